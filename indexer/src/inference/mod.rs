//! Captioning protocol
//!
//! [`Captioner`] turns a prepared image into raw keywords and a caption.
//! It owns the admission bound on concurrent model calls, so however many
//! workers are running, at most `concurrency.inference` requests reach the
//! endpoint at once. Transport failures are retried per call on a
//! deterministic backoff schedule.

pub mod caption;
mod sleep;

pub use sleep::{Sleeper, TokioSleeper, sleep_or_cancel};

use crate::core::{Backoff, CaptionProtocol, IndexError, IndexResult, IndexerConfig, Instructions};
use crate::repair::{self, RepairStage};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use vision_client::{ImagePayload, VisionBackend, VisionRequest};

/// Raw model output for one image, after repair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub keywords: Vec<String>,
    pub caption: Option<String>,
    /// Repair stage that recovered the keyword record
    pub stage: RepairStage,
    /// Endpoint requests made, retries included
    pub calls: u32,
}

pub struct Captioner {
    backend: Arc<dyn VisionBackend>,
    admission: Arc<Semaphore>,
    instructions: Instructions,
    protocol: CaptionProtocol,
    call_retries: u32,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
}

impl Captioner {
    pub fn new(backend: Arc<dyn VisionBackend>, config: &IndexerConfig) -> Self {
        Self {
            backend,
            admission: Arc::new(Semaphore::new(config.concurrency.inference.max(1))),
            instructions: config.instructions.clone(),
            protocol: config.protocol,
            call_retries: config.retry.call_retries,
            backoff: config.retry.backoff(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the retry delay implementation
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn protocol(&self) -> CaptionProtocol {
        self.protocol
    }

    /// Run the configured protocol for one image
    ///
    /// Two-step: a keywords-only call, then a caption call (optionally told
    /// the keywords). One-step: a single call for both. When no caption is
    /// wanted only the keyword prompt is sent.
    #[instrument(skip_all, fields(protocol = ?self.protocol))]
    pub async fn generate(
        &self,
        image: &ImagePayload,
        want_caption: bool,
        cancel: &CancellationToken,
    ) -> IndexResult<Generation> {
        let mut calls = 0;

        if self.protocol == CaptionProtocol::OneStep {
            let instruction = if want_caption {
                &self.instructions.one_step
            } else {
                &self.instructions.keyword_stage
            };
            let text = self.call(instruction.clone(), image, cancel, &mut calls).await?;
            let parsed = repair::parse(&text)?;
            debug!(stage = ?parsed.stage, keywords = parsed.keywords.len(), "One-step response parsed");
            return Ok(Generation {
                keywords: parsed.keywords,
                caption: parsed.caption.filter(|_| want_caption),
                stage: parsed.stage,
                calls,
            });
        }

        let text = self
            .call(self.instructions.keyword_stage.clone(), image, cancel, &mut calls)
            .await?;
        let parsed = repair::parse(&text)?;
        debug!(stage = ?parsed.stage, keywords = parsed.keywords.len(), "Keyword stage parsed");

        let caption = if want_caption {
            let instruction = self.caption_instruction(&parsed.keywords);
            let text = self.call(instruction, image, cancel, &mut calls).await?;
            repair::clean_caption(&text)
        } else {
            None
        };

        Ok(Generation {
            keywords: parsed.keywords,
            caption,
            stage: parsed.stage,
            calls,
        })
    }

    fn caption_instruction(&self, keywords: &[String]) -> String {
        let base = &self.instructions.caption_stage;
        if self.instructions.keywords_in_caption_stage && !keywords.is_empty() {
            format!("{}\nKeywords: {}", base, keywords.join(", "))
        } else {
            base.clone()
        }
    }

    /// One admitted request with per-call retries
    async fn call(
        &self,
        instruction: String,
        image: &ImagePayload,
        cancel: &CancellationToken,
        calls: &mut u32,
    ) -> IndexResult<String> {
        let request = VisionRequest {
            system: Some(self.instructions.system.clone()).filter(|s| !s.is_empty()),
            instruction,
            image: image.clone(),
        };

        let mut retry = 0;
        loop {
            let result = {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(IndexError::Cancelled),
                    permit = self.admission.acquire() => permit
                        .map_err(|_| IndexError::Internal("admission closed".into()))?,
                };
                *calls += 1;
                self.backend.complete(&request).await
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && retry < self.call_retries => {
                    retry += 1;
                    let delay = self.backoff.delay(retry);
                    warn!(retry, delay_ms = delay.as_millis() as u64, error = %e, "Inference call failed, retrying");
                    if !sleep_or_cancel(self.sleeper.as_ref(), delay, cancel).await {
                        return Err(IndexError::Cancelled);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
