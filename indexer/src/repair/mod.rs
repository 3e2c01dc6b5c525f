//! Response repair
//!
//! Model output is coerced into keywords and a caption by an ordered list
//! of pure stages, cheapest first:
//! - `Strict`: the text is valid JSON as is
//! - `Syntactic`: fences and surrounding prose removed, common JSON breakage fixed
//! - `Heuristic`: list and caption patterns pulled out of free text
//!
//! The first stage that yields a recognizable record wins. When every stage
//! gives up the result is [`Repaired::Unparsable`].

mod heuristic;
mod syntax;
mod text;

pub use syntax::{extract_block, repair_json, strip_fences};
pub use text::clean_caption;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Which repair stage produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStage {
    Strict,
    Syntactic,
    Heuristic,
}

/// Structured record recovered from model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub keywords: Vec<String>,
    pub caption: Option<String>,
    pub stage: RepairStage,
}

/// Result of running the repair stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repaired {
    Parsed(ParsedResponse),
    Unparsable,
}

/// Every repair stage gave up
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unparsable model response ({length} chars): {excerpt}")]
pub struct UnparsableResponseError {
    pub length: usize,
    pub excerpt: String,
}

impl UnparsableResponseError {
    fn new(raw: &str) -> Self {
        const EXCERPT_CHARS: usize = 80;
        let mut excerpt: String = raw.trim().chars().take(EXCERPT_CHARS).collect();
        if raw.trim().chars().count() > EXCERPT_CHARS {
            excerpt.push_str("...");
        }
        Self {
            length: raw.len(),
            excerpt,
        }
    }
}

/// Fields a stage managed to pull out; `None` means the key was absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Fields {
    pub keywords: Option<Vec<String>>,
    pub caption: Option<String>,
}

type Stage = fn(&str) -> Option<Fields>;

const STAGES: [(RepairStage, Stage); 3] = [
    (RepairStage::Strict, strict),
    (RepairStage::Syntactic, syntactic),
    (RepairStage::Heuristic, heuristic::salvage),
];

/// Run the repair stages in order
pub fn repair(raw: &str) -> Repaired {
    for (stage, run) in STAGES {
        if let Some(fields) = run(raw) {
            return Repaired::Parsed(ParsedResponse {
                keywords: fields.keywords.unwrap_or_default(),
                caption: fields.caption.and_then(|c| clean_caption(&c)),
                stage,
            });
        }
    }
    Repaired::Unparsable
}

/// [`repair`] as a `Result`
pub fn parse(raw: &str) -> Result<ParsedResponse, UnparsableResponseError> {
    match repair(raw) {
        Repaired::Parsed(parsed) => Ok(parsed),
        Repaired::Unparsable => Err(UnparsableResponseError::new(raw)),
    }
}

fn strict(raw: &str) -> Option<Fields> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    fields_from_value(&value)
}

fn syntactic(raw: &str) -> Option<Fields> {
    let unfenced = strip_fences(raw);
    let block = extract_block(unfenced)?;
    if let Ok(value) = serde_json::from_str::<Value>(block) {
        return fields_from_value(&value);
    }
    let value: Value = serde_json::from_str(&repair_json(block)).ok()?;
    fields_from_value(&value)
}

fn fields_from_value(value: &Value) -> Option<Fields> {
    match value {
        Value::Object(map) => {
            let mut fields = Fields::default();
            for (key, v) in map {
                match key.trim().to_lowercase().as_str() {
                    "keywords" | "keyword" | "tags" => fields.keywords = Some(keyword_values(v)),
                    "description" | "caption" => fields.caption = caption_value(v),
                    _ => {}
                }
            }
            if fields.keywords.is_some() || map.keys().any(|k| is_caption_key(k)) {
                return Some(fields);
            }
            // {"result": {...}} style wrappers
            match map.values().collect::<Vec<_>>().as_slice() {
                [inner @ (Value::Object(_) | Value::String(_))] => fields_from_value(inner),
                _ => None,
            }
        }
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => {
            Some(Fields {
                keywords: Some(keyword_values(value)),
                caption: None,
            })
        }
        // JSON encoded inside a JSON string
        Value::String(inner) => {
            let nested: Value = serde_json::from_str(inner.trim()).ok()?;
            match nested {
                Value::Object(_) | Value::Array(_) => fields_from_value(&nested),
                _ => None,
            }
        }
        _ => None,
    }
}

fn is_caption_key(key: &str) -> bool {
    matches!(key.trim().to_lowercase().as_str(), "description" | "caption")
}

fn keyword_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split([',', ';'])
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn caption_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            Some(joined)
        }
        _ => None,
    }
}
