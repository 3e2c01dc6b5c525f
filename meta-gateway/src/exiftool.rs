//! ExifTool process adapter
//!
//! Every call runs one `exiftool` process. ExifTool writes to a temporary
//! file and renames it over the original, so a single write invocation lands
//! all requested tags or none of them.

use crate::error::{MetadataError, MetadataResult};
use crate::store::{MetadataStore, TagUpdate};
use async_trait::async_trait;
use serde_json::Value;
use shared::{FileStatus, ImageTags, tag_names};
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Adapter options
#[derive(Debug, Clone)]
pub struct ExifToolOptions {
    /// Keep ExifTool's `<file>_original` backup on write
    pub keep_backup: bool,
    /// Ask ExifTool to validate structure on read and treat errors as corruption
    pub validate: bool,
    /// Upper bound for a single process run
    pub timeout: Duration,
}

impl Default for ExifToolOptions {
    fn default() -> Self {
        Self {
            keep_backup: false,
            validate: true,
            timeout: Duration::from_secs(30),
        }
    }
}

/// ExifTool-backed metadata store
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: String,
    options: ExifToolOptions,
}

impl ExifTool {
    /// Create an adapter for the given executable name or path
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            options: ExifToolOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExifToolOptions) -> Self {
        self.options = options;
        self
    }

    /// Check that the executable runs; returns its version string
    pub async fn version(&self) -> MetadataResult<String> {
        let output = Command::new(&self.program)
            .arg("-ver")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| MetadataError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, path: &Path, args: Vec<String>) -> MetadataResult<Output> {
        let mut command = Command::new(&self.program);
        command.args(&args).arg(path).kill_on_drop(true);

        match tokio::time::timeout(self.options.timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(MetadataError::Spawn {
                program: self.program.clone(),
                source,
            }),
            Err(_) => Err(MetadataError::Timeout {
                path: path.to_path_buf(),
                seconds: self.options.timeout.as_secs(),
            }),
        }
    }

    fn read_args(&self) -> Vec<String> {
        let mut args = vec!["-json".to_string(), "-G".to_string(), "-n".to_string()];
        if self.options.validate {
            args.push("-validate".to_string());
        }
        args.extend(tag_names::ALL.iter().map(|tag| format!("-{}", tag)));
        args
    }
}

/// Build the argument list for one write invocation
pub(crate) fn write_args(update: &TagUpdate, keep_backup: bool) -> Vec<String> {
    let mut args = vec!["-P".to_string(), "-m".to_string()];
    if !keep_backup {
        args.push("-overwrite_original".to_string());
    }

    if let Some(keywords) = &update.keywords {
        if keywords.is_empty() {
            args.push(format!("-{}=", tag_names::KEYWORDS));
        }
        // Repeated assignments replace the list as a whole
        for keyword in keywords {
            args.push(format!("-{}={}", tag_names::KEYWORDS, keyword));
        }
    }
    if let Some(description) = &update.description {
        args.push(format!("-{}={}", tag_names::DESCRIPTION, description));
    }
    if let Some(identifier) = &update.identifier {
        args.push(format!("-{}={}", tag_names::IDENTIFIER, identifier));
    }
    if let Some(status) = update.status {
        args.push(format!(
            "-{}={}",
            tag_names::STATUS,
            status.tag_value().unwrap_or("")
        ));
    }
    args
}

/// Turn `exiftool -json -G -n` output for one file into a tag snapshot
pub(crate) fn parse_read_output(path: &Path, stdout: &str) -> MetadataResult<ImageTags> {
    let parsed: Value = serde_json::from_str(stdout)?;
    let entry = parsed
        .as_array()
        .and_then(|files| files.first())
        .and_then(Value::as_object)
        .ok_or_else(|| MetadataError::Read {
            path: path.to_path_buf(),
            reason: "empty ExifTool output".into(),
        })?;

    let mut tags = ImageTags::default();
    for (key, value) in entry {
        // Keys are group-prefixed ("Composite:Keywords", "XMP:Status", ...)
        let name = key.rsplit(':').next().unwrap_or(key);
        match name {
            "Error" => {
                return Err(MetadataError::Corrupted {
                    path: path.to_path_buf(),
                    reason: value_to_string(value).unwrap_or_default(),
                });
            }
            "Validate" => {
                let errors = value_to_string(value)
                    .and_then(|v| v.split_whitespace().next().and_then(|n| n.parse::<u32>().ok()))
                    .unwrap_or(0);
                if errors > 0 {
                    return Err(MetadataError::Corrupted {
                        path: path.to_path_buf(),
                        reason: format!("validation reported {} error(s)", errors),
                    });
                }
            }
            "Keywords" | "Subject" => {
                for keyword in value_to_list(value) {
                    if !tags.keywords.contains(&keyword) {
                        tags.keywords.push(keyword);
                    }
                }
            }
            "Description" | "ImageDescription" | "Caption-Abstract" => {
                if tags.description.is_none() {
                    tags.description = value_to_string(value).filter(|d| !d.trim().is_empty());
                }
            }
            "Identifier" => {
                tags.identifier = value_to_string(value).filter(|i| !i.trim().is_empty());
            }
            "Status" => {
                if let Some(raw) = value_to_string(value) {
                    tags.status = FileStatus::from_tag_value(&raw);
                    if tags.status.is_none() && !raw.trim().is_empty() {
                        warn!(path = %path.display(), status = %raw, "Unrecognized status tag");
                    }
                }
            }
            _ => {}
        }
    }
    Ok(tags)
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_to_string).collect(),
        other => value_to_string(other).into_iter().collect(),
    }
}

fn stderr_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let reason = stderr
        .lines()
        .find(|line| line.starts_with("Error"))
        .or_else(|| stderr.lines().next())
        .unwrap_or("no diagnostic output");
    reason.trim().to_string()
}

#[async_trait]
impl MetadataStore for ExifTool {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn read(&self, path: &Path) -> MetadataResult<ImageTags> {
        if !tokio::fs::try_exists(path).await? {
            return Err(MetadataError::Read {
                path: path.to_path_buf(),
                reason: "file does not exist".into(),
            });
        }

        let output = self.run(path, self.read_args()).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if stdout.trim().is_empty() {
            // ExifTool prints nothing to stdout when it cannot parse the file at all
            return Err(MetadataError::Corrupted {
                path: path.to_path_buf(),
                reason: stderr_reason(&output),
            });
        }

        let tags = parse_read_output(path, &stdout)?;
        debug!(
            keywords = tags.keywords.len(),
            has_identifier = tags.identifier.is_some(),
            status = ?tags.status,
            "Read tags"
        );
        Ok(tags)
    }

    #[instrument(skip(self, update), fields(path = %path.display()))]
    async fn write(&self, path: &Path, update: &TagUpdate) -> MetadataResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        let output = self
            .run(path, write_args(update, self.options.keep_backup))
            .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        let written = stdout.contains("1 image files updated")
            || stdout.contains("1 image files unchanged");
        if !output.status.success() || !written {
            return Err(MetadataError::Write {
                path: path.to_path_buf(),
                reason: stderr_reason(&output),
            });
        }

        debug!("Tags written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("/photos/cat.jpg")
    }

    #[test]
    fn test_parse_full_snapshot() {
        let out = r#"[{
            "SourceFile": "/photos/cat.jpg",
            "ExifTool:Validate": "0 0 0",
            "Composite:Keywords": ["cat", "sofa"],
            "Composite:Description": "A cat on a sofa.",
            "XMP:Identifier": "px1:abcd",
            "XMP:Status": "success"
        }]"#;
        let tags = parse_read_output(&path(), out).unwrap();
        assert_eq!(tags.keywords, vec!["cat", "sofa"]);
        assert_eq!(tags.description.as_deref(), Some("A cat on a sofa."));
        assert_eq!(tags.identifier.as_deref(), Some("px1:abcd"));
        assert_eq!(tags.status, Some(FileStatus::Done));
    }

    #[test]
    fn test_parse_single_keyword_scalar_and_no_tags() {
        let out = r#"[{"SourceFile": "/photos/cat.jpg", "Composite:Keywords": 1984}]"#;
        let tags = parse_read_output(&path(), out).unwrap();
        assert_eq!(tags.keywords, vec!["1984"]);

        let out = r#"[{"SourceFile": "/photos/cat.jpg"}]"#;
        let tags = parse_read_output(&path(), out).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn test_parse_validation_errors_are_corruption() {
        let out = r#"[{"SourceFile": "/photos/cat.jpg", "ExifTool:Validate": "2 1 0"}]"#;
        let err = parse_read_output(&path(), out).unwrap_err();
        assert!(err.is_corrupted());

        let out = r#"[{"SourceFile": "/photos/cat.jpg", "ExifTool:Error": "File format error"}]"#;
        let err = parse_read_output(&path(), out).unwrap_err();
        assert!(err.is_corrupted());
    }

    #[test]
    fn test_write_args_replace_keyword_list() {
        let update = TagUpdate::commit(
            vec!["cat".into(), "red sofa".into()],
            Some("A cat.".into()),
            "px1:ff",
        );
        let args = write_args(&update, false);
        assert!(args.contains(&"-overwrite_original".to_string()));
        assert!(args.contains(&"-MWG:Keywords=cat".to_string()));
        assert!(args.contains(&"-MWG:Keywords=red sofa".to_string()));
        assert!(args.contains(&"-MWG:Description=A cat.".to_string()));
        assert!(args.contains(&"-XMP:Identifier=px1:ff".to_string()));
        assert!(args.contains(&"-XMP:Status=success".to_string()));
    }

    #[test]
    fn test_write_args_status_only() {
        let update = TagUpdate::status(FileStatus::Failed, None);
        let args = write_args(&update, true);
        assert!(!args.contains(&"-overwrite_original".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("-MWG:")));
        assert!(args.contains(&"-XMP:Status=failed".to_string()));

        let clear = TagUpdate {
            keywords: Some(Vec::new()),
            ..Default::default()
        };
        assert!(write_args(&clear, false).contains(&"-MWG:Keywords=".to_string()));
    }
}
