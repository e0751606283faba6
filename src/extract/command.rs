//! Extractor backed by an external command
//!
//! The prompt is written to the command's stdin and its stdout is the reply.
//! Attachments are written to a scratch file whose path is passed in
//! `RIDGE_ATTACHMENT`; the token budget is passed in `RIDGE_MAX_TOKENS`.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::extract::{ExtractError, ExtractionRequest, TextExtractor};

/// Runs `sh -c <command>` once per request
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    command: String,
}

impl CommandExtractor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Scratch file removed when dropped
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[async_trait]
impl TextExtractor for CommandExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<String, ExtractError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .env("RIDGE_MAX_TOKENS", request.max_tokens.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let _scratch = match &request.attachment {
            Some(attachment) => {
                let ext = attachment
                    .file_name
                    .as_deref()
                    .and_then(|n| n.rsplit_once('.'))
                    .map(|(_, ext)| ext.to_string())
                    .unwrap_or_else(|| "bin".to_string());
                let path = std::env::temp_dir()
                    .join(format!("ridge-attachment-{}.{}", ulid::Ulid::new(), ext));
                tokio::fs::write(&path, &attachment.data).await?;
                cmd.env("RIDGE_ATTACHMENT", &path)
                    .env("RIDGE_ATTACHMENT_TYPE", &attachment.media_type);
                Some(ScratchFile(path))
            }
            None => None,
        };

        let mut child = cmd
            .spawn()
            .map_err(|e| ExtractError::Unavailable(format!("{}: {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that exits without reading the prompt is judged by its status
            if let Err(e) = stdin.write_all(request.prompt.as_bytes()).await {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Failed(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractError::InvalidResponse {
                reason: "empty response".to_string(),
            });
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.command
    }
}
