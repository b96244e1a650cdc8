use std::process::Stdio;

use anyhow::{Context, Result, bail};
use assist::{CompletionProvider, CompletionRequest};
use async_trait::async_trait;
use config::AssistConfig;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs an external program per completion: the request goes to its stdin
/// as JSON and its stdout is the completion text.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &AssistConfig) -> Option<Self> {
        let program = config.command.as_deref()?.trim();
        if program.is_empty() {
            return None;
        }
        Some(Self::new(program, config.args.clone()))
    }
}

#[async_trait]
impl CompletionProvider for CommandProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let payload = serde_json::to_vec(request).context("failed to encode completion request")?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", self.program))?;

        let mut stdin = child.stdin.take().context("provider stdin unavailable")?;
        stdin
            .write_all(&payload)
            .await
            .context("failed to send completion request")?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .context("failed to wait for provider")?;

        if !output.status.success() {
            bail!(
                "provider {} failed: {} {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let content = String::from_utf8(output.stdout).context("provider output is not UTF-8")?;
        if content.trim().is_empty() {
            warn!(program = %self.program, "empty completion content");
        }
        debug!(program = %self.program, bytes = content.len(), "completion received");
        Ok(content)
    }
}
