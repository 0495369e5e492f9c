//! Generation backends.
//!
//! A [`GenerationClient`] turns a compiled prompt into the agent's raw answer.
//! The bundled [`AgentCommandClient`] pipes the prompt into a local agent CLI
//! and reads its stdout; anything else (a test double, another transport)
//! plugs in behind the same trait.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// The two halves of a prompt handed to an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPayload {
    pub system: String,
    pub user: String,
}

impl GenerationPayload {
    /// Single-document form for agents that only take one input stream.
    pub fn combined(&self) -> String {
        format!("{}\n\n---\n\n{}", self.system.trim_end(), self.user)
    }
}

#[derive(Debug, Error)]
#[error("generation cancelled")]
pub struct GenerationCancelled;

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut,
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    fn id(&self) -> &str;

    async fn generate(&self, payload: &GenerationPayload, cancel: CancellationToken)
    -> Result<String>;
}

pub struct AgentCommandClient {
    id: String,
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl AgentCommandClient {
    /// Resolves `command` on PATH. Fails early when the agent is not installed.
    pub fn new(command: &str, args: Vec<String>, timeout: Duration) -> Result<Self> {
        let program = which::which(command)
            .with_context(|| format!("agent command '{command}' not found in PATH"))?;
        Ok(Self {
            id: command.to_string(),
            program,
            args,
            timeout,
        })
    }
}

#[async_trait]
impl GenerationClient for AgentCommandClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(
        &self,
        payload: &GenerationPayload,
        cancel: CancellationToken,
    ) -> Result<String> {
        log::debug!("starting agent {} {}", self.program.display(), self.args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start agent {}", self.program.display()))?;

        let mut stdin = child.stdin.take().context("agent stdin unavailable")?;
        let mut stdout = child.stdout.take().context("agent stdout unavailable")?;
        let mut stderr = child.stderr.take().context("agent stderr unavailable")?;

        // Feed and drain concurrently so a chatty agent can't block on a full pipe.
        let input = payload.combined();
        let writer = tokio::spawn(async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        });
        let out_reader = tokio::spawn(async move {
            let mut buf = String::new();
            stdout.read_to_string(&mut buf).await.map(|_| buf)
        });
        let err_reader = tokio::spawn(async move {
            let mut buf = String::new();
            stderr.read_to_string(&mut buf).await.map(|_| buf)
        });

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = tokio::time::sleep(self.timeout) => Outcome::TimedOut,
        };

        let status = match outcome {
            Outcome::Exited(status) => status.context("waiting for agent failed")?,
            Outcome::Cancelled => {
                let _ = child.kill().await;
                return Err(GenerationCancelled.into());
            }
            Outcome::TimedOut => {
                let _ = child.kill().await;
                anyhow::bail!("agent timed out after {}s", self.timeout.as_secs());
            }
        };

        if let Err(err) = writer.await.context("stdin writer panicked")? {
            log::debug!("agent closed stdin early: {err}");
        }
        let output = out_reader.await.context("stdout reader panicked")??;
        let errors = err_reader.await.context("stderr reader panicked")??;

        if !status.success() {
            anyhow::bail!("agent exited with {status}: {}", errors.trim());
        }
        if output.trim().is_empty() {
            anyhow::bail!("agent produced no output");
        }
        Ok(output)
    }
}
