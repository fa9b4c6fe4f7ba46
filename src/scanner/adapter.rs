//! Subprocess adapter for the local signature scanner.
//!
//! The scanner is an interactive console program: during a batch scan it can
//! stop and ask for confirmation ("disinfect? S/N", "apply the same action to
//! all?"). The adapter runs it with all three standard streams piped and
//! watches every chunk on stdout and stderr; each recognized prompt is
//! answered with a single negative response on stdin, so the artifact is
//! never disinfected or removed and the scan completes unattended.
//!
//! Prompt detection is heuristic, so a reinforcement timer fires once after a
//! fixed delay and writes the negative answer unconditionally while the
//! process is still running. Lifecycle: Spawned -> Running (prompt watch) ->
//! Exited(code) | Errored(spawn failure). Non-zero exit codes are returned
//! uninterpreted: the real verdict comes from parsing the captured text.

use crate::config::ScannerConfig;
use crate::error::{Result, VigilError};
use crate::timeout::{with_timeout, TimeoutConfig};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn, Instrument};

/// The answer written for every detected prompt. Always decline the
/// destructive action; the stored artifact is preserved for forensic review.
pub const NEGATIVE_ANSWER: &str = "N\n";

/// Doubled answer used by the reinforcement timer.
const REINFORCEMENT_ANSWER: &str = "N\nN\n";

static PROMPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)S/?N|descontaminar|aplicar la misma acci[oó]n").unwrap());

/// Captured result of one scanner run, uninterpreted.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// Process exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Seam for the local scan leg.
#[async_trait]
pub trait LocalScanner: Send + Sync {
    /// Run the scanner against a stored file path and capture its output.
    async fn scan(&self, file_path: &Path) -> Result<ScanOutput>;
}

/// Adapter around the external scanner executable.
#[derive(Debug, Clone)]
pub struct SegavScanner {
    config: ScannerConfig,
}

impl SegavScanner {
    /// Build the adapter, verifying the executable exists up front.
    pub fn new(config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    async fn run(&self, file_path: &Path) -> Result<ScanOutput> {
        let mut child = Command::new(&self.config.executable)
            .arg(&self.config.scan_now_flag)
            .arg(&self.config.files_flag)
            .arg(file_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // If the caller abandons the request the subprocess must still be
            // reaped, not left orphaned.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                VigilError::ExternalProcessFailure(format!(
                    "failed to spawn {}: {}",
                    self.config.executable.display(),
                    e
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            VigilError::ExternalProcessFailure("scanner stdin not piped".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            VigilError::ExternalProcessFailure("scanner stdout not piped".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            VigilError::ExternalProcessFailure("scanner stderr not piped".to_string())
        })?;

        // Prompt answers flow from the stream watchers to a single stdin
        // writer; the channel closing ends the writer.
        let (answer_tx, answer_rx) = mpsc::unbounded_channel::<&'static str>();
        let writer = tokio::spawn(feed_stdin(stdin, answer_rx));
        let out_task = tokio::spawn(watch_stream(stdout, answer_tx.clone(), "stdout"));
        let err_task = tokio::spawn(watch_stream(stderr, answer_tx.clone(), "stderr"));

        let reinforce_delay = Duration::from_millis(self.config.reinforce_delay_ms);
        let reinforce = sleep(reinforce_delay);
        tokio::pin!(reinforce);
        let mut reinforced = false;

        let status = loop {
            tokio::select! {
                status = child.wait() => {
                    break status.map_err(|e| {
                        VigilError::ExternalProcessFailure(format!("wait failed: {}", e))
                    })?;
                }
                _ = &mut reinforce, if !reinforced => {
                    // The process is still running and may be blocked on a
                    // prompt we did not recognize.
                    reinforced = true;
                    debug!("reinforcement timer fired, writing negative answer");
                    let _ = answer_tx.send(REINFORCEMENT_ANSWER);
                }
            }
        };
        drop(answer_tx);

        let stdout_text = out_task.await.unwrap_or_default();
        let stderr_text = err_task.await.unwrap_or_default();
        let _ = writer.await;

        info!(exit_code = ?status.code(), "scan completed");
        Ok(ScanOutput {
            exit_code: status.code(),
            stdout: stdout_text,
            stderr: stderr_text,
        })
    }
}

#[async_trait]
impl LocalScanner for SegavScanner {
    async fn scan(&self, file_path: &Path) -> Result<ScanOutput> {
        let span = tracing::info_span!("local_scan", path = %file_path.display());
        // On timeout the child is dropped mid-flight; kill_on_drop reaps it.
        with_timeout(
            TimeoutConfig::new(self.config.timeout_seconds, "local_scan"),
            self.run(file_path),
        )
        .instrument(span)
        .await
    }
}

/// Read a stream chunk by chunk, answering each prompt occurrence with
/// exactly one negative response line, and accumulate the text.
async fn watch_stream<R>(
    mut stream: R,
    answers: mpsc::UnboundedSender<&'static str>,
    label: &'static str,
) -> String
where
    R: AsyncRead + Unpin,
{
    let mut text = String::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]);
                for _ in PROMPT_RE.find_iter(&chunk) {
                    debug!(stream = label, "prompt detected, declining");
                    let _ = answers.send(NEGATIVE_ANSWER);
                }
                text.push_str(&chunk);
            }
            Err(e) => {
                warn!(stream = label, error = %e, "stream read failed");
                break;
            }
        }
    }
    text
}

/// Write queued answers to the scanner's stdin until the channel closes.
/// A write error means the process already closed its input; stop quietly.
async fn feed_stdin(mut stdin: ChildStdin, mut answers: mpsc::UnboundedReceiver<&'static str>) {
    while let Some(answer) = answers.recv().await {
        if stdin.write_all(answer.as_bytes()).await.is_err() {
            break;
        }
        let _ = stdin.flush().await;
    }
}
