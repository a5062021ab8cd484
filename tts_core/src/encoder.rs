use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::TtsError;

/// MP3 conversion through an external ffmpeg-style encoder process.
///
/// One process is spawned per call and fed through its standard streams
/// entirely in memory; nothing touches the filesystem and processes are not
/// reused. A semaphore bounds how many encoders run at once, and each run is
/// subject to a deadline after which the child is killed.
pub struct MpegEncoder {
    program: String,
    bitrate: String,
    permits: Semaphore,
    timeout: Duration,
}

impl MpegEncoder {
    pub fn new(
        program: impl Into<String>,
        bitrate: impl Into<String>,
        max_concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            bitrate: bitrate.into(),
            permits: Semaphore::new(max_concurrency.max(1)),
            timeout,
        }
    }

    /// Convert a complete WAV byte stream to MP3 at the configured bitrate.
    ///
    /// The sample rate is not passed to the process; the encoder reads it
    /// from the WAV header.
    pub async fn encode(&self, wav_bytes: &[u8]) -> Result<Vec<u8>, TtsError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| TtsError::Encoding("encoder pool closed".to_string()))?;

        match tokio::time::timeout(self.timeout, self.run(wav_bytes)).await {
            Ok(result) => result,
            // Dropping the future drops the child, which is killed on drop.
            Err(_) => Err(TtsError::Encoding(format!(
                "encoder timed out after {:?}",
                self.timeout
            ))),
        }
    }

    async fn run(&self, wav_bytes: &[u8]) -> Result<Vec<u8>, TtsError> {
        let mut child = Command::new(&self.program)
            .arg("-y")
            .args(["-hide_banner", "-loglevel", "error"])
            .args(["-i", "-"])
            .args(["-f", "mp3"])
            .args(["-b:a", &self.bitrate])
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TtsError::Encoding(format!("failed to spawn {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TtsError::Encoding("encoder stdin unavailable".to_string()))?;

        // Feed stdin from its own task so a full stdout pipe can never
        // deadlock against our write. Write errors surface through the
        // child's exit status.
        let input = wav_bytes.to_vec();
        let writer = tokio::spawn(async move {
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| TtsError::Encoding(format!("encoder wait failed: {e}")))?;
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TtsError::Encoding(format!(
                "encoder exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        debug!(bytes_in = wav_bytes.len(), bytes_out = output.stdout.len(), "mp3 encode complete");
        Ok(output.stdout)
    }
}
