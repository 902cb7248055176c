//! OCR Engine
//!
//! Image-to-text via the Tesseract command line tool. The image is piped
//! in on stdin and the recognized text read back from stdout.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use vtrack_utils::OcrConfig;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    language: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            language: config.language.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Returns an engine only when OCR is enabled and the binary answers
    /// `--version`.
    pub async fn detect(config: &OcrConfig) -> Option<Self> {
        if !config.enabled {
            info!("OCR disabled by configuration");
            return None;
        }

        let probe = Command::new(&config.tesseract_cmd)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match probe {
            Ok(status) if status.success() => {
                info!(command = %config.tesseract_cmd, "OCR engine available");
                Some(Self::new(config))
            }
            Ok(status) => {
                warn!(command = %config.tesseract_cmd, %status, "OCR engine probe failed, OCR disabled");
                None
            }
            Err(e) => {
                warn!(command = %config.tesseract_cmd, error = %e, "OCR engine not found, OCR disabled");
                None
            }
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String> {
        let output = self
            .run(&["stdin", "stdout", "-l", self.language.as_str()], image)
            .await?;

        if !output.status.success() {
            bail!(
                "OCR exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TesseractOcr {
    /// Pipes `image` through the command. The time limit covers feeding
    /// stdin as well as waiting for the exit.
    async fn run(&self, args: &[&str], image: &[u8]) -> Result<Output> {
        let mut child = Command::new(&self.command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.command))?;

        let mut stdin = child.stdin.take().context("OCR process has no stdin")?;
        let exchange = async move {
            stdin
                .write_all(image)
                .await
                .context("Failed to pipe image to OCR process")?;
            drop(stdin);
            child
                .wait_with_output()
                .await
                .context("Failed to read OCR output")
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .with_context(|| format!("OCR timed out after {:?}", self.timeout))?
    }
}
