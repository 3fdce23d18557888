//! Document text extraction

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{AppError, AppResult};

/// Turns a binary document into plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, document: &[u8]) -> AppResult<String>;
}

/// Pipes the document through the poppler `pdftotext` binary
#[derive(Debug, Clone)]
pub struct PdfToTextExtractor {
    binary: String,
}

impl PdfToTextExtractor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl TextExtractor for PdfToTextExtractor {
    async fn extract_text(&self, document: &[u8]) -> AppResult<String> {
        let mut child = Command::new(&self.binary)
            .args(["-layout", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Extraction(format!("Failed to start {}: {}", self.binary, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Extraction("pdftotext stdin unavailable".to_string()))?;
        let input = document.to_vec();
        // Feed stdin concurrently so a full stdout pipe cannot deadlock us
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AppError::Extraction(format!("pdftotext failed: {}", e)))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(AppError::Extraction(format!(
                    "Writing document to pdftotext failed: {}",
                    e
                )))
            }
            Err(e) => return Err(AppError::Extraction(format!("pdftotext writer panicked: {}", e))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Extraction(format!(
                "pdftotext exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_extraction_error() {
        let extractor = PdfToTextExtractor::new("/nonexistent/pdftotext");
        let err = extractor.extract_text(b"%PDF-1.4").await.unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }
}
