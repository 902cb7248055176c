//! PDF Processor
//!
//! Reads the embedded text layer of a PDF. Scanned PDFs without one yield
//! empty text.

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Blocking; run it off the async executor.
    pub fn extract_text(&self, data: &[u8]) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(data)
            .context("Failed to extract text from PDF")?;
        Ok(text)
    }

    pub fn has_pdf_header(data: &[u8]) -> bool {
        data.starts_with(b"%PDF-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_detection() {
        assert!(PdfProcessor::has_pdf_header(b"%PDF-1.7\n..."));
        assert!(!PdfProcessor::has_pdf_header(b"\x89PNG\r\n"));
    }
}
