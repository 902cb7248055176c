//! Document Intake
//!
//! Validates an uploaded scan, stores it, pulls text out of it and turns
//! that text into an expiry date suggestion. Text extraction problems never
//! fail the upload; they only mean there is no suggestion.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vtrack_models::InferredExpiry;
use vtrack_utils::{validate_upload, ExpiryInferencer, UploadConfig, VtrackError, VtrackResult};

use crate::ocr::OcrEngine;
use crate::pdf_processor::PdfProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirySource {
    Manual,
    Ocr,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryResolution {
    pub expiry_date: Option<NaiveDate>,
    pub source: ExpirySource,
    /// Inferred date as `dd/mm/YYYY`, reported even when overridden.
    pub ocr_suggestion: Option<String>,
}

/// A manual date always wins; otherwise the inferred one fills the gap.
pub fn resolve_expiry(manual: Option<NaiveDate>, inferred: Option<&InferredExpiry>) -> ExpiryResolution {
    let ocr_suggestion = inferred.map(InferredExpiry::formatted);
    match (manual, inferred) {
        (Some(date), _) => ExpiryResolution {
            expiry_date: Some(date),
            source: ExpirySource::Manual,
            ocr_suggestion,
        },
        (None, Some(inferred)) => ExpiryResolution {
            expiry_date: Some(inferred.date),
            source: ExpirySource::Ocr,
            ocr_suggestion,
        },
        (None, None) => ExpiryResolution {
            expiry_date: None,
            source: ExpirySource::None,
            ocr_suggestion: None,
        },
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub file_name: String,
    pub file_type: String,
    pub file_path: String,
    pub size_bytes: usize,
    pub text_extracted: bool,
    #[serde(flatten)]
    pub expiry: ExpiryResolution,
}

#[derive(Clone)]
pub struct DocumentIntake {
    ocr: Option<Arc<dyn OcrEngine>>,
    pdf: PdfProcessor,
    inferencer: Arc<ExpiryInferencer>,
    uploads: UploadConfig,
}

impl DocumentIntake {
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>, uploads: UploadConfig) -> Self {
        Self {
            ocr,
            pdf: PdfProcessor::new(),
            inferencer: Arc::new(ExpiryInferencer::default()),
            uploads,
        }
    }

    pub fn ocr_available(&self) -> bool {
        self.ocr.is_some()
    }

    pub fn suggest_expiry(&self, text: &str) -> Option<InferredExpiry> {
        self.inferencer.infer_expiry(text)
    }

    pub async fn scan(
        &self,
        file_name: &str,
        data: Vec<u8>,
        manual_expiry: Option<NaiveDate>,
    ) -> VtrackResult<ScanOutcome> {
        let file_type = validate_upload(file_name, data.len(), &self.uploads)?;
        let size_bytes = data.len();

        let stored = self
            .store(&file_type, &data)
            .await
            .map_err(|e| VtrackError::document_processing(format!("{:#}", e)))?;

        let text = match self.extract_text(&file_type, data).await {
            Ok(text) => text,
            Err(e) => {
                warn!(file_name, error = %format!("{:#}", e), "Text extraction failed, no expiry suggestion");
                None
            }
        };

        let inferred = text.as_deref().and_then(|text| self.suggest_expiry(text));
        let expiry = resolve_expiry(manual_expiry, inferred.as_ref());
        info!(
            file_name,
            file_type = %file_type,
            source = ?expiry.source,
            suggestion = ?expiry.ocr_suggestion,
            "Document scanned"
        );

        Ok(ScanOutcome {
            file_name: file_name.to_string(),
            file_type,
            file_path: stored.display().to_string(),
            size_bytes,
            text_extracted: text.is_some(),
            expiry,
        })
    }

    /// `Ok(None)` when there is no way to read text from this kind of file.
    async fn extract_text(&self, file_type: &str, data: Vec<u8>) -> Result<Option<String>> {
        if file_type == "pdf" {
            if !PdfProcessor::has_pdf_header(&data) {
                warn!("Upload has a .pdf name but no PDF header");
                return Ok(None);
            }
            let pdf = self.pdf;
            let text = tokio::task::spawn_blocking(move || pdf.extract_text(&data))
                .await
                .context("PDF text extraction aborted")??;
            return Ok(Some(text));
        }

        match &self.ocr {
            Some(engine) => Ok(Some(engine.recognize(&data).await?)),
            None => {
                debug!("OCR unavailable, skipping text extraction");
                Ok(None)
            }
        }
    }

    async fn store(&self, file_type: &str, data: &[u8]) -> Result<PathBuf> {
        let dir = Path::new(&self.uploads.upload_dir);
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        let path = dir.join(format!("{}.{}", Uuid::new_v4(), file_type));
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to store upload at {}", path.display()))?;
        Ok(path)
    }
}
