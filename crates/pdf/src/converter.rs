use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvertError {
    #[error("PDF decode error: {0}")]
    Decode(String),
    #[error("Document contains no text")]
    Empty,
}

/// Abstraction over a document-to-text backend.
/// Implementations accept the raw bytes of an attachment and return its plain text.
pub trait TextConverter: Send + Sync {
    fn to_text(&self, data: &[u8]) -> Result<String, ConvertError>;
}

// ── pdf-extract backend ──────────────────────────────────────────────────────

/// Text-layer extraction via `pdf-extract`. Scanned PDFs without a text layer
/// come back as `ConvertError::Empty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextConverter;

impl TextConverter for PdfTextConverter {
    fn to_text(&self, data: &[u8]) -> Result<String, ConvertError> {
        // pdf-extract panics on some malformed content streams.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(data)
        }))
        .map_err(|_| ConvertError::Decode("pdf-extract panicked".to_string()))?;

        let text = result.map_err(|e| ConvertError::Decode(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(ConvertError::Empty);
        }
        tracing::debug!(bytes = data.len(), chars = text.len(), "extracted PDF text layer");
        Ok(text)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string, or a pre-set error when built with
/// [`MockConverter::failing`] or [`MockConverter::no_text`].
pub struct MockConverter {
    result: Result<String, ConvertError>,
}

impl MockConverter {
    pub fn new(text: impl Into<String>) -> Self {
        Self { result: Ok(text.into()) }
    }

    pub fn failing() -> Self {
        Self {
            result: Err(ConvertError::Decode("mock decoder always fails".to_string())),
        }
    }

    /// A well-formed document without a text layer.
    pub fn no_text() -> Self {
        Self { result: Err(ConvertError::Empty) }
    }
}

impl TextConverter for MockConverter {
    fn to_text(&self, _data: &[u8]) -> Result<String, ConvertError> {
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_preset_text() {
        let c = MockConverter::new("WAL*MART\nTOTAL 15.98");
        assert_eq!(c.to_text(b"%PDF-1.4 ...").unwrap(), "WAL*MART\nTOTAL 15.98");
        assert_eq!(c.to_text(b"").unwrap(), "WAL*MART\nTOTAL 15.98");
    }

    #[test]
    fn failing_mock_reports_decode_error() {
        assert!(matches!(
            MockConverter::failing().to_text(b"anything"),
            Err(ConvertError::Decode(_))
        ));
    }

    #[test]
    fn no_text_mock_reports_empty() {
        assert_eq!(MockConverter::no_text().to_text(b"%PDF-1.4"), Err(ConvertError::Empty));
    }

    #[test]
    fn pdf_backend_rejects_non_pdf_bytes() {
        assert!(PdfTextConverter.to_text(b"this is not a pdf").is_err());
    }
}
