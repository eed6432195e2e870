use tally_pdf::{ConvertError, TextConverter};

use crate::extract::Extractor;
use crate::types::ExtractedReceipt;

/// The result of running one attachment through the pipeline.
#[derive(Debug, Clone)]
pub struct ParsedReceipt {
    /// Text the extractor saw: the converted document, empty for a document
    /// without a text layer, or the raw bytes read as UTF-8 when decoding
    /// failed.
    pub raw_text: String,
    pub extracted: ExtractedReceipt,
}

/// Orchestrates: convert → (fallback to raw text) → extract.
pub struct ReceiptPipeline {
    converter: Box<dyn TextConverter>,
}

impl ReceiptPipeline {
    pub fn new(converter: impl TextConverter + 'static) -> Self {
        Self { converter: Box::new(converter) }
    }

    /// Never fails: undecodable documents are read as lossy UTF-8, and
    /// extraction itself is total. A document that decodes but carries no
    /// text is extracted as empty text.
    pub fn process_bytes(&self, data: &[u8]) -> ParsedReceipt {
        let raw_text = match self.converter.to_text(data) {
            Ok(text) => text,
            Err(ConvertError::Empty) => {
                tracing::warn!(bytes = data.len(), "document has no text layer");
                String::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, bytes = data.len(), "document conversion failed, reading bytes as text");
                String::from_utf8_lossy(data).into_owned()
            }
        };

        let extracted = Extractor::extract(&raw_text);
        ParsedReceipt { raw_text, extracted }
    }
}
