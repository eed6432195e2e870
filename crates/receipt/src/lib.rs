pub mod extract;
pub mod pipeline;
pub mod rules;
pub mod types;

pub use extract::Extractor;
pub use pipeline::{ParsedReceipt, ReceiptPipeline};
pub use types::ExtractedReceipt;
