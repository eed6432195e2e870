pub mod converter;

pub use converter::{ConvertError, MockConverter, PdfTextConverter, TextConverter};
