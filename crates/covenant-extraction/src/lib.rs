mod ocr;
mod pdf;

pub use ocr::{OcrEngine, TesseractOcr};
pub use pdf::{ExtractionPolicy, PdfTextExtractor};
