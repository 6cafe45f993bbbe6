//! PDF documents.
//!
//! Pages are rasterized and read by a [`TextRecognizer`]; embedded images
//! are pulled out with poppler's command-line tools.
//!
//! [`TextRecognizer`]: docref_core::TextRecognizer

pub mod extractor;
pub mod gemini;
pub mod poppler;
pub mod tesseract;

pub use extractor::{build_page, PdfExtractor};
pub use gemini::{GeminiRecognizer, DEFAULT_MODEL};
pub use poppler::{PageImage, Poppler};
pub use tesseract::{TesseractRecognizer, DEFAULT_LANGUAGES};
