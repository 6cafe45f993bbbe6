//! PPTX (Office Open XML) slide decks.
//!
//! Parses .pptx files into positioned shapes per slide, then runs them
//! through the shared slide pipeline.

pub mod parser;
pub mod placeholder;

pub use parser::{extract_from_reader, extract_pptx, PptxParser, SlideShapes, UNKNOWN_LAYOUT};
