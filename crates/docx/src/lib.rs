//! DOCX (Office Open XML) word-processor documents.
//!
//! The body is split into sections at heading paragraphs; inline pictures
//! become image references inside the section that holds them.

pub mod parser;
pub mod styles;

pub use parser::{extract_docx, extract_from_reader, DocxParser};
pub use styles::{heading_level, StyleMap};
