//! Office Open XML package access shared by the deck, document and
//! workbook readers: zip parts, relationships, content types and a small
//! namespace-agnostic element tree.

pub mod content_types;
pub mod package;
pub mod rels;
pub mod xml;

pub use content_types::ContentTypes;
pub use package::{detect_package, Package};
pub use rels::{rels_path_for, resolve_target, trailing_number, Relationship, Relationships};
pub use xml::{local_name, XmlElement, XmlNode};
