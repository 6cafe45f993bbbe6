//! Legacy binary formats (`.ppt`, `.doc`, `.xls`, `.hwp`).
//!
//! These are never parsed here beyond telling them apart: the OLE/CFB
//! container is sniffed for its main stream and the file is then handed to
//! LibreOffice, whose OOXML (or PDF) output goes through the regular
//! front ends.

pub mod convert;
pub mod sniff;

pub use convert::{convert_legacy, Converter, SofficeConverter};
pub use sniff::{sniff_cfb, sniff_file};
