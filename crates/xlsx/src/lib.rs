//! XLSX (Office Open XML) workbooks.
//!
//! Each worksheet becomes one sheet unit holding its used range as a table;
//! pictures are located by the cell their drawing anchor starts in.

pub mod cells;
pub mod drawing;
pub mod parser;

pub use cells::{cell_reference, column_name, parse_cell_reference, SharedStrings};
pub use parser::{extract_from_reader, extract_xlsx, XlsxParser};
