//! Core content model and the geometry-driven engine that associates
//! extracted images with the text, headings and table cells around them.

pub mod assets;
pub mod embed;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod locate;
pub mod markdown;
pub mod normalize;
pub mod options;
pub mod pipeline;
pub mod recognize;
pub mod refs;
pub mod rename;
pub mod shapes;
pub mod tool;
pub mod types;

pub use assets::{FsImageWriter, ImageWriter};
pub use error::{Error, Result};
pub use geometry::{Point, Rect};
pub use locate::{locate, CellLocation};
pub use markdown::write_markdown;
pub use normalize::sanitize_for_filename;
pub use options::ExtractOptions;
pub use pipeline::finalize_unit;
pub use recognize::{RetryPolicy, TextRecognizer};
pub use shapes::{build_slide, ImageBlob, Shape, ShapeKind, TableShape};
pub use tool::{Tool, ToolOutput};
pub use types::{
    ContentNode, Document, GroupNode, ImageAsset, ImageNode, ImageRefNode, Metadata, RefType,
    SourceFormat, TableImage, TableNode, TableRows, TextNode, Unit, UnitKind, IMAGE_DIR,
};
