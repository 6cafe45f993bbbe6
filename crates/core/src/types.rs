//! Domain types for representing extracted document content.

use chrono::{DateTime, Local};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::geometry::Rect;

/// Directory (relative to the output root) that holds extracted images.
pub const IMAGE_DIR: &str = "images";

/// Represents an entire document with its extracted content.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub metadata: Metadata,

    /// Logical units (slides, pages, sections or sheets) in document order.
    pub units: Vec<Unit>,
}

impl Document {
    /// Create an empty document for the given source file.
    pub fn new(filename: impl Into<String>, file_size: u64, format: SourceFormat) -> Self {
        Self {
            metadata: Metadata {
                filename: filename.into(),
                file_size,
                format,
                unit_count: 0,
                extraction_date: Local::now(),
            },
            units: Vec::new(),
        }
    }

    /// Add a finished unit to the document.
    pub fn add_unit(&mut self, unit: Unit) {
        self.units.push(unit);
        self.metadata.unit_count = self.units.len();
    }

    /// All image assets across units, in unit order.
    pub fn images(&self) -> impl Iterator<Item = &ImageAsset> {
        self.units.iter().flat_map(|u| u.images.iter())
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    /// Original filename (without path).
    pub filename: String,
    pub file_size: u64,
    pub format: SourceFormat,
    pub unit_count: usize,
    pub extraction_date: DateTime<Local>,
}

/// The format of the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pptx,
    Ppt,
    Docx,
    Doc,
    Xlsx,
    Xls,
    Pdf,
    Hwp,
}

impl SourceFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "pdf" => Some(Self::Pdf),
            "hwp" => Some(Self::Hwp),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    ///
    /// Only PDF is unambiguous from the header alone; ZIP and OLE/CFB
    /// containers need their entries inspected (see [`is_zip`] / [`is_cfb`]).
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }
        None
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pptx => "pptx",
            Self::Ppt => "ppt",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Pdf => "pdf",
            Self::Hwp => "hwp",
        }
    }

    /// Formats that must go through the office suite before extraction.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Ppt | Self::Doc | Self::Xls | Self::Hwp)
    }

    /// The format a legacy file is converted to first.
    pub fn conversion_target(&self) -> Option<Self> {
        match self {
            Self::Ppt => Some(Self::Pptx),
            Self::Doc | Self::Hwp => Some(Self::Docx),
            Self::Xls => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Kind of logical unit produced for this format once converted.
    pub fn unit_kind(&self) -> UnitKind {
        match self {
            Self::Pptx | Self::Ppt => UnitKind::Slide,
            Self::Docx | Self::Doc | Self::Hwp => UnitKind::Section,
            Self::Xlsx | Self::Xls => UnitKind::Sheet,
            Self::Pdf => UnitKind::Page,
        }
    }

    pub const SUPPORTED_EXTENSIONS: &'static [&'static str] =
        &["ppt", "pptx", "pdf", "doc", "docx", "hwp", "xls", "xlsx"];
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// ZIP local file header (`PK\x03\x04`), the OOXML container.
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04])
}

/// OLE/CFB signature (`D0 CF 11 E0 A1 B1 1A E1`), the legacy container.
pub fn is_cfb(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
}

/// Kind of logical unit a document is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Slide,
    Page,
    Section,
    Sheet,
}

impl UnitKind {
    /// Label used in generated filenames and identifiers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Slide => "슬라이드",
            Self::Page => "페이지",
            Self::Section => "섹션",
            Self::Sheet => "시트",
        }
    }
}

/// A single logical unit: slide, page, section or sheet.
#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    pub kind: UnitKind,

    /// 1-based unit number.
    pub number: usize,

    /// Slide layout name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    /// Section heading text (empty for a leading section without heading).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,

    /// Used range of a sheet, e.g. `A1:D20`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub merged_cells: Vec<String>,

    pub content: Vec<ContentNode>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAsset>,

    /// A1 reference → cell text, for anchor-cell lookups on sheets.
    #[serde(skip)]
    pub cell_values: HashMap<String, String>,
}

impl Unit {
    /// Create an empty unit.
    pub fn new(kind: UnitKind, number: usize) -> Self {
        Self {
            kind,
            number,
            layout: None,
            heading: None,
            heading_level: None,
            sheet_name: None,
            dimensions: None,
            merged_cells: Vec::new(),
            content: Vec::new(),
            images: Vec::new(),
            cell_values: HashMap::new(),
        }
    }

    /// Whether the unit has neither content nor a heading.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.heading.as_deref().map_or(true, str::is_empty)
    }
}

/// How an image's `ref` was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefType {
    TableColumnHeader,
    NearestAboveText,
    NearestBelowText,
    SlideSection,
    SlidePosition,
    SectionHeading,
    SectionPosition,
    AnchorCellText,
    AnchorCell,
    SheetPosition,
    PageSection,
    PagePosition,
}

impl RefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TableColumnHeader => "table_column_header",
            Self::NearestAboveText => "nearest_above_text",
            Self::NearestBelowText => "nearest_below_text",
            Self::SlideSection => "slide_section",
            Self::SlidePosition => "slide_position",
            Self::SectionHeading => "section_heading",
            Self::SectionPosition => "section_position",
            Self::AnchorCellText => "anchor_cell_text",
            Self::AnchorCell => "anchor_cell",
            Self::SheetPosition => "sheet_position",
            Self::PageSection => "page_section",
            Self::PagePosition => "page_position",
        }
    }

    /// The positional fallback for a unit kind.
    pub fn positional(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Slide => Self::SlidePosition,
            UnitKind::Page => Self::PagePosition,
            UnitKind::Section => Self::SectionPosition,
            UnitKind::Sheet => Self::SheetPosition,
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image file written to the output `images/` directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Number of the owning unit.
    pub unit_id: usize,
    pub filename: String,

    /// Path relative to the output directory.
    pub path: String,
    pub size_bytes: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,

    #[serde(rename = "ref")]
    pub reference: String,
    pub ref_type: RefType,

    /// A1 reference of the cell a sheet image is anchored to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_cell: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
}

impl ImageAsset {
    /// Create an asset with a provisional reference.
    pub fn new(
        unit_id: usize,
        filename: impl Into<String>,
        size_bytes: u64,
        reference: impl Into<String>,
        ref_type: RefType,
    ) -> Self {
        let filename = filename.into();
        Self {
            unit_id,
            path: asset_path(&filename),
            filename,
            size_bytes,
            position: None,
            reference: reference.into(),
            ref_type,
            anchor_cell: None,
            sheet_name: None,
        }
    }

    pub fn with_position(mut self, position: Rect) -> Self {
        self.position = Some(position);
        self
    }
}

/// Output-relative path of an image file.
pub fn asset_path(filename: &str) -> String {
    format!("{}/{}", IMAGE_DIR, filename)
}

/// A node of a unit's content tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentNode {
    Text(TextNode),
    Image(ImageNode),
    ImageRef(ImageRefNode),
    Table(TableNode),
    Group(GroupNode),
}

impl ContentNode {
    pub fn position(&self) -> Option<Rect> {
        match self {
            Self::Text(n) => n.position,
            Self::Image(n) => n.position,
            Self::ImageRef(_) => None,
            Self::Table(n) => n.position,
            Self::Group(n) => n.position,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Text(n) => &n.id,
            Self::Image(n) => &n.id,
            Self::ImageRef(n) => &n.id,
            Self::Table(n) => &n.id,
            Self::Group(n) => &n.id,
        }
    }

    /// Filename referenced by an image or image-ref node.
    pub fn image_filename(&self) -> Option<&str> {
        match self {
            Self::Image(n) => Some(&n.filename),
            Self::ImageRef(n) => Some(&n.filename),
            _ => None,
        }
    }
}

/// Visit every node depth-first in document order, descending into groups.
pub fn walk_mut<F: FnMut(&mut ContentNode)>(nodes: &mut [ContentNode], f: &mut F) {
    for node in nodes.iter_mut() {
        f(node);
        if let ContentNode::Group(group) = node {
            walk_mut(&mut group.items, f);
        }
    }
}

/// A block of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextNode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
    pub text: String,

    /// Paragraph style name (word-processor sources).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            position: None,
            text: text.into(),
            style: None,
        }
    }

    pub fn at(mut self, position: Rect) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// A positioned picture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageNode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
    pub filename: String,
}

impl ImageNode {
    pub fn new(filename: impl Into<String>, position: Rect) -> Self {
        Self {
            id: String::new(),
            position: Some(position),
            filename: filename.into(),
        }
    }
}

/// An image marker in flowing content (pages, sections).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRefNode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub filename: String,
    #[serde(rename = "ref", skip_serializing_if = "String::is_empty")]
    pub reference: String,
}

impl ImageRefNode {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            filename: filename.into(),
            reference: String::new(),
        }
    }
}

/// An image placed inside a table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableImage {
    pub filename: String,
    pub column: String,
    pub column_idx: usize,
    pub row_idx: usize,
}

/// A table with its cell values and, until stripping, its grid geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableNode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
    pub rows: TableRows,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<TableImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col_widths: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_heights: Option<Vec<f64>>,
}

impl TableNode {
    pub fn new(rows: TableRows) -> Self {
        Self {
            id: String::new(),
            position: None,
            rows,
            images: None,
            col_widths: None,
            row_heights: None,
        }
    }

    pub fn at(mut self, position: Rect) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_grid(mut self, col_widths: Vec<f64>, row_heights: Vec<f64>) -> Self {
        self.col_widths = Some(col_widths);
        self.row_heights = Some(row_heights);
        self
    }
}

/// Cell values of a table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRows {
    /// Rows of cell values, no header detected.
    Raw(Vec<Vec<String>>),
    /// First row used as header; `records` are the data rows.
    Keyed {
        headers: Vec<String>,
        records: Vec<Vec<String>>,
    },
}

impl TableRows {
    /// Build rows from a cell grid, treating the first row as header when
    /// there are at least two rows and more than half its cells are non-empty.
    pub fn from_grid(grid: Vec<Vec<String>>) -> Self {
        let has_header = grid.len() >= 2
            && grid.first().is_some_and(|row| {
                let non_empty = row.iter().filter(|c| !c.trim().is_empty()).count();
                non_empty * 2 > row.len()
            });

        if !has_header {
            return Self::Raw(grid);
        }

        let mut rows = grid.into_iter();
        let headers = rows.next().unwrap_or_default();
        Self::Keyed {
            headers,
            records: rows.collect(),
        }
    }

    /// Header names, if the first row was taken as header.
    pub fn headers(&self) -> Option<&[String]> {
        match self {
            Self::Raw(_) => None,
            Self::Keyed { headers, .. } => Some(headers),
        }
    }

    /// Total grid rows, counting the header row.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Raw(rows) => rows.len(),
            Self::Keyed { records, .. } => records.len() + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Cell text by grid coordinates (row 0 is the header row when keyed).
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        let cells = match self {
            Self::Raw(rows) => rows.get(row)?,
            Self::Keyed { headers, .. } if row == 0 => headers,
            Self::Keyed { records, .. } => records.get(row - 1)?,
        };
        cells.get(col).map(String::as_str)
    }
}

impl Serialize for TableRows {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Raw(rows) => rows.serialize(serializer),
            Self::Keyed { headers, records } => {
                let mut seq = serializer.serialize_seq(Some(records.len()))?;
                for record in records {
                    seq.serialize_element(&KeyedRow { headers, record })?;
                }
                seq.end()
            }
        }
    }
}

/// One data row serialized as a header → value object.
struct KeyedRow<'a> {
    headers: &'a [String],
    record: &'a [String],
}

impl Serialize for KeyedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // A repeated header keeps its first position and takes the later value.
        let mut entries: Vec<(&str, &str)> = Vec::with_capacity(self.headers.len());
        for (key, value) in self.headers.iter().zip(self.record.iter()) {
            match entries.iter_mut().find(|(k, _)| *k == key.as_str()) {
                Some(entry) => entry.1 = value.as_str(),
                None => entries.push((key.as_str(), value.as_str())),
            }
        }

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A group of shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupNode {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
    pub items: Vec<ContentNode>,
}

impl GroupNode {
    pub fn new(items: Vec<ContentNode>, position: Rect) -> Self {
        Self {
            id: String::new(),
            position: Some(position),
            items,
        }
    }
}
