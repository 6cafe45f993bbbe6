//! PPTX file parser implementation.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use docref_core::shapes::{ImageBlob, Shape, ShapeKind, TableShape};
use docref_core::{
    build_slide, finalize_unit, Document, ImageWriter, Rect, Result, SourceFormat, Unit,
    UnitKind,
};
use docref_ooxml::{
    resolve_target, trailing_number, ContentTypes, Package, Relationships, XmlElement,
};

use crate::placeholder::{xfrm_rect, Inherited, PlaceholderKey, Placeholders};

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Layout name reported when a slide has no readable layout.
pub const UNKNOWN_LAYOUT: &str = "Unknown";

/// The shapes of one slide, in z-order.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideShapes {
    /// 1-based position in the deck.
    pub number: usize,
    pub layout: String,
    pub shapes: Vec<Shape>,
}

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse every slide of a deck into shapes.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Vec<SlideShapes>> {
        let mut package = Package::open(reader)?;
        let content_types = package.content_types();

        let slide_order = self.get_slide_order(&mut package)?;
        log::debug!("{} slides", slide_order.len());

        let mut slides = Vec::with_capacity(slide_order.len());
        for (idx, slide_path) in slide_order.iter().enumerate() {
            slides.push(self.parse_slide(&mut package, &content_types, slide_path, idx + 1)?);
        }
        Ok(slides)
    }

    /// Ordered slide part names.
    ///
    /// `p:sldIdLst` in the presentation part is authoritative; decks without
    /// one fall back to ordering the slide relationships by number.
    fn get_slide_order<R: Read + Seek>(&self, package: &mut Package<R>) -> Result<Vec<String>> {
        let rels = package.read_rels(PRESENTATION_PART)?;

        let listed: Vec<String> = match package.read_xml(PRESENTATION_PART) {
            Ok(root) => root
                .find("sldIdLst")
                .map(|list| {
                    list.children_named("sldId")
                        .filter_map(|id| id.prefixed_attr("id"))
                        .filter_map(|rid| rels.get(rid))
                        .map(|rel| resolve_target(PRESENTATION_PART, &rel.target))
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) => {
                log::warn!("Unreadable {}: {}", PRESENTATION_PART, e);
                Vec::new()
            }
        };
        if !listed.is_empty() {
            return Ok(listed);
        }

        let mut slides: Vec<(String, Option<usize>)> = rels
            .of_kind("slide")
            .map(|rel| {
                let order_num = trailing_number(&rel.id).or_else(|| trailing_number(&rel.target));
                (resolve_target(PRESENTATION_PART, &rel.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        content_types: &ContentTypes,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<SlideShapes> {
        let root = package.read_xml(slide_path)?;
        let rels = package.read_rels(slide_path)?;
        let (layout, inherited) = self.load_layout(package, slide_path, &rels);

        let mut ctx = ShapeContext {
            package,
            content_types,
            rels: &rels,
            slide_path,
            slide_number,
            inherited: &inherited,
        };
        let shapes = match root.path(&["cSld", "spTree"]) {
            Some(tree) => ctx.parse_shapes(tree),
            None => Vec::new(),
        };

        Ok(SlideShapes {
            number: slide_number,
            layout,
            shapes,
        })
    }

    /// Layout name and inherited placeholder geometry for a slide.
    fn load_layout<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        slide_path: &str,
        rels: &Relationships,
    ) -> (String, Inherited) {
        let Some(layout_rel) = rels.of_kind("slideLayout").next() else {
            return (UNKNOWN_LAYOUT.to_string(), Inherited::default());
        };
        let layout_path = resolve_target(slide_path, &layout_rel.target);
        let layout = match package.read_xml(&layout_path) {
            Ok(layout) => layout,
            Err(e) => {
                log::warn!("Unreadable layout {}: {}", layout_path, e);
                return (UNKNOWN_LAYOUT.to_string(), Inherited::default());
            }
        };

        let name = layout
            .child("cSld")
            .and_then(|c| c.attr("name"))
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_LAYOUT)
            .to_string();

        let mut inherited = Inherited {
            layout: placeholders_of(&layout),
            master: Placeholders::default(),
        };

        let master_path = package
            .read_rels(&layout_path)
            .ok()
            .and_then(|r| {
                r.of_kind("slideMaster")
                    .next()
                    .map(|m| resolve_target(&layout_path, &m.target))
            });
        if let Some(master_path) = master_path {
            if let Ok(master) = package.read_xml(&master_path) {
                inherited.master = placeholders_of(&master);
            }
        }

        (name, inherited)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

fn placeholders_of(part: &XmlElement) -> Placeholders {
    part.path(&["cSld", "spTree"])
        .map(Placeholders::collect)
        .unwrap_or_default()
}

/// What shape parsing needs from the surrounding slide.
struct ShapeContext<'a, R: Read + Seek> {
    package: &'a mut Package<R>,
    content_types: &'a ContentTypes,
    rels: &'a Relationships,
    slide_path: &'a str,
    slide_number: usize,
    inherited: &'a Inherited,
}

impl<R: Read + Seek> ShapeContext<'_, R> {
    /// Shapes among the children of a shape tree or group.
    fn parse_shapes(&mut self, parent: &XmlElement) -> Vec<Shape> {
        let mut shapes = Vec::new();
        for element in parent.elements() {
            let shape = match element.name.as_str() {
                "sp" => Shape::new(
                    self.shape_position(element),
                    ShapeKind::Text(
                        element
                            .child("txBody")
                            .map(text_body)
                            .unwrap_or_default(),
                    ),
                ),
                "pic" => Shape::new(self.shape_position(element), self.picture(element)),
                "graphicFrame" => {
                    let position = element.child("xfrm").and_then(xfrm_rect).unwrap_or_default();
                    let kind = element
                        .find("tbl")
                        .map(|tbl| ShapeKind::Table(table_shape(tbl)))
                        .unwrap_or(ShapeKind::Other);
                    Shape::new(position, kind)
                }
                "grpSp" => {
                    let position = element
                        .path(&["grpSpPr", "xfrm"])
                        .and_then(xfrm_rect)
                        .unwrap_or_default();
                    Shape::new(position, ShapeKind::Group(self.parse_shapes(element)))
                }
                "cxnSp" | "contentPart" => Shape::new(
                    self.shape_position(element),
                    ShapeKind::Other,
                ),
                _ => continue,
            };
            shapes.push(shape);
        }
        shapes
    }

    /// Own transform, else the inherited placeholder position, else zero.
    fn shape_position(&self, element: &XmlElement) -> Rect {
        if let Some(rect) = element.path(&["spPr", "xfrm"]).and_then(xfrm_rect) {
            return rect;
        }
        PlaceholderKey::of(element)
            .and_then(|key| self.inherited.lookup(&key))
            .unwrap_or_default()
    }

    /// The image behind a `p:pic`; unreadable pictures keep their slot.
    fn picture(&mut self, element: &XmlElement) -> ShapeKind {
        let Some(rid) = element.find("blip").and_then(|b| b.attr_local("embed")) else {
            log::warn!("Picture without embedded image on slide {}", self.slide_number);
            return ShapeKind::Other;
        };
        let Some(rel) = self.rels.get(rid).filter(|r| !r.external) else {
            log::warn!(
                "Picture relationship {} missing on slide {}",
                rid,
                self.slide_number
            );
            return ShapeKind::Other;
        };

        let media_path = resolve_target(self.slide_path, &rel.target);
        match self.package.read_bytes(&media_path) {
            Ok(bytes) => ShapeKind::Picture(ImageBlob {
                bytes,
                content_type: self.content_types.content_type(&media_path),
            }),
            Err(e) => {
                log::warn!(
                    "Failed to extract image (slide{}): {}",
                    self.slide_number,
                    e
                );
                ShapeKind::Other
            }
        }
    }
}

/// Text of a text body: paragraphs joined by newlines.
fn text_body(body: &XmlElement) -> String {
    body.children_named("p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut text = String::new();
    for child in paragraph.elements() {
        match child.name.as_str() {
            "r" | "fld" => {
                if let Some(t) = child.child("t") {
                    text.push_str(&t.text());
                }
            }
            "br" => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn table_shape(tbl: &XmlElement) -> TableShape {
    let col_widths = tbl
        .child("tblGrid")
        .map(|grid| {
            grid.children_named("gridCol")
                .map(|col| col.attr_f64("w").unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default();

    let mut cells = Vec::new();
    let mut row_heights = Vec::new();
    for row in tbl.children_named("tr") {
        row_heights.push(row.attr_f64("h").unwrap_or(0.0));
        cells.push(
            row.children_named("tc")
                .map(|tc| {
                    tc.child("txBody")
                        .map(text_body)
                        .unwrap_or_default()
                        .trim()
                        .to_string()
                })
                .collect(),
        );
    }

    TableShape {
        cells,
        col_widths,
        row_heights,
    }
}

/// Extract a slide deck, writing its pictures through `writer`.
pub fn extract_pptx(path: &Path, writer: &dyn ImageWriter) -> Result<Document> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    extract_from_reader(BufReader::new(file), filename, file_size, writer)
}

/// Extract a deck from any seekable reader.
pub fn extract_from_reader<R: Read + Seek>(
    reader: R,
    filename: &str,
    file_size: u64,
    writer: &dyn ImageWriter,
) -> Result<Document> {
    let slides = PptxParser::new().parse(reader)?;
    if slides.is_empty() {
        log::warn!("{} has no slides", filename);
    }

    let mut document = Document::new(filename, file_size, SourceFormat::Pptx);
    let total = slides.len();
    for slide in slides {
        log::debug!("slide {}/{}", slide.number, total);
        let mut unit = Unit::new(UnitKind::Slide, slide.number);
        unit.layout = Some(slide.layout);
        build_slide(&mut unit, &slide.shapes, writer);
        finalize_unit(&mut unit, writer.dir());
        document.add_unit(unit);
    }
    Ok(document)
}
