//! DOCX file parser implementation.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use docref_core::refs::positional_ref;
use docref_core::{
    finalize_unit, ContentNode, Document, Error, ImageAsset, ImageRefNode, ImageWriter, RefType,
    Result, SourceFormat, TableNode, TableRows, TextNode, Unit, UnitKind,
};
use docref_ooxml::{resolve_target, Package, Relationships, XmlElement};

use crate::styles::{heading_level, StyleMap};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const MEDIA_DIR: &str = "word/media/";

/// Media extensions copied out of the package.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "emf", "wmf",
];

/// Parser for DOCX (Office Open XML) files.
pub struct DocxParser;

impl DocxParser {
    /// Create a new DOCX parser.
    pub fn new() -> Self {
        Self
    }

    /// Split a document into sections, writing its pictures through
    /// `writer`. The sections are not finalized.
    pub fn parse<R: Read + Seek>(&self, reader: R, writer: &dyn ImageWriter) -> Result<Vec<Unit>> {
        let mut package = Package::open(reader)?;

        let root = package.read_xml(DOCUMENT_PART)?;
        let body = root
            .child("body")
            .ok_or_else(|| Error::CorruptedFile(format!("{} has no body", DOCUMENT_PART)))?;

        let styles = if package.has_part(STYLES_PART) {
            match package.read_xml(STYLES_PART) {
                Ok(styles) => StyleMap::parse(&styles),
                Err(e) => {
                    log::warn!("Ignoring unreadable {}: {}", STYLES_PART, e);
                    StyleMap::default()
                }
            }
        } else {
            StyleMap::default()
        };
        let rels = package.read_rels(DOCUMENT_PART)?;

        let mut sections = SectionBuilder {
            package: &mut package,
            rels: &rels,
            writer,
            sections: Vec::new(),
            current: leading_section(),
            image_count: 0,
        };

        for element in body.elements() {
            match element.name.as_str() {
                "p" => sections.paragraph(element, &styles),
                "tbl" => sections.table(element),
                _ => {}
            }
        }
        Ok(sections.finish())
    }
}

impl Default for DocxParser {
    fn default() -> Self {
        Self::new()
    }
}

fn leading_section() -> Unit {
    let mut unit = Unit::new(UnitKind::Section, 1);
    unit.heading = Some(String::new());
    unit.heading_level = Some(0);
    unit
}

/// Accumulates sections while the body is walked in order.
struct SectionBuilder<'a, R: Read + Seek> {
    package: &'a mut Package<R>,
    rels: &'a Relationships,
    writer: &'a dyn ImageWriter,
    sections: Vec<Unit>,
    current: Unit,
    /// Images written so far, across sections.
    image_count: usize,
}

impl<R: Read + Seek> SectionBuilder<'_, R> {
    fn paragraph(&mut self, paragraph: &XmlElement, styles: &StyleMap) {
        let style = styles.paragraph_style(paragraph);

        if let Some(level) = heading_level(&style) {
            let heading = paragraph_text(paragraph).trim().to_string();
            self.close_section();
            let mut section = Unit::new(UnitKind::Section, self.sections.len() + 1);
            section.heading = Some(heading);
            section.heading_level = Some(level);
            self.current = section;
            return;
        }

        for blip in paragraph.find_all("blip") {
            if let Some(rid) = blip.prefixed_attr("embed") {
                self.inline_image(rid);
            }
        }

        let text = paragraph_text(paragraph);
        let text = text.trim();
        if !text.is_empty() {
            self.current
                .content
                .push(ContentNode::Text(TextNode::new(text).with_style(style)));
        }
    }

    fn table(&mut self, tbl: &XmlElement) {
        self.current
            .content
            .push(ContentNode::Table(TableNode::new(TableRows::from_grid(
                table_grid(tbl),
            ))));
    }

    /// Copy the picture behind `rid` out of `word/media/` and reference it.
    fn inline_image(&mut self, rid: &str) {
        let Some(rel) = self.rels.get(rid).filter(|r| !r.external) else {
            log::debug!("Image relationship {} not found", rid);
            return;
        };
        let media_path = resolve_target(DOCUMENT_PART, &rel.target);
        if !media_path.starts_with(MEDIA_DIR) {
            return;
        }
        let Some(ext) = media_path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        else {
            log::debug!("Skipping unsupported media {}", media_path);
            return;
        };

        let bytes = match self.package.read_bytes(&media_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Skipping unreadable media {}: {}", media_path, e);
                return;
            }
        };

        let filename = format!("doc_img{:03}.{}", self.image_count + 1, ext);
        let size = match self.writer.write_image(&filename, &bytes) {
            Ok(size) => size,
            Err(e) => {
                log::warn!("Failed to write image {}: {}", filename, e);
                return;
            }
        };
        self.image_count += 1;

        let number = self.current.number;
        self.current
            .content
            .push(ContentNode::ImageRef(ImageRefNode::new(filename.clone())));
        self.current.images.push(ImageAsset::new(
            number,
            filename,
            size,
            positional_ref(UnitKind::Section, number, None),
            RefType::SectionPosition,
        ));
    }

    /// Keep the current section if it has anything in it.
    fn close_section(&mut self) {
        let section = std::mem::replace(&mut self.current, leading_section());
        if !section.is_empty() {
            self.sections.push(section);
        }
    }

    fn finish(mut self) -> Vec<Unit> {
        let last = std::mem::replace(&mut self.current, leading_section());
        if !last.is_empty() || self.sections.is_empty() {
            self.sections.push(last);
        }
        self.sections
    }
}

/// Visible text of a paragraph: runs, including those inside hyperlinks
/// and tracked insertions.
fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut text = String::new();
    push_runs(paragraph, &mut text);
    text
}

fn push_runs(parent: &XmlElement, out: &mut String) {
    for child in parent.elements() {
        match child.name.as_str() {
            "r" => push_run(child, out),
            "hyperlink" | "ins" | "smartTag" | "fldSimple" | "customXml" => push_runs(child, out),
            _ => {}
        }
    }
}

fn push_run(run: &XmlElement, out: &mut String) {
    for child in run.elements() {
        match child.name.as_str() {
            "t" => out.push_str(&child.text()),
            "tab" => out.push('\t'),
            "br" | "cr" => out.push('\n'),
            _ => {}
        }
    }
}

/// Cell grid of a `w:tbl`. Horizontally merged cells repeat their text
/// across the spanned columns; vertically merged ones repeat the cell above.
fn table_grid(tbl: &XmlElement) -> Vec<Vec<String>> {
    let mut grid: Vec<Vec<String>> = Vec::new();
    for tr in tbl.children_named("tr") {
        let mut row: Vec<String> = Vec::new();
        for tc in tr.children_named("tc") {
            let props = tc.child("tcPr");
            let span = props
                .and_then(|p| p.child("gridSpan"))
                .and_then(|g| g.attr_local("val"))
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            let continued = props
                .and_then(|p| p.child("vMerge"))
                .is_some_and(|m| m.attr_local("val").map_or(true, |v| v == "continue"));

            let text = if continued {
                grid.last()
                    .and_then(|above| above.get(row.len()))
                    .cloned()
                    .unwrap_or_default()
            } else {
                cell_text(tc)
            };
            for _ in 0..span {
                row.push(text.clone());
            }
        }
        grid.push(row);
    }
    grid
}

fn cell_text(tc: &XmlElement) -> String {
    tc.children_named("p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Extract a document, writing its pictures through `writer`.
pub fn extract_docx(path: &Path, writer: &dyn ImageWriter) -> Result<Document> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    extract_from_reader(BufReader::new(file), filename, file_size, writer)
}

/// Extract a document from any seekable reader.
pub fn extract_from_reader<R: Read + Seek>(
    reader: R,
    filename: &str,
    file_size: u64,
    writer: &dyn ImageWriter,
) -> Result<Document> {
    let sections = DocxParser::new().parse(reader, writer)?;

    let mut document = Document::new(filename, file_size, SourceFormat::Docx);
    for mut section in sections {
        log::debug!(
            "section {}: {} blocks, {} images",
            section.number,
            section.content.len(),
            section.images.len()
        );
        finalize_unit(&mut section, writer.dir());
        document.add_unit(section);
    }
    Ok(document)
}
