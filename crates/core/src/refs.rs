//! Reference inference: what each image of a unit belongs to.
//!
//! Slides run an ordered chain of rules; the first rule that produces a
//! reference wins and the positional fallback always succeeds. Pages,
//! sections and sheets use the signals their formats carry instead.

use std::collections::HashMap;

use crate::locate::{collect_tables, containing_table};
use crate::normalize::{truncate_chars, REF_MAX_CHARS};
use crate::types::{
    walk_mut, ContentNode, ImageAsset, RefType, TableNode, TextNode, Unit, UnitKind,
};

/// Leading glyphs that mark a slide's section label.
pub const SECTION_MARKERS: &[char] = &['▣', '▶', '●', '■', '◆', '□', '○', '△', '▲'];

/// Leading glyphs (besides `#`) that mark a heading line in page text.
pub const PAGE_HEADING_MARKERS: &[char] = &['▣', '▶', '●', '■', '◆'];

/// Assign `reference`/`ref_type` to every image of the unit.
///
/// Afterwards every image has a non-empty reference, and image-ref nodes
/// carry the reference of their asset.
pub fn infer_refs(unit: &mut Unit) {
    let Unit {
        kind,
        number,
        heading,
        sheet_name,
        content,
        images,
        cell_values,
        ..
    } = unit;

    match kind {
        UnitKind::Slide => infer_slide_refs(content, images, *number),
        UnitKind::Page => infer_page_refs(content, images),
        UnitKind::Section => infer_section_refs(heading.as_deref(), content, images),
        UnitKind::Sheet => infer_sheet_refs(cell_values, images),
    }

    for image in images.iter_mut() {
        if image.reference.trim().is_empty() {
            image.reference = positional_ref(*kind, *number, sheet_name.as_deref());
            image.ref_type = RefType::positional(*kind);
        }
    }

    sync_image_refs(content, images);
}

/// Fallback reference for an image nothing else describes.
pub fn positional_ref(kind: UnitKind, number: usize, sheet_name: Option<&str>) -> String {
    match kind {
        UnitKind::Slide => format!("{}{} 이미지", kind.label(), number),
        UnitKind::Page => format!("page_{}_figure", number),
        UnitKind::Section => format!("section_{}_figure", number),
        UnitKind::Sheet => match sheet_name {
            Some(name) => format!("{}_figure", name),
            None => format!("{}{}_figure", kind.label(), number),
        },
    }
}

fn ref_text(text: &str) -> String {
    truncate_chars(text.trim(), REF_MAX_CHARS).to_string()
}

/// Copy asset references onto the image-ref nodes that point at them.
fn sync_image_refs(content: &mut [ContentNode], images: &[ImageAsset]) {
    let refs: HashMap<&str, &str> = images
        .iter()
        .map(|i| (i.filename.as_str(), i.reference.as_str()))
        .collect();

    walk_mut(content, &mut |node| {
        if let ContentNode::ImageRef(image_ref) = node {
            if let Some(reference) = refs.get(image_ref.filename.as_str()) {
                image_ref.reference = reference.to_string();
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Slides
// ---------------------------------------------------------------------------

/// What the slide rules look at, gathered once per slide.
struct SlideContext<'a> {
    tables: Vec<&'a TableNode>,
    texts: Vec<&'a TextNode>,
    /// Index into `texts` and text of the section marker.
    section: Option<(usize, String)>,
}

impl<'a> SlideContext<'a> {
    fn new(content: &'a [ContentNode]) -> Self {
        let mut texts = Vec::new();
        for node in content {
            match node {
                ContentNode::Text(text) => texts.push(text),
                ContentNode::Group(group) => {
                    texts.extend(group.items.iter().filter_map(|item| match item {
                        ContentNode::Text(text) => Some(text),
                        _ => None,
                    }));
                }
                _ => {}
            }
        }

        let section = texts
            .iter()
            .position(|t| t.text.starts_with(SECTION_MARKERS))
            .map(|idx| (idx, truncate_chars(&texts[idx].text, REF_MAX_CHARS).to_string()));

        Self {
            tables: collect_tables(content),
            texts,
            section,
        }
    }

    /// Non-empty texts that compete on proximity; the section marker is
    /// the slide's label and does not.
    fn proximity_candidates(&self) -> impl Iterator<Item = &'a TextNode> + '_ {
        let marker = self.section.as_ref().map(|(idx, _)| *idx);
        self.texts
            .iter()
            .enumerate()
            .filter(move |(idx, t)| Some(*idx) != marker && !t.text.trim().is_empty())
            .map(|(_, t)| *t)
    }
}

type SlideRule = for<'a, 'b, 'c> fn(&'a SlideContext<'b>, &'c ImageAsset) -> Option<(String, RefType)>;

/// Slide rules in priority order.
const SLIDE_RULES: &[SlideRule] = &[
    table_column_header,
    nearest_above_text,
    section_marker,
    nearest_below_text,
];

fn infer_slide_refs(content: &[ContentNode], images: &mut [ImageAsset], number: usize) {
    let ctx = SlideContext::new(content);

    for image in images.iter_mut() {
        let (reference, ref_type) = SLIDE_RULES
            .iter()
            .find_map(|rule| rule(&ctx, image))
            .unwrap_or_else(|| {
                (
                    positional_ref(UnitKind::Slide, number, None),
                    RefType::SlidePosition,
                )
            });
        log::debug!(
            "slide {}: {} -> {:?} ({})",
            number,
            image.filename,
            reference,
            ref_type
        );
        image.reference = reference;
        image.ref_type = ref_type;
    }
}

fn text_top(text: &TextNode) -> f64 {
    text.position.unwrap_or_default().top
}

/// Header of the column the image center falls in, when the first
/// containing table has a header row.
fn table_column_header(ctx: &SlideContext<'_>, image: &ImageAsset) -> Option<(String, RefType)> {
    let center = image.position.unwrap_or_default().center();
    let table = containing_table(&ctx.tables, center)?;
    let cell = table.locate(center)?;
    if cell.column_name.is_empty() {
        return None;
    }
    Some((cell.column_name, RefType::TableColumnHeader))
}

/// Closest text whose top is at or above the image top.
fn nearest_above_text(ctx: &SlideContext<'_>, image: &ImageAsset) -> Option<(String, RefType)> {
    let top = image.position.unwrap_or_default().top;
    ctx.proximity_candidates()
        .filter(|t| text_top(t) <= top)
        .min_by(|a, b| (top - text_top(a)).total_cmp(&(top - text_top(b))))
        .map(|t| (ref_text(&t.text), RefType::NearestAboveText))
}

fn section_marker(ctx: &SlideContext<'_>, _image: &ImageAsset) -> Option<(String, RefType)> {
    ctx.section
        .as_ref()
        .map(|(_, text)| (text.clone(), RefType::SlideSection))
}

/// Closest text whose top is strictly below the image top.
fn nearest_below_text(ctx: &SlideContext<'_>, image: &ImageAsset) -> Option<(String, RefType)> {
    let top = image.position.unwrap_or_default().top;
    ctx.proximity_candidates()
        .filter(|t| text_top(t) > top)
        .min_by(|a, b| (text_top(a) - top).total_cmp(&(text_top(b) - top)))
        .map(|t| (ref_text(&t.text), RefType::NearestBelowText))
}

// ---------------------------------------------------------------------------
// Pages, sections, sheets
// ---------------------------------------------------------------------------

/// First heading-like line of a page's recognized text.
pub fn page_heading(text: &str) -> Option<String> {
    // Only the first marked line counts, even when it is empty.
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#') || line.starts_with(PAGE_HEADING_MARKERS))?;
    let heading = ref_text(line.trim_start_matches('#'));
    (!heading.is_empty()).then_some(heading)
}

fn infer_page_refs(content: &[ContentNode], images: &mut [ImageAsset]) {
    let text = content
        .iter()
        .filter_map(|node| match node {
            ContentNode::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if let Some(heading) = page_heading(&text) {
        for image in images.iter_mut() {
            image.reference = heading.clone();
            image.ref_type = RefType::PageSection;
        }
    }
}

fn infer_section_refs(heading: Option<&str>, content: &[ContentNode], images: &mut [ImageAsset]) {
    if let Some(heading) = heading.map(str::trim).filter(|h| !h.is_empty()) {
        for image in images.iter_mut() {
            image.reference = ref_text(heading);
            image.ref_type = RefType::SectionHeading;
        }
        return;
    }

    let text_of = |node: &ContentNode| match node {
        ContentNode::Text(t) if !t.text.trim().is_empty() => Some(ref_text(&t.text)),
        _ => None,
    };

    for image in images.iter_mut() {
        let Some(idx) = content
            .iter()
            .position(|node| node.image_filename() == Some(image.filename.as_str()))
        else {
            continue;
        };

        if let Some(above) = content[..idx].iter().rev().find_map(text_of) {
            image.reference = above;
            image.ref_type = RefType::NearestAboveText;
        } else if let Some(below) = content[idx + 1..].iter().find_map(text_of) {
            image.reference = below;
            image.ref_type = RefType::NearestBelowText;
        }
    }
}

fn infer_sheet_refs(cell_values: &HashMap<String, String>, images: &mut [ImageAsset]) {
    for image in images.iter_mut() {
        let Some(anchor) = image.anchor_cell.as_deref() else {
            continue;
        };
        if let Some(value) = cell_values.get(anchor).filter(|v| !v.trim().is_empty()) {
            image.reference = truncate_chars(value, REF_MAX_CHARS).to_string();
            image.ref_type = RefType::AnchorCellText;
        }
    }
}
