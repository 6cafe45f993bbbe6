//! Markdown text output.
//!
//! Each unit becomes `texts/<kind>_NNN.md`, and `texts/full_text.md` holds
//! every unit in order, separated by horizontal rules.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{asset_path, ContentNode, Document, TableRows, Unit, UnitKind};

/// Directory (under the output directory) the Markdown files go in.
pub const TEXT_DIR: &str = "texts";

pub const FULL_TEXT_FILE: &str = "full_text.md";

fn slug(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Slide => "slide",
        UnitKind::Page => "page",
        UnitKind::Section => "section",
        UnitKind::Sheet => "sheet",
    }
}

fn title(kind: UnitKind) -> &'static str {
    match kind {
        UnitKind::Slide => "Slide",
        UnitKind::Page => "Page",
        UnitKind::Section => "Section",
        UnitKind::Sheet => "Sheet",
    }
}

/// File name of a unit's Markdown file, e.g. `slide_003.md`.
pub fn unit_file_name(unit: &Unit) -> String {
    format!("{}_{:03}.md", slug(unit.kind), unit.number)
}

/// Body of a unit: its heading or sheet name, then each content node as a
/// block.
pub fn unit_text(unit: &Unit) -> String {
    let refs: HashMap<&str, &str> = unit
        .images
        .iter()
        .map(|i| (i.filename.as_str(), i.reference.as_str()))
        .collect();

    let mut blocks = Vec::new();
    if let Some(heading) = unit.heading.as_deref().filter(|h| !h.trim().is_empty()) {
        let level = unit.heading_level.unwrap_or(1).clamp(1, 5) as usize;
        blocks.push(format!("{} {}", "#".repeat(level + 1), heading.trim()));
    }
    if let Some(name) = &unit.sheet_name {
        blocks.push(format!("## {}", name));
    }
    push_blocks(&unit.content, &refs, &mut blocks);
    blocks.join("\n\n")
}

fn push_blocks(nodes: &[ContentNode], refs: &HashMap<&str, &str>, blocks: &mut Vec<String>) {
    for node in nodes {
        match node {
            ContentNode::Text(text) => {
                let text = text.text.trim_end();
                if !text.trim().is_empty() {
                    blocks.push(text.to_string());
                }
            }
            ContentNode::Image(image) => {
                let alt = refs.get(image.filename.as_str()).copied().unwrap_or("");
                blocks.push(image_link(alt, &image.filename));
            }
            ContentNode::ImageRef(image_ref) => {
                blocks.push(image_link(&image_ref.reference, &image_ref.filename));
            }
            ContentNode::Table(table) => {
                if let Some(table) = pipe_table(&table.rows) {
                    blocks.push(table);
                }
            }
            ContentNode::Group(group) => push_blocks(&group.items, refs, blocks),
        }
    }
}

fn image_link(alt: &str, filename: &str) -> String {
    format!(
        "![{}](../{})",
        alt.replace(['[', ']'], ""),
        asset_path(filename).replace(' ', "%20")
    )
}

/// A GitHub-style pipe table; the first grid row is the header line.
fn pipe_table(rows: &TableRows) -> Option<String> {
    let row_count = rows.row_count();
    let width = (0..row_count)
        .map(|row| (0..).take_while(|&col| rows.cell(row, col).is_some()).count())
        .max()
        .filter(|&w| w > 0)?;

    let line = |row: usize| {
        let cells: Vec<String> = (0..width)
            .map(|col| escape_cell(rows.cell(row, col).unwrap_or("")))
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = vec![line(0), format!("|{}", " --- |".repeat(width))];
    lines.extend((1..row_count).map(line));
    Some(lines.join("\n"))
}

fn escape_cell(cell: &str) -> String {
    cell.trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// A unit's standalone Markdown file.
pub fn unit_markdown(unit: &Unit) -> String {
    format!("# {} {}\n\n{}", title(unit.kind), unit.number, unit_text(unit))
}

/// Every unit in one file.
pub fn full_text(document: &Document) -> String {
    document
        .units
        .iter()
        .map(|unit| {
            format!(
                "# {} {}\n\n{}\n\n---\n\n",
                title(unit.kind),
                unit.number,
                unit_text(unit)
            )
        })
        .collect()
}

/// Write the per-unit files and the combined file under
/// `output_dir/texts`, returning that directory.
pub fn write_markdown(output_dir: &Path, document: &Document) -> Result<PathBuf> {
    let dir = output_dir.join(TEXT_DIR);
    fs::create_dir_all(&dir)?;

    for unit in &document.units {
        fs::write(dir.join(unit_file_name(unit)), unit_markdown(unit))?;
    }
    fs::write(dir.join(FULL_TEXT_FILE), full_text(document))?;
    log::debug!(
        "wrote {} unit file(s) to {}",
        document.units.len(),
        dir.display()
    );
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GroupNode, ImageRefNode, SourceFormat, TableNode, TextNode};
    use crate::Rect;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn slide() -> Unit {
        let mut unit = Unit::new(UnitKind::Slide, 3);
        let mut chart = ImageRefNode::new("3 매출 추이_슬라이드3.png");
        chart.reference = "매출 추이".to_string();
        unit.content = vec![
            ContentNode::Text(TextNode::new("매출 추이")),
            ContentNode::Group(GroupNode::new(
                vec![
                    ContentNode::Text(TextNode::new("  ")),
                    ContentNode::ImageRef(chart),
                ],
                Rect::new(0.0, 0.0, 10.0, 10.0),
            )),
            ContentNode::Table(TableNode::new(TableRows::from_grid(grid(&[
                &["분기", "금액"],
                &["1Q", "10|20"],
                &["2Q"],
            ])))),
        ];
        unit
    }

    #[test]
    fn test_unit_markdown() {
        let unit = slide();
        assert_eq!(unit_file_name(&unit), "slide_003.md");
        assert_eq!(
            unit_markdown(&unit),
            concat!(
                "# Slide 3\n\n",
                "매출 추이\n\n",
                "![매출 추이](../images/3%20매출%20추이_슬라이드3.png)\n\n",
                "| 분기 | 금액 |\n",
                "| --- | --- |\n",
                "| 1Q | 10\\|20 |\n",
                "| 2Q |  |",
            )
        );
    }

    #[test]
    fn test_section_heading_and_sheet_name() {
        let mut section = Unit::new(UnitKind::Section, 2);
        section.heading = Some("개요".to_string());
        section.heading_level = Some(1);
        section.content.push(ContentNode::Text(TextNode::new("본문")));
        assert_eq!(unit_text(&section), "## 개요\n\n본문");

        let mut untitled = Unit::new(UnitKind::Section, 1);
        untitled.heading = Some(String::new());
        assert_eq!(unit_text(&untitled), "");

        let mut sheet = Unit::new(UnitKind::Sheet, 1);
        sheet.sheet_name = Some("Data".to_string());
        assert_eq!(unit_file_name(&sheet), "sheet_001.md");
        assert_eq!(unit_text(&sheet), "## Data");
    }

    #[test]
    fn test_write_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = Document::new("deck.pptx", 0, SourceFormat::Pptx);
        let mut first = Unit::new(UnitKind::Slide, 1);
        first.content.push(ContentNode::Text(TextNode::new("표지")));
        document.units = vec![first, Unit::new(UnitKind::Slide, 2)];

        let texts = write_markdown(dir.path(), &document).unwrap();
        assert_eq!(texts, dir.path().join("texts"));
        assert_eq!(
            fs::read_to_string(texts.join("slide_001.md")).unwrap(),
            "# Slide 1\n\n표지"
        );
        assert_eq!(
            fs::read_to_string(texts.join("slide_002.md")).unwrap(),
            "# Slide 2\n\n"
        );
        assert_eq!(
            fs::read_to_string(texts.join(FULL_TEXT_FILE)).unwrap(),
            "# Slide 1\n\n표지\n\n---\n\n# Slide 2\n\n\n\n---\n\n"
        );
    }
}
