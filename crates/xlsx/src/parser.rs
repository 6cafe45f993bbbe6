//! XLSX file parser implementation.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use docref_core::refs::positional_ref;
use docref_core::{
    finalize_unit, ContentNode, Document, ImageAsset, ImageWriter, RefType, Result, SourceFormat,
    TableNode, TableRows, Unit, UnitKind,
};
use docref_ooxml::{resolve_target, Package, XmlElement};

use crate::cells::{cell_reference, cell_value, parse_cell_reference, SharedStrings};
use crate::drawing::anchored_pictures;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Media extensions copied out of the package.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "emf"];

/// Parser for XLSX (Office Open XML) files.
pub struct XlsxParser;

/// A worksheet as listed in the workbook.
struct SheetEntry {
    name: String,
    part: Option<String>,
}

impl XlsxParser {
    /// Create a new XLSX parser.
    pub fn new() -> Self {
        Self
    }

    /// One unit per worksheet, in workbook order, with pictures written
    /// through `writer`. The units are not finalized.
    pub fn parse<R: Read + Seek>(&self, reader: R, writer: &dyn ImageWriter) -> Result<Vec<Unit>> {
        let mut package = Package::open(reader)?;
        let sheets = self.get_sheet_order(&mut package)?;
        let shared = self.load_shared_strings(&mut package);

        let mut image_count = 0;
        let mut units = Vec::with_capacity(sheets.len());
        for (idx, entry) in sheets.iter().enumerate() {
            let mut unit = Unit::new(UnitKind::Sheet, idx + 1);
            unit.sheet_name = Some(entry.name.clone());

            let Some(part) = entry.part.as_deref() else {
                log::warn!("Sheet '{}' has no worksheet part", entry.name);
                units.push(unit);
                continue;
            };
            match package.read_xml(part) {
                Ok(root) => read_cells(&mut unit, &root, &shared),
                Err(e) => {
                    log::warn!("Unreadable sheet '{}': {}", entry.name, e);
                    units.push(unit);
                    continue;
                }
            }

            let mut pictures = SheetPictures {
                package: &mut package,
                writer,
                image_count: &mut image_count,
            };
            pictures.extract(&mut unit, part);
            units.push(unit);
        }
        Ok(units)
    }

    /// Worksheets in the order of `<sheets>`.
    fn get_sheet_order<R: Read + Seek>(&self, package: &mut Package<R>) -> Result<Vec<SheetEntry>> {
        let workbook = package.read_xml(WORKBOOK_PART)?;
        let rels = package.read_rels(WORKBOOK_PART)?;

        let Some(sheets) = workbook.child("sheets") else {
            return Ok(Vec::new());
        };
        Ok(sheets
            .children_named("sheet")
            .map(|sheet| SheetEntry {
                name: sheet.attr_local("name").unwrap_or_default().to_string(),
                part: sheet
                    .prefixed_attr("id")
                    .and_then(|rid| rels.get(rid))
                    .map(|rel| resolve_target(WORKBOOK_PART, &rel.target)),
            })
            .collect())
    }

    fn load_shared_strings<R: Read + Seek>(&self, package: &mut Package<R>) -> SharedStrings {
        let part = package
            .read_rels(WORKBOOK_PART)
            .ok()
            .and_then(|rels| {
                rels.of_kind("sharedStrings")
                    .next()
                    .map(|rel| resolve_target(WORKBOOK_PART, &rel.target))
            })
            .unwrap_or_else(|| SHARED_STRINGS_PART.to_string());

        if !package.has_part(&part) {
            return SharedStrings::default();
        }
        match package.read_xml(&part) {
            Ok(root) => SharedStrings::parse(&root),
            Err(e) => {
                log::warn!("Ignoring unreadable {}: {}", part, e);
                SharedStrings::default()
            }
        }
    }
}

impl Default for XlsxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill dimensions, merged ranges, the cell map and the used-range table.
fn read_cells(unit: &mut Unit, root: &XmlElement, shared: &SharedStrings) {
    unit.dimensions = root
        .child("dimension")
        .and_then(|d| d.attr_local("ref"))
        .map(str::to_string);

    unit.merged_cells = root
        .child("mergeCells")
        .map(|m| {
            m.children_named("mergeCell")
                .filter_map(|c| c.attr_local("ref"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut values: BTreeMap<(u32, u32), String> = BTreeMap::new();
    if let Some(data) = root.child("sheetData") {
        let mut next_row = 0;
        for row in data.children_named("row") {
            let row_idx = row
                .attr_local("r")
                .and_then(|r| r.trim().parse::<u32>().ok())
                .and_then(|r| r.checked_sub(1))
                .unwrap_or(next_row);
            next_row = row_idx.saturating_add(1);

            let mut next_col = 0;
            for cell in row.children_named("c") {
                let (row_idx, col_idx) = cell
                    .attr_local("r")
                    .and_then(parse_cell_reference)
                    .unwrap_or((row_idx, next_col));
                next_col = col_idx.saturating_add(1);

                if let Some(value) = cell_value(cell, shared) {
                    values.insert((row_idx, col_idx), value);
                }
            }
        }
    }

    for (&(row, col), value) in &values {
        unit.cell_values.insert(cell_reference(row, col), value.clone());
    }

    if let Some(grid) = used_range(&values) {
        unit.content
            .push(ContentNode::Table(TableNode::new(TableRows::from_grid(grid))));
    }
}

/// Rows from the first to the last populated row, columns likewise.
fn used_range(values: &BTreeMap<(u32, u32), String>) -> Option<Vec<Vec<String>>> {
    let first_row = values.keys().map(|(r, _)| *r).min()?;
    let last_row = values.keys().map(|(r, _)| *r).max()?;
    let first_col = values.keys().map(|(_, c)| *c).min()?;
    let last_col = values.keys().map(|(_, c)| *c).max()?;

    Some(
        (first_row..=last_row)
            .map(|row| {
                (first_col..=last_col)
                    .map(|col| values.get(&(row, col)).cloned().unwrap_or_default())
                    .collect()
            })
            .collect(),
    )
}

/// Copies a sheet's drawing pictures out of the package.
struct SheetPictures<'a, R: Read + Seek> {
    package: &'a mut Package<R>,
    writer: &'a dyn ImageWriter,
    /// Images written so far, across sheets.
    image_count: &'a mut usize,
}

impl<R: Read + Seek> SheetPictures<'_, R> {
    fn extract(&mut self, unit: &mut Unit, sheet_part: &str) {
        let rels = match self.package.read_rels(sheet_part) {
            Ok(rels) => rels,
            Err(e) => {
                log::warn!("Unreadable relationships of {}: {}", sheet_part, e);
                return;
            }
        };
        let drawings: Vec<String> = rels
            .of_kind("drawing")
            .map(|rel| resolve_target(sheet_part, &rel.target))
            .collect();

        for drawing_part in drawings {
            if let Err(e) = self.extract_drawing(unit, &drawing_part) {
                log::warn!("Skipping images of {}: {}", drawing_part, e);
            }
        }
    }

    fn extract_drawing(&mut self, unit: &mut Unit, drawing_part: &str) -> Result<()> {
        let drawing = self.package.read_xml(drawing_part)?;
        let rels = self.package.read_rels(drawing_part)?;
        let sheet_name = unit.sheet_name.clone().unwrap_or_default();

        for picture in anchored_pictures(&drawing) {
            let Some(rel) = rels.get(&picture.embed).filter(|r| !r.external) else {
                continue;
            };
            let media_path = resolve_target(drawing_part, &rel.target);
            let Some(ext) = media_path
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            else {
                continue;
            };
            let bytes = match self.package.read_bytes(&media_path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Skipping unreadable media {}: {}", media_path, e);
                    continue;
                }
            };

            let filename = format!("xl_img{:03}.{}", *self.image_count + 1, ext);
            let size = match self.writer.write_image(&filename, &bytes) {
                Ok(size) => size,
                Err(e) => {
                    log::warn!("Failed to write image {}: {}", filename, e);
                    continue;
                }
            };
            *self.image_count += 1;

            let anchor = picture.from.map(|(row, col)| cell_reference(row, col));
            let (reference, ref_type) = match &anchor {
                Some(cell) => (format!("{}_{}", sheet_name, cell), RefType::AnchorCell),
                None => (
                    positional_ref(UnitKind::Sheet, unit.number, Some(&sheet_name)),
                    RefType::SheetPosition,
                ),
            };

            let mut asset = ImageAsset::new(unit.number, filename, size, reference, ref_type);
            asset.anchor_cell = anchor;
            asset.sheet_name = Some(sheet_name.clone());
            unit.images.push(asset);
        }
        Ok(())
    }
}

/// Extract a workbook, writing its pictures through `writer`.
pub fn extract_xlsx(path: &Path, writer: &dyn ImageWriter) -> Result<Document> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");
    extract_from_reader(BufReader::new(file), filename, file_size, writer)
}

/// Extract a workbook from any seekable reader.
pub fn extract_from_reader<R: Read + Seek>(
    reader: R,
    filename: &str,
    file_size: u64,
    writer: &dyn ImageWriter,
) -> Result<Document> {
    let sheets = XlsxParser::new().parse(reader, writer)?;

    let mut document = Document::new(filename, file_size, SourceFormat::Xlsx);
    let total = sheets.len();
    for mut sheet in sheets {
        log::debug!(
            "sheet {}/{}: {}",
            sheet.number,
            total,
            sheet.sheet_name.as_deref().unwrap_or_default()
        );
        finalize_unit(&mut sheet, writer.dir());
        document.add_unit(sheet);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docref_core::FsImageWriter;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    fn rels(entries: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut xml = String::from("<Relationships>");
        for (id, kind, target) in entries {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
                id, REL, kind, target
            ));
        }
        xml.push_str("</Relationships>");
        xml.into_bytes()
    }

    fn workbook() -> Vec<u8> {
        let data_sheet = concat!(
            r#"<worksheet xmlns="urn:x" xmlns:r="urn:r"><dimension ref="A1:B3"/><sheetData>"#,
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>"#,
            r#"<row r="2"><c r="A2" t="inlineStr"><is><t>kim</t></is></c><c r="B2"><v>3</v></c></row>"#,
            r#"<row r="3"><c r="A3" t="b"><v>1</v></c><c r="B3"><v>2.50</v></c><c r="C3" s="2"/></row>"#,
            r#"</sheetData><mergeCells count="1"><mergeCell ref="A5:B5"/></mergeCells><drawing r:id="rId1"/></worksheet>"#,
        );
        let drawing = concat!(
            r#"<xdr:wsDr xmlns:xdr="urn:xdr" xmlns:a="urn:a" xmlns:r="urn:r">"#,
            r#"<xdr:twoCellAnchor><xdr:from><xdr:col>1</xdr:col><xdr:row>1</xdr:row></xdr:from><xdr:pic><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill></xdr:pic></xdr:twoCellAnchor>"#,
            r#"<xdr:oneCellAnchor><xdr:from><xdr:col>3</xdr:col><xdr:row>4</xdr:row></xdr:from><xdr:pic><xdr:blipFill><a:blip r:embed="rId2"/></xdr:blipFill></xdr:pic></xdr:oneCellAnchor>"#,
            r#"<xdr:absoluteAnchor><xdr:pic><xdr:blipFill><a:blip r:embed="rId3"/></xdr:blipFill></xdr:pic></xdr:absoluteAnchor>"#,
            r#"</xdr:wsDr>"#,
        );

        let parts: Vec<(&str, Vec<u8>)> = vec![
            (
                "xl/workbook.xml",
                r#"<workbook xmlns="urn:x" xmlns:r="urn:r"><sheets><sheet name="Data" sheetId="2" r:id="rId2"/><sheet name="빈 시트" sheetId="1" r:id="rId1"/></sheets></workbook>"#.as_bytes().to_vec(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                rels(&[
                    ("rId1", "worksheet", "worksheets/sheet1.xml"),
                    ("rId2", "worksheet", "worksheets/sheet2.xml"),
                    ("rId3", "sharedStrings", "sharedStrings.xml"),
                ]),
            ),
            (
                "xl/sharedStrings.xml",
                r#"<sst xmlns="urn:x"><si><t>이름</t></si><si><t>사진</t></si></sst>"#
                    .as_bytes()
                    .to_vec(),
            ),
            (
                "xl/worksheets/sheet1.xml",
                br#"<worksheet xmlns="urn:x"><sheetData/></worksheet>"#.to_vec(),
            ),
            ("xl/worksheets/sheet2.xml", data_sheet.as_bytes().to_vec()),
            (
                "xl/worksheets/_rels/sheet2.xml.rels",
                rels(&[("rId1", "drawing", "../drawings/drawing1.xml")]),
            ),
            ("xl/drawings/drawing1.xml", drawing.as_bytes().to_vec()),
            (
                "xl/drawings/_rels/drawing1.xml.rels",
                rels(&[
                    ("rId1", "image", "../media/image1.png"),
                    ("rId2", "image", "../media/image2.jpeg"),
                    ("rId3", "image", "../media/image3.png"),
                ]),
            ),
            ("xl/media/image1.png", vec![1, 2, 3]),
            ("xl/media/image2.jpeg", vec![4]),
            ("xl/media/image3.png", vec![5, 6]),
        ];

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in parts {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(&data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_sheets_in_workbook_order() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FsImageWriter::new(dir.path()).unwrap();
        let sheets = XlsxParser::new()
            .parse(Cursor::new(workbook()), &writer)
            .unwrap();

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].sheet_name.as_deref(), Some("Data"));
        assert_eq!(sheets[1].sheet_name.as_deref(), Some("빈 시트"));
        assert!(sheets[1].content.is_empty());
        assert!(sheets[1].images.is_empty());

        let data = &sheets[0];
        assert_eq!(data.dimensions.as_deref(), Some("A1:B3"));
        assert_eq!(data.merged_cells, vec!["A5:B5".to_string()]);
        assert_eq!(data.cell_values.get("B2").map(String::as_str), Some("3"));
        assert_eq!(data.cell_values.get("A3").map(String::as_str), Some("TRUE"));
        assert!(!data.cell_values.contains_key("C3"));

        match &data.content[0] {
            ContentNode::Table(table) => {
                assert_eq!(table.rows.row_count(), 3);
                assert_eq!(table.rows.cell(0, 1), Some("사진"));
                assert_eq!(table.rows.cell(2, 1), Some("2.5"));
            }
            other => panic!("unexpected node {other:?}"),
        }

        let refs: Vec<(&str, RefType)> = data
            .images
            .iter()
            .map(|i| (i.reference.as_str(), i.ref_type))
            .collect();
        assert_eq!(
            refs,
            vec![
                ("Data_B2", RefType::AnchorCell),
                ("Data_D5", RefType::AnchorCell),
                ("Data_figure", RefType::SheetPosition),
            ]
        );
        assert_eq!(data.images[1].filename, "xl_img002.jpeg");
        assert_eq!(data.images[1].anchor_cell.as_deref(), Some("D5"));
    }

    #[test]
    fn test_anchor_cell_value_names_image() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FsImageWriter::new(dir.path()).unwrap();
        let document =
            extract_from_reader(Cursor::new(workbook()), "book.xlsx", 1, &writer).unwrap();

        let images = &document.units[0].images;
        assert_eq!(images[0].reference, "3");
        assert_eq!(images[0].ref_type, RefType::AnchorCellText);
        assert_eq!(images[0].filename, "3 이미지_시트1.png");
        assert_eq!(images[1].filename, "Data_D5 이미지_시트1.jpeg");
        assert_eq!(images[2].filename, "Data_figure 이미지_시트1.png");
        assert_eq!(images[2].sheet_name.as_deref(), Some("Data"));
        assert!(dir.path().join("3 이미지_시트1.png").exists());
    }

    #[test]
    fn test_used_range_starts_at_first_populated_cell() {
        let mut values = BTreeMap::new();
        values.insert((2, 1), "x".to_string());
        values.insert((3, 2), "y".to_string());
        assert_eq!(
            used_range(&values),
            Some(vec![
                vec!["x".to_string(), String::new()],
                vec![String::new(), "y".to_string()],
            ])
        );
        assert_eq!(used_range(&BTreeMap::new()), None);
    }

    #[test]
    fn test_cells_after_last_row_number() {
        let root = XmlElement::parse(concat!(
            r#"<worksheet><sheetData>"#,
            r#"<row r="4294967295"><c><v>1</v></c></row>"#,
            r#"<row><c><v>2</v></c><c><v>3</v></c></row>"#,
            r#"<row><c><v>4</v></c></row>"#,
            r#"</sheetData></worksheet>"#,
        ))
        .unwrap();
        let mut unit = Unit::new(UnitKind::Sheet, 1);
        read_cells(&mut unit, &root, &SharedStrings::default());

        assert_eq!(unit.cell_values["A4294967295"], "1");
        assert_eq!(unit.cell_values["A4294967296"], "4");
        assert_eq!(unit.cell_values["B4294967296"], "3");
    }
}
