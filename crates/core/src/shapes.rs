//! Slide shapes as delivered by a deck reader, and their conversion into
//! content nodes and image assets.

use crate::assets::ImageWriter;
use crate::geometry::Rect;
use crate::types::{
    ContentNode, GroupNode, ImageAsset, ImageNode, RefType, TableNode, TableRows, TextNode, Unit,
};

/// A shape on a slide, positioned in EMU.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub position: Rect,
    pub kind: ShapeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Text of a text-bearing shape (may be blank).
    Text(String),
    Picture(ImageBlob),
    Table(TableShape),
    Group(Vec<Shape>),
    /// A shape that yields no content (connectors, charts, unreadable
    /// pictures) but still takes up an index.
    Other,
}

/// Raw picture bytes and their declared content type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Cell text plus the real grid geometry of a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableShape {
    pub cells: Vec<Vec<String>>,
    pub col_widths: Vec<f64>,
    pub row_heights: Vec<f64>,
}

impl Shape {
    pub fn new(position: Rect, kind: ShapeKind) -> Self {
        Self { position, kind }
    }
}

/// File extension for a picture content type, `png` when unknown.
pub fn image_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/webp" => "webp",
        "image/tiff" => "tiff",
        _ => "png",
    }
}

/// Turn a slide's shapes into the unit's content and image list.
///
/// Pictures are written through `writer` as they are met.
pub fn build_slide(unit: &mut Unit, shapes: &[Shape], writer: &dyn ImageWriter) {
    for (idx, shape) in shapes.iter().enumerate() {
        if let Some((node, image)) = build_shape(shape, unit.number, &idx.to_string(), writer) {
            unit.content.push(node);
            unit.images.extend(image);
        }
    }
}

fn build_shape(
    shape: &Shape,
    slide: usize,
    path: &str,
    writer: &dyn ImageWriter,
) -> Option<(ContentNode, Option<ImageAsset>)> {
    match &shape.kind {
        ShapeKind::Table(table) => {
            let rows = TableRows::from_grid(table.cells.clone());
            let node = TableNode::new(rows)
                .at(shape.position)
                .with_grid(table.col_widths.clone(), table.row_heights.clone());
            Some((ContentNode::Table(node), None))
        }
        ShapeKind::Picture(blob) => {
            let filename = format!(
                "slide{:03}_shape{}.{}",
                slide,
                path,
                image_extension(&blob.content_type)
            );
            let size = match writer.write_image(&filename, &blob.bytes) {
                Ok(size) => size,
                Err(e) => {
                    log::warn!("Failed to write image (slide{}, shape{}): {}", slide, path, e);
                    return None;
                }
            };
            let asset = ImageAsset::new(
                slide,
                filename.clone(),
                size,
                format!("slide{}_shape{}", slide, path),
                RefType::SlidePosition,
            )
            .with_position(shape.position);
            Some((
                ContentNode::Image(ImageNode::new(filename, shape.position)),
                Some(asset),
            ))
        }
        ShapeKind::Group(children) => {
            let mut items = Vec::new();
            let mut images = Vec::new();
            for (sub_idx, child) in children.iter().enumerate() {
                let child_path = format!("{}g{}", path, sub_idx);
                if let Some((node, image)) = build_shape(child, slide, &child_path, writer) {
                    items.push(node);
                    images.extend(image);
                }
            }
            if items.is_empty() {
                return None;
            }
            if images.len() > 1 {
                log::warn!(
                    "slide{} group shape{} holds {} images; only the first is listed",
                    slide,
                    path,
                    images.len()
                );
            }
            let first = images.into_iter().next();
            Some((ContentNode::Group(GroupNode::new(items, shape.position)), first))
        }
        ShapeKind::Other => None,
        ShapeKind::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some((ContentNode::Text(TextNode::new(text).at(shape.position)), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FsImageWriter;
    use crate::types::UnitKind;

    fn picture(left: f64, content_type: &str) -> Shape {
        Shape::new(
            Rect::new(left, 0.0, 10.0, 10.0),
            ShapeKind::Picture(ImageBlob {
                bytes: vec![1, 2, 3],
                content_type: content_type.into(),
            }),
        )
    }

    fn text(value: &str) -> Shape {
        Shape::new(Rect::new(0.0, 0.0, 10.0, 10.0), ShapeKind::Text(value.into()))
    }

    #[test]
    fn test_extension_map() {
        assert_eq!(image_extension("image/jpeg"), "jpg");
        assert_eq!(image_extension("image/tiff"), "tiff");
        assert_eq!(image_extension("image/x-emf"), "png");
    }

    #[test]
    fn test_build_slide_nodes_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FsImageWriter::new(dir.path()).unwrap();
        let shapes = vec![
            text("  Title  "),
            Shape::new(Rect::default(), ShapeKind::Other),
            picture(20.0, "image/jpeg"),
            Shape::new(
                Rect::new(0.0, 50.0, 100.0, 40.0),
                ShapeKind::Table(TableShape {
                    cells: vec![vec!["A".into(), "B".into()], vec!["1".into(), "2".into()]],
                    col_widths: vec![50.0, 50.0],
                    row_heights: vec![20.0, 20.0],
                }),
            ),
        ];

        let mut unit = Unit::new(UnitKind::Slide, 4);
        build_slide(&mut unit, &shapes, &writer);

        assert_eq!(unit.content.len(), 3);
        assert!(matches!(&unit.content[0], ContentNode::Text(t) if t.text == "Title"));
        assert_eq!(unit.content[1].image_filename(), Some("slide004_shape2.jpg"));
        match &unit.content[2] {
            ContentNode::Table(t) => {
                assert_eq!(t.col_widths, Some(vec![50.0, 50.0]));
                assert!(t.rows.headers().is_some());
            }
            other => panic!("unexpected node {other:?}"),
        }

        assert_eq!(unit.images.len(), 1);
        assert_eq!(unit.images[0].reference, "slide4_shape2");
        assert_eq!(unit.images[0].size_bytes, 3);
        assert!(dir.path().join("slide004_shape2.jpg").exists());
    }

    #[test]
    fn test_group_surfaces_first_image_only() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FsImageWriter::new(dir.path()).unwrap();
        let shapes = vec![
            text("a"),
            Shape::new(
                Rect::default(),
                ShapeKind::Group(vec![picture(0.0, "image/png"), picture(20.0, "image/gif")]),
            ),
            Shape::new(Rect::default(), ShapeKind::Group(vec![text(" ")])),
        ];

        let mut unit = Unit::new(UnitKind::Slide, 1);
        build_slide(&mut unit, &shapes, &writer);

        assert_eq!(unit.content.len(), 2);
        match &unit.content[1] {
            ContentNode::Group(g) => {
                assert_eq!(g.items.len(), 2);
                assert_eq!(g.items[1].image_filename(), Some("slide001_shape1g1.gif"));
            }
            other => panic!("unexpected node {other:?}"),
        }
        assert_eq!(unit.images.len(), 1);
        assert_eq!(unit.images[0].filename, "slide001_shape1g0.png");
        assert!(dir.path().join("slide001_shape1g1.gif").exists());
    }

    #[test]
    fn test_write_failure_drops_picture() {
        let root = tempfile::tempdir().unwrap();
        let writer = FsImageWriter::new(root.path().join("images")).unwrap();
        std::fs::remove_dir(writer.dir()).unwrap();

        let mut unit = Unit::new(UnitKind::Slide, 1);
        build_slide(&mut unit, &[picture(0.0, "image/png"), text("kept")], &writer);
        assert_eq!(unit.content.len(), 1);
        assert!(unit.images.is_empty());
    }
}
