//! The per-unit post-processing pass every front end ends with.

use std::collections::HashSet;
use std::path::Path;

use crate::embed::{embed_table_images, strip_positions};
use crate::ids::assign_ids;
use crate::refs::infer_refs;
use crate::rename::{apply_renames, rename_assets};
use crate::types::Unit;

/// Finish a unit whose content and images have been collected.
///
/// Runs reference inference, renaming (files live in `image_dir`), id
/// assignment, table embedding and position stripping, in that order.
/// Embedding relies on geometry, so it must come before stripping.
pub fn finalize_unit(unit: &mut Unit, image_dir: &Path) {
    infer_refs(unit);

    let mut used = HashSet::new();
    let renames = rename_assets(&mut unit.images, image_dir, unit.kind, &mut used);
    apply_renames(&mut unit.content, &renames);

    assign_ids(&mut unit.content, unit.kind, unit.number);
    embed_table_images(&mut unit.content, &unit.images);
    strip_positions(&mut unit.content, &mut unit.images);

    log::debug!(
        "{} {}: {} nodes, {} images",
        unit.kind.label(),
        unit.number,
        unit.content.len(),
        unit.images.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::types::{
        ContentNode, ImageAsset, ImageNode, RefType, TableNode, TableRows, TextNode, UnitKind,
    };
    use std::fs;

    #[test]
    fn test_slide_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("slide001_shape2.png"), b"a").unwrap();
        fs::write(dir.path().join("slide001_shape3.png"), b"b").unwrap();

        let table_rect = Rect::new(0.0, 100.0, 300.0, 100.0);
        let in_table = Rect::new(200.0, 160.0, 20.0, 20.0);
        let below_title = Rect::new(0.0, 300.0, 50.0, 50.0);

        let mut unit = Unit::new(UnitKind::Slide, 1);
        unit.content = vec![
            ContentNode::Text(TextNode::new("▣ 개요").at(Rect::new(0.0, 0.0, 100.0, 20.0))),
            ContentNode::Table(
                TableNode::new(TableRows::from_grid(vec![
                    vec!["제품".into(), "사진".into()],
                    vec!["A".into(), "".into()],
                ]))
                .at(table_rect),
            ),
            ContentNode::Image(ImageNode::new("slide001_shape2.png", in_table)),
            ContentNode::Image(ImageNode::new("slide001_shape3.png", below_title)),
        ];
        unit.images = vec![
            ImageAsset::new(1, "slide001_shape2.png", 1, "slide1_shape2", RefType::SlidePosition)
                .with_position(in_table),
            ImageAsset::new(1, "slide001_shape3.png", 1, "slide1_shape3", RefType::SlidePosition)
                .with_position(below_title),
        ];

        finalize_unit(&mut unit, dir.path());

        assert_eq!(unit.images[0].reference, "사진");
        assert_eq!(unit.images[0].filename, "사진 이미지_슬라이드1.png");
        assert_eq!(unit.images[1].reference, "▣ 개요");
        assert_eq!(unit.images[1].ref_type, RefType::SlideSection);
        assert_eq!(unit.images[1].filename, "개요 이미지_슬라이드1.png");
        assert!(dir.path().join("사진 이미지_슬라이드1.png").exists());

        // The table image left the content tree; the other one stayed.
        assert_eq!(unit.content.len(), 3);
        match &unit.content[1] {
            ContentNode::Table(t) => {
                assert_eq!(t.id, "표_제품 사진_슬라이드1");
                let embedded = t.images.as_ref().unwrap();
                assert_eq!(embedded[0].filename, "사진 이미지_슬라이드1.png");
                assert_eq!(embedded[0].column, "사진");
            }
            other => panic!("unexpected node {other:?}"),
        }
        assert_eq!(unit.content[2].id(), "개요 이미지_슬라이드1");

        assert!(unit.content.iter().all(|n| n.position().is_none()));
        assert!(unit.images.iter().all(|i| i.position.is_none()));
    }

    #[test]
    fn test_used_names_fresh_per_unit() {
        let dir = tempfile::tempdir().unwrap();
        for number in 1..=2 {
            let mut unit = Unit::new(UnitKind::Page, number);
            unit.images = vec![ImageAsset::new(number, "x.png", 1, "Chart", RefType::PagePosition)];
            finalize_unit(&mut unit, dir.path());
            assert_eq!(
                unit.images[0].filename,
                format!("Chart 이미지_페이지{}.png", number)
            );
        }
    }
}
