//! Human-readable node identifiers.

use std::path::Path;

use crate::normalize::{sanitize_for_filename, ID_MAX_CHARS};
use crate::types::{ContentNode, UnitKind};

#[derive(Default)]
struct Counters {
    text: usize,
    table: usize,
    group: usize,
}

/// Give every node of a unit a descriptive `id`, in document order.
///
/// Counters are per unit and shared with nested groups.
pub fn assign_ids(content: &mut [ContentNode], kind: UnitKind, number: usize) {
    let suffix = format!("{}{}", kind.label(), number);
    assign(content, &suffix, &mut Counters::default());
}

fn assign(content: &mut [ContentNode], suffix: &str, counters: &mut Counters) {
    for node in content.iter_mut() {
        match node {
            ContentNode::Text(text) => {
                counters.text += 1;
                let summary = sanitize_for_filename(&text.text, ID_MAX_CHARS);
                text.id = if summary.is_empty() {
                    format!("텍스트{}_{}", counters.text, suffix)
                } else {
                    format!("{}_{}", summary, suffix)
                };
            }
            ContentNode::Image(image) => image.id = file_stem(&image.filename),
            ContentNode::ImageRef(image_ref) => image_ref.id = file_stem(&image_ref.filename),
            ContentNode::Table(table) => {
                counters.table += 1;
                table.id = match table.rows.headers() {
                    Some(headers) => {
                        let mut distinct: Vec<&str> = Vec::with_capacity(3);
                        for header in headers {
                            if distinct.len() == 3 {
                                break;
                            }
                            if !distinct.contains(&header.as_str()) {
                                distinct.push(header.as_str());
                            }
                        }
                        let summary = sanitize_for_filename(&distinct.join(" "), ID_MAX_CHARS);
                        format!("표_{}_{}", summary, suffix)
                    }
                    None => format!("표{}_{}", counters.table, suffix),
                };
            }
            ContentNode::Group(group) => {
                counters.group += 1;
                group.id = format!("그룹{}_{}", counters.group, suffix);
                assign(&mut group.items, suffix, counters);
            }
        }
    }
}

fn file_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::types::{GroupNode, ImageNode, ImageRefNode, TableNode, TableRows, TextNode};

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_ids_for_each_kind() {
        let mut content = vec![
            ContentNode::Text(TextNode::new("▣ 프로젝트 개요!")),
            ContentNode::Text(TextNode::new("...")),
            ContentNode::Image(ImageNode::new("개요 이미지_슬라이드2.png", Rect::default())),
            ContentNode::Table(TableNode::new(TableRows::from_grid(grid(&[
                &["이름", "사진", "비고", "기타"],
                &["a", "", "", ""],
            ])))),
            ContentNode::Table(TableNode::new(TableRows::Raw(grid(&[&["x"]])))),
        ];

        assign_ids(&mut content, UnitKind::Slide, 2);
        let ids: Vec<&str> = content.iter().map(ContentNode::id).collect();
        assert_eq!(
            ids,
            vec![
                "프로젝트 개요_슬라이드2",
                "텍스트2_슬라이드2",
                "개요 이미지_슬라이드2",
                "표_이름 사진 비고_슬라이드2",
                "표2_슬라이드2",
            ]
        );
    }

    #[test]
    fn test_groups_number_and_recurse() {
        let mut content = vec![
            ContentNode::Group(GroupNode::new(
                vec![
                    ContentNode::Text(TextNode::new("")),
                    ContentNode::Group(GroupNode::new(Vec::new(), Rect::default())),
                ],
                Rect::default(),
            )),
            ContentNode::Text(TextNode::new("")),
        ];

        assign_ids(&mut content, UnitKind::Sheet, 1);
        match &content[0] {
            ContentNode::Group(g) => {
                assert_eq!(g.id, "그룹1_시트1");
                assert_eq!(g.items[0].id(), "텍스트1_시트1");
                assert_eq!(g.items[1].id(), "그룹2_시트1");
            }
            other => panic!("unexpected node {other:?}"),
        }
        assert_eq!(content[1].id(), "텍스트2_시트1");
    }

    #[test]
    fn test_image_ref_uses_stem() {
        let mut content = vec![ContentNode::ImageRef(ImageRefNode::new("page001_img01.jpeg"))];
        assign_ids(&mut content, UnitKind::Page, 1);
        assert_eq!(content[0].id(), "page001_img01");
    }

    #[test]
    fn test_long_text_truncated() {
        let mut content = vec![ContentNode::Text(TextNode::new("a".repeat(50)))];
        assign_ids(&mut content, UnitKind::Section, 4);
        assert_eq!(content[0].id(), format!("{}_섹션4", "a".repeat(20)));
    }
}
