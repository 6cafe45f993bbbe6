//! Moving images that sit inside table cells into their tables, and
//! dropping geometry once it is no longer needed.

use crate::locate::{collect_tables, collect_tables_mut};
use crate::types::{walk_mut, ContentNode, ImageAsset, TableImage};

/// Attach images lying inside a header-keyed table to that table.
///
/// An image is embedded when its center is inside the first containing
/// table, that table has a header row, and its `Image` node is still in the
/// tree. The node is removed; the asset stays. Running this twice adds
/// nothing the second time.
pub fn embed_table_images(content: &mut Vec<ContentNode>, images: &[ImageAsset]) {
    let mut placements: Vec<(usize, TableImage)> = Vec::new();
    {
        let tables = collect_tables(content);
        if tables.is_empty() {
            return;
        }

        for image in images {
            let Some(position) = image.position else {
                continue;
            };
            let center = position.center();
            let Some(idx) = tables.iter().position(|t| t.contains(center)) else {
                continue;
            };
            let Some(cell) = tables[idx].locate(center) else {
                continue;
            };
            if !has_image_node(content, &image.filename) {
                continue;
            }
            placements.push((
                idx,
                TableImage {
                    filename: image.filename.clone(),
                    column: cell.column_name,
                    column_idx: cell.column_index,
                    row_idx: cell.row_index,
                },
            ));
        }
    }

    for (idx, table_image) in placements {
        remove_image_node(content, &table_image.filename);
        if let Some(table) = collect_tables_mut(content).into_iter().nth(idx) {
            log::debug!(
                "{} embedded in table cell ({}, {})",
                table_image.filename,
                table_image.row_idx,
                table_image.column_idx
            );
            table.images.get_or_insert_with(Vec::new).push(table_image);
        }
    }
}

fn has_image_node(nodes: &[ContentNode], filename: &str) -> bool {
    nodes.iter().any(|node| match node {
        ContentNode::Image(image) => image.filename == filename,
        ContentNode::Group(group) => has_image_node(&group.items, filename),
        _ => false,
    })
}

/// Remove the first `Image` node with `filename`, depth-first.
fn remove_image_node(nodes: &mut Vec<ContentNode>, filename: &str) -> bool {
    for idx in 0..nodes.len() {
        if matches!(&nodes[idx], ContentNode::Image(image) if image.filename == filename) {
            nodes.remove(idx);
            return true;
        }
        if let ContentNode::Group(group) = &mut nodes[idx] {
            if remove_image_node(&mut group.items, filename) {
                return true;
            }
        }
    }
    false
}

/// Clear all geometry from nodes and assets.
pub fn strip_positions(content: &mut [ContentNode], images: &mut [ImageAsset]) {
    walk_mut(content, &mut |node| match node {
        ContentNode::Text(n) => n.position = None,
        ContentNode::Image(n) => n.position = None,
        ContentNode::ImageRef(_) => {}
        ContentNode::Table(n) => {
            n.position = None;
            n.col_widths = None;
            n.row_heights = None;
        }
        ContentNode::Group(n) => n.position = None,
    });

    for image in images.iter_mut() {
        image.position = None;
    }
}
