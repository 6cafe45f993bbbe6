//! Table-cell lookup by geometry.
//!
//! Table embedding and reference inference both resolve cells through this
//! module, so they always agree on which cell a point falls in.

use crate::geometry::{Point, Rect};
use crate::types::{ContentNode, TableNode};

/// The cell a point resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLocation {
    pub column_index: usize,
    pub row_index: usize,
    pub column_name: String,
}

/// Resolve the cell under `point` in a table occupying `table`.
///
/// Real column widths are used when they cover every header, otherwise the
/// width is split evenly. Rows use `row_heights` when present, otherwise an
/// even split over `row_count` (header row included). Indices are always
/// clamped into range; a table without columns or rows yields index 0.
pub fn locate(
    point: Point,
    table: Rect,
    col_widths: Option<&[f64]>,
    row_heights: Option<&[f64]>,
    headers: &[String],
    row_count: usize,
) -> CellLocation {
    let column_count = headers.len();

    let column_index = match col_widths {
        Some(widths) if column_count > 0 && widths.len() >= column_count => {
            walk_tracks(point.x, table.left, &widths[..column_count])
        }
        _ => even_track(point.x, table.left, table.width, column_count),
    };

    let row_index = match row_heights {
        Some(heights) if !heights.is_empty() => {
            walk_tracks(point.y, table.top, heights).min(row_count.saturating_sub(1))
        }
        _ => even_track(point.y, table.top, table.height, row_count),
    };

    CellLocation {
        column_index,
        row_index,
        column_name: headers
            .get(column_index)
            .map(|h| h.trim().to_string())
            .unwrap_or_default(),
    }
}

/// First track whose cumulative end exceeds `pos`, or the last track.
fn walk_tracks(pos: f64, start: f64, sizes: &[f64]) -> usize {
    let mut end = start;
    for (idx, size) in sizes.iter().enumerate() {
        end += size;
        if pos < end {
            return idx;
        }
    }
    sizes.len().saturating_sub(1)
}

/// `floor((pos - start) / (extent / count))`, clamped to `[0, count - 1]`.
fn even_track(pos: f64, start: f64, extent: f64, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let size = extent / count as f64;
    let idx = ((pos - start) / size).floor();
    // Also catches NaN from a zero-sized table.
    if !(idx > 0.0) {
        return 0;
    }
    (idx as usize).min(count - 1)
}

impl TableNode {
    /// Cell under `point`, for tables with a header row and a position.
    pub fn locate(&self, point: Point) -> Option<CellLocation> {
        let headers = self.rows.headers()?;
        let position = self.position?;
        Some(locate(
            point,
            position,
            self.col_widths.as_deref(),
            self.row_heights.as_deref(),
            headers,
            self.rows.row_count(),
        ))
    }

    /// Whether `point` lies inside the table's rectangle.
    pub fn contains(&self, point: Point) -> bool {
        self.position.is_some_and(|p| p.contains(point))
    }
}

/// Tables at the top level and one level inside groups, in tree order.
pub fn collect_tables(content: &[ContentNode]) -> Vec<&TableNode> {
    let mut tables = Vec::new();
    for node in content {
        match node {
            ContentNode::Table(table) => tables.push(table),
            ContentNode::Group(group) => {
                tables.extend(group.items.iter().filter_map(|item| match item {
                    ContentNode::Table(table) => Some(table),
                    _ => None,
                }));
            }
            _ => {}
        }
    }
    tables
}

/// Mutable counterpart of [`collect_tables`], in the same order.
pub(crate) fn collect_tables_mut(content: &mut [ContentNode]) -> Vec<&mut TableNode> {
    let mut tables = Vec::new();
    for node in content.iter_mut() {
        match node {
            ContentNode::Table(table) => tables.push(table),
            ContentNode::Group(group) => {
                tables.extend(group.items.iter_mut().filter_map(|item| match item {
                    ContentNode::Table(table) => Some(table),
                    _ => None,
                }));
            }
            _ => {}
        }
    }
    tables
}

/// The first table (see [`collect_tables`]) containing `point`.
pub fn containing_table<'a>(tables: &[&'a TableNode], point: Point) -> Option<&'a TableNode> {
    tables.iter().copied().find(|t| t.contains(point))
}
