use crate::geometry::available_content_width;
use crate::xml::{Element, Node, W};

use super::images::scale_images;
use super::{is_section_break, sect_pr_at, section_anchors, section_geometry};

/// 100% in fiftieths of a percent.
const FULL_WIDTH_PCT: &str = "5000";

fn column_count(tbl: &Element) -> usize {
    tbl.child(W, "tblGrid")
        .map_or(0, |grid| grid.children_named(W, "gridCol").count())
}

fn force_full_width(tbl: &mut Element) {
    let tbl_pr = tbl.child_or_insert(W, "tblPr", 0);

    tbl_pr.remove_children_named(W, "tblW");
    tbl_pr.push_child(
        Element::new(W, "tblW")
            .with_attr(W, "w", FULL_WIDTH_PCT)
            .with_attr(W, "type", "pct"),
    );

    tbl_pr.remove_children_named(W, "tblLayout");
    tbl_pr.push_child(Element::new(W, "tblLayout").with_attr(W, "type", "autofit"));
}

/// Forces `tbl` to 100% width with auto-fit layout and shrinks images in its
/// cells to `available_width / (inherited_columns + own columns)`.
///
/// Nested tables recurse with the accumulated column count as their inherited
/// count and the same `available_width`, so the budget shrinks with depth
/// faster than the real rendered column widths do. That matches the output
/// this tool has always produced; it is a simplification, not a column solver.
pub fn normalize_table(tbl: &mut Element, inherited_columns: usize, available_width: i64) {
    let total_columns = inherited_columns + column_count(tbl);
    force_full_width(tbl);

    let budget = available_width as f64 / total_columns.max(1) as f64;
    for row in tbl.children_named_mut(W, "tr") {
        for cell in row.children_named_mut(W, "tc") {
            scale_images(cell, budget);
            for nested in cell.children_named_mut(W, "tbl") {
                normalize_table(nested, total_columns, available_width);
            }
        }
    }
}

/// Normalizes every top-level body table, using the content width of the
/// section each table falls in.
pub fn normalize_document_tables(body: &mut Element) -> usize {
    let widths: Vec<i64> = section_anchors(body)
        .into_iter()
        .map(|anchor| available_content_width(&section_geometry(sect_pr_at(body, anchor))))
        .collect();
    let default_width = available_content_width(&section_geometry(None));

    let mut section = 0;
    let mut count = 0;
    for node in body.children.iter_mut() {
        let Node::Element(el) = node else { continue };
        if el.is(W, "tbl") {
            let width = widths.get(section).copied().unwrap_or(default_width);
            normalize_table(el, 0, width);
            count += 1;
        } else if is_section_break(el) {
            section += 1;
        }
    }

    log::info!("Normalized {count} tables across {} sections", widths.len().max(1));
    count
}
