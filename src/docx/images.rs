use crate::error::Error;
use crate::xml::{Element, WP, XmlDocument, element_to_string};

/// New `(cx, cy)` for an extent wider than `max_width`. Both casts truncate
/// toward zero, which is what existing output was produced with.
pub fn fit_extent(cx: i64, cy: i64, max_width: f64) -> (i64, i64) {
    let scale = max_width / cx as f64;
    (max_width as i64, (cy as f64 * scale) as i64)
}

/// Shrinks every `wp:extent` below `cell` (at any depth) that is wider than
/// `max_width`, keeping its aspect ratio. Extents that already fit are left
/// byte-identical. Returns how many extents changed.
pub fn scale_images(cell: &mut Element, max_width: f64) -> usize {
    if max_width <= 0.0 {
        return 0;
    }
    let mut scaled = 0;
    cell.for_each_descendant_mut(&mut |el: &mut Element| {
        if !el.is(WP, "extent") {
            return;
        }
        let cx = el.plain_attr("cx").and_then(|v| v.trim().parse::<i64>().ok());
        let cy = el.plain_attr("cy").and_then(|v| v.trim().parse::<i64>().ok());
        let (Some(cx), Some(cy)) = (cx, cy) else {
            return;
        };
        log::debug!("Image found, size: {cx} x {cy}");
        if cx as f64 <= max_width {
            return;
        }
        let (new_cx, new_cy) = fit_extent(cx, cy, max_width);
        el.set_plain_attr("cx", new_cx.to_string());
        el.set_plain_attr("cy", new_cy.to_string());
        log::debug!("Resized to: {new_cx} x {new_cy}");
        scaled += 1;
    });
    scaled
}

/// String form of [`scale_images`] for a standalone `w:tc` fragment (which
/// must declare its own namespaces). Returns `None` when nothing needed
/// shrinking, so callers can leave the original XML untouched.
pub fn scale_cell_images(cell_xml: &str, max_width: f64) -> Result<Option<String>, Error> {
    let mut fragment = XmlDocument::parse(cell_xml)?;
    if scale_images(&mut fragment.root, max_width) == 0 {
        return Ok(None);
    }
    element_to_string(&fragment.root).map(Some)
}
