use crate::geometry::{apply_orientation, paper_dimensions};
use crate::model::{Orientation, PaperSize};
use crate::xml::{Element, Node, W};

use super::{sect_pr_at, sect_pr_at_mut, section_anchors, twips_attr};

const LETTER_PORTRAIT: (u32, u32) = (12240, 15840);

/// Child order of `w:sectPr`. Header and footer references share a rank
/// because they may interleave.
const SECT_PR_ORDER: &[&str] = &[
    "headerReference",
    "footnotePr",
    "endnotePr",
    "type",
    "pgSz",
    "pgMar",
    "paperSrc",
    "pgBorders",
    "lnNumType",
    "pgNumType",
    "cols",
    "formProt",
    "vAlign",
    "noEndnote",
    "titlePg",
    "textDirection",
    "bidi",
    "rtlGutter",
    "docGrid",
    "printerSettings",
    "sectPrChange",
];

fn sect_pr_rank(local: &str) -> Option<usize> {
    let local = if local == "footerReference" { "headerReference" } else { local };
    SECT_PR_ORDER.iter().position(|name| *name == local)
}

/// Index in `sect_pr.children` where a new `local` element belongs.
fn schema_index(sect_pr: &Element, local: &str) -> usize {
    let Some(rank) = sect_pr_rank(local) else {
        return sect_pr.children.len();
    };
    sect_pr
        .children
        .iter()
        .position(|node| match node {
            Node::Element(el) => {
                el.namespace.as_deref() == Some(W.uri)
                    && sect_pr_rank(el.local_name()).is_some_and(|r| r > rank)
            }
            _ => false,
        })
        .unwrap_or(sect_pr.children.len())
}

fn is_header_footer_reference(el: &Element) -> bool {
    el.is(W, "headerReference") || el.is(W, "footerReference")
}

fn normalize_page_size(
    sect_pr: &mut Element,
    paper_size: Option<PaperSize>,
    orientation: Option<Orientation>,
) {
    let index = schema_index(sect_pr, "pgSz");
    let pg_sz = sect_pr.child_or_insert(W, "pgSz", index);

    let mut width = twips_attr(pg_sz, "w")
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(LETTER_PORTRAIT.0);
    let mut height = twips_attr(pg_sz, "h")
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(LETTER_PORTRAIT.1);
    let was_landscape = pg_sz.attr(W, "orient") == Some("landscape");

    if let Some(size) = paper_size {
        // Without an explicit orientation the section keeps its own; the
        // orient attribute is left as it was.
        (width, height) = paper_dimensions(size, None, was_landscape);
        log::debug!("Applied paper size {}: {width} x {height} twips", size.name());
    }

    if let Some(orientation) = orientation {
        let (w, h, swapped) = apply_orientation(width, height, orientation.is_landscape());
        (width, height) = (w, h);
        if orientation.is_landscape() {
            pg_sz.set_attr(W, "orient", "landscape");
        } else {
            // Portrait is expressed by the attribute's absence.
            pg_sz.remove_attr(W, "orient");
        }
        log::debug!("Applied orientation {orientation:?} (swapped: {swapped})");
    }

    pg_sz.set_attr(W, "w", width.to_string());
    pg_sz.set_attr(W, "h", height.to_string());
}

/// Applies paper size and/or orientation to every section. No-op when both
/// are `None`. Returns the number of sections touched.
pub fn normalize_sections(
    body: &mut Element,
    paper_size: Option<PaperSize>,
    orientation: Option<Orientation>,
) -> usize {
    if paper_size.is_none() && orientation.is_none() {
        return 0;
    }
    let mut count = 0;
    for anchor in section_anchors(body) {
        if let Some(sect_pr) = sect_pr_at_mut(body, anchor) {
            normalize_page_size(sect_pr, paper_size, orientation);
            count += 1;
        }
    }
    log::info!(
        "Normalized page geometry of {count} sections (paper: {}, orientation: {:?})",
        paper_size.map_or("unchanged", PaperSize::name),
        orientation,
    );
    count
}

/// With several sections and none of the header/footer references on the
/// first one, moves the references (and `w:titlePg`) of the last section to
/// the first. Later sections then inherit them through the usual
/// nearest-preceding-section rule. Returns true when references moved.
pub fn migrate_header_footer_references(body: &mut Element) -> bool {
    let anchors = section_anchors(body);
    let (Some(&first), Some(&last)) = (anchors.first(), anchors.last()) else {
        return false;
    };
    if first == last {
        return false;
    }
    let first_has_refs = sect_pr_at(body, first)
        .is_some_and(|s| s.elements().any(is_header_footer_reference));
    if first_has_refs {
        return false;
    }

    let Some(last_sect) = sect_pr_at_mut(body, last) else {
        return false;
    };
    if !last_sect.elements().any(is_header_footer_reference) {
        return false;
    }
    let references = last_sect.remove_children_where(is_header_footer_reference);
    let title_pg = last_sect.remove_children_named(W, "titlePg").into_iter().next();

    let Some(first_sect) = sect_pr_at_mut(body, first) else {
        return false;
    };
    let moved = references.len();
    for (i, reference) in references.into_iter().enumerate() {
        first_sect.insert_child(i, reference);
    }
    if let Some(title_pg) = title_pg {
        first_sect.remove_children_named(W, "titlePg");
        let index = schema_index(first_sect, "titlePg");
        first_sect.insert_child(index, title_pg);
    }

    log::info!("Moved {moved} header/footer references from the last section to the first");
    true
}
