mod images;
mod references;
mod sections;
mod tables;

pub use images::{fit_extent, scale_cell_images, scale_images};
pub use references::{
    CaptionKind, FieldKind, ReferenceReport, enable_auto_update_fields, synthesize_references,
};
pub use sections::{migrate_header_footer_references, normalize_sections};
pub use tables::{normalize_document_tables, normalize_table};

use std::time::Instant;

use crate::error::Error;
use crate::geometry::{PageGeometry, twips_to_emu};
use crate::model::DocxOptions;
use crate::package::Package;
use crate::xml::{Element, Node, W, XmlDocument};

const DEFAULT_MAIN_PART: &str = "word/document.xml";

pub(crate) fn wml<'a>(node: &'a Element, name: &str) -> Option<&'a Element> {
    node.child(W, name)
}

pub(crate) fn wml_attr<'a>(node: &'a Element, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attr(W, "val"))
}

pub(crate) fn twips_attr(node: &Element, attr: &str) -> Option<i64> {
    node.attr(W, attr).and_then(|v| v.trim().parse::<i64>().ok())
}

/// Concatenated `w:t` text of a paragraph, including runs nested in hyperlinks.
pub(crate) fn paragraph_text(para: &Element) -> String {
    para.descendants_named(W, "t").map(Element::own_text).collect()
}

pub(crate) fn paragraph_style(para: &Element) -> Option<&str> {
    wml(para, "pPr").and_then(|ppr| wml_attr(ppr, "pStyle"))
}

/// A paragraph whose properties carry a `w:sectPr` ends a section.
pub(crate) fn is_section_break(node: &Element) -> bool {
    node.is(W, "p") && wml(node, "pPr").and_then(|ppr| wml(ppr, "sectPr")).is_some()
}

pub(crate) fn body_mut(doc: &mut XmlDocument) -> Result<&mut Element, Error> {
    doc.root
        .child_mut(W, "body")
        .ok_or_else(|| Error::InvalidPackage("Missing w:body".into()))
}

/// Body child indices of every section in document order: section-break
/// paragraphs first, then the body-level `w:sectPr`.
pub(crate) fn section_anchors(body: &Element) -> Vec<usize> {
    body.children
        .iter()
        .enumerate()
        .filter_map(|(idx, node)| match node {
            Node::Element(el) if is_section_break(el) || el.is(W, "sectPr") => Some(idx),
            _ => None,
        })
        .collect()
}

pub(crate) fn sect_pr_at(body: &Element, anchor: usize) -> Option<&Element> {
    match body.children.get(anchor)? {
        Node::Element(el) if el.is(W, "sectPr") => Some(el),
        Node::Element(el) if el.is(W, "p") => wml(el, "pPr").and_then(|ppr| wml(ppr, "sectPr")),
        _ => None,
    }
}

pub(crate) fn sect_pr_at_mut(body: &mut Element, anchor: usize) -> Option<&mut Element> {
    let Node::Element(el) = body.children.get_mut(anchor)? else {
        return None;
    };
    if el.is(W, "sectPr") {
        return Some(el);
    }
    if !el.is(W, "p") {
        return None;
    }
    el.child_mut(W, "pPr")
        .and_then(|ppr| ppr.child_mut(W, "sectPr"))
}

pub(crate) fn section_geometry(sect_pr: Option<&Element>) -> PageGeometry {
    let pg_sz = sect_pr.and_then(|s| wml(s, "pgSz"));
    let pg_mar = sect_pr.and_then(|s| wml(s, "pgMar"));
    PageGeometry {
        width: pg_sz.and_then(|n| twips_attr(n, "w")).map(twips_to_emu),
        left_margin: pg_mar.and_then(|n| twips_attr(n, "left")).map(twips_to_emu),
        right_margin: pg_mar.and_then(|n| twips_attr(n, "right")).map(twips_to_emu),
    }
}

/// Runs every DOCX pass over one package: sections, tables (with image
/// fitting), then caption and TOC synthesis. Any parse failure aborts the
/// whole pass and no output is produced.
pub fn postprocess(bytes: Vec<u8>, options: &DocxOptions) -> Result<Vec<u8>, Error> {
    let t0 = Instant::now();

    let mut package = Package::open(bytes)?;
    let main = package.main_part(DEFAULT_MAIN_PART)?;
    let t_open = t0.elapsed();

    let report = {
        let body = body_mut(package.part_mut(&main)?)?;
        migrate_header_footer_references(body);
        normalize_sections(body, options.paper_size, options.orientation);
        normalize_document_tables(body);
        references::synthesize_in_body(body, options.toc_strategy)
    };
    let t_passes = t0.elapsed();

    if report.emitted_fields() {
        enable_auto_update_fields(&mut package, &main);
    }

    let out = package.save()?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: open={:.1}ms, passes={:.1}ms, save={:.1}ms, total={:.1}ms (output {} bytes)",
        t_open.as_secs_f64() * 1000.0,
        (t_passes - t_open).as_secs_f64() * 1000.0,
        (t_total - t_passes).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        out.len(),
    );

    Ok(out)
}
