//! Caption styling, TC entries and TOC / list-of-figures / list-of-tables fields.
//!
//! The pass works on the direct children of `w:body`, addressed by their index
//! in the children vector. Replacement sites are collected first and applied in
//! descending index order so earlier indices stay valid while paragraphs are
//! removed and field blocks inserted. Every paragraph ends the pass unchanged,
//! restyled as a caption, or replaced by a field; never more than one of these.

use std::collections::HashSet;

use crate::error::Error;
use crate::model::TocStrategy;
use crate::package::{Package, REL_SETTINGS};
use crate::xml::{Element, Node, W, XML, XmlDocument};

use super::{body_mut, is_section_break, paragraph_style, paragraph_text};

const CAPTION_STYLE: &str = "Caption";
/// Styles a placeholder paragraph may carry; headings never qualify.
const PLACEHOLDER_STYLES: &[&str] = &["BodyText", "FirstParagraph"];

const TOC_PLACEHOLDER: &str = "TOC_PLACEHOLDER";
const TOF_PLACEHOLDER: &str = "TOF_PLACEHOLDER";
const TOT_PLACEHOLDER: &str = "TOT_PLACEHOLDER";

const HEADING_ANCHOR_PREFIX: &str = "_Toc";
const FIGURE_ANCHOR_PREFIX: &str = "fig";
const TABLE_ANCHOR_PREFIX: &str = "tbl";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptionKind {
    Figure,
    Table,
}

impl CaptionKind {
    fn classify(text: &str) -> Option<Self> {
        if text.starts_with("Figure") {
            Some(CaptionKind::Figure)
        } else if text.starts_with("Table") {
            Some(CaptionKind::Table)
        } else {
            None
        }
    }

    pub fn flag(self) -> char {
        match self {
            CaptionKind::Figure => 'F',
            CaptionKind::Table => 'T',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Contents,
    Figures,
    Tables,
}

impl FieldKind {
    pub fn instruction(self) -> String {
        match self {
            FieldKind::Contents => r#"TOC \o "1-3" \h \z \u"#.to_string(),
            FieldKind::Figures => listing_instruction(CaptionKind::Figure),
            FieldKind::Tables => listing_instruction(CaptionKind::Table),
        }
    }
}

fn listing_instruction(kind: CaptionKind) -> String {
    format!(r"TOC \h \z \f {}", kind.flag())
}

/// What the pass found and changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceReport {
    pub figures: Vec<String>,
    pub tables: Vec<String>,
    /// Fields inserted, in document order.
    pub inserted: Vec<FieldKind>,
    /// Body paragraphs removed as placeholders or link clusters.
    pub removed: usize,
}

impl ReferenceReport {
    pub fn emitted_fields(&self) -> bool {
        !self.figures.is_empty() || !self.tables.is_empty() || !self.inserted.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Site {
    start: usize,
    end: usize,
    field: FieldKind,
}

impl Site {
    fn single(idx: usize, field: FieldKind) -> Self {
        Site { start: idx, end: idx, field }
    }
}

fn field_char_run(kind: &str) -> Element {
    Element::new(W, "r").with_child(Element::new(W, "fldChar").with_attr(W, "fldCharType", kind))
}

fn instr_run(code: &str) -> Element {
    Element::new(W, "r").with_child(
        Element::new(W, "instrText")
            .with_attr(XML, "space", "preserve")
            .with_text(format!(" {code} ")),
    )
}

/// Begin / instruction / end runs of a TC entry for a caption.
pub(crate) fn tc_field_runs(caption: &str, kind: CaptionKind) -> [Element; 3] {
    [
        field_char_run("begin"),
        instr_run(&format!(r#"TC "{caption}" \f {} \l "1""#, kind.flag())),
        field_char_run("end"),
    ]
}

/// Field paragraph followed by an empty spacer paragraph.
pub(crate) fn field_block(field: FieldKind) -> [Element; 2] {
    let para = Element::new(W, "p")
        .with_child(field_char_run("begin"))
        .with_child(instr_run(&field.instruction()))
        .with_child(field_char_run("separate"))
        .with_child(field_char_run("end"));
    [para, Element::new(W, "p")]
}

fn apply_caption(para: &mut Element, caption: &str, kind: CaptionKind) {
    let ppr = para.child_or_insert(W, "pPr", 0);
    match ppr.child_mut(W, "pStyle") {
        Some(style) => style.set_attr(W, "val", CAPTION_STYLE),
        None => {
            ppr.insert_child(0, Element::new(W, "pStyle").with_attr(W, "val", CAPTION_STYLE))
        }
    }
    for run in tc_field_runs(caption, kind) {
        para.push_child(run);
    }
}

fn visit_paragraphs_mut<F: FnMut(&mut Element)>(el: &mut Element, f: &mut F) {
    if el.is(W, "p") {
        f(el);
    }
    for child in el.elements_mut() {
        visit_paragraphs_mut(child, f);
    }
}

/// Restyles every caption paragraph (at any depth) outside `skip` and appends
/// its TC entry.
fn process_captions(body: &mut Element, skip: &HashSet<usize>, report: &mut ReferenceReport) {
    for (idx, node) in body.children.iter_mut().enumerate() {
        if skip.contains(&idx) {
            continue;
        }
        let Node::Element(el) = node else { continue };
        visit_paragraphs_mut(el, &mut |para: &mut Element| {
            let text = paragraph_text(para);
            let caption = text.trim();
            let Some(kind) = CaptionKind::classify(caption) else {
                return;
            };
            apply_caption(para, caption, kind);
            log::debug!("Added {CAPTION_STYLE} style and TC field to {kind:?}: {caption}");
            match kind {
                CaptionKind::Figure => report.figures.push(caption.to_string()),
                CaptionKind::Table => report.tables.push(caption.to_string()),
            }
        });
    }
    log::info!(
        "Found {} figure captions and {} table captions",
        report.figures.len(),
        report.tables.len()
    );
}

fn find_placeholder_sites(body: &Element) -> Vec<Site> {
    let mut sites = Vec::new();
    for (idx, node) in body.children.iter().enumerate() {
        let Node::Element(para) = node else { continue };
        if !para.is(W, "p") || is_section_break(para) {
            continue;
        }
        if paragraph_style(para).is_some_and(|s| !PLACEHOLDER_STYLES.contains(&s)) {
            continue;
        }
        let field = match paragraph_text(para).trim() {
            TOC_PLACEHOLDER => FieldKind::Contents,
            TOF_PLACEHOLDER => FieldKind::Figures,
            TOT_PLACEHOLDER => FieldKind::Tables,
            _ => continue,
        };
        log::info!("Found {field:?} placeholder at index {idx}");
        sites.push(Site::single(idx, field));
    }
    sites
}

fn link_kind(para: &Element) -> Option<FieldKind> {
    para.descendants_named(W, "hyperlink")
        .filter_map(|link| link.attr(W, "anchor"))
        .find_map(|anchor| {
            if anchor.starts_with(HEADING_ANCHOR_PREFIX) {
                Some(FieldKind::Contents)
            } else if anchor.starts_with(FIGURE_ANCHOR_PREFIX) {
                Some(FieldKind::Figures)
            } else if anchor.starts_with(TABLE_ANCHOR_PREFIX) {
                Some(FieldKind::Tables)
            } else {
                None
            }
        })
}

fn is_blank(para: &Element) -> bool {
    paragraph_text(para).trim().is_empty()
        && para.descendants_named(W, "hyperlink").next().is_none()
}

/// Maximal runs of paragraphs linking to the same kind of target, with blank
/// paragraphs tolerated between (not around) them. Each run becomes one site
/// at the run's first index.
fn find_hyperlink_sites(body: &Element) -> Vec<Site> {
    let mut sites = Vec::new();
    let mut current: Option<Site> = None;

    for (idx, node) in body.children.iter().enumerate() {
        let Node::Element(el) = node else { continue };
        if el.is(W, "p") && !is_section_break(el) {
            if let Some(kind) = link_kind(el) {
                match current.as_mut() {
                    Some(site) if site.field == kind => site.end = idx,
                    _ => {
                        sites.extend(current.take());
                        current = Some(Site::single(idx, kind));
                    }
                }
                continue;
            }
            if is_blank(el) {
                continue;
            }
        }
        sites.extend(current.take());
    }
    sites.extend(current.take());

    for site in &sites {
        log::info!(
            "Found {:?} link cluster at indices {}..={}",
            site.field,
            site.start,
            site.end
        );
    }
    sites
}

fn replace_sites(body: &mut Element, mut sites: Vec<Site>, report: &mut ReferenceReport) {
    sites.sort_by(|a, b| b.start.cmp(&a.start));
    for site in sites {
        let removed = body
            .children
            .drain(site.start..=site.end)
            .filter(|n| matches!(n, Node::Element(_)))
            .count();
        report.removed += removed;
        log::debug!("Removed {removed} elements at index {}", site.start);

        let wanted = match site.field {
            FieldKind::Contents => true,
            FieldKind::Figures => !report.figures.is_empty(),
            FieldKind::Tables => !report.tables.is_empty(),
        };
        if !wanted {
            log::info!("Skipped {:?} field at index {}: no captions", site.field, site.start);
            continue;
        }
        for (offset, para) in field_block(site.field).into_iter().enumerate() {
            body.insert_child(site.start + offset, para);
        }
        report.inserted.push(site.field);
        log::info!("Inserted {:?} field at index {}", site.field, site.start);
    }
    report.inserted.reverse();
}

pub(crate) fn synthesize_in_body(body: &mut Element, strategy: TocStrategy) -> ReferenceReport {
    let mut report = ReferenceReport::default();

    let sites = match strategy {
        TocStrategy::Placeholders => find_placeholder_sites(body),
        TocStrategy::HyperlinkClusters => find_hyperlink_sites(body),
    };
    let claimed: HashSet<usize> = sites.iter().flat_map(|s| s.start..=s.end).collect();

    process_captions(body, &claimed, &mut report);
    replace_sites(body, sites, &mut report);
    report
}

/// Caption / TOC pass over a parsed `word/document.xml`, usable on its own.
pub fn synthesize_references(
    document: &mut XmlDocument,
    strategy: TocStrategy,
) -> Result<ReferenceReport, Error> {
    let body = body_mut(document)?;
    Ok(synthesize_in_body(body, strategy))
}

fn set_update_fields(package: &mut Package, main_part: &str) -> Result<(), Error> {
    let settings_part = package
        .related_part(main_part, REL_SETTINGS)?
        .ok_or_else(|| Error::InvalidPackage("document has no settings part".into()))?;
    let settings = package.part_mut(&settings_part)?;
    match settings.root.child_mut(W, "updateFields") {
        Some(update_fields) => {
            update_fields.set_attr(W, "val", "true");
            log::info!("Updated existing auto-update fields setting");
        }
        None => {
            settings
                .root
                .push_child(Element::new(W, "updateFields").with_attr(W, "val", "true"));
            log::info!("Enabled auto-update of fields on document open");
        }
    }
    Ok(())
}

/// Asks Word to refresh fields on open. Best effort: failures are logged and
/// the package is left as it was.
pub fn enable_auto_update_fields(package: &mut Package, main_part: &str) {
    if let Err(e) = set_update_fields(package, main_part) {
        log::warn!("Could not enable auto-update fields: {e}");
    }
}
