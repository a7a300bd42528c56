use crate::error::Error;
use crate::model::{PptxOptions, SlideSize};
use crate::package::Package;
use crate::xml::{Element, Node, P};

const DEFAULT_MAIN_PART: &str = "ppt/presentation.xml";

/// `p:presentation` children that precede `p:sldSz`.
const BEFORE_SLD_SZ: &[&str] = &[
    "sldMasterIdLst",
    "notesMasterIdLst",
    "handoutMasterIdLst",
    "sldIdLst",
];

/// Overwrites the slide width/height declared on `p:presentation`. Other
/// `p:sldSz` attributes are kept.
pub fn apply_slide_size(presentation: &mut Element, size: SlideSize) {
    let index = presentation
        .children
        .iter()
        .rposition(|node| {
            matches!(node, Node::Element(el)
                if BEFORE_SLD_SZ.iter().any(|name| el.is(P, name)))
        })
        .map_or(0, |idx| idx + 1);
    let sld_sz = presentation.child_or_insert(P, "sldSz", index);

    let (cx, cy) = size.emu();
    sld_sz.set_plain_attr("cx", cx.to_string());
    sld_sz.set_plain_attr("cy", cy.to_string());
    log::debug!("Applied slide size {}: {cx} x {cy} EMU", size.name());
}

/// Applies the requested slide size. Without one the input bytes are returned
/// untouched.
pub fn postprocess(bytes: Vec<u8>, options: &PptxOptions) -> Result<Vec<u8>, Error> {
    let Some(size) = options.slide_size else {
        log::debug!("No slide size requested, presentation passed through");
        return Ok(bytes);
    };

    let mut package = Package::open(bytes)?;
    let main = package.main_part(DEFAULT_MAIN_PART)?;
    let presentation = package.part_mut(&main)?;
    if !presentation.root.is(P, "presentation") {
        return Err(Error::InvalidPackage(format!("{main} is not a presentation part")));
    }
    apply_slide_size(&mut presentation.root, size);
    package.save()
}
