use crate::model::{Orientation, PaperSize};

pub const EMU_PER_INCH: i64 = 914_400;
pub const EMU_PER_TWIP: i64 = 635;
/// US Letter width, 8.5in.
pub const LETTER_WIDTH_EMU: i64 = 7_772_400;
pub const DEFAULT_SIDE_MARGIN_EMU: i64 = EMU_PER_INCH;

/// Horizontal page geometry of one section in EMU. `None` means the source
/// left the value unset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageGeometry {
    pub width: Option<i64>,
    pub left_margin: Option<i64>,
    pub right_margin: Option<i64>,
}

/// Saturates instead of overflowing on out-of-range measures.
pub fn twips_to_emu(twips: i64) -> i64 {
    twips.saturating_mul(EMU_PER_TWIP)
}

/// `page_width - left_margin - right_margin`, falling back to Letter width and
/// one-inch margins for unset (or zero) values.
pub fn available_content_width(page: &PageGeometry) -> i64 {
    let or_default = |v: Option<i64>, default: i64| v.filter(|v| *v != 0).unwrap_or(default);
    or_default(page.width, LETTER_WIDTH_EMU)
        .saturating_sub(or_default(page.left_margin, DEFAULT_SIDE_MARGIN_EMU))
        .saturating_sub(or_default(page.right_margin, DEFAULT_SIDE_MARGIN_EMU))
}

/// Page `(width, height)` in twips for a paper size. The portrait pair is
/// swapped when landscape is requested, or when nothing is requested and the
/// section is already landscape.
pub fn paper_dimensions(
    size: PaperSize,
    orientation: Option<Orientation>,
    section_landscape: bool,
) -> (u32, u32) {
    let (w, h) = size.portrait_twips();
    let landscape = orientation.map_or(section_landscape, Orientation::is_landscape);
    if landscape { (h, w) } else { (w, h) }
}

/// Swaps `width`/`height` only when their current landscape-ness disagrees
/// with `landscape`. The flag reports whether a swap happened.
pub fn apply_orientation(width: u32, height: u32, landscape: bool) -> (u32, u32, bool) {
    if (width > height) != landscape {
        (height, width, true)
    } else {
        (width, height, false)
    }
}
