use std::str::FromStr;

use crate::error::Error;

/// Named paper sizes, portrait dimensions in twips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaperSize {
    A5,
    A4,
    A3,
    B5,
    B4,
    JisB5,
    JisB4,
    Letter,
    Legal,
    Ledger,
}

// Indexed by discriminant; keep in declaration order.
const PAPER_SIZES: &[(PaperSize, &str, u32, u32)] = &[
    (PaperSize::A5, "A5", 8419, 11906),
    (PaperSize::A4, "A4", 11906, 16838),
    (PaperSize::A3, "A3", 16838, 23811),
    (PaperSize::B5, "B5", 9979, 14144),
    (PaperSize::B4, "B4", 14144, 20013),
    (PaperSize::JisB5, "JIS_B5", 10319, 14572),
    (PaperSize::JisB4, "JIS_B4", 14572, 20639),
    (PaperSize::Letter, "Letter", 12240, 15840),
    (PaperSize::Legal, "Legal", 12240, 20160),
    (PaperSize::Ledger, "Ledger", 15840, 24480),
];

impl PaperSize {
    fn entry(self) -> &'static (PaperSize, &'static str, u32, u32) {
        &PAPER_SIZES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    /// Portrait `(width, height)` in twips.
    pub fn portrait_twips(self) -> (u32, u32) {
        let (_, _, w, h) = *self.entry();
        (w, h)
    }

    pub fn names() -> Vec<&'static str> {
        PAPER_SIZES.iter().map(|(_, name, ..)| *name).collect()
    }
}

impl FromStr for PaperSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PAPER_SIZES
            .iter()
            .find(|(_, name, ..)| name.eq_ignore_ascii_case(wanted))
            .map(|(size, ..)| *size)
            .ok_or_else(|| Error::UnsupportedPaperSize(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn is_landscape(self) -> bool {
        self == Orientation::Landscape
    }
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            _ => Err(Error::InvalidOrientation(s.to_string())),
        }
    }
}

/// Named slide sizes, `(cx, cy)` in EMU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlideSize {
    Ratio16x9,
    Widescreen,
    Ratio4x3,
    Letter,
    Ledger,
    A4,
    A3,
}

// Indexed by discriminant. Values are inches * 914400, truncated.
const SLIDE_SIZES: &[(SlideSize, &str, i64, i64)] = &[
    (SlideSize::Ratio16x9, "16:9", 9_144_000, 5_148_072),
    (SlideSize::Widescreen, "WIDESCREEN", 12_188_952, 6_858_000),
    (SlideSize::Ratio4x3, "4:3", 9_144_000, 6_858_000),
    (SlideSize::Letter, "LETTER", 9_144_000, 6_858_000),
    (SlideSize::Ledger, "LEDGER", 12_191_695, 9_144_000),
    (SlideSize::A4, "A4", 9_905_695, 6_858_000),
    (SlideSize::A3, "A3", 12_801_600, 9_601_200),
];

impl SlideSize {
    fn entry(self) -> &'static (SlideSize, &'static str, i64, i64) {
        &SLIDE_SIZES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn emu(self) -> (i64, i64) {
        let (_, _, cx, cy) = *self.entry();
        (cx, cy)
    }

    pub fn names() -> Vec<&'static str> {
        SLIDE_SIZES.iter().map(|(_, name, ..)| *name).collect()
    }
}

impl FromStr for SlideSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SLIDE_SIZES
            .iter()
            .find(|(_, name, ..)| name.eq_ignore_ascii_case(wanted))
            .map(|(size, ..)| *size)
            .ok_or_else(|| Error::UnsupportedSlideSize(s.to_string()))
    }
}

/// How Table-of-Contents insertion sites are located. Only one runs per pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TocStrategy {
    /// Paragraphs whose whole text is `TOC_PLACEHOLDER`, `TOF_PLACEHOLDER` or `TOT_PLACEHOLDER`.
    #[default]
    Placeholders,
    /// Contiguous runs of paragraphs holding internal hyperlinks to headings or captions.
    HyperlinkClusters,
}

impl FromStr for TocStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholders" => Ok(TocStrategy::Placeholders),
            "hyperlinks" | "hyperlink-clusters" => Ok(TocStrategy::HyperlinkClusters),
            other => Err(format!("unknown TOC strategy: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DocxOptions {
    pub paper_size: Option<PaperSize>,
    pub orientation: Option<Orientation>,
    pub toc_strategy: TocStrategy,
}

impl DocxOptions {
    /// Builds options from the loosely typed names a service receives.
    pub fn from_names(paper_size: Option<&str>, orientation: Option<&str>) -> Result<Self, Error> {
        Ok(DocxOptions {
            paper_size: paper_size.map(str::parse).transpose()?,
            orientation: orientation.map(str::parse).transpose()?,
            toc_strategy: TocStrategy::default(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PptxOptions {
    pub slide_size: Option<SlideSize>,
}

impl PptxOptions {
    pub fn from_name(slide_size: Option<&str>) -> Result<Self, Error> {
        Ok(PptxOptions {
            slide_size: slide_size.map(str::parse).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_lookup_is_case_insensitive() {
        assert_eq!("a4".parse::<PaperSize>().unwrap(), PaperSize::A4);
        assert_eq!("jis_b5".parse::<PaperSize>().unwrap(), PaperSize::JisB5);
        assert_eq!("LETTER".parse::<PaperSize>().unwrap(), PaperSize::Letter);
        assert_eq!(PaperSize::Ledger.portrait_twips(), (15840, 24480));
    }

    #[test]
    fn unknown_paper_is_configuration_error() {
        let err = "A0".parse::<PaperSize>().unwrap_err();
        assert!(err.is_invalid_configuration());
        assert!(err.to_string().contains("JIS_B4"));
    }

    #[test]
    fn slide_lookup() {
        assert_eq!("widescreen".parse::<SlideSize>().unwrap().emu(), (12_188_952, 6_858_000));
        assert_eq!("16:9".parse::<SlideSize>().unwrap().emu(), (9_144_000, 5_148_072));
        assert!("5:4".parse::<SlideSize>().is_err());
    }

    #[test]
    fn options_from_names() {
        let opts = DocxOptions::from_names(Some("a3"), Some("Landscape")).unwrap();
        assert_eq!(opts.paper_size, Some(PaperSize::A3));
        assert_eq!(opts.orientation, Some(Orientation::Landscape));
        assert!(DocxOptions::from_names(None, Some("sideways")).is_err());
        assert!(PptxOptions::from_name(None).unwrap().slide_size.is_none());
    }
}
