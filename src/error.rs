use std::fmt;

#[derive(Debug)]
pub enum Error {
    InvalidPackage(String),
    Zip(zip::result::ZipError),
    Xml(quick_xml::Error),
    Io(std::io::Error),
    UnsupportedPaperSize(String),
    UnsupportedSlideSize(String),
    InvalidOrientation(String),
}

impl Error {
    /// True for errors caused by caller-supplied options rather than the package.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedPaperSize(_)
                | Error::UnsupportedSlideSize(_)
                | Error::InvalidOrientation(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPackage(reason) => write!(f, "not a valid OOXML package: {reason}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Xml(e) => write!(f, "XML error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::UnsupportedPaperSize(name) => write!(
                f,
                "unsupported paper size: {name} (supported: {})",
                crate::model::PaperSize::names().join(", ")
            ),
            Error::UnsupportedSlideSize(name) => write!(
                f,
                "unsupported slide size: {name} (supported: {})",
                crate::model::SlideSize::names().join(", ")
            ),
            Error::InvalidOrientation(value) => {
                write!(f, "invalid orientation: {value} (expected portrait or landscape)")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e)
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(e.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
