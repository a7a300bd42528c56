mod docx;
mod error;
pub mod geometry;
mod model;
mod package;
mod pptx;
pub mod xml;

pub use docx::{
    CaptionKind, FieldKind, ReferenceReport, fit_extent, migrate_header_footer_references,
    normalize_document_tables, normalize_sections, normalize_table, scale_cell_images,
    scale_images, synthesize_references,
};
pub use error::Error;
pub use model::{DocxOptions, Orientation, PaperSize, PptxOptions, SlideSize, TocStrategy};
pub use pptx::apply_slide_size;

use std::path::Path;

/// Full DOCX pass: section geometry, header/footer migration, full-width
/// tables with fitted images, captions and TOC fields.
pub fn postprocess_docx(bytes: Vec<u8>, options: &DocxOptions) -> Result<Vec<u8>, Error> {
    docx::postprocess(bytes, options)
}

/// PPTX pass: slide size only.
pub fn postprocess_pptx(bytes: Vec<u8>, options: &PptxOptions) -> Result<Vec<u8>, Error> {
    pptx::postprocess(bytes, options)
}

/// Processes `input` into `output` (which may be the same path), choosing the
/// pass from the input's extension.
pub fn postprocess_file(
    input: &Path,
    output: &Path,
    docx_options: &DocxOptions,
    pptx_options: &PptxOptions,
) -> Result<(), Error> {
    let bytes = std::fs::read(input)?;
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let out = match extension.as_deref() {
        Some("docx") => postprocess_docx(bytes, docx_options)?,
        Some("pptx") => postprocess_pptx(bytes, pptx_options)?,
        _ => {
            return Err(Error::InvalidPackage(format!(
                "unsupported file type: {}",
                input.display()
            )));
        }
    };
    std::fs::write(output, out).map_err(Error::Io)
}
