mod common;

use common::*;
use ooxml_postprocess::{DocxOptions, Error, Orientation, PaperSize, postprocess_docx};

const HEADER_FOOTER: &str = r#"<w:headerReference w:type="default" r:id="rId8"/><w:footerReference w:type="default" r:id="rId9"/>"#;

fn landscape_letter() -> &'static str {
    r#"<w:sectPr><w:pgSz w:w="15840" w:h="12240" w:orient="landscape"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr>"#
}

fn section_break(sect_pr: &str) -> String {
    format!("<w:p><w:pPr>{sect_pr}</w:pPr></w:p>")
}

fn process(body: &str, paper_size: Option<PaperSize>, orientation: Option<Orientation>) -> String {
    let options = DocxOptions {
        paper_size,
        orientation,
        ..DocxOptions::default()
    };
    let out = postprocess_docx(docx_with_body(body), &options).unwrap();
    read_part(&out, "word/document.xml")
}

/// `(w, h, orient)` of every `w:pgSz`, in document order.
fn page_sizes(xml: &str) -> Vec<(u32, u32, Option<String>)> {
    let doc = roxmltree::Document::parse(xml).unwrap();
    w_all(doc.root_element(), "pgSz")
        .map(|n| {
            (
                w_attr(n, "w").unwrap().parse().unwrap(),
                w_attr(n, "h").unwrap().parse().unwrap(),
                w_attr(n, "orient").map(str::to_string),
            )
        })
        .collect()
}

/// Local names of the children of every `w:sectPr`, in document order.
fn sect_pr_children(xml: &str) -> Vec<Vec<String>> {
    let doc = roxmltree::Document::parse(xml).unwrap();
    w_all(doc.root_element(), "sectPr")
        .map(|s| {
            s.children()
                .filter(|n| n.is_element())
                .map(|n| n.tag_name().name().to_string())
                .collect()
        })
        .collect()
}

#[test]
fn paper_size_keeps_landscape_section_landscape() {
    init_logging();
    let xml = process(landscape_letter(), Some(PaperSize::A4), None);
    assert_eq!(
        page_sizes(&xml),
        [(16838, 11906, Some("landscape".to_string()))]
    );
}

#[test]
fn paper_size_on_portrait_section() {
    let xml = process(&sect_pr(12240, 15840, 1440, ""), Some(PaperSize::Legal), None);
    assert_eq!(page_sizes(&xml), [(12240, 20160, None)]);
}

#[test]
fn landscape_orientation_swaps_and_marks() {
    let xml = process(
        &sect_pr(12240, 15840, 1440, ""),
        None,
        Some(Orientation::Landscape),
    );
    assert_eq!(
        page_sizes(&xml),
        [(15840, 12240, Some("landscape".to_string()))]
    );
}

#[test]
fn portrait_orientation_removes_attribute() {
    let xml = process(
        landscape_letter(),
        Some(PaperSize::A4),
        Some(Orientation::Portrait),
    );
    assert_eq!(page_sizes(&xml), [(11906, 16838, None)]);
}

#[test]
fn orientation_already_satisfied_is_stable() {
    let xml = process(landscape_letter(), None, Some(Orientation::Landscape));
    assert_eq!(
        page_sizes(&xml),
        [(15840, 12240, Some("landscape".to_string()))]
    );
}

#[test]
fn no_options_leave_geometry_alone() {
    let xml = process(landscape_letter(), None, None);
    assert_eq!(
        page_sizes(&xml),
        [(15840, 12240, Some("landscape".to_string()))]
    );
    assert_eq!(sect_pr_children(&xml), [["pgSz", "pgMar"]]);
}

#[test]
fn every_section_is_normalized() {
    let input = format!(
        "{}{}{}",
        section_break(landscape_letter()),
        para("second"),
        sect_pr(12240, 15840, 1440, "")
    );
    let xml = process(&input, Some(PaperSize::A5), None);
    assert_eq!(
        page_sizes(&xml),
        [
            (11906, 8419, Some("landscape".to_string())),
            (8419, 11906, None)
        ]
    );
}

#[test]
fn missing_page_size_is_created_in_place() {
    let input = format!(
        r#"<w:sectPr>{HEADER_FOOTER}<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr>"#
    );
    let xml = process(&input, Some(PaperSize::A4), None);
    assert_eq!(page_sizes(&xml), [(11906, 16838, None)]);
    assert_eq!(
        sect_pr_children(&xml),
        [["headerReference", "footerReference", "pgSz", "pgMar"]]
    );

    let xml = process(&input, None, Some(Orientation::Landscape));
    assert_eq!(
        page_sizes(&xml),
        [(15840, 12240, Some("landscape".to_string()))]
    );
}

#[test]
fn header_footer_references_move_to_first_section() {
    let input = format!(
        "{}{}{}{}{}",
        section_break(&sect_pr(12240, 15840, 1440, "")),
        para("middle"),
        section_break(&sect_pr(15840, 12240, 1440, "")),
        para("last"),
        format!(
            r#"<w:sectPr>{HEADER_FOOTER}<w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:left="1440" w:right="1440"/><w:titlePg/></w:sectPr>"#
        )
    );
    let xml = process(&input, None, None);

    assert_eq!(
        sect_pr_children(&xml),
        [
            vec!["headerReference", "footerReference", "pgSz", "pgMar", "titlePg"],
            vec!["pgSz", "pgMar"],
            vec!["pgSz", "pgMar"],
        ]
    );
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let first = w_all(doc.root_element(), "sectPr").next().unwrap();
    let header = w(first, "headerReference").unwrap();
    assert_eq!(
        header.attribute((
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
            "id"
        )),
        Some("rId8")
    );
}

#[test]
fn first_section_with_references_blocks_migration() {
    let input = format!(
        "{}{}",
        section_break(&sect_pr(12240, 15840, 1440, r#"<w:headerReference w:type="first" r:id="rId7"/>"#)),
        sect_pr(12240, 15840, 1440, HEADER_FOOTER)
    );
    let xml = process(&input, None, None);
    assert_eq!(
        sect_pr_children(&xml),
        [
            vec!["headerReference", "pgSz", "pgMar"],
            vec!["headerReference", "footerReference", "pgSz", "pgMar"],
        ]
    );
}

#[test]
fn single_section_is_not_migrated() {
    let xml = process(&sect_pr(12240, 15840, 1440, HEADER_FOOTER), None, None);
    assert_eq!(
        sect_pr_children(&xml),
        [["headerReference", "footerReference", "pgSz", "pgMar"]]
    );
}

#[test]
fn invalid_names_are_configuration_errors() {
    let err = DocxOptions::from_names(Some("A9"), None).unwrap_err();
    assert!(err.is_invalid_configuration());
    assert!(matches!(err, Error::UnsupportedPaperSize(ref name) if name == "A9"));
    let message = err.to_string();
    assert!(message.contains("A4"), "{message}");
    assert!(message.contains("JIS_B5"), "{message}");

    let err = DocxOptions::from_names(None, Some("sideways")).unwrap_err();
    assert!(err.is_invalid_configuration());

    let ok = DocxOptions::from_names(Some("letter"), Some("LANDSCAPE")).unwrap();
    assert_eq!(ok.paper_size, Some(PaperSize::Letter));
    assert_eq!(ok.orientation, Some(Orientation::Landscape));
}

#[test]
fn invalid_paper_name_produces_no_output() {
    let dir = std::env::temp_dir().join(format!("ooxml-postprocess-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("in.docx");
    let output = dir.join("out.docx");
    std::fs::write(&input, docx_with_body(&para("x"))).unwrap();

    let result = DocxOptions::from_names(Some("Tabloid"), None).and_then(|options| {
        ooxml_postprocess::postprocess_file(&input, &output, &options, &Default::default())
    });
    assert!(result.is_err());
    assert!(!output.exists());
    std::fs::remove_dir_all(&dir).unwrap();
}
