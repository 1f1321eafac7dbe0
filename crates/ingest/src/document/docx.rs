use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractionError;

const BODY_ENTRY: &str = "word/document.xml";

/// Raw text of a Word document, formatting discarded. Paragraphs end with a
/// blank line; tabs and breaks are kept.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(BODY_ENTRY)?.read_to_string(&mut xml)?;
    raw_text(&xml)
}

fn raw_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push_str("\n\n"),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                b"w:p" => out.push_str("\n\n"),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures;

    #[test]
    fn paragraphs_are_separated_by_blank_lines() {
        let bytes = fixtures::docx(&["Chapter 1: Heat", "Energy is conserved."]);
        let text = extract_docx(&bytes).unwrap();
        assert_eq!(text, "Chapter 1: Heat\n\nEnergy is conserved.\n\n");
    }

    #[test]
    fn entities_are_unescaped_and_markup_dropped() {
        let xml = r#"<w:document><w:body><w:p><w:r><w:rPr><w:b/></w:rPr><w:t>a &lt; b</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> &amp; c</w:t></w:r></w:p></w:body></w:document>"#;
        assert_eq!(raw_text(xml).unwrap(), "a < b\t & c\n\n");
    }

    #[test]
    fn missing_body_is_archive_error() {
        let bytes = fixtures::archive(&[("other.xml", "<x/>")]);
        let err = extract_docx(&bytes).unwrap_err();
        assert!(matches!(err, ExtractionError::Archive(_)));
    }
}
