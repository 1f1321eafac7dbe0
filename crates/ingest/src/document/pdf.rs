use std::borrow::Cow;

use super::ExtractionError;

pub fn extract_pdf(bytes: &[u8]) -> Result<(String, usize), ExtractionError> {
    // pdf-extract panics on some malformed files instead of returning an error.
    let raw = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| ExtractionError::Pdf("malformed PDF".into()))?
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    assemble(&raw)
}

/// pdf-extract returns all text as one string with pages separated by form
/// feeds (`\x0C`). Each line is treated as a text run: percent-decoded, then
/// joined with single spaces. Pages are joined with a blank line.
fn assemble(raw: &str) -> Result<(String, usize), ExtractionError> {
    let pages: Vec<String> = raw
        .split('\x0C')
        .map(|page| {
            page.lines()
                .map(str::trim)
                .filter(|run| !run.is_empty())
                .map(decode_run)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|page| !page.is_empty())
        .collect();

    let text = pages.join("\n\n");
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyExtraction);
    }
    Ok((text, pages.len()))
}

/// Some producers percent-encode text runs. Runs that don't decode to
/// valid UTF-8 are kept verbatim.
fn decode_run(run: &str) -> Cow<'_, str> {
    if !run.contains('%') {
        return Cow::Borrowed(run);
    }
    urlencoding::decode(run).unwrap_or(Cow::Borrowed(run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures;

    fn squash(text: &str) -> String {
        text.split_whitespace().collect::<String>().to_lowercase()
    }

    #[test]
    fn real_pdf_pages_are_extracted() {
        let bytes = fixtures::pdf(&["Thermodynamics", "Entropy"]);
        let (text, _) = extract_pdf(&bytes).unwrap();
        let squashed = squash(&text);
        assert!(squashed.contains("thermodynamics"), "got {text:?}");
        assert!(squashed.contains("entropy"), "got {text:?}");
    }

    #[test]
    fn corrupt_pdf_is_an_extraction_error() {
        let err = extract_pdf(b"%PDF-1.4\nthis is not a pdf body").unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_) | ExtractionError::EmptyExtraction));

        let bytes = fixtures::pdf(&["Thermodynamics"]);
        let err = extract_pdf(&bytes[..bytes.len() / 3]).unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_) | ExtractionError::EmptyExtraction));
    }

    #[test]
    fn joins_runs_with_spaces_and_pages_with_blank_line() {
        let (text, pages) = assemble("Chapter 1\nHeat\x0CChapter 2\n  Work  \n").unwrap();
        assert_eq!(text, "Chapter 1 Heat\n\nChapter 2 Work");
        assert_eq!(pages, 2);
    }

    #[test]
    fn percent_encoded_runs_are_decoded() {
        let (text, _) = assemble("%C3%89nergie%20cin%C3%A9tique").unwrap();
        assert_eq!(text, "Énergie cinétique");
    }

    #[test]
    fn undecodable_runs_fall_back_to_raw() {
        let (text, _) = assemble("100%FF sure").unwrap();
        assert_eq!(text, "100%FF sure");
    }

    #[test]
    fn blank_pages_are_empty_extraction() {
        let err = assemble("  \n\x0C\n \x0C").unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyExtraction));
    }
}
