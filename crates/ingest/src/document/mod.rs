mod docx;
mod pdf;
mod pptx;
mod txt;

use std::path::Path;

use examly_core::filename::extension_of;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("No text could be extracted from the file")]
    EmptyExtraction,
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("Could not read document archive: {0}")]
    Archive(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ExtractionError {
    fn from(e: zip::result::ZipError) -> Self {
        ExtractionError::Archive(e.to_string())
    }
}

impl From<quick_xml::Error> for ExtractionError {
    fn from(e: quick_xml::Error) -> Self {
        ExtractionError::Archive(format!("malformed markup: {e}"))
    }
}

/// Extensions accepted for upload, lower-cased with leading dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".ppt", ".pptx", ".txt"];

pub fn is_supported(file_name: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension_of(file_name).as_str())
}

/// Result of extracting text from a document.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Original filename.
    pub filename: String,
    /// Lower-cased extension with leading dot.
    pub file_type: String,
    /// Pages (pdf), slides (pptx) or 1 for flat formats.
    pub units: usize,
    pub text: String,
}

impl ExtractedDocument {
    pub fn total_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Extract text from file bytes, dispatching on the filename's extension.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let file_type = extension_of(filename);

    let (text, units) = match file_type.as_str() {
        ".pdf" => pdf::extract_pdf(bytes)?,
        ".doc" | ".docx" => (docx::extract_docx(bytes)?, 1),
        ".ppt" | ".pptx" => pptx::extract_pptx(bytes)?,
        ".txt" => (txt::extract_txt(bytes), 1),
        other => return Err(ExtractionError::UnsupportedFileType(other.to_string())),
    };

    tracing::debug!(file = filename, units, chars = text.len(), "extracted text");

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        file_type,
        units,
        text,
    })
}

/// Extract text from a file on local disk.
pub fn extract_file(path: &Path) -> Result<ExtractedDocument, ExtractionError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    // Reject before touching the disk.
    if !is_supported(&filename) {
        return Err(ExtractionError::UnsupportedFileType(extension_of(&filename)));
    }
    let bytes = std::fs::read(path)?;
    extract_text(&bytes, &filename)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_extension() {
        let err = extract_text(b"whatever", "notes.xyz").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFileType(ref e) if e == ".xyz"));
    }

    #[test]
    fn dispatch_is_case_insensitive() {
        let doc = extract_text(b"Energy", "NOTES.TXT").unwrap();
        assert_eq!(doc.file_type, ".txt");
        assert_eq!(doc.text, "Energy");
    }

    #[test]
    fn every_supported_format_yields_text() {
        let docx = fixtures::docx(&["Thermodynamics"]);
        let pptx = fixtures::archive(&[("ppt/slides/slide1.xml", &fixtures::slide(&["Entropy"]))]);

        for (bytes, name) in [
            (fixtures::pdf(&["Thermodynamics"]), "x.pdf"),
            (b"Heat flows".to_vec(), "a.txt"),
            (docx.clone(), "b.docx"),
            (docx, "c.doc"),
            (pptx.clone(), "d.pptx"),
            (pptx, "e.ppt"),
        ] {
            let doc = extract_text(&bytes, name).unwrap();
            assert!(!doc.text.trim().is_empty(), "{name} produced no text");
        }
    }

    #[test]
    fn legacy_binary_word_file_is_archive_error() {
        let err = extract_text(&[0xD0, 0xCF, 0x11, 0xE0, 0, 0, 0, 0], "old.doc").unwrap_err();
        assert!(matches!(err, ExtractionError::Archive(_)));
    }

    #[test]
    fn extract_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.txt");
        std::fs::write(&path, "Chapter 1\r\nHeat").unwrap();
        let doc = extract_file(&path).unwrap();
        assert_eq!(doc.text, "Chapter 1\r\nHeat");
        assert_eq!(doc.filename, "chapter.txt");
    }

    #[test]
    fn supported_extensions() {
        assert!(is_supported("a.PDF"));
        assert!(is_supported("slides.pptx"));
        assert!(!is_supported("image.png"));
        assert!(!is_supported("noext"));
    }
}
