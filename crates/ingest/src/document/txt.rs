/// Plain text is returned as-is. Invalid UTF-8 sequences are replaced,
/// everything else (including line endings) is untouched.
pub fn extract_txt(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_simple_text() {
        let content = b"Hello, world!\nThis is a test file.";
        assert_eq!(extract_txt(content), "Hello, world!\nThis is a test file.");
    }

    #[test]
    fn extract_utf8_text() {
        let content = "Chapitre 2 : énergie thermique".as_bytes();
        assert_eq!(extract_txt(content), "Chapitre 2 : énergie thermique");
    }

    #[test]
    fn keeps_line_endings_and_whitespace() {
        let content = b"  \r\n  Hello  \r\n  ";
        assert_eq!(extract_txt(content), "  \r\n  Hello  \r\n  ");
    }

    #[test]
    fn extract_empty_text() {
        assert_eq!(extract_txt(b""), "");
    }
}
