//! Filename helpers shared by upload, sequencing and title detection.

/// Lower-cased extension including the leading dot (`"Notes.PDF"` → `".pdf"`).
/// Returns an empty string when the name has no extension.
pub fn extension_of(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx..].to_lowercase(),
        _ => String::new(),
    }
}

/// Drop the last extension, if any.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && !file_name[idx + 1..].contains(['/', '\\']) => &file_name[..idx],
        _ => file_name,
    }
}

/// Turn an uploaded file name into a readable title:
/// extension stripped, `_` and `-` replaced by spaces, whitespace collapsed.
///
/// Returns an empty string when nothing readable is left; callers pick their
/// own placeholder in that case.
pub fn humanize_filename(file_name: &str) -> String {
    strip_extension(file_name)
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Longest common prefix of the extension-less names, humanized.
pub fn common_name_prefix(file_names: &[String]) -> String {
    let stems: Vec<&str> = file_names.iter().map(|n| strip_extension(n)).collect();
    let Some(first) = stems.first() else {
        return String::new();
    };

    let mut end = 0;
    for (idx, ch) in first.char_indices() {
        let next = idx + ch.len_utf8();
        if stems.iter().all(|s| s.starts_with(&first[..next])) {
            end = next;
        } else {
            break;
        }
    }

    humanize_filename(&first[..end])
}
