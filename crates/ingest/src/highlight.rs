//! Line heuristics that mark headings, definitions and formulas in raw
//! document text. Pure pattern matching; rendering is up to the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Heading,
    Definition,
    Formula,
}

/// Byte range `[start, end)` into the highlighted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub category: Category,
}

static ALL_CAPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z\s]{5,}").expect("caps pattern"));
static SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(chapter|section|part|unit|chapitre)\s*\d+").expect("section pattern")
});
static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+[A-Z]").expect("numbered pattern"));
static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Z][A-Za-z\s]{2,40}):?\s+(is|are|refers to|means|denotes|defines?|est|sont|signifie)\b")
        .expect("definition pattern")
});
static OPERATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[=+\-*/^()\[\]{}]").expect("operator pattern"));

fn is_heading(line: &str) -> bool {
    let len = line.chars().count();
    if len >= 100 {
        return false;
    }
    (ALL_CAPS.is_match(line) && len < 80) || SECTION.is_match(line) || NUMBERED.is_match(line)
}

fn is_definition(line: &str) -> bool {
    DEFINITION.is_match(line)
}

fn is_formula(line: &str) -> bool {
    line.chars().count() < 200
        && OPERATOR.is_match(line)
        && line.chars().any(|c| c.is_ascii_alphanumeric())
}

/// Classify each non-blank line. A line gets at most one span covering its
/// trimmed extent; heading beats definition beats formula.
pub fn highlight(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut offset = 0;

    for raw in text.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lead = raw.len() - raw.trim_start().len();
        let start = line_start + lead;

        let category = if is_heading(trimmed) {
            Category::Heading
        } else if is_definition(trimmed) {
            Category::Definition
        } else if is_formula(trimmed) {
            Category::Formula
        } else {
            continue;
        };

        spans.push(Span {
            start,
            end: start + trimmed.len(),
            category,
        });
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(text: &str) -> Vec<(String, Category)> {
        highlight(text)
            .into_iter()
            .map(|s| (text[s.start..s.end].to_string(), s.category))
            .collect()
    }

    #[test]
    fn classifies_lines() {
        let text = "Chapter 1: Thermodynamics\n\n  Entropy is a measure of disorder.\nE = mc^2\nplain prose here\nINTRODUCTION TO HEAT\n";
        assert_eq!(
            categories(text),
            vec![
                ("Chapter 1: Thermodynamics".to_string(), Category::Heading),
                ("Entropy is a measure of disorder.".to_string(), Category::Definition),
                ("E = mc^2".to_string(), Category::Formula),
                ("INTRODUCTION TO HEAT".to_string(), Category::Heading),
            ]
        );
    }

    #[test]
    fn french_headings_and_definitions() {
        let text = "chapitre 3\nL'énergie est conservée";
        let found = categories(text);
        assert_eq!(found[0], ("chapitre 3".to_string(), Category::Heading));
        assert_eq!(found.len(), 1, "apostrophe breaks the definition term: {found:?}");

        assert_eq!(
            categories("Enthalpie est une grandeur"),
            vec![("Enthalpie est une grandeur".to_string(), Category::Definition)]
        );
    }

    #[test]
    fn spans_are_sorted_and_disjoint() {
        let text = "1. Introduction\nF = m * a\n\r\nWork: refers to energy transfer\r\n";
        let spans = highlight(text);
        assert_eq!(spans.len(), 3);
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(&text[spans[2].start..spans[2].end], "Work: refers to energy transfer");
    }

    #[test]
    fn long_lines_are_not_headings_or_formulas() {
        let long = format!("CHAPTER {}", "X".repeat(120));
        assert!(highlight(&long).is_empty());
        let long_formula = format!("a = {}", "b + ".repeat(60));
        assert!(highlight(&long_formula).is_empty());
    }
}
