use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use super::ExtractionError;

static SLIDE_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("slide entry pattern"));

/// Text of every slide: runs joined with spaces, slides with newlines, in
/// slide-number order. Slides without text are skipped.
pub fn extract_pptx(bytes: &[u8]) -> Result<(String, usize), ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = SLIDE_ENTRY.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);

    let mut texts = Vec::with_capacity(slides.len());
    for (_, name) in &slides {
        let mut xml = String::new();
        archive.by_name(name)?.read_to_string(&mut xml)?;
        let runs = text_runs(&xml)?;
        if !runs.is_empty() {
            texts.push(runs.join(" "));
        }
    }

    if texts.is_empty() {
        return Err(ExtractionError::EmptyExtraction);
    }
    Ok((texts.join("\n"), slides.len()))
}

/// Contents of every `<a:t>` element.
fn text_runs(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut runs = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"a:t" => current = Some(String::new()),
            Event::End(e) if e.name().as_ref() == b"a:t" => {
                if let Some(run) = current.take() {
                    let run = run.trim();
                    if !run.is_empty() {
                        runs.push(run.to_string());
                    }
                }
            }
            Event::Text(t) => {
                if let Some(run) = current.as_mut() {
                    run.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(runs)
}
