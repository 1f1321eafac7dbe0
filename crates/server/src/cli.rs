//! CLI argument parsing and the offline `extract` subcommand.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use examly_ingest::{extract_file, highlight, Category};

/// Examly: study material from your course documents.
#[derive(Parser, Debug)]
#[command(name = "examly", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve {
        /// Override `HOST`.
        #[arg(long)]
        host: Option<String>,
        /// Override `PORT`.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Extract text from a local file and print it.
    Extract {
        /// pdf, doc(x), ppt(x) or txt file.
        path: PathBuf,
        /// Print heading/definition/formula counts instead of the text.
        #[arg(long)]
        summary: bool,
    },
}

pub fn extract(path: &Path, summary: bool) -> anyhow::Result<()> {
    let doc = extract_file(path)?;
    info!(
        "Extracted '{}' (type={}): {} units, {} chars",
        doc.filename,
        doc.file_type,
        doc.units,
        doc.total_chars()
    );

    if !summary {
        println!("{}", doc.text);
        return Ok(());
    }

    let spans = highlight(&doc.text);
    let count = |c: Category| spans.iter().filter(|s| s.category == c).count();
    println!("file:        {}", doc.filename);
    println!("characters:  {}", doc.total_chars());
    println!("headings:    {}", count(Category::Heading));
    println!("definitions: {}", count(Category::Definition));
    println!("formulas:    {}", count(Category::Formula));
    for span in spans.iter().filter(|s| s.category == Category::Heading).take(20) {
        println!("  # {}", &doc.text[span.start..span.end]);
    }
    Ok(())
}
