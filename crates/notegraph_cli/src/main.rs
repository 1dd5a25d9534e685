//! Command-line driver for the note graph query engine.
//!
//! # Responsibility
//! - Load a graph snapshot from a JSON file and run one query against it.
//! - Print one `path<TAB>title` line per result; diagnostics go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use notegraph_core::{
    init_logging, GraphCache, GraphSnapshot, NoteContentProvider, SearchOptions, SearchService,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "notegraph", version, about = "Query a note graph snapshot")]
struct Cli {
    /// JSON file with `notes`, `branches`, `attributes` and optional `contents`.
    snapshot: PathBuf,

    /// Search query, e.g. `hello #label=text`.
    query: String,

    /// Autocomplete mode: fuzzy attributes, highlighted titles.
    #[arg(long)]
    autocomplete: bool,

    /// Scan note bodies from `contents` for fulltext tokens.
    #[arg(long)]
    include_content: bool,

    /// Prefix-match attribute names.
    #[arg(long)]
    fuzzy: bool,

    /// Restrict results to the subtree of this note.
    #[arg(long, default_value = notegraph_core::ROOT_NOTE_ID)]
    hoisted: String,

    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value = notegraph_core::default_log_level())]
    log_level: String,

    /// Write rotating log files here instead of stderr.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
struct SnapshotFile {
    #[serde(flatten)]
    snapshot: GraphSnapshot,
    /// Note bodies keyed by note id.
    #[serde(default)]
    contents: HashMap<String, String>,
}

struct FileContents(HashMap<String, String>);

impl NoteContentProvider for FileContents {
    fn content(&self, note_id: &str) -> Option<String> {
        self.0.get(note_id).cloned()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = cli.log_dir.as_deref().map(absolute).transpose()?;
    init_logging(&cli.log_level, log_dir.as_deref()).context("failed to initialize logging")?;

    let file = load_snapshot(&cli.snapshot)?;
    let graph = GraphCache::from_snapshot(file.snapshot);
    debug!(
        "event=cli_snapshot module=cli status=ok notes={}",
        graph.note_count()
    );

    let contents = FileContents(file.contents);
    let service = SearchService::new(&graph).with_content_provider(&contents);
    let options = SearchOptions {
        include_note_content: cli.include_content,
        fuzzy_attribute_search: cli.fuzzy,
        hoisted_note_id: cli.hoisted,
        limit: cli.limit,
    };

    let outcome = if cli.autocomplete {
        service.search_for_autocomplete(&cli.query, &options)?
    } else {
        service.search(&cli.query, &options)?
    };

    if let Some(error) = &outcome.error {
        eprintln!("warning: {error}");
    }
    for result in &outcome.results {
        let title = result
            .highlighted_note_path_title
            .as_deref()
            .unwrap_or(&result.note_path_title);
        println!("{}\t{}", result.note_path_string(), title);
    }
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<SnapshotFile> {
    let file = File::open(path)
        .with_context(|| format!("failed to open snapshot `{}`", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse snapshot `{}`", path.display()))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    Ok(cwd.join(path))
}
