//! Idea extraction from plain text.
//!
//! Ideas are introduced by an `Idea ID: <id>` marker and run until the next
//! marker. Within a segment, the `Project Title:` line names the idea and
//! everything after it is the description.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::IdeaRecord;

/// Title used when a segment has no `Project Title:` line.
pub const UNTITLED: &str = "Untitled";

lazy_static! {
    static ref IDEA_MARKER: Regex = Regex::new(r"Idea ID:[ \t]*([A-Za-z0-9_-]+)").unwrap();
    static ref PROJECT_TITLE: Regex = Regex::new(r"Project Title:([^\n]*)").unwrap();
}

/// Errors from the idea source.
#[derive(Error, Debug)]
pub enum IdeaSourceError {
    #[error("Failed to read ideas file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No ideas found in {0}")]
    NoIdeas(String),
}

/// Split `text` into ideas. The first segment for a given id wins.
pub fn extract_ideas(text: &str) -> Vec<IdeaRecord> {
    let markers: Vec<(usize, String)> = IDEA_MARKER
        .captures_iter(text)
        .filter_map(|c| Some((c.get(0)?.start(), c.get(1)?.as_str().to_string())))
        .collect();

    let mut seen = HashSet::new();
    let mut ideas = Vec::new();

    for (index, (start, id)) in markers.iter().enumerate() {
        let end = markers.get(index + 1).map_or(text.len(), |(next, _)| *next);
        if !seen.insert(id.clone()) {
            tracing::warn!(idea = %id, "Duplicate idea id, keeping the first occurrence");
            continue;
        }
        ideas.push(idea_from_segment(id, text[*start..end].trim()));
    }

    ideas
}

fn idea_from_segment(id: &str, segment: &str) -> IdeaRecord {
    match PROJECT_TITLE.captures(segment) {
        Some(captures) => {
            let title = captures.get(1).map_or("", |m| m.as_str()).trim();
            let after_title = captures.get(0).map_or(segment.len(), |m| m.end());
            IdeaRecord::new(id, title, segment[after_title..].trim())
        }
        None => IdeaRecord::new(id, UNTITLED, segment),
    }
}

/// Read a UTF-8 text file and extract its ideas.
pub fn load_ideas(path: impl AsRef<Path>) -> Result<Vec<IdeaRecord>, IdeaSourceError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let ideas = extract_ideas(&contents);

    if ideas.is_empty() {
        return Err(IdeaSourceError::NoIdeas(path.display().to_string()));
    }

    tracing::info!(count = ideas.len(), path = %path.display(), "Extracted ideas");
    Ok(ideas)
}
