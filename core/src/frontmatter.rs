//! Metadata header parsing.
//!
//! A document may start with a YAML block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: Hello
//! tags: [rust]
//! ---
//! body...
//! ```

use crate::text::slugify;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_COVER: &str = "https://cdn.example.com/default-cover.jpg";

const FENCE: &str = "---";

#[derive(Error, Debug)]
pub enum ParseError {
    /// The document has no header; the whole file is body.
    #[error("no front matter found")]
    NoHeader,
    #[error("invalid front matter: unterminated header block")]
    Unterminated,
    #[error("invalid front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeriesField {
    pub name: String,
    pub order: i64,
}

/// Decoded header fields, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: String,
    pub slug: String,
    pub date: String,
    pub updated: String,

    pub tags: Vec<String>,
    pub category: String,

    pub sticky: i32,
    pub hidden: bool,
    pub draft: bool,
    pub cover: String,
    pub description: String,
    pub summary: String,

    pub aliases: Vec<String>,
    pub series: SeriesField,

    #[serde(rename = "short")]
    pub short_id: String,
}

/// Split `raw` into its decoded header and trimmed body.
pub fn split_front_matter(raw: &str) -> Result<(FrontMatter, String), ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::NoHeader);
    }
    let norm = trimmed.replace("\r\n", "\n").replace('\r', "\n");

    let Some(rest) = norm.strip_prefix("---\n") else {
        return Err(ParseError::NoHeader);
    };

    let (header, body) = if let Some((header, body)) = rest.split_once("\n---\n") {
        (header, body)
    } else if let Some(header) = rest.strip_suffix("\n---") {
        (header, "")
    } else if rest.trim() == FENCE {
        ("", "")
    } else {
        return Err(ParseError::Unterminated);
    };

    let header = header.trim();
    let mut fm = if header.is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str::<Option<FrontMatter>>(header)?.unwrap_or_default()
    };
    if fm.cover.trim().is_empty() {
        fm.cover = DEFAULT_COVER.to_string();
    }
    Ok((fm, body.trim().to_string()))
}

/// Body of a document, with the header removed when one parses.
pub fn body_of(raw: &str) -> String {
    match split_front_matter(raw) {
        Ok((_, body)) => body,
        Err(_) => raw.trim().to_string(),
    }
}

/// Explicit slug, else slugified title, else slugified file stem.
pub fn resolve_slug(fm: &FrontMatter, path: &Path) -> String {
    let explicit = fm.slug.trim();
    if !explicit.is_empty() {
        return slugify(explicit);
    }
    let title = fm.title.trim();
    if !title.is_empty() {
        return slugify(title);
    }
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    slugify(&stem)
}

/// Parse a header timestamp; naive layouts are taken in the local timezone.
/// `None` stands for the zero timestamp.
pub fn parse_time(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Local));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return local(d.and_hms_opt(0, 0, 0)?);
    }
    for layout in ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, layout) {
            return local(t);
        }
    }
    None
}

fn local(t: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&t).earliest()
}

/// Fingerprint of the untouched file bytes.
pub fn content_hash(raw: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw);
    format!("{:x}", hasher.finalize())
}
