use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Ordering used by the global listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Updated,
    Created,
}

impl std::str::FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "updated" => Ok(SortMode::Updated),
            "created" => Ok(SortMode::Created),
            other => Err(format!("unknown sort mode '{other}', expected 'updated' or 'created'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRef {
    pub name: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// The catalog record. Stored as-is in the primary tree of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMeta {
    pub title: String,
    pub slug: String,
    pub date: DateTime<Local>,
    pub updated: DateTime<Local>,

    pub tags: Vec<String>,
    pub category: String,
    pub series: SeriesRef,

    pub description: String,
    pub summary: String,
    pub cover: String,

    pub sticky: i32,
    pub hidden: bool,
    pub draft: bool,

    pub aliases: Vec<String>,
    pub short_id: String,

    // derived from the body at parse time
    pub word_count: usize,
    pub read_minutes: usize,
    pub headings: Vec<Heading>,
    pub out_links: Vec<String>,
}

impl ArticleMeta {
    /// Record with every optional field empty and both timestamps set to `at`.
    pub fn new(slug: &str, at: DateTime<Local>) -> Self {
        Self {
            title: String::new(),
            slug: slug.to_string(),
            date: at,
            updated: at,
            tags: Vec::new(),
            category: String::new(),
            series: SeriesRef::default(),
            description: String::new(),
            summary: String::new(),
            cover: String::new(),
            sticky: 0,
            hidden: false,
            draft: false,
            aliases: Vec::new(),
            short_id: String::new(),
            word_count: 0,
            read_minutes: 0,
            headings: Vec::new(),
            out_links: Vec::new(),
        }
    }

    /// Trim scalar fields, fold and dedupe tags/aliases, clamp series order.
    /// Idempotent.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.title);
        trim_in_place(&mut self.slug);
        trim_in_place(&mut self.category);
        trim_in_place(&mut self.short_id);
        trim_in_place(&mut self.series.name);

        self.tags = normalize_strings(&self.tags);
        self.aliases = normalize_strings(&self.aliases);
        if self.series.order < 0 {
            self.series.order = 0;
        }
    }

    pub fn in_series(&self) -> bool { !self.series.name.is_empty() }

    /// Timestamp the given sort mode orders by.
    pub fn sort_time(&self, mode: SortMode) -> DateTime<Local> {
        match mode {
            SortMode::Created => self.date,
            SortMode::Updated => self.updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRef {
    pub source_path: PathBuf,
    /// Hex SHA-256 of the raw file bytes.
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub meta: ArticleMeta,
    pub body: BodyRef,
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn normalize_strings(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim().to_lowercase();
        if item.is_empty() { continue; }
        if seen.insert(item.clone()) {
            out.push(item);
        }
    }
    out
}
