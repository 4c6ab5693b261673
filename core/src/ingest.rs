//! Ingestion pipeline: discovery → parse → normalize → dedupe.
//!
//! Files are parsed by a fixed pool of worker threads fed through a job
//! channel. Every worker reports one outcome per file on a result channel and
//! the calling thread is the only collector. Deduplication and warning
//! aggregation happen once, after every worker has finished, in discovery
//! order, so the outcome does not depend on thread scheduling.

use crate::content::{Article, ArticleMeta, BodyRef, SeriesRef};
use crate::discover::{discover, SourceFile};
use crate::error::Result;
use crate::frontmatter::{content_hash, parse_time, resolve_slug, split_front_matter, FrontMatter, ParseError, DEFAULT_COVER};
use crate::text;
use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, unbounded};
use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread;

/// A per-file problem that did not stop the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub path: PathBuf,
    pub message: String,
}

impl Warning {
    fn new(path: &Path, message: impl Into<String>) -> Self {
        Self { path: path.to_path_buf(), message: message.into() }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Default)]
pub struct IngestOutput {
    pub articles: Vec<Article>,
    pub warnings: Vec<Warning>,
}

struct FileOutcome {
    index: usize,
    article: Option<Article>,
    warnings: Vec<Warning>,
}

/// Ingest every document under `root`. Fails only on I/O: traversal, stat or
/// read of any discovered file.
pub fn ingest(root: &Path) -> Result<IngestOutput> {
    let files = discover(root)?;
    ingest_files(files)
}

/// Ingest an explicit file list; list position is the discovery order.
pub fn ingest_files(files: Vec<SourceFile>) -> Result<IngestOutput> {
    let total = files.len();
    let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(total).max(1);

    let (job_tx, job_rx) = bounded::<(usize, SourceFile)>(workers * 2);
    let (res_tx, res_rx) = unbounded::<Result<FileOutcome>>();

    let mut outcomes = Vec::with_capacity(total);
    let mut first_err = None;

    thread::scope(|scope| {
        for _ in 0..workers {
            let jobs = job_rx.clone();
            let results = res_tx.clone();
            scope.spawn(move || {
                let mut buf = Vec::new();
                for (index, file) in jobs.iter() {
                    if results.send(process_file(index, &file, &mut buf)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(res_tx);

        scope.spawn(move || {
            for job in files.into_iter().enumerate() {
                if job_tx.send(job).is_err() {
                    break;
                }
            }
        });

        for result in res_rx.iter() {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
        }
    });

    if let Some(err) = first_err {
        return Err(err);
    }

    outcomes.sort_by_key(|o| o.index);
    let mut warnings = Vec::new();
    let mut seen = HashSet::with_capacity(outcomes.len());
    let mut articles = Vec::with_capacity(outcomes.len());
    let mut duplicates = Vec::new();
    for outcome in outcomes {
        warnings.extend(outcome.warnings);
        let Some(article) = outcome.article else { continue };
        if !seen.insert(article.meta.slug.clone()) {
            duplicates.push(Warning::new(
                &article.body.source_path,
                format!("duplicate slug, skipped: {}", article.meta.slug),
            ));
            continue;
        }
        articles.push(article);
    }
    warnings.extend(duplicates);

    tracing::info!(files = total, articles = articles.len(), warnings = warnings.len(), "ingest complete");
    Ok(IngestOutput { articles, warnings })
}

fn process_file(index: usize, file: &SourceFile, buf: &mut Vec<u8>) -> Result<FileOutcome> {
    let path = file.path.as_path();
    let stat = fs::metadata(path)?;
    let modified: DateTime<Local> = stat.modified()?.into();

    buf.clear();
    File::open(path)?.read_to_end(buf)?;
    let content_hash = content_hash(buf);
    let raw = String::from_utf8_lossy(buf);

    let mut warnings = Vec::new();
    let (fm, body) = match split_front_matter(&raw) {
        Ok(parts) => parts,
        Err(ParseError::NoHeader) => {
            let fm = FrontMatter { cover: DEFAULT_COVER.to_string(), ..FrontMatter::default() };
            (fm, raw.trim().to_string())
        }
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "skipping file with malformed header");
            warnings.push(Warning::new(path, format!("failed to parse front matter: {err}")));
            return Ok(FileOutcome { index, article: None, warnings });
        }
    };

    if fm.hidden {
        tracing::debug!(path = %path.display(), "skipping hidden document");
        return Ok(FileOutcome { index, article: None, warnings });
    }

    let slug = resolve_slug(&fm, path);
    if slug.is_empty() {
        warnings.push(Warning::new(path, "empty slug"));
        return Ok(FileOutcome { index, article: None, warnings });
    }

    let date = match parse_time(&fm.date) {
        Some(t) => t,
        None => {
            warnings.push(Warning::new(path, "using file modification time for date"));
            modified
        }
    };
    let updated = parse_time(&fm.updated).unwrap_or(date);
    if fm.title.trim().is_empty() {
        warnings.push(Warning::new(path, "title is empty"));
    }

    let word_count = text::word_count(&body);
    let mut meta = ArticleMeta {
        title: fm.title,
        slug,
        date,
        updated,
        tags: fm.tags,
        category: fm.category,
        series: SeriesRef { name: fm.series.name, order: fm.series.order },
        description: fm.description,
        summary: fm.summary,
        cover: fm.cover,
        sticky: fm.sticky,
        hidden: fm.hidden,
        draft: fm.draft,
        aliases: fm.aliases,
        short_id: fm.short_id,
        word_count,
        read_minutes: text::reading_minutes(word_count),
        headings: text::headings(&body),
        out_links: text::out_links(&body),
    };
    meta.normalize();

    let article = Article {
        meta,
        body: BodyRef { source_path: path.to_path_buf(), content_hash },
    };
    Ok(FileOutcome { index, article: Some(article), warnings })
}
