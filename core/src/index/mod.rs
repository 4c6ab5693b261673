//! Indexing engine backed by an embedded ordered key-value store.
//!
//! One sled tree per logical structure. The primary tree maps slug to the
//! serialized record; every other tree only holds keys that point back into
//! it. A rebuild replaces the contents of every tree in one transaction.

pub mod home;
pub mod keys;
mod query;
mod rebuild;
mod series;

pub use home::HomeItem;
pub use query::{FacetCount, ListOptions, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use rebuild::RebuildOptions;
pub use series::SeriesSummary;

use crate::content::ArticleMeta;
use crate::error::{CatalogError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

/// Bumped whenever a tree name or key layout changes.
pub const SCHEMA_VERSION: u32 = 1;

pub(crate) const T_META: &str = "meta";
pub(crate) const T_ALIAS: &str = "alias";
pub(crate) const T_SHORT: &str = "short";
pub(crate) const T_IDX_UPDATED: &str = "idx_updated";
pub(crate) const T_IDX_CREATED: &str = "idx_created";
pub(crate) const T_IDX_TAG: &str = "idx_tag";
pub(crate) const T_IDX_CAT: &str = "idx_cat";
pub(crate) const T_IDX_SERIES: &str = "idx_series";
pub(crate) const T_CATALOG: &str = "catalog";

pub(crate) const INFO_KEY: &[u8] = b"info";
pub(crate) const SENTINEL: &[u8] = &[1];

/// Written by every rebuild next to the data it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub version: u32,
    pub articles: u32,
    pub built_at: String,
    pub include_draft: bool,
}

pub(crate) struct Trees {
    pub meta: sled::Tree,
    pub alias: sled::Tree,
    pub short: sled::Tree,
    pub idx_updated: sled::Tree,
    pub idx_created: sled::Tree,
    pub idx_tag: sled::Tree,
    pub idx_cat: sled::Tree,
    pub idx_series: sled::Tree,
    pub catalog: sled::Tree,
}

impl Trees {
    fn open(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            meta: db.open_tree(T_META)?,
            alias: db.open_tree(T_ALIAS)?,
            short: db.open_tree(T_SHORT)?,
            idx_updated: db.open_tree(T_IDX_UPDATED)?,
            idx_created: db.open_tree(T_IDX_CREATED)?,
            idx_tag: db.open_tree(T_IDX_TAG)?,
            idx_cat: db.open_tree(T_IDX_CAT)?,
            idx_series: db.open_tree(T_IDX_SERIES)?,
            catalog: db.open_tree(T_CATALOG)?,
        })
    }

    /// Every tree, in the slot order used by rebuild plans.
    pub(crate) fn all(&self) -> [sled::Tree; rebuild::TREE_COUNT] {
        [
            self.meta.clone(),
            self.alias.clone(),
            self.short.clone(),
            self.idx_updated.clone(),
            self.idx_created.clone(),
            self.idx_tag.clone(),
            self.idx_cat.clone(),
            self.idx_series.clone(),
            self.catalog.clone(),
        ]
    }
}

/// Owned handle to the index. Queries take the read side of `gate`; a
/// rebuild holds the write side for its transaction, so a reader observes
/// one whole generation.
pub struct Store {
    db: sled::Db,
    path: PathBuf,
    pub(crate) trees: Trees,
    pub(crate) gate: RwLock<()>,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(CatalogError::MissingPath);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let db = sled::open(&path)?;
        let trees = Trees::open(&db)?;
        let store = Self { db, path, trees, gate: RwLock::new(()) };

        match store.info()? {
            Some(info) if info.version != SCHEMA_VERSION => tracing::warn!(
                found = info.version,
                expected = SCHEMA_VERSION,
                "index was written by another schema version; rebuild to refresh it"
            ),
            Some(info) => tracing::debug!(articles = info.articles, built_at = %info.built_at, "opened index"),
            None => tracing::debug!(path = %store.path.display(), "opened empty index"),
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Flush and release the store.
    pub fn close(self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn info(&self) -> Result<Option<StoreInfo>> {
        let _gate = self.gate.read();
        match self.trees.catalog.get(INFO_KEY)? {
            Some(v) => Ok(Some(serde_json::from_slice(&v)?)),
            None => Ok(None),
        }
    }

    /// Primary record for `slug`.
    pub fn get_meta(&self, slug: &str) -> Result<Option<ArticleMeta>> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Ok(None);
        }
        let _gate = self.gate.read();
        self.load_meta(slug.as_bytes())
    }

    /// `slug` itself when live, else the slug an alias points to.
    pub fn resolve_alias(&self, slug_or_old: &str) -> Result<Option<String>> {
        let key = slug_or_old.trim();
        if key.is_empty() {
            return Ok(None);
        }
        let _gate = self.gate.read();
        if self.trees.meta.contains_key(key.as_bytes())? {
            return Ok(Some(key.to_string()));
        }
        read_string(&self.trees.alias, key)
    }

    pub fn resolve_short_id(&self, short_id: &str) -> Result<Option<String>> {
        let key = short_id.trim();
        if key.is_empty() {
            return Ok(None);
        }
        let _gate = self.gate.read();
        read_string(&self.trees.short, key)
    }

    /// Caller must hold the gate.
    pub(crate) fn load_meta(&self, slug: &[u8]) -> Result<Option<ArticleMeta>> {
        match self.trees.meta.get(slug)? {
            Some(v) => Ok(Some(bincode::deserialize(&v)?)),
            None => Ok(None),
        }
    }
}

fn read_string(tree: &sled::Tree, key: &str) -> Result<Option<String>> {
    Ok(tree
        .get(key.as_bytes())?
        .map(|v| String::from_utf8_lossy(&v).into_owned()))
}

pub(crate) fn info_record(articles: usize, include_draft: bool) -> Result<Vec<u8>> {
    let info = StoreInfo {
        version: SCHEMA_VERSION,
        articles: articles as u32,
        built_at: chrono::Local::now().to_rfc3339(),
        include_draft,
    };
    Ok(serde_json::to_vec(&info)?)
}
