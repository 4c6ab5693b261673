use super::keys::{after_facet, facet_prefix, slug_from_series_key, slug_from_sticky_time_key, split_facet_key};
use super::Store;
use crate::content::{ArticleMeta, SortMode};
use crate::error::Result;
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub sort: SortMode,
    /// 1-based; 0 means the first page.
    pub page: usize,
    /// 0 means the default size; capped at `MAX_PAGE_SIZE`.
    pub size: usize,
    pub include_draft: bool,
}

impl ListOptions {
    pub fn page(page: usize, size: usize) -> Self {
        Self { page, size, ..Self::default() }
    }

    /// `(page, size)` after defaults and caps.
    pub fn normalized(&self) -> (usize, usize) {
        let page = self.page.max(1);
        let size = match self.size {
            0 => DEFAULT_PAGE_SIZE,
            s => s.min(MAX_PAGE_SIZE),
        };
        (page, size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub name: String,
    pub count: usize,
}

type SlugOf = fn(&[u8]) -> Option<String>;

impl Store {
    /// Global listing: sticky desc, then the sort mode's timestamp desc.
    pub fn list(&self, opts: &ListOptions) -> Result<Vec<ArticleMeta>> {
        let _gate = self.gate.read();
        let tree = match opts.sort {
            SortMode::Created => &self.trees.idx_created,
            SortMode::Updated => &self.trees.idx_updated,
        };
        self.page_of(tree.iter(), 0, slug_from_sticky_time_key, opts)
    }

    pub fn list_by_tag(&self, tag: &str, opts: &ListOptions) -> Result<Vec<ArticleMeta>> {
        let tag = tag.trim().to_lowercase();
        self.list_facet(&self.trees.idx_tag, &tag, slug_from_sticky_time_key, opts)
    }

    pub fn list_by_category(&self, category: &str, opts: &ListOptions) -> Result<Vec<ArticleMeta>> {
        self.list_facet(&self.trees.idx_cat, category.trim(), slug_from_sticky_time_key, opts)
    }

    /// Members of one series in author order, recency breaking ties.
    pub fn list_series(&self, name: &str, opts: &ListOptions) -> Result<Vec<ArticleMeta>> {
        self.list_facet(&self.trees.idx_series, name.trim(), slug_from_series_key, opts)
    }

    /// Distinct series names, in byte order.
    pub fn series_names(&self) -> Result<Vec<String>> {
        let _gate = self.gate.read();
        let mut names = Vec::new();
        let mut cursor: Vec<u8> = Vec::new();
        while let Some(entry) = self.trees.idx_series.range(cursor.as_slice()..).next() {
            let (key, _) = entry?;
            let Some((facet, _)) = split_facet_key(&key) else { break };
            names.push(String::from_utf8_lossy(facet).into_owned());
            cursor = after_facet(facet);
        }
        Ok(names)
    }

    /// Number of visible records per tag.
    pub fn tag_counts(&self, include_draft: bool) -> Result<Vec<FacetCount>> {
        self.facet_counts(&self.trees.idx_tag, slug_from_sticky_time_key, include_draft)
    }

    pub fn category_counts(&self, include_draft: bool) -> Result<Vec<FacetCount>> {
        self.facet_counts(&self.trees.idx_cat, slug_from_sticky_time_key, include_draft)
    }

    fn list_facet(&self, tree: &sled::Tree, facet: &str, slug_of: SlugOf, opts: &ListOptions) -> Result<Vec<ArticleMeta>> {
        let Some(prefix) = facet_prefix(facet) else { return Ok(Vec::new()) };
        let _gate = self.gate.read();
        self.page_of(tree.scan_prefix(&prefix), prefix.len(), slug_of, opts)
    }

    /// Walk `entries` in key order, skipping `(page-1)*size` visible records
    /// and collecting up to `size`. Caller must hold the gate.
    fn page_of(&self, entries: sled::Iter, strip: usize, slug_of: SlugOf, opts: &ListOptions) -> Result<Vec<ArticleMeta>> {
        let (page, size) = opts.normalized();
        let mut skip = (page - 1).saturating_mul(size);
        let mut out = Vec::with_capacity(size);

        for key in entries.keys() {
            let key = key?;
            let Some(meta) = self.visible(&key[strip..], slug_of, opts.include_draft)? else { continue };
            if skip > 0 {
                skip -= 1;
                continue;
            }
            out.push(meta);
            if out.len() >= size {
                break;
            }
        }
        Ok(out)
    }

    fn facet_counts(&self, tree: &sled::Tree, slug_of: SlugOf, include_draft: bool) -> Result<Vec<FacetCount>> {
        let _gate = self.gate.read();
        let mut out: Vec<FacetCount> = Vec::new();
        for key in tree.iter().keys() {
            let key = key?;
            let Some((facet, rest)) = split_facet_key(&key) else { continue };
            if self.visible(rest, slug_of, include_draft)?.is_none() {
                continue;
            }
            let name = String::from_utf8_lossy(facet);
            match out.last_mut() {
                Some(last) if last.name == name => last.count += 1,
                _ => out.push(FacetCount { name: name.into_owned(), count: 1 }),
            }
        }
        Ok(out)
    }

    /// Record behind an index entry, if it passes the hidden/draft filter.
    /// Entries whose record is missing or unreadable are skipped.
    pub(crate) fn visible(&self, entry: &[u8], slug_of: SlugOf, include_draft: bool) -> Result<Option<ArticleMeta>> {
        let Some(slug) = slug_of(entry) else { return Ok(None) };
        let meta = match self.load_meta(slug.as_bytes()) {
            Ok(Some(meta)) => meta,
            Ok(None) => return Ok(None),
            Err(crate::error::CatalogError::Codec(err)) => {
                tracing::warn!(slug, error = %err, "unreadable record in index, skipped");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        if meta.hidden || (meta.draft && !include_draft) {
            return Ok(None);
        }
        Ok(Some(meta))
    }
}
