//! Home feed: the global listing with series folded into one entry each.

use super::keys::clamp_sticky;
use super::{ListOptions, SeriesSummary, Store};
use crate::content::{ArticleMeta, SortMode};
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HomeItem {
    Post(ArticleMeta),
    Series(SeriesSummary),
}

impl HomeItem {
    /// `(sticky, timestamp)` the feed is ranked by, sticky clamped the same
    /// way the listing keys clamp it.
    pub fn rank(&self, mode: SortMode) -> (i32, DateTime<Local>) {
        match self {
            HomeItem::Post(meta) => (i32::from(clamp_sticky(meta.sticky)), meta.sort_time(mode)),
            HomeItem::Series(s) => (s.max_sticky, s.latest_updated),
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            HomeItem::Post(meta) => &meta.slug,
            HomeItem::Series(s) => &s.representative_slug,
        }
    }
}

impl Store {
    /// One page of the global listing, with the first member of each series
    /// replaced by that series' summary and later members dropped.
    pub fn home_items(&self, opts: &ListOptions) -> Result<Vec<HomeItem>> {
        let page = self.list(opts)?;
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(page.len());

        for meta in page {
            if !meta.in_series() {
                items.push(HomeItem::Post(meta));
                continue;
            }
            if !seen.insert(meta.series.name.clone()) {
                continue;
            }
            match self.series_summary(&meta.series.name, opts.include_draft)? {
                Some(summary) => items.push(HomeItem::Series(summary)),
                None => tracing::debug!(series = %meta.series.name, "series has no eligible members"),
            }
        }

        let mode = opts.sort;
        items.sort_by(|a, b| feed_order(a.rank(mode), b.rank(mode)));
        Ok(items)
    }
}

fn feed_order(a: (i32, DateTime<Local>), b: (i32, DateTime<Local>)) -> Ordering {
    b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1))
}
