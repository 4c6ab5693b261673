use super::keys::{clamp_sticky, facet_prefix, slug_from_series_key};
use super::Store;
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Aggregate over the eligible members of one series. Computed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    pub name: String,
    pub count: usize,
    pub latest_updated: DateTime<Local>,
    /// Highest member sticky, clamped to the key range [0, 100].
    pub max_sticky: i32,
    /// Member with the strictly latest `updated`; the first one in series
    /// order wins a tie.
    pub representative_slug: String,
}

impl Store {
    pub fn series_summary(&self, name: &str, include_draft: bool) -> Result<Option<SeriesSummary>> {
        let name = name.trim();
        let Some(prefix) = facet_prefix(name) else { return Ok(None) };
        let _gate = self.gate.read();

        let mut summary: Option<SeriesSummary> = None;
        for key in self.trees.idx_series.scan_prefix(&prefix).keys() {
            let key = key?;
            let Some(meta) = self.visible(&key[prefix.len()..], slug_from_series_key, include_draft)? else {
                continue;
            };
            match summary.as_mut() {
                None => {
                    summary = Some(SeriesSummary {
                        name: name.to_string(),
                        count: 1,
                        latest_updated: meta.updated,
                        max_sticky: i32::from(clamp_sticky(meta.sticky)),
                        representative_slug: meta.slug,
                    });
                }
                Some(s) => {
                    s.count += 1;
                    s.max_sticky = s.max_sticky.max(i32::from(clamp_sticky(meta.sticky)));
                    if meta.updated > s.latest_updated {
                        s.latest_updated = meta.updated;
                        s.representative_slug = meta.slug;
                    }
                }
            }
        }
        Ok(summary)
    }
}
