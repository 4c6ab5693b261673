use super::keys::{facet_key, facet_prefix, series_key, sticky_time_key, unix_nanos};
use super::{info_record, Store, INFO_KEY, SENTINEL};
use crate::content::Article;
use crate::error::{CatalogError, Result};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError, TransactionResult, TransactionalTree,
};
use sled::Transactional;
use std::collections::HashSet;

pub(crate) const TREE_COUNT: usize = 9;

// slots into `Trees::all()`
const META: usize = 0;
const ALIAS: usize = 1;
const SHORT: usize = 2;
const IDX_UPDATED: usize = 3;
const IDX_CREATED: usize = 4;
const IDX_TAG: usize = 5;
const IDX_CAT: usize = 6;
const IDX_SERIES: usize = 7;
const CATALOG: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct RebuildOptions {
    /// Write draft records. Drafts left out here are absent from the store,
    /// not merely hidden from queries.
    pub include_draft: bool,
}

type Entries = Vec<(Vec<u8>, Vec<u8>)>;

struct Plan {
    inserts: [Entries; TREE_COUNT],
    articles: usize,
}

impl Plan {
    fn put(&mut self, slot: usize, key: Vec<u8>, value: &[u8]) {
        self.inserts[slot].push((key, value.to_vec()));
    }
}

impl Store {
    /// Replace the whole index with `articles`.
    ///
    /// Every tree is cleared and refilled inside a single transaction. If any
    /// step fails nothing is committed and the previous generation stays
    /// readable.
    pub fn rebuild(&self, articles: &[Article], opts: RebuildOptions) -> Result<()> {
        let plan = plan(articles, opts)?;
        self.commit(&plan, info_written)?;
        tracing::info!(articles = plan.articles, include_draft = opts.include_draft, "index rebuilt");
        Ok(())
    }

    /// Apply `plan` in one transaction. `verify` runs inside it after every
    /// batch is applied; an abort from it discards the whole generation.
    fn commit<V>(&self, plan: &Plan, verify: V) -> Result<()>
    where
        V: Fn(&[TransactionalTree]) -> ConflictableTransactionResult<(), ()>,
    {
        let _gate = self.gate.write();
        let trees = self.trees.all();
        let mut batches = Vec::with_capacity(TREE_COUNT);
        for (tree, inserts) in trees.iter().zip(plan.inserts.iter()) {
            let mut batch = sled::Batch::default();
            for key in tree.iter().keys() {
                batch.remove(key?);
            }
            for (k, v) in inserts {
                batch.insert(k.as_slice(), v.as_slice());
            }
            batches.push(batch);
        }

        let result: TransactionResult<(), ()> = trees.as_slice().transaction(|views| {
            for (view, batch) in views.iter().zip(batches.iter()) {
                view.apply_batch(batch)?;
            }
            verify(views.as_slice())
        });
        result.map_err(|err| match err {
            TransactionError::Abort(()) => CatalogError::RebuildAborted,
            TransactionError::Storage(e) => CatalogError::Store(e),
        })?;
        self.db.flush()?;
        Ok(())
    }
}

fn info_written(views: &[TransactionalTree]) -> ConflictableTransactionResult<(), ()> {
    if views[CATALOG].get(INFO_KEY)?.is_none() {
        return Err(ConflictableTransactionError::Abort(()));
    }
    Ok(())
}

/// Serialize records and compute every fan-out key, touching no tree.
fn plan(articles: &[Article], opts: RebuildOptions) -> Result<Plan> {
    let mut plan = Plan { inserts: Default::default(), articles: 0 };
    let mut seen = HashSet::with_capacity(articles.len());

    for article in articles {
        let m = &article.meta;
        if m.draft && !opts.include_draft {
            continue;
        }
        let slug = m.slug.trim();
        if slug.is_empty() {
            continue;
        }
        if !seen.insert(slug) {
            tracing::warn!(slug, path = %article.body.source_path.display(), "duplicate slug passed to rebuild, skipped");
            continue;
        }

        let value = bincode::serialize(m)?;
        plan.put(META, slug.as_bytes().to_vec(), &value);

        let updated = unix_nanos(&m.updated);
        let u_key = sticky_time_key(m.sticky, updated, slug);
        let c_key = sticky_time_key(m.sticky, unix_nanos(&m.date), slug);
        plan.put(IDX_UPDATED, u_key.clone(), SENTINEL);
        plan.put(IDX_CREATED, c_key, SENTINEL);

        for tag in &m.tags {
            put_facet(&mut plan, IDX_TAG, tag.trim(), &u_key, slug);
        }
        put_facet(&mut plan, IDX_CAT, m.category.trim(), &u_key, slug);
        let s_key = series_key(m.series.order, updated, slug);
        put_facet(&mut plan, IDX_SERIES, m.series.name.trim(), &s_key, slug);

        for old in &m.aliases {
            let old = old.trim();
            if !old.is_empty() {
                plan.put(ALIAS, old.as_bytes().to_vec(), slug.as_bytes());
            }
        }
        let short = m.short_id.trim();
        if !short.is_empty() {
            plan.put(SHORT, short.as_bytes().to_vec(), slug.as_bytes());
        }
        plan.articles += 1;
    }

    let info = info_record(plan.articles, opts.include_draft)?;
    plan.put(CATALOG, INFO_KEY.to_vec(), &info);
    Ok(plan)
}

fn put_facet(plan: &mut Plan, slot: usize, facet: &str, key: &[u8], slug: &str) {
    if facet.is_empty() {
        return;
    }
    match facet_prefix(facet) {
        Some(prefix) => plan.put(slot, facet_key(&prefix, key), SENTINEL),
        None => tracing::warn!(slug, facet, "facet value cannot be indexed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ArticleMeta, BodyRef};
    use chrono::{Local, TimeZone};

    fn article(slug: &str, tag: &str) -> Article {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut meta = ArticleMeta::new(slug, at);
        meta.tags = vec![tag.to_string()];
        Article { meta, body: BodyRef { source_path: format!("{slug}.md").into(), content_hash: String::new() } }
    }

    #[test]
    fn aborted_commit_keeps_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("idx")).unwrap();
        store.rebuild(&[article("first", "old")], RebuildOptions::default()).unwrap();

        let next = plan(&[article("second", "new")], RebuildOptions::default()).unwrap();
        let err = store.commit(&next, |_| Err(ConflictableTransactionError::Abort(()))).unwrap_err();
        assert!(matches!(err, CatalogError::RebuildAborted));

        assert!(store.get_meta("first").unwrap().is_some());
        assert!(store.get_meta("second").unwrap().is_none());
        let tags: Vec<_> = store.tag_counts(false).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(tags, vec!["old".to_string()]);
        assert_eq!(store.info().unwrap().unwrap().articles, 1);
    }

    #[test]
    fn plan_skips_excluded_drafts_and_duplicates() {
        let mut draft = article("draft", "x");
        draft.meta.draft = true;
        let items = [article("a", "x"), article("a", "y"), draft, article("", "z")];
        let p = plan(&items, RebuildOptions::default()).unwrap();
        assert_eq!(p.articles, 1);
        assert_eq!(p.inserts[META].len(), 1);
        assert_eq!(p.inserts[IDX_TAG].len(), 1);
        assert_eq!(p.inserts[CATALOG].len(), 1);

        let p = plan(&items, RebuildOptions { include_draft: true }).unwrap();
        assert_eq!(p.articles, 2);
    }
}
