use catalog::index::keys::{sticky_time_key, unix_nanos};
use catalog::{Article, ArticleMeta, BodyRef, HomeItem, ListOptions, RebuildOptions, SeriesRef, SortMode, Store};
use chrono::{DateTime, Duration, Local, TimeZone};
use tempfile::TempDir;

fn t(day: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
}

fn article(slug: &str, updated: DateTime<Local>) -> Article {
    let mut meta = ArticleMeta::new(slug, updated);
    meta.title = slug.to_uppercase();
    Article {
        meta,
        body: BodyRef { source_path: format!("/src/{slug}.md").into(), content_hash: String::new() },
    }
}

fn open() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("index")).unwrap();
    (dir, store)
}

fn slugs(items: &[ArticleMeta]) -> Vec<&str> {
    items.iter().map(|m| m.slug.as_str()).collect()
}

#[test]
fn fresh_store_is_empty() {
    let (_dir, store) = open();
    assert!(store.list(&ListOptions::default()).unwrap().is_empty());
    assert!(store.get_meta("anything").unwrap().is_none());
    assert!(store.resolve_alias("anything").unwrap().is_none());
    assert!(store.series_names().unwrap().is_empty());
    assert!(store.info().unwrap().is_none());
}

#[test]
fn keys_order_by_sticky_then_newest() {
    let times = [-5_000_000_000i64, -1, 0, 1, 5_000_000_000];
    let mut keys = Vec::new();
    for sticky in [0, 100] {
        for nanos in times {
            keys.push((sticky, nanos, sticky_time_key(sticky, nanos, "s")));
        }
    }
    keys.sort_by(|a, b| a.2.cmp(&b.2));
    let order: Vec<(i32, i64)> = keys.iter().map(|k| (k.0, k.1)).collect();

    let mut expected = Vec::new();
    for sticky in [100, 0] {
        for nanos in times.iter().rev() {
            expected.push((sticky, *nanos));
        }
    }
    assert_eq!(order, expected);
}

#[test]
fn listing_does_not_depend_on_input_order() {
    let a = article("a", t(1));
    let b = article("b", t(2));
    let mut c = article("c", t(3));
    c.meta.sticky = 1;

    let perms = [
        [&a, &b, &c],
        [&a, &c, &b],
        [&b, &a, &c],
        [&b, &c, &a],
        [&c, &a, &b],
        [&c, &b, &a],
    ];
    let (_dir, store) = open();
    for perm in perms {
        let input: Vec<Article> = perm.iter().map(|x| (*x).clone()).collect();
        store.rebuild(&input, RebuildOptions::default()).unwrap();
        let listed = store.list(&ListOptions::default()).unwrap();
        assert_eq!(slugs(&listed), vec!["c", "b", "a"]);
    }
}

#[test]
fn pagination_windows() {
    let (_dir, store) = open();
    let items: Vec<Article> = (1..=5).map(|d| article(&format!("p{d}"), t(d))).collect();
    store.rebuild(&items, RebuildOptions::default()).unwrap();

    let page2 = store.list(&ListOptions::page(2, 2)).unwrap();
    assert_eq!(slugs(&page2), vec!["p3", "p2"]);
    assert!(store.list(&ListOptions::page(10, 10)).unwrap().is_empty());
    assert_eq!(store.list(&ListOptions::page(0, 0)).unwrap().len(), 5);
}

#[test]
fn created_and_updated_orders_differ() {
    let (_dir, store) = open();
    let mut old = article("old", t(1));
    old.meta.updated = t(9);
    let new = article("new", t(5));
    store.rebuild(&[old, new], RebuildOptions::default()).unwrap();

    let by_updated = store.list(&ListOptions::default()).unwrap();
    assert_eq!(slugs(&by_updated), vec!["old", "new"]);
    let by_created = store.list(&ListOptions { sort: SortMode::Created, ..Default::default() }).unwrap();
    assert_eq!(slugs(&by_created), vec!["new", "old"]);
}

#[test]
fn negative_timestamps_sort_below_positive() {
    let (_dir, store) = open();
    let ancient = article("ancient", Local.with_ymd_and_hms(1950, 6, 1, 0, 0, 0).unwrap());
    let epoch = article("epoch", Local.timestamp_opt(0, 0).unwrap());
    let recent = article("recent", t(1));
    store.rebuild(&[ancient, recent, epoch], RebuildOptions::default()).unwrap();
    let listed = store.list(&ListOptions::default()).unwrap();
    assert_eq!(slugs(&listed), vec!["recent", "epoch", "ancient"]);
}

#[test]
fn aliases_and_short_ids_resolve() {
    let (_dir, store) = open();
    let mut a = article("new-home", t(1));
    a.meta.aliases = vec!["old-home".into()];
    a.meta.short_id = "nh".into();
    store.rebuild(&[a], RebuildOptions::default()).unwrap();

    assert_eq!(store.resolve_alias("old-home").unwrap().as_deref(), Some("new-home"));
    assert_eq!(store.resolve_alias(" new-home ").unwrap().as_deref(), Some("new-home"));
    assert!(store.resolve_alias("never-existed").unwrap().is_none());
    assert!(store.resolve_alias("").unwrap().is_none());
    assert_eq!(store.resolve_short_id("nh").unwrap().as_deref(), Some("new-home"));
    assert!(store.resolve_short_id("zz").unwrap().is_none());
}

#[test]
fn drafts_are_filtered_when_written() {
    let (_dir, store) = open();
    let mut wip = article("wip", t(2));
    wip.meta.draft = true;
    let done = article("done", t(1));
    let items = vec![wip, done];

    store.rebuild(&items, RebuildOptions { include_draft: false }).unwrap();
    assert!(store.get_meta("wip").unwrap().is_none());
    let all = ListOptions { include_draft: true, ..Default::default() };
    assert_eq!(slugs(&store.list(&all).unwrap()), vec!["done"]);

    store.rebuild(&items, RebuildOptions { include_draft: true }).unwrap();
    assert!(store.get_meta("wip").unwrap().unwrap().draft);
    assert_eq!(slugs(&store.list(&ListOptions::default()).unwrap()), vec!["done"]);
    assert_eq!(slugs(&store.list(&all).unwrap()), vec!["wip", "done"]);
    assert!(store.info().unwrap().unwrap().include_draft);
}

#[test]
fn hidden_records_stay_out_of_listings() {
    let (_dir, store) = open();
    let mut secret = article("secret", t(3));
    secret.meta.hidden = true;
    secret.meta.tags = vec!["x".into()];
    let mut open_post = article("open", t(1));
    open_post.meta.tags = vec!["x".into()];
    store.rebuild(&[secret, open_post], RebuildOptions::default()).unwrap();

    assert_eq!(slugs(&store.list(&ListOptions::default()).unwrap()), vec!["open"]);
    assert_eq!(slugs(&store.list_by_tag("x", &ListOptions::default()).unwrap()), vec!["open"]);
    assert_eq!(store.tag_counts(false).unwrap()[0].count, 1);
    assert!(store.get_meta("secret").unwrap().is_some());
}

#[test]
fn facet_listings_and_counts() {
    let (_dir, store) = open();
    let mut a = article("a", t(1));
    a.meta.tags = vec!["rust".into(), "db".into()];
    a.meta.category = "notes".into();
    let mut b = article("b", t(2));
    b.meta.tags = vec!["rust".into()];
    b.meta.category = "essays".into();
    let mut c = article("c", t(3));
    c.meta.category = "notes".into();
    store.rebuild(&[a, b, c], RebuildOptions::default()).unwrap();

    let rust = store.list_by_tag(" RUST ", &ListOptions::default()).unwrap();
    assert_eq!(slugs(&rust), vec!["b", "a"]);
    let notes = store.list_by_category("notes", &ListOptions::default()).unwrap();
    assert_eq!(slugs(&notes), vec!["c", "a"]);
    assert!(store.list_by_tag("", &ListOptions::default()).unwrap().is_empty());
    assert!(store.list_by_category("missing", &ListOptions::default()).unwrap().is_empty());

    let tags: Vec<(String, usize)> = store.tag_counts(false).unwrap().into_iter().map(|f| (f.name, f.count)).collect();
    assert_eq!(tags, vec![("db".to_string(), 1), ("rust".to_string(), 2)]);
    let cats: Vec<(String, usize)> =
        store.category_counts(false).unwrap().into_iter().map(|f| (f.name, f.count)).collect();
    assert_eq!(cats, vec![("essays".to_string(), 1), ("notes".to_string(), 2)]);
}

fn series_member(slug: &str, name: &str, order: i64, updated: DateTime<Local>) -> Article {
    let mut a = article(slug, updated);
    a.meta.series = SeriesRef { name: name.into(), order };
    a
}

#[test]
fn series_summary_and_listing() {
    let (_dir, store) = open();
    let items = vec![
        series_member("s2", "go", 2, t(2)),
        series_member("s3", "go", 3, t(3)),
        series_member("s1", "go", 1, t(1)),
        article("solo", t(4)),
    ];
    store.rebuild(&items, RebuildOptions::default()).unwrap();

    let s = store.series_summary("go", false).unwrap().unwrap();
    assert_eq!(s.count, 3);
    assert_eq!(s.latest_updated, t(3));
    assert_eq!(s.representative_slug, "s3");
    assert_eq!(s.max_sticky, 0);

    let members = store.list_series("go", &ListOptions::default()).unwrap();
    assert_eq!(slugs(&members), vec!["s1", "s2", "s3"]);
    assert!(store.series_summary("rust", false).unwrap().is_none());
}

#[test]
fn equal_series_order_lists_newest_first() {
    let (_dir, store) = open();
    let items = vec![series_member("older", "x", 1, t(1)), series_member("newer", "x", 1, t(2))];
    store.rebuild(&items, RebuildOptions::default()).unwrap();
    let members = store.list_series("x", &ListOptions::default()).unwrap();
    assert_eq!(slugs(&members), vec!["newer", "older"]);
}

#[test]
fn series_names_are_distinct_and_sorted() {
    let (_dir, store) = open();
    let items = vec![
        series_member("a1", "beta", 1, t(1)),
        series_member("a2", "beta", 2, t(2)),
        series_member("b1", "alpha", 1, t(3)),
        series_member("c1", "alpha-two", 1, t(4)),
        article("plain", t(5)),
    ];
    store.rebuild(&items, RebuildOptions::default()).unwrap();
    assert_eq!(store.series_names().unwrap(), vec!["alpha", "alpha-two", "beta"]);
}

#[test]
fn home_feed_folds_series() {
    let (_dir, store) = open();
    let mut pinned = article("pinned", t(1));
    pinned.meta.sticky = 10;
    let items = vec![
        pinned,
        article("fresh", t(6)),
        series_member("part1", "guide", 1, t(4)),
        series_member("part2", "guide", 2, t(5)),
        article("stale", t(2)),
    ];
    store.rebuild(&items, RebuildOptions::default()).unwrap();

    let feed = store.home_items(&ListOptions::default()).unwrap();
    assert_eq!(feed.len(), 4);
    assert!(matches!(&feed[0], HomeItem::Post(m) if m.slug == "pinned"));
    assert!(matches!(&feed[1], HomeItem::Post(m) if m.slug == "fresh"));
    match &feed[2] {
        HomeItem::Series(s) => {
            assert_eq!(s.name, "guide");
            assert_eq!(s.count, 2);
            assert_eq!(s.representative_slug, "part2");
        }
        other => panic!("expected series, got {other:?}"),
    }
    assert!(matches!(&feed[3], HomeItem::Post(m) if m.slug == "stale"));
}

#[test]
fn home_feed_ranks_series_by_its_own_sticky() {
    let (_dir, store) = open();
    let mut boosted = series_member("boosted", "pinned-series", 1, t(1));
    boosted.meta.sticky = 5;
    let items = vec![article("newest", t(9)), boosted, series_member("tail", "pinned-series", 2, t(2))];
    store.rebuild(&items, RebuildOptions::default()).unwrap();

    let feed = store.home_items(&ListOptions::default()).unwrap();
    assert_eq!(feed.len(), 2);
    match &feed[0] {
        HomeItem::Series(s) => {
            assert_eq!(s.max_sticky, 5);
            assert_eq!(s.latest_updated, t(2));
        }
        other => panic!("expected series first, got {other:?}"),
    }
}

#[test]
fn home_feed_agrees_with_listing_on_out_of_range_sticky() {
    let (_dir, store) = open();
    let mut negative = article("neg-newest", t(9));
    negative.meta.sticky = -5;
    let mut big = article("big", t(2));
    big.meta.sticky = 500;
    let mut hundred = article("hundred", t(8));
    hundred.meta.sticky = 100;
    let items = vec![negative, article("zero-older", t(1)), big, hundred];
    store.rebuild(&items, RebuildOptions::default()).unwrap();

    let listed = store.list(&ListOptions::default()).unwrap();
    assert_eq!(slugs(&listed), vec!["hundred", "big", "neg-newest", "zero-older"]);
    let feed = store.home_items(&ListOptions::default()).unwrap();
    let fed: Vec<&str> = feed.iter().map(|i| i.slug()).collect();
    assert_eq!(fed, slugs(&listed));
}

#[test]
fn series_summary_clamps_member_sticky() {
    let (_dir, store) = open();
    let mut low = series_member("low", "mixed", 1, t(1));
    low.meta.sticky = -5;
    let mut high = series_member("high", "mixed", 2, t(2));
    high.meta.sticky = 500;
    store.rebuild(&[low.clone()], RebuildOptions::default()).unwrap();
    assert_eq!(store.series_summary("mixed", false).unwrap().unwrap().max_sticky, 0);

    store.rebuild(&[low, high], RebuildOptions::default()).unwrap();
    assert_eq!(store.series_summary("mixed", false).unwrap().unwrap().max_sticky, 100);
}

#[test]
fn rebuild_replaces_previous_generation() {
    let (_dir, store) = open();
    let mut first = article("first", t(1));
    first.meta.tags = vec!["gone".into()];
    first.meta.aliases = vec!["first-old".into()];
    store.rebuild(&[first, article("kept", t(2))], RebuildOptions::default()).unwrap();

    store.rebuild(&[article("kept", t(2))], RebuildOptions::default()).unwrap();
    assert!(store.get_meta("first").unwrap().is_none());
    assert!(store.resolve_alias("first-old").unwrap().is_none());
    assert!(store.tag_counts(false).unwrap().is_empty());
    assert_eq!(store.info().unwrap().unwrap().articles, 1);
}

#[test]
fn index_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("index");
    {
        let store = Store::open(&path).unwrap();
        store.rebuild(&[article("persisted", t(1))], RebuildOptions::default()).unwrap();
        store.close().unwrap();
    }
    let store = Store::open(&path).unwrap();
    let meta = store.get_meta("persisted").unwrap().unwrap();
    assert_eq!(meta.title, "PERSISTED");
    assert_eq!(meta.updated, t(1));
    assert_eq!(store.info().unwrap().unwrap().version, catalog::index::SCHEMA_VERSION);
}

#[test]
fn concurrent_readers_see_whole_generations() {
    let (_dir, store) = open();
    let gen_a: Vec<Article> = (1..=4).map(|d| article(&format!("a{d}"), t(d))).collect();
    let gen_b: Vec<Article> = (1..=6).map(|d| article(&format!("b{d}"), t(d) + Duration::hours(1))).collect();
    store.rebuild(&gen_a, RebuildOptions::default()).unwrap();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..10 {
                let next = if i % 2 == 0 { &gen_b } else { &gen_a };
                store.rebuild(next, RebuildOptions::default()).unwrap();
            }
        });
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let listed = store.list(&ListOptions::page(1, 100)).unwrap();
                    let a = listed.iter().filter(|m| m.slug.starts_with('a')).count();
                    let b = listed.iter().filter(|m| m.slug.starts_with('b')).count();
                    assert!((a, b) == (4, 0) || (a, b) == (0, 6), "mixed generation: {a} + {b}");
                }
            });
        }
    });
}

#[test]
fn sticky_key_uses_clamped_value_only() {
    let over = sticky_time_key(500, unix_nanos(&t(1)), "x");
    let max = sticky_time_key(100, unix_nanos(&t(1)), "x");
    assert_eq!(over, max);
}

#[test]
fn empty_path_is_rejected() {
    assert!(matches!(Store::open(""), Err(catalog::CatalogError::MissingPath)));
}
