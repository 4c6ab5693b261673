//! Page views and the queries that assemble them.
//!
//! Both the site materializer and the HTTP service build pages through the
//! functions here, so a page has the same shape wherever it is produced.

use crate::config::Config;
use crate::content::{ArticleMeta, Heading, SortMode};
use crate::error::Result;
use crate::frontmatter::body_of;
use crate::index::{FacetCount, HomeItem, ListOptions, Store, MAX_PAGE_SIZE};
use chrono::{DateTime, Datelike, Local};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref UNSAFE_PATH_CHAR: Regex = Regex::new(r"[^\p{L}\p{Nd}_-]").expect("valid regex");
}

pub const HOME_PAGE_SIZE: usize = 20;

/// Site-wide fields every page carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteInfo {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub site_url: String,
    pub description: String,
    pub language: String,
    pub theme: String,
    pub base_path: String,
    pub sort_mode: SortMode,
}

impl From<&Config> for SiteInfo {
    fn from(cfg: &Config) -> Self {
        Self {
            title: cfg.site.title.clone(),
            subtitle: cfg.site.subtitle.clone(),
            author: cfg.site.author.clone(),
            site_url: cfg.site.site_url.clone(),
            description: cfg.site.description.clone(),
            language: cfg.site.language.clone(),
            theme: cfg.site.theme.clone(),
            base_path: cfg.build.base_path.trim().to_string(),
            sort_mode: cfg.site.sort_mode,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HomeEntry {
    Post {
        meta: ArticleMeta,
    },
    Series {
        name: String,
        count: usize,
        latest_updated: DateTime<Local>,
        max_sticky: i32,
        representative: Option<ArticleMeta>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub site: SiteInfo,
    pub title: String,
    pub items: Vec<HomeEntry>,
    pub page: usize,
    pub page_size: usize,
    pub generated: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub site: SiteInfo,
    pub title: String,
    pub meta: ArticleMeta,
    /// Markdown body with the header removed.
    pub body: String,
    pub toc: Vec<Heading>,
    pub series_name: String,
    pub series_list: Vec<ArticleMeta>,
    pub is_draft: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesPage {
    pub site: SiteInfo,
    pub title: String,
    pub name: String,
    pub items: Vec<ArticleMeta>,
    pub count: usize,
    pub latest: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListPage {
    pub site: SiteInfo,
    pub title: String,
    pub items: Vec<ArticleMeta>,
    pub page: usize,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub generated: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotFoundPage {
    pub site: SiteInfo,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchivesGroup {
    pub year: i32,
    pub count: usize,
    pub posts: Vec<ArticleMeta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchivesPage {
    pub site: SiteInfo,
    pub title: String,
    pub groups: Vec<ArchivesGroup>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagsPage {
    pub site: SiteInfo,
    pub title: String,
    pub tags: Vec<FacetCount>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoriesPage {
    pub site: SiteInfo,
    pub title: String,
    pub categories: Vec<FacetCount>,
    pub total: usize,
}

fn public_opts(site: &SiteInfo, page: usize, size: usize) -> ListOptions {
    ListOptions { sort: site.sort_mode, page, size, include_draft: false }
}

pub fn home_page(store: &Store, site: &SiteInfo, page: usize, size: usize) -> Result<HomePage> {
    let opts = public_opts(site, page, size);
    let (page, page_size) = opts.normalized();
    let mut items = Vec::new();
    for item in store.home_items(&opts)? {
        items.push(match item {
            HomeItem::Post(meta) => HomeEntry::Post { meta },
            HomeItem::Series(s) => HomeEntry::Series {
                representative: store.get_meta(&s.representative_slug)?,
                name: s.name,
                count: s.count,
                latest_updated: s.latest_updated,
                max_sticky: s.max_sticky,
            },
        });
    }
    Ok(HomePage {
        site: site.clone(),
        title: "Home".to_string(),
        items,
        page,
        page_size,
        generated: Local::now(),
    })
}

/// Post page for `meta`, with the body read from `source` and the series
/// sidebar filled from the index.
pub fn post_page(store: &Store, site: &SiteInfo, meta: ArticleMeta, source: &Path) -> Result<PostPage> {
    let raw = fs::read(source)?;
    let body = body_of(&String::from_utf8_lossy(&raw));
    let series_list = if meta.in_series() {
        collect_all(site, |opts| store.list_series(&meta.series.name, opts))?
    } else {
        Vec::new()
    };
    Ok(PostPage {
        site: site.clone(),
        title: meta.title.clone(),
        toc: meta.headings.clone(),
        series_name: meta.series.name.clone(),
        is_draft: meta.draft,
        series_list,
        body,
        meta,
    })
}

pub fn series_page(store: &Store, site: &SiteInfo, name: &str) -> Result<Option<SeriesPage>> {
    let Some(summary) = store.series_summary(name, false)? else { return Ok(None) };
    let items = collect_all(site, |opts| store.list_series(&summary.name, opts))?;
    Ok(Some(SeriesPage {
        site: site.clone(),
        title: format!("Series: {}", summary.name),
        name: summary.name,
        count: summary.count,
        latest: summary.latest_updated,
        items,
    }))
}

/// Chronological listing; `page` and `size` as in [`ListOptions`].
pub fn posts_page(store: &Store, site: &SiteInfo, sort: SortMode, page: usize, size: usize) -> Result<ListPage> {
    let opts = ListOptions { sort, ..public_opts(site, page, size) };
    let (page, page_size) = opts.normalized();
    Ok(ListPage {
        site: site.clone(),
        title: "Posts".to_string(),
        items: store.list(&opts)?,
        page,
        page_size,
        tag: None,
        category: None,
        generated: Local::now(),
    })
}

/// Every visible post under `tag`, or `None` when there are none.
pub fn tag_page(store: &Store, site: &SiteInfo, tag: &str) -> Result<Option<ListPage>> {
    let tag = tag.trim().to_lowercase();
    let items = collect_all(site, |opts| store.list_by_tag(&tag, opts))?;
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(ListPage {
        site: site.clone(),
        title: format!("Tag: {tag}"),
        page: 1,
        page_size: items.len(),
        items,
        tag: Some(tag),
        category: None,
        generated: Local::now(),
    }))
}

pub fn category_page(store: &Store, site: &SiteInfo, category: &str) -> Result<Option<ListPage>> {
    let category = category.trim().to_string();
    let items = collect_all(site, |opts| store.list_by_category(&category, opts))?;
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(ListPage {
        site: site.clone(),
        title: format!("Category: {category}"),
        page: 1,
        page_size: items.len(),
        items,
        tag: None,
        category: Some(category),
        generated: Local::now(),
    }))
}

/// Every visible post grouped by creation year, newest year first.
pub fn archives_page(store: &Store, site: &SiteInfo) -> Result<ArchivesPage> {
    let posts = collect_all(site, |opts| store.list(opts))?;
    let total = posts.len();
    let mut by_year: BTreeMap<i32, Vec<ArticleMeta>> = BTreeMap::new();
    for meta in posts {
        by_year.entry(meta.date.year()).or_default().push(meta);
    }
    let groups = by_year
        .into_iter()
        .rev()
        .map(|(year, posts)| ArchivesGroup { year, count: posts.len(), posts })
        .collect();
    Ok(ArchivesPage { site: site.clone(), title: "Archives".to_string(), groups, total })
}

pub fn tags_page(store: &Store, site: &SiteInfo) -> Result<TagsPage> {
    let tags = by_popularity(store.tag_counts(false)?);
    Ok(TagsPage { site: site.clone(), title: "Tags".to_string(), total: tags.len(), tags })
}

pub fn categories_page(store: &Store, site: &SiteInfo) -> Result<CategoriesPage> {
    let categories = by_popularity(store.category_counts(false)?);
    Ok(CategoriesPage { site: site.clone(), title: "Categories".to_string(), total: categories.len(), categories })
}

pub fn not_found_page(site: &SiteInfo, path: &str) -> NotFoundPage {
    NotFoundPage { site: site.clone(), path: path.to_string() }
}

/// Count desc, then name.
fn by_popularity(mut counts: Vec<FacetCount>) -> Vec<FacetCount> {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts
}

/// Drain a paged listing from the first page until a short page.
fn collect_all<F>(site: &SiteInfo, mut fetch: F) -> Result<Vec<ArticleMeta>>
where
    F: FnMut(&ListOptions) -> Result<Vec<ArticleMeta>>,
{
    let mut out = Vec::new();
    let mut page = 1;
    loop {
        let batch = fetch(&public_opts(site, page, MAX_PAGE_SIZE))?;
        let done = batch.len() < MAX_PAGE_SIZE;
        out.extend(batch);
        if done {
            return Ok(out);
        }
        page += 1;
    }
}

/// `post/YYYY/MM/DD/<slug>`, dated by creation time.
pub fn post_dir(meta: &ArticleMeta) -> PathBuf {
    let d = meta.date;
    PathBuf::from("post")
        .join(format!("{:04}", d.year()))
        .join(format!("{:02}", d.month()))
        .join(format!("{:02}", d.day()))
        .join(&meta.slug)
}

/// Letters, digits, `-` and `_` kept; anything else becomes `-`. Used for
/// free-form facet names; slugs are already path-safe.
pub fn safe_path_segment(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        return "untitled".to_string();
    }
    UNSAFE_PATH_CHAR.replace_all(s, "-").into_owned()
}
