//! Materializes every page of the site to an output directory.

use crate::content::Article;
use crate::index::Store;
use crate::render::Renderer;
use crate::views::{self, post_dir, safe_path_segment, SiteInfo, HOME_PAGE_SIZE};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub posts: usize,
    pub pages: usize,
}

pub struct SiteBuilder<'a, R: Renderer + ?Sized> {
    store: &'a Store,
    renderer: &'a R,
    site: SiteInfo,
    out_dir: PathBuf,
    include_draft: bool,
}

impl<'a, R: Renderer + ?Sized> SiteBuilder<'a, R> {
    pub fn new(store: &'a Store, renderer: &'a R, site: SiteInfo, out_dir: impl Into<PathBuf>) -> Self {
        Self { store, renderer, site, out_dir: out_dir.into(), include_draft: false }
    }

    /// Also write post pages for drafts.
    pub fn include_draft(mut self, yes: bool) -> Self {
        self.include_draft = yes;
        self
    }

    /// Write every page. `articles` supplies post bodies; listings come from
    /// the store, which must already hold the same generation.
    pub fn build(&self, articles: &[Article]) -> Result<BuildReport> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("create output dir {}", self.out_dir.display()))?;
        let mut report = BuildReport::default();

        self.build_home(&mut report).context("build home")?;
        self.build_posts(articles, &mut report).context("build posts")?;
        self.build_series(&mut report).context("build series")?;
        self.build_tags(&mut report).context("build tags")?;
        self.build_categories(&mut report).context("build categories")?;
        self.build_not_found(&mut report).context("build 404")?;
        self.build_archives(&mut report).context("build archives")?;
        self.build_overviews(&mut report).context("build overviews")?;

        tracing::info!(out = %self.out_dir.display(), posts = report.posts, pages = report.pages, "site written");
        Ok(report)
    }

    fn build_home(&self, report: &mut BuildReport) -> Result<()> {
        let page = views::home_page(self.store, &self.site, 1, HOME_PAGE_SIZE)?;
        let bytes = self.renderer.render_home(&page)?;
        self.write(&self.index_file(Path::new("")), &bytes, report)
    }

    fn build_posts(&self, articles: &[Article], report: &mut BuildReport) -> Result<()> {
        for article in articles {
            let meta = &article.meta;
            if meta.hidden || (meta.draft && !self.include_draft) {
                continue;
            }
            let source = &article.body.source_path;
            let page = views::post_page(self.store, &self.site, meta.clone(), source)
                .with_context(|| format!("read post source {}", source.display()))?;
            let bytes = self
                .renderer
                .render_post(&page)
                .with_context(|| format!("render post {}", meta.slug))?;
            self.write(&self.index_file(&post_dir(meta)), &bytes, report)?;
            report.posts += 1;
        }
        Ok(())
    }

    fn build_series(&self, report: &mut BuildReport) -> Result<()> {
        for name in self.store.series_names()? {
            let Some(page) = views::series_page(self.store, &self.site, &name)? else { continue };
            let bytes = self
                .renderer
                .render_series(&page)
                .with_context(|| format!("render series {name}"))?;
            let dir = Path::new("series").join(safe_path_segment(&name));
            self.write(&self.index_file(&dir), &bytes, report)?;
        }
        Ok(())
    }

    fn build_tags(&self, report: &mut BuildReport) -> Result<()> {
        for tag in self.store.tag_counts(false)? {
            let Some(page) = views::tag_page(self.store, &self.site, &tag.name)? else { continue };
            let bytes = self
                .renderer
                .render_list(&page)
                .with_context(|| format!("render tag {}", tag.name))?;
            let dir = Path::new("tags").join(safe_path_segment(&tag.name));
            self.write(&self.index_file(&dir), &bytes, report)?;
        }
        Ok(())
    }

    fn build_categories(&self, report: &mut BuildReport) -> Result<()> {
        for cat in self.store.category_counts(false)? {
            let Some(page) = views::category_page(self.store, &self.site, &cat.name)? else { continue };
            let bytes = self
                .renderer
                .render_list(&page)
                .with_context(|| format!("render category {}", cat.name))?;
            let dir = Path::new("categories").join(safe_path_segment(&cat.name));
            self.write(&self.index_file(&dir), &bytes, report)?;
        }
        Ok(())
    }

    fn build_not_found(&self, report: &mut BuildReport) -> Result<()> {
        let bytes = self.renderer.render_not_found(&views::not_found_page(&self.site, ""))?;
        let file = PathBuf::from(format!("404.{}", self.renderer.file_extension()));
        self.write(&file, &bytes, report)
    }

    fn build_archives(&self, report: &mut BuildReport) -> Result<()> {
        let page = views::archives_page(self.store, &self.site)?;
        let bytes = self.renderer.render_archives(&page)?;
        self.write(&self.index_file(Path::new("archives")), &bytes, report)
    }

    fn build_overviews(&self, report: &mut BuildReport) -> Result<()> {
        let tags = views::tags_page(self.store, &self.site)?;
        let bytes = self.renderer.render_tags(&tags).context("render tags overview")?;
        self.write(&self.index_file(Path::new("tags")), &bytes, report)?;

        let cats = views::categories_page(self.store, &self.site)?;
        let bytes = self.renderer.render_categories(&cats).context("render categories overview")?;
        self.write(&self.index_file(Path::new("categories")), &bytes, report)
    }

    fn index_file(&self, dir: &Path) -> PathBuf {
        dir.join(format!("index.{}", self.renderer.file_extension()))
    }

    fn write(&self, rel: &Path, bytes: &[u8], report: &mut BuildReport) -> Result<()> {
        let full = self.out_dir.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, bytes).with_context(|| format!("write {}", full.display()))?;
        tracing::debug!(path = %rel.display(), bytes = bytes.len(), "page written");
        report.pages += 1;
        Ok(())
    }
}
