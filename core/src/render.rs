use crate::error::Result;
use crate::views::{
    ArchivesPage, CategoriesPage, HomePage, ListPage, NotFoundPage, PostPage, SeriesPage, TagsPage,
};
use serde::Serialize;

/// Turns a page view into output bytes. One method per page type.
pub trait Renderer: Send + Sync {
    fn render_home(&self, page: &HomePage) -> Result<Vec<u8>>;
    fn render_post(&self, page: &PostPage) -> Result<Vec<u8>>;
    fn render_series(&self, page: &SeriesPage) -> Result<Vec<u8>>;
    fn render_list(&self, page: &ListPage) -> Result<Vec<u8>>;
    fn render_not_found(&self, page: &NotFoundPage) -> Result<Vec<u8>>;
    fn render_archives(&self, page: &ArchivesPage) -> Result<Vec<u8>>;
    fn render_tags(&self, page: &TagsPage) -> Result<Vec<u8>>;
    fn render_categories(&self, page: &CategoriesPage) -> Result<Vec<u8>>;

    /// Extension of materialized files, without the dot.
    fn file_extension(&self) -> &str {
        "html"
    }
}

/// Writes every view as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl JsonRenderer {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    fn encode<T: Serialize>(&self, page: &T) -> Result<Vec<u8>> {
        let bytes = if self.pretty { serde_json::to_vec_pretty(page)? } else { serde_json::to_vec(page)? };
        Ok(bytes)
    }
}

impl Renderer for JsonRenderer {
    fn render_home(&self, page: &HomePage) -> Result<Vec<u8>> { self.encode(page) }
    fn render_post(&self, page: &PostPage) -> Result<Vec<u8>> { self.encode(page) }
    fn render_series(&self, page: &SeriesPage) -> Result<Vec<u8>> { self.encode(page) }
    fn render_list(&self, page: &ListPage) -> Result<Vec<u8>> { self.encode(page) }
    fn render_not_found(&self, page: &NotFoundPage) -> Result<Vec<u8>> { self.encode(page) }
    fn render_archives(&self, page: &ArchivesPage) -> Result<Vec<u8>> { self.encode(page) }
    fn render_tags(&self, page: &TagsPage) -> Result<Vec<u8>> { self.encode(page) }
    fn render_categories(&self, page: &CategoriesPage) -> Result<Vec<u8>> { self.encode(page) }

    fn file_extension(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::views::{not_found_page, SiteInfo};

    #[test]
    fn json_renderer_encodes_views() {
        let site = SiteInfo::from(&Config::default());
        let out = JsonRenderer::default().render_not_found(&not_found_page(&site, "/nope")).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["path"], "/nope");
        assert_eq!(v["site"]["sort_mode"], "updated");
        assert_eq!(JsonRenderer::pretty().file_extension(), "json");
    }
}
