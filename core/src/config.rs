//! Site and build configuration, read from YAML.
//!
//! ```yaml
//! site:
//!   title: Notes
//!   site_url: https://notes.example.com
//!   sort_mode: created
//! build:
//!   source_dir: content
//!   include_draft: true
//! ```
//!
//! Fields missing from the file keep their defaults.

use crate::content::SortMode;
use crate::error::{CatalogError, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub site_url: String,
    #[serde(alias = "themes")]
    pub theme: String,
    pub sort_mode: SortMode,
    pub time_zone: String,
    pub language: String,
    pub description: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Catalog".to_string(),
            subtitle: String::new(),
            author: String::new(),
            site_url: "http://localhost:8080".to_string(),
            theme: "default".to_string(),
            sort_mode: SortMode::Updated,
            time_zone: String::new(),
            language: "zh-CN".to_string(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub source_dir: PathBuf,
    pub public_dir: PathBuf,
    pub index_path: PathBuf,
    /// URL prefix the site is served under; empty or `/x`, never ending in `/`.
    pub base_path: String,
    pub include_draft: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            public_dir: PathBuf::from("public"),
            index_path: PathBuf::from(".catalog/index"),
            base_path: String::new(),
            include_draft: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub build: BuildConfig,
}

impl Config {
    /// Read and validate `path`. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(data) => Self::from_yaml(&data),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                let cfg = Self::default();
                cfg.validate()?;
                Ok(cfg)
            }
            Err(err) => Err(CatalogError::Io(err)),
        }
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg = if data.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str::<Option<Self>>(data)?.unwrap_or_default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every field and report all problems at once.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut ve = ValidationError::default();

        if self.site.title.trim().is_empty() {
            ve.add("site.title", "must not be empty");
        }
        let url = self.site.site_url.trim();
        if url.is_empty() {
            ve.add("site.site_url", "must not be empty");
        } else if !is_absolute_http_url(url) {
            ve.add("site.site_url", "must be a valid absolute URL");
        }
        if self.site.theme.trim().is_empty() {
            ve.add("site.theme", "must not be empty");
        }

        if self.build.source_dir.as_os_str().is_empty() {
            ve.add("build.source_dir", "must not be empty");
        }
        if self.build.public_dir.as_os_str().is_empty() {
            ve.add("build.public_dir", "must not be empty");
        }
        if self.build.index_path.as_os_str().is_empty() {
            ve.add("build.index_path", "must not be empty");
        }
        let bp = self.build.base_path.trim();
        if !bp.is_empty() {
            if !bp.starts_with('/') {
                ve.add("build.base_path", "must start with '/'");
            }
            if bp.ends_with('/') && bp != "/" {
                ve.add("build.base_path", "must not end with '/'");
            }
        }

        if ve.has_any() {
            return Err(ve);
        }
        Ok(())
    }
}

fn is_absolute_http_url(s: &str) -> bool {
    let rest = match s.split_once("://") {
        Some(("http", rest)) | Some(("https", rest)) => rest,
        _ => return false,
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.rsplit('@').next().unwrap_or_default();
    !host.is_empty() && !host.starts_with(':') && !host.contains(char::is_whitespace)
}
