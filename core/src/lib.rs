//! Content catalog: turns a directory of documents with metadata headers into
//! an ordered, queryable index and the listing views derived from it.

pub mod build;
pub mod config;
pub mod content;
pub mod discover;
pub mod error;
pub mod frontmatter;
pub mod index;
pub mod ingest;
pub mod render;
pub mod text;
pub mod views;

pub use config::Config;
pub use content::{Article, ArticleMeta, BodyRef, Heading, SeriesRef, SortMode};
pub use error::{CatalogError, Result};
pub use index::{FacetCount, HomeItem, ListOptions, RebuildOptions, SeriesSummary, Store, StoreInfo};
pub use ingest::{ingest, IngestOutput, Warning};
pub use render::{JsonRenderer, Renderer};
