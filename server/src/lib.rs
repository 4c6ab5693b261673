use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use catalog::views::{self, PostPage, SiteInfo, HOME_PAGE_SIZE};
use catalog::{ingest, Article, Config, JsonRenderer, RebuildOptions, Renderer, SeriesSummary, SortMode, Store};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod reload;
pub mod watch;

pub use error::ApiError;
pub use reload::ReloadHub;

type ApiResult = std::result::Result<Response, ApiError>;

/// Shared by every handler and the watcher thread.
pub struct AppState {
    pub config: Config,
    pub site: SiteInfo,
    pub store: Arc<Store>,
    pub reload: ReloadHub,
    /// slug → article of the current generation, swapped wholesale.
    snapshot: RwLock<HashMap<String, Article>>,
    refreshing: Mutex<()>,
    renderer: JsonRenderer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub articles: usize,
    pub warnings: usize,
    pub generation: u64,
}

impl AppState {
    pub fn new(config: Config, store: Arc<Store>) -> Self {
        Self {
            site: SiteInfo::from(&config),
            config,
            store,
            reload: ReloadHub::new(),
            snapshot: RwLock::new(HashMap::new()),
            refreshing: Mutex::new(()),
            renderer: JsonRenderer::default(),
        }
    }

    /// Ingest the source tree, rebuild the index, swap the snapshot and tell
    /// listeners. On failure the previous generation stays in place.
    pub fn refresh(&self) -> Result<RefreshReport> {
        let _running = self.refreshing.lock();
        let source = &self.config.build.source_dir;
        let out = ingest(source).with_context(|| format!("ingest {}", source.display()))?;
        for warning in &out.warnings {
            tracing::warn!(path = %warning.path.display(), "{}", warning.message);
        }

        let include_draft = self.config.build.include_draft;
        let next: HashMap<String, Article> = out
            .articles
            .iter()
            .filter(|a| include_draft || !a.meta.draft)
            .map(|a| (a.meta.slug.clone(), a.clone()))
            .collect();
        let articles = next.len();

        // Held across the commit so a slug found in the new index is also
        // found in the snapshot.
        let mut snapshot = self.snapshot.write();
        self.store
            .rebuild(&out.articles, RebuildOptions { include_draft })
            .context("rebuild index")?;
        *snapshot = next;
        drop(snapshot);

        let generation = self.reload.broadcast();
        tracing::info!(articles, warnings = out.warnings.len(), generation, "catalog refreshed");
        Ok(RefreshReport { articles, warnings: out.warnings.len(), generation })
    }

    pub fn article(&self, slug: &str) -> Option<Article> {
        self.snapshot.read().get(slug).cloned()
    }
}

pub fn build_app(state: Arc<AppState>) -> Router {
    // CORS_ALLOW_ORIGIN is a comma-separated origin list; unset or empty means any
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/home", get(home_handler))
        .route("/api/posts", get(posts_handler))
        .route("/api/posts/:slug", get(post_handler))
        .route("/s/:short", get(short_handler))
        .route("/api/tags", get(tags_handler))
        .route("/api/tags/:tag", get(tag_handler))
        .route("/api/categories", get(categories_handler))
        .route("/api/categories/:category", get(category_handler))
        .route("/api/series", get(all_series_handler))
        .route("/api/series/:name", get(series_handler))
        .route("/api/archives", get(archives_handler))
        .route("/dev/events", get(events_handler))
        .fallback(fallback_handler)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub size: usize,
    pub sort: Option<SortMode>,
}

fn json_page(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], bytes).into_response()
}

fn not_found(state: &AppState, path: &str) -> ApiResult {
    let bytes = state.renderer.render_not_found(&views::not_found_page(&state.site, path))?;
    Ok((StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

fn moved(location: String) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

pub async fn home_handler(State(state): State<Arc<AppState>>, Query(p): Query<PageParams>) -> ApiResult {
    let size = if p.size == 0 { HOME_PAGE_SIZE } else { p.size };
    let page = views::home_page(&state.store, &state.site, p.page, size)?;
    Ok(json_page(state.renderer.render_home(&page)?))
}

pub async fn posts_handler(State(state): State<Arc<AppState>>, Query(p): Query<PageParams>) -> ApiResult {
    let sort = p.sort.unwrap_or(state.site.sort_mode);
    let page = views::posts_page(&state.store, &state.site, sort, p.page, p.size)?;
    Ok(json_page(state.renderer.render_list(&page)?))
}

enum PostLookup {
    Found(Box<PostPage>),
    Moved(String),
    Missing,
}

/// Index lookups plus the source read; runs on the blocking pool.
fn lookup_post(state: &AppState, slug: &str) -> catalog::Result<PostLookup> {
    let Some(canonical) = state.store.resolve_alias(slug)? else {
        return Ok(PostLookup::Missing);
    };
    if canonical != slug {
        return Ok(PostLookup::Moved(canonical));
    }
    let (Some(meta), Some(article)) = (state.store.get_meta(slug)?, state.article(slug)) else {
        return Ok(PostLookup::Missing);
    };
    let page = views::post_page(&state.store, &state.site, meta, &article.body.source_path)?;
    Ok(PostLookup::Found(Box::new(page)))
}

/// A live slug renders the post; an old slug redirects to its current one.
pub async fn post_handler(State(state): State<Arc<AppState>>, Path(slug): Path<String>, uri: Uri) -> ApiResult {
    let worker = Arc::clone(&state);
    let lookup = tokio::task::spawn_blocking(move || lookup_post(&worker, &slug))
        .await
        .map_err(|err| ApiError::internal(err.to_string()))??;
    match lookup {
        PostLookup::Found(page) => Ok(json_page(state.renderer.render_post(&page)?)),
        PostLookup::Moved(canonical) => Ok(moved(format!("/api/posts/{canonical}"))),
        PostLookup::Missing => not_found(&state, uri.path()),
    }
}

pub async fn short_handler(State(state): State<Arc<AppState>>, Path(short): Path<String>, uri: Uri) -> ApiResult {
    match state.store.resolve_short_id(&short)? {
        Some(slug) => Ok(moved(format!("/api/posts/{slug}"))),
        None => not_found(&state, uri.path()),
    }
}

pub async fn tags_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let page = views::tags_page(&state.store, &state.site)?;
    Ok(json_page(state.renderer.render_tags(&page)?))
}

pub async fn tag_handler(State(state): State<Arc<AppState>>, Path(tag): Path<String>, uri: Uri) -> ApiResult {
    match views::tag_page(&state.store, &state.site, &tag)? {
        Some(page) => Ok(json_page(state.renderer.render_list(&page)?)),
        None => not_found(&state, uri.path()),
    }
}

pub async fn categories_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let page = views::categories_page(&state.store, &state.site)?;
    Ok(json_page(state.renderer.render_categories(&page)?))
}

pub async fn category_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    uri: Uri,
) -> ApiResult {
    match views::category_page(&state.store, &state.site, &category)? {
        Some(page) => Ok(json_page(state.renderer.render_list(&page)?)),
        None => not_found(&state, uri.path()),
    }
}

pub async fn all_series_handler(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<Vec<SeriesSummary>>, ApiError> {
    let mut out = Vec::new();
    for name in state.store.series_names()? {
        if let Some(summary) = state.store.series_summary(&name, false)? {
            out.push(summary);
        }
    }
    Ok(Json(out))
}

pub async fn series_handler(State(state): State<Arc<AppState>>, Path(name): Path<String>, uri: Uri) -> ApiResult {
    match views::series_page(&state.store, &state.site, &name)? {
        Some(page) => Ok(json_page(state.renderer.render_series(&page)?)),
        None => not_found(&state, uri.path()),
    }
}

pub async fn archives_handler(State(state): State<Arc<AppState>>) -> ApiResult {
    let page = views::archives_page(&state.store, &state.site)?;
    Ok(json_page(state.renderer.render_archives(&page)?))
}

/// `hello` on connect, then one `reload` per refreshed generation.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.reload.subscribe();
    let hello = tokio_stream::once(Ok::<_, Infallible>(
        Event::default().event("hello").data(state.reload.generation().to_string()),
    ));
    let reloads = ReceiverStream::new(rx)
        .map(|generation| Ok::<_, Infallible>(Event::default().event("reload").data(generation.to_string())));
    Sse::new(hello.chain(reloads)).keep_alive(KeepAlive::default())
}

async fn fallback_handler(State(state): State<Arc<AppState>>, uri: Uri) -> ApiResult {
    not_found(&state, uri.path())
}
