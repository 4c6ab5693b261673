use anyhow::{bail, Context, Result};
use catalog::build::SiteBuilder;
use catalog::views::SiteInfo;
use catalog::{ingest, Config, JsonRenderer, ListOptions, RebuildOptions, SortMode, Store};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_INDEX: &str = ".catalog/index";

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the content catalog index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the source tree, rebuild the index and write every page
    Build {
        /// Site config (YAML); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Source directory, overrides build.source_dir
        #[arg(long)]
        source: Option<PathBuf>,
        /// Index path, overrides build.index_path
        #[arg(long)]
        index: Option<PathBuf>,
        /// Output directory, overrides build.public_dir
        #[arg(long)]
        output: Option<PathBuf>,
        /// Keep draft documents
        #[arg(long, default_value_t = false)]
        include_draft: bool,
    },
    /// List records in index order
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long, conflicts_with_all = ["category", "series"])]
        tag: Option<String>,
        #[arg(long, conflicts_with = "series")]
        category: Option<String>,
        #[arg(long)]
        series: Option<String>,
    },
    /// Print one record by slug, alias or short id
    Get {
        key: String,
        #[arg(long, default_value = DEFAULT_INDEX)]
        index: PathBuf,
    },
    /// Print the home feed
    Home {
        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value = DEFAULT_INDEX)]
    index: PathBuf,
    /// updated | created
    #[arg(long, default_value = "updated")]
    sort: SortMode,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = 10)]
    size: usize,
    #[arg(long, default_value_t = false)]
    include_draft: bool,
}

impl PageArgs {
    fn options(&self) -> ListOptions {
        ListOptions { sort: self.sort, page: self.page, size: self.size, include_draft: self.include_draft }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config, source, index, output, include_draft } => {
            let mut cfg = match config {
                Some(path) => Config::load(&path).with_context(|| format!("load config {}", path.display()))?,
                None => Config::default(),
            };
            if let Some(dir) = source {
                cfg.build.source_dir = dir;
            }
            if let Some(path) = index {
                cfg.build.index_path = path;
            }
            if let Some(dir) = output {
                cfg.build.public_dir = dir;
            }
            cfg.build.include_draft |= include_draft;
            build_site(&cfg)
        }
        Commands::List { page, tag, category, series } => {
            let store = open_store(&page.index)?;
            let opts = page.options();
            let items = match (tag, category, series) {
                (Some(t), _, _) => store.list_by_tag(&t, &opts)?,
                (_, Some(c), _) => store.list_by_category(&c, &opts)?,
                (_, _, Some(s)) => store.list_series(&s, &opts)?,
                _ => store.list(&opts)?,
            };
            print_json(&items)
        }
        Commands::Get { key, index } => {
            let store = open_store(&index)?;
            let slug = match store.resolve_alias(&key)? {
                Some(slug) => Some(slug),
                None => store.resolve_short_id(&key)?,
            };
            match slug {
                Some(slug) => match store.get_meta(&slug)? {
                    Some(meta) => print_json(&meta),
                    None => bail!("not found: {key}"),
                },
                None => bail!("not found: {key}"),
            }
        }
        Commands::Home { page } => {
            let store = open_store(&page.index)?;
            print_json(&store.home_items(&page.options())?)
        }
    }
}

fn build_site(cfg: &Config) -> Result<()> {
    cfg.validate()?;
    let out = ingest(&cfg.build.source_dir)
        .with_context(|| format!("ingest {}", cfg.build.source_dir.display()))?;
    for warning in &out.warnings {
        tracing::warn!(path = %warning.path.display(), "{}", warning.message);
    }

    let store = open_store(&cfg.build.index_path)?;
    store
        .rebuild(&out.articles, RebuildOptions { include_draft: cfg.build.include_draft })
        .context("rebuild index")?;

    let renderer = JsonRenderer::pretty();
    let report = SiteBuilder::new(&store, &renderer, SiteInfo::from(cfg), &cfg.build.public_dir)
        .include_draft(cfg.build.include_draft)
        .build(&out.articles)?;
    store.close()?;

    tracing::info!(
        articles = out.articles.len(),
        warnings = out.warnings.len(),
        pages = report.pages,
        output = %cfg.build.public_dir.display(),
        "build complete"
    );
    Ok(())
}

fn open_store(path: &Path) -> Result<Store> {
    Store::open(path).with_context(|| format!("open index {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
