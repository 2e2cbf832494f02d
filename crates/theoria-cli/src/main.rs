use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use theoria_core::StreamedSearchEvent;
use theoria_engine::discovery::DuckDuckGoDiscovery;
use theoria_engine::fetch::HttpPageFetcher;
use theoria_engine::search_engine::{self, SearchOptions};
use theoria_engine::{Index, LiveSearchConfig, LiveSearchEngine};

#[derive(Parser, Debug)]
#[command(name = "theoria")]
#[command(about = "Live-search retrieval over scholarly theology and philosophy material", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one query through the live orchestrator or the indexed engine.
    Search(SearchCmd),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Live,
    Indexed,
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    /// The search query.
    query: String,

    /// Number of ranked results to return.
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Retrieval mode: fetch pages live, or search a pre-built local index.
    #[arg(long, value_enum, default_value_t = Mode::Live)]
    mode: Mode,

    /// Directory of files to index for `--mode indexed` (`.html`/`.htm` are
    /// parsed for title/text; everything else is indexed as plain text).
    #[arg(long)]
    index_path: Option<PathBuf>,

    /// Emit the two-phase `discovery`/`scored` events instead of one final result.
    #[arg(long)]
    stream: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_env("THEORIA_LOG"));
    #[cfg(feature = "log-json")]
    subscriber.json().init();
    #[cfg(not(feature = "log-json"))]
    subscriber.init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Search(cmd) => run_search(cmd).await,
    }
}

async fn run_search(cmd: SearchCmd) -> anyhow::Result<()> {
    match cmd.mode {
        Mode::Live => run_live_search(&cmd).await,
        Mode::Indexed => run_indexed_search(&cmd),
    }
}

async fn run_live_search(cmd: &SearchCmd) -> anyhow::Result<()> {
    let config = LiveSearchConfig::from_env();
    let cache_ttl = config.cache_ttl();
    let discovery = Arc::new(DuckDuckGoDiscovery::new(config.discovery_timeout())?);
    let fetcher = Arc::new(HttpPageFetcher::new()?);
    let engine = LiveSearchEngine::new(discovery, fetcher, config)
        .with_cache(Arc::new(theoria_engine::cache::ResponseCache::new(cache_ttl)));

    if cmd.stream {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<StreamedSearchEvent>(2);
        let query = cmd.query.clone();
        let top_n = cmd.top_n;
        let handle = tokio::spawn(async move {
            engine.search_streaming(&query, top_n, tx).await;
        });
        while let Some(event) = rx.recv().await {
            println!("{}", serde_json::to_string(&event)?);
        }
        handle.await?;
    } else {
        let result = engine.search(&cmd.query, cmd.top_n).await;
        println!("{}", serde_json::to_string(&result)?);
    }
    Ok(())
}

fn run_indexed_search(cmd: &SearchCmd) -> anyhow::Result<()> {
    let index_path = cmd
        .index_path
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("--index-path is required for --mode indexed"))?;
    let index = Index::new();
    load_directory_into_index(&index, index_path)?;
    let config = theoria_engine::LiveSearchConfig::from_env();
    let options = SearchOptions { bm25_k1: config.bm25_k1, bm25_b: config.bm25_b, ..SearchOptions::default() };
    let result = search_engine::search(&index, &cmd.query, cmd.top_n, &options);
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

fn load_directory_into_index(index: &Index, dir: &std::path::Path) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            load_directory_into_index(index, &path)?;
            continue;
        }
        let Ok(raw) = std::fs::read_to_string(&path) else { continue };
        let id = path.to_string_lossy().to_string();
        let is_html = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("html") | Some("htm")
        );

        let (title, content, content_type) = if is_html {
            let extracted = theoria_engine::html::extract(&raw, None);
            (extracted.title, extracted.text, theoria_core::ContentType::Html)
        } else {
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            (title, raw, theoria_core::ContentType::Markdown)
        };

        index.add_document(
            theoria_core::DocumentMeta {
                id: id.clone(),
                title,
                url: None,
                source_path: Some(id),
                content_type,
                last_indexed_at_epoch_s: 0,
            },
            &content,
        );
    }
    Ok(())
}
