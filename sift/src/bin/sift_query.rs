//! Run one query against a catalog file and print the ranking.
//!
//! Usage:
//!     sift-query --catalog catalog.json [--config search.json] [--limit 20] <terms>...

use anyhow::{Context, Result};
use clap::Parser;
use sift::{CandidateFields, CatalogList, SearchConfig, SearchEngine, SearchEngineApi};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(about = "Query a software catalog with the sift ranking engine")]
struct Args {
    /// JSON array of catalog entries
    #[arg(long)]
    catalog: PathBuf,

    /// JSON search configuration (engine settings and bias rules)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of results to print
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Pre-tokenized query terms; none prints the catalog unranked
    terms: Vec<String>,
}

fn init_logging() {
    // warn+ to stderr unless RUST_LOG overrides
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SearchConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => SearchConfig::default(),
    };

    let json = std::fs::read_to_string(&args.catalog)
        .with_context(|| format!("reading {}", args.catalog.display()))?;
    let entries: Vec<CandidateFields> = serde_json::from_str(&json).context("parsing catalog")?;

    let engine = SearchEngine::from_config(&config)?;
    engine.set_model(Some(Arc::new(CatalogList::from_fields(entries))));

    let terms = if args.terms.is_empty() { vec![String::new()] } else { args.terms };
    let finished = engine.query(terms).await?;

    println!("query: \"{}\" ({} results)", finished.interpreted_query, finished.n_results);
    for result in finished.results.iter().take(args.limit) {
        let fields = result.candidate.read();
        let score = result.score.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
        println!(
            "{:>12}  #{:<6} {}  {}",
            score,
            result.original_index,
            fields.id,
            fields.title.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
