mod analysis;
mod analyzer;
mod cache;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod search;
mod state;
#[cfg(test)]
mod testing;
mod vocabulary;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analyzer::{AnalysisRequest, DEFAULT_PAGE_BUDGET};
use crate::cache::cache_key;
use crate::config::Config;
use crate::state::AppState;

#[derive(Parser)]
#[command(author, version, about = "Job-market skill signals from live postings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search postings, extract skills and print the market profile as JSON
    Analyze {
        #[command(flatten)]
        target: Target,

        /// Maximum number of ranked skills
        #[arg(long, default_value_t = 30)]
        top_n: usize,

        /// Plain top-N by count, without category balancing
        #[arg(long)]
        unbalanced: bool,

        /// Group skills by category instead of a single ranking
        #[arg(long)]
        by_category: bool,

        /// Pages to request from each provider
        #[arg(long, default_value_t = DEFAULT_PAGE_BUDGET)]
        pages: u32,

        /// Ignore any cached profile and refresh it
        #[arg(long)]
        no_cache: bool,
    },

    /// Extract vocabulary skills from a single text and print them as JSON
    Extract {
        /// Posting text
        #[arg(short, long)]
        text: String,
    },

    /// Print the cache key a request would use
    CacheKey {
        #[command(flatten)]
        target: Target,

        #[arg(long, default_value_t = 30)]
        top_n: usize,

        #[arg(long)]
        unbalanced: bool,

        #[arg(long)]
        by_category: bool,
    },
}

#[derive(Args)]
struct Target {
    /// Job title to search for
    #[arg(short, long)]
    job: String,

    /// City, e.g. "Montréal"
    #[arg(short, long)]
    city: String,

    /// Province, e.g. "Québec"
    #[arg(short, long)]
    province: String,
}

impl Target {
    fn request(self, top_n: usize, unbalanced: bool, by_category: bool) -> AnalysisRequest {
        let mut request = AnalysisRequest::new(self.job, self.city, self.province);
        request.top_n = top_n;
        request.balanced = !unbalanced;
        request.by_category = by_category;
        request
    }
}

/// Work that needs the full component graph.
enum Job {
    Analyze {
        request: AnalysisRequest,
        no_cache: bool,
    },
    Extract(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let job = match cli.command {
        Commands::CacheKey {
            target,
            top_n,
            unbalanced,
            by_category,
        } => {
            println!("{}", cache_key(&target.request(top_n, unbalanced, by_category)));
            return Ok(());
        }
        Commands::Extract { text } => Job::Extract(text),
        Commands::Analyze {
            target,
            top_n,
            unbalanced,
            by_category,
            pages,
            no_cache,
        } => {
            let mut request = target.request(top_n, unbalanced, by_category);
            request.page_budget = pages.max(1);
            Job::Analyze { request, no_cache }
        }
    };

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging; stdout is reserved for the JSON profile
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting market v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::build(config).await?;
    info!(
        "Ready: {} vocabulary skills from {}",
        state.vocabulary.len(),
        state.config.skills_path
    );

    let json = match job {
        Job::Analyze { request, no_cache } => {
            let profile = if no_cache {
                state.analyzer.refresh(&request).await
            } else {
                state.analyzer.analyze(&request).await
            };
            serde_json::to_string_pretty(&profile).context("Failed to serialize profile")?
        }
        Job::Extract(text) => {
            let skills = state.extractor.extract(&text).await;
            serde_json::to_string_pretty(&skills).context("Failed to serialize skills")?
        }
    };
    println!("{json}");

    Ok(())
}
