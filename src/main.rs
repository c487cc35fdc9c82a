use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use job_matcher::config::Config;
use job_matcher::descriptions::DescriptionFetcher;
use job_matcher::fetcher::HttpPageFetcher;
use job_matcher::filters::FilterCatalogCache;
use job_matcher::job_matcher::JobMatcher;
use job_matcher::llm::AnthropicClient;
use job_matcher::models::{ParamValue, SearchParams};
use job_matcher::scraper::ListingScraper;

#[derive(Parser)]
#[command(name = "job-matcher", version, about = "Scrape job listings and rank them against your CV")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the search facet catalog as JSON
    Filters,
    /// Scrape every page of a listing search and print the jobs as JSON
    Search {
        /// Search parameters as KEY=VALUE; repeat a key to pass several values
        params: Vec<String>,
    },
    /// Scrape a listing search and rank the jobs against a CV
    Rank {
        /// CV file (PDF or plain text)
        #[arg(long)]
        cv: PathBuf,
        /// Optional cover letter file (PDF or plain text)
        #[arg(long)]
        cover_letter: Option<PathBuf>,
        /// Search parameters as KEY=VALUE; repeat a key to pass several values
        params: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("job_matcher={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let fetcher = Arc::new(HttpPageFetcher::from_config(&config));

    match cli.command {
        Command::Filters => {
            let cache = FilterCatalogCache::new();
            let catalog = cache
                .get_or_load(fetcher.as_ref(), &config.listing_search_url)
                .await?;
            println!("{}", serde_json::to_string_pretty(catalog)?);
        }
        Command::Search { params } => {
            let scraper = ListingScraper::new(
                fetcher,
                config.listing_search_url.clone(),
                config.job_ad_url_prefix.clone(),
            );
            let jobs = scraper.scrape_listing(&parse_search_params(&params)?).await?;
            println!("{}", serde_json::to_string_pretty(&jobs)?);
            println!("\nTotal: {}", jobs.len());
        }
        Command::Rank {
            cv,
            cover_letter,
            params,
        } => {
            let llm = AnthropicClient::from_config(&config)?;
            info!("Ranking with model {}", llm.model());

            let matcher = JobMatcher::new(
                &config,
                fetcher,
                DescriptionFetcher::from_config(&config)?,
                Arc::new(llm),
            );

            let (content, filename) = read_upload(&cv).await?;
            matcher.profile().upload_cv(&content, &filename).await?;
            if let Some(path) = cover_letter {
                let (content, filename) = read_upload(&path).await?;
                matcher
                    .profile()
                    .upload_cover_letter(&content, &filename)
                    .await?;
            }

            let jobs = matcher
                .scrape_listing(&parse_search_params(&params)?)
                .await?;
            let results = matcher.analyze(&jobs).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    }

    Ok(())
}

async fn read_upload(path: &Path) -> Result<(Vec<u8>, String)> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((content, filename))
}

/// `KEY=VALUE` pairs; a key given more than once becomes an array value.
fn parse_search_params(args: &[String]) -> Result<SearchParams> {
    let mut params = SearchParams::new();

    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .with_context(|| format!("Search parameter '{arg}' is not KEY=VALUE"))?;

        let value = value.to_string();
        match params.remove(key) {
            None => {
                params.insert(key.to_string(), ParamValue::Single(value));
            }
            Some(ParamValue::Single(first)) => {
                params.insert(key.to_string(), ParamValue::Multi(vec![first, value]));
            }
            Some(ParamValue::Multi(mut values)) => {
                values.push(value);
                params.insert(key.to_string(), ParamValue::Multi(values));
            }
        }
    }

    Ok(params)
}
