//! webscrape main entry point
//!
//! Command-line interface over the scraping tool service.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use webscrape::config::{load_config_with_hash, Config};
use webscrape::crawler::FetchMode;
use webscrape::output::write_crawl_summary;
use webscrape::store::spawn_expiry_sweeper;
use webscrape::tools::{
    CrawlSiteParams, ExtractLinksParams, ResourceContent, ScrapeMultipleParams, ScrapeUrlParams,
    ScrapeWithJsParams, ScreenshotParams,
};
use webscrape::{ResponseFormat, ScrapeService};

/// webscrape: bounded web scraping and crawling
///
/// Scrapes pages, crawls sites breadth-first, extracts links and captures
/// rendered pages. Content is kept in an expiring resource store and
/// referenced by `scrape://` URIs.
#[derive(Parser, Debug)]
#[command(name = "webscrape")]
#[command(version)]
#[command(about = "Bounded web scraping and crawling toolkit", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape a single URL
    Scrape {
        url: String,
        /// markdown, html, text or json
        #[arg(short, long, default_value = "markdown")]
        format: ResponseFormat,
        /// Append the links found on the page (markdown)
        #[arg(long)]
        links: bool,
        /// Append the images found on the page (markdown)
        #[arg(long)]
        images: bool,
    },

    /// Scrape up to 20 URLs concurrently
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,
        #[arg(short, long, default_value = "markdown")]
        format: ResponseFormat,
        /// Report page titles
        #[arg(long)]
        metadata: bool,
    },

    /// Crawl a site breadth-first
    Crawl {
        url: String,
        /// 0-5
        #[arg(short, long, default_value_t = webscrape::crawler::DEFAULT_CRAWL_DEPTH)]
        depth: u32,
        /// 1-100
        #[arg(short, long, default_value_t = webscrape::crawler::DEFAULT_CRAWL_PAGES)]
        pages: usize,
        /// Follow links to other sites too
        #[arg(long)]
        all_domains: bool,
        #[arg(short, long, default_value = "markdown")]
        format: ResponseFormat,
        /// Render every page in a headless browser
        #[arg(long)]
        javascript: bool,
        /// Stop after this many seconds and report partial results
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Write a markdown summary of the crawl
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,
    },

    /// List the links of a page
    Links {
        url: String,
        /// Leave external links out of the list
        #[arg(long)]
        same_domain: bool,
        /// Keep #fragment links distinct
        #[arg(long)]
        anchors: bool,
    },

    /// Scrape a page after running its scripts
    Render {
        url: String,
        /// CSS selector that must be present
        #[arg(long, value_name = "SELECTOR")]
        wait_for: Option<String>,
        /// Extra seconds for scripts (0-30)
        #[arg(long, default_value_t = webscrape::tools::DEFAULT_WAIT_SECONDS)]
        wait: u64,
        #[arg(short, long, default_value = "markdown")]
        format: ResponseFormat,
    },

    /// Capture a PNG screenshot
    Screenshot {
        url: String,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
        #[arg(long)]
        full_page: bool,
        /// Also write the PNG to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print a stored resource (scrape:// URI or scrape id)
    Resource { uri: String },

    /// Remove expired resources from the store
    Sweep,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let persistent = config.store.database_path.is_some();
    let service = ScrapeService::from_config(config).context("failed to start scrape service")?;

    let shutdown = CancellationToken::new();
    let sweeper = spawn_expiry_sweeper(
        service.store(),
        service.config().store.sweep_interval(),
        shutdown.clone(),
    );

    let result = run(&service, cli.command, persistent, shutdown.clone()).await;

    shutdown.cancel();
    let _ = sweeper.await;
    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webscrape=info,warn"),
            1 => EnvFilter::new("webscrape=debug,info"),
            2 => EnvFilter::new("webscrape=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(
    service: &ScrapeService,
    command: Command,
    persistent: bool,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Command::Scrape {
            url,
            format,
            links,
            images,
        } => {
            let params = ScrapeUrlParams {
                response_format: format,
                include_links: links,
                include_images: images,
                ..ScrapeUrlParams::new(url)
            };
            print_json(&service.scrape_url(params).await?)
        }

        Command::Batch {
            urls,
            format,
            metadata,
        } => {
            let params = ScrapeMultipleParams {
                urls,
                response_format: format,
                include_metadata: metadata,
            };
            print_json(&service.scrape_multiple_urls(params).await?)
        }

        Command::Crawl {
            url,
            depth,
            pages,
            all_domains,
            format,
            javascript,
            timeout,
            summary,
        } => {
            let params = CrawlSiteParams {
                url,
                max_depth: depth,
                max_pages: pages,
                same_domain_only: !all_domains,
                response_format: format,
                fetch_mode: if javascript {
                    FetchMode::Rendered
                } else {
                    FetchMode::Static
                },
                timeout_secs: timeout,
            };
            handle_crawl(service, params, summary, shutdown).await
        }

        Command::Links {
            url,
            same_domain,
            anchors,
        } => {
            let params = ExtractLinksParams {
                url,
                same_domain_only: same_domain,
                include_anchors: anchors,
            };
            print_json(&service.extract_links(params).await?)
        }

        Command::Render {
            url,
            wait_for,
            wait,
            format,
        } => {
            let params = ScrapeWithJsParams {
                url,
                wait_for_selector: wait_for,
                wait_seconds: wait,
                response_format: format,
            };
            print_json(&service.scrape_with_js(params).await?)
        }

        Command::Screenshot {
            url,
            width,
            height,
            full_page,
            output,
        } => {
            let params = ScreenshotParams {
                url,
                full_page,
                width,
                height,
            };
            let result = service.screenshot_url(params).await?;
            if let Some(path) = output {
                if let ResourceContent::Content { bytes, .. } =
                    service.get_resource(&result.resource_uri)?
                {
                    std::fs::write(&path, bytes)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!("Screenshot written to {}", path.display());
                }
            }
            print_json(&result)
        }

        Command::Resource { uri } => {
            if !persistent {
                tracing::warn!(
                    "No database-path configured; the in-memory store is empty in a new process"
                );
            }
            handle_resource(service, &uri)
        }

        Command::Sweep => {
            if !persistent {
                tracing::warn!("No database-path configured; nothing to sweep");
            }
            let swept = service.sweep()?;
            print_json(&serde_json::json!({ "success": true, "swept": swept }))
        }
    }
}

/// Runs a crawl, cancelling it on Ctrl-C
async fn handle_crawl(
    service: &ScrapeService,
    params: CrawlSiteParams,
    summary: Option<PathBuf>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let cancel = shutdown.child_token();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping crawl");
                cancel.cancel();
            }
        })
    };

    let report = service.crawl_site(params, cancel).await;
    interrupt.abort();

    match report {
        Ok(report) => {
            if let Some(path) = summary {
                write_crawl_summary(&report, &path)
                    .with_context(|| format!("failed to write summary {}", path.display()))?;
                tracing::info!("Summary written to {}", path.display());
            }
            print_json(&report)
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn handle_resource(service: &ScrapeService, uri: &str) -> anyhow::Result<()> {
    let content = service.get_resource(uri)?;
    let is_text = content.is_text();
    match content {
        ResourceContent::Metadata(json) => print_json(&json),
        ResourceContent::Content { bytes, .. } if is_text => {
            std::io::stdout().write_all(&bytes)?;
            println!();
            Ok(())
        }
        ResourceContent::Content {
            scrape_id,
            mime_type,
            bytes,
        } => print_json(&serde_json::json!({
            "scrape_id": scrape_id,
            "mime_type": mime_type,
            "size_bytes": bytes.len(),
            "note": "binary content; use `screenshot --output` to save images",
        })),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
