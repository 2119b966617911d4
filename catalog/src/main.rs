use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog_crawler::{crawl, discover, HttpSource, SiteConfig};

#[derive(Parser)]
#[command(name = "catalog-crawler")]
#[command(about = "Catalog taxonomy and product listing crawler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Site configuration file (CONL)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Page carrying the navigation menus
    #[arg(long, env = "URL", global = true)]
    url: Option<String>,

    /// Selector that marks the menu page as loaded
    #[arg(long = "css-groups", env = "CSS_GRUPOS", global = true)]
    css_groups: Option<String>,

    /// Serve and store fetched pages under this directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Most pages fetched for one tree node
    #[arg(long, global = true)]
    max_pages: Option<u32>,

    /// Write JSON here instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the menu taxonomy and print it as a tree
    Tree,
    /// Discover the taxonomy, then collect every product listing
    Crawl,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let mut config = match &cli.config {
        Some(path) => SiteConfig::load(path)?,
        None => SiteConfig::default(),
    };
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    if let Some(selector) = &cli.css_groups {
        config.ready_selector = Some(selector.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(max_pages) = cli.max_pages {
        config.max_pages = max_pages;
    }
    Ok(config)
}

fn write_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let mut source = HttpSource::new(&config.user_agent, Duration::from_millis(config.timeout_ms))?;
    if let Some(dir) = &cli.cache_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache dir {}", dir.display()))?;
        source = source.with_cache(dir);
    }

    let discovery = discover(&mut source, &config)
        .with_context(|| format!("Failed to load menu from {}", config.url))?;
    if discovery.taxonomy.groups.is_empty() {
        bail!("No groups found in the menu at {}", config.url);
    }

    match cli.command {
        Commands::Tree => write_json(&discovery.tree, cli.output.as_ref()),
        Commands::Crawl => {
            let report = crawl(&mut source, &config, discovery, None)?;
            write_json(&report, cli.output.as_ref())
        }
    }
}
