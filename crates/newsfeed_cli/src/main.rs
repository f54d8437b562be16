//! Operator entry point for the newsfeed data layer.
//!
//! # Responsibility
//! - Open both stores from a TOML config and report their state.
//! - Keep output line-oriented (`key=value`) for scripting.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use newsfeed_core::db::migrations::{current_user_version, KV, RELATIONAL};
use newsfeed_core::{Context, OrEmpty, Status, Store, StoreConfig};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "newsfeed", version, about = "Newsfeed data-layer operator tool")]
struct Cli {
    /// TOML store config; in-memory stores when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks core linkage.
    Ping,
    /// Applies pending migrations and prints schema versions.
    Migrate,
    /// Prints title and news counts per status.
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Ping => {
            println!("newsfeed_core ping={}", newsfeed_core::ping());
            println!("newsfeed_core version={}", newsfeed_core::core_version());
            Ok(())
        }
        Command::Migrate => migrate(&load_config(cli.config)?),
        Command::Stats => stats(&load_config(cli.config)?),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<StoreConfig> {
    let config = match path {
        Some(path) => StoreConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    newsfeed_core::init_from_config(&config.logging).context("starting logging")?;
    Ok(config)
}

fn migrate(config: &StoreConfig) -> anyhow::Result<()> {
    let store = Store::open(config).context("opening stores")?;
    println!(
        "{}_version={}/{}",
        RELATIONAL.name(),
        current_user_version(store.connection())?,
        RELATIONAL.latest_version()
    );
    println!(
        "{}_version={}/{}",
        KV.name(),
        current_user_version(store.kv().connection())?,
        KV.latest_version()
    );
    Ok(())
}

fn stats(config: &StoreConfig) -> anyhow::Result<()> {
    let store = Store::open(config).context("opening stores")?;
    let provider = store.provider();
    let ctx = Context::background();

    for status in Status::ALL {
        let titles = provider.titles().by_status([status]).count(&ctx)?;
        let news = provider.news().by_status([status]).count(&ctx)?;
        println!("status={status} titles={titles} news={news}");
    }
    let latest = provider
        .news()
        .get_latest(&ctx)?
        .and_then(|news| news.published_at);
    match latest {
        Some(published_at) => println!("latest_published_at={published_at}"),
        None => println!("latest_published_at=none"),
    }
    let channels = provider.channels().select(&ctx).or_empty()?;
    println!("channels={}", channels.len());
    Ok(())
}
