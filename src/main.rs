//! profile-monitor: incremental local snapshots of a social profile.
//!
//! Each run resolves the profile through a provider gateway, downloads
//! highlights it has not seen before and the currently active stories, then
//! records the follower and following lists under the run's timestamp. All
//! state is kept in pretty-printed JSON files under `{output}/{username}_data/`.

#![warn(clippy::all)]

mod cli;
mod config;
mod metadata;
mod monitor;
mod provider;
mod reconcile;
mod snapshot;
mod store;
mod types;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::monitor::Monitor;
use crate::provider::HttpProvider;
use crate::store::{Category, LocalStore};

/// Print what is stored locally for the configured profile.
async fn run_status(config: &config::Config) -> anyhow::Result<()> {
    let store = LocalStore::new(config.username.clone(), config.paths());
    let paths = store.paths();
    if !paths.base_dir.exists() {
        println!(
            "No data for {} under {}",
            config.username,
            config.output_dir.display()
        );
        return Ok(());
    }

    let state = store.load().await?;
    let log = store.load_metadata_log().await?;

    println!("Profile:     {}", config.username);
    println!("Directory:   {}", paths.base_dir.display());
    match state.profile {
        Some(profile) => println!(
            "Profile ID:  {} (cached for {})",
            profile.profile_id, profile.username
        ),
        None => println!("Profile ID:  (not cached)"),
    }
    println!("Snapshots:   {}", state.snapshots.len());
    if let Some((timestamp, latest)) = state.snapshots.last() {
        println!(
            "Latest:      {} ({} followers, {} following)",
            timestamp,
            latest.followers.len(),
            latest.following.len()
        );
    }
    println!("Highlights:  {} downloaded", state.highlights.len());
    println!("Stories:     {} downloaded", state.stories.len());
    for category in Category::ALL {
        let timestamps = log.timestamps(category);
        let latest = timestamps
            .last()
            .and_then(|ts| log.entry(category, ts))
            .map_or(0, |entry| entry.len());
        println!(
            "Metadata:    {} run(s) with {}, {} in the latest",
            timestamps.len(),
            category,
            latest
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;

    if config.status {
        return run_status(&config).await;
    }

    let provider_url = config
        .provider_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--provider-url is required"))?;
    let provider = Arc::new(HttpProvider::new(provider_url)?);
    tracing::debug!(?provider, "Using provider");

    let monitor = Monitor::new(config.monitor_config(), provider);
    tracing::debug!("Writing to {}", monitor.store().paths().base_dir.display());
    let summary = monitor.run().await?;

    tracing::info!(
        timestamp = %summary.timestamp,
        profile_id = ?summary.profile_id,
        new_highlights = summary.new_highlights,
        stories = summary.stories_processed,
        snapshots = summary.snapshots,
        "Run complete for {}",
        config.username
    );
    if let Some(changes) = summary.follower_changes.filter(|c| {
        !(c.followers.is_empty() && c.following.is_empty())
    }) {
        tracing::info!(
            "Followers: +{} -{}, following: +{} -{}",
            changes.followers.added.len(),
            changes.followers.removed.len(),
            changes.following.added.len(),
            changes.following.removed.len()
        );
    }
    Ok(())
}
