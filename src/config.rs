use std::path::PathBuf;

use crate::monitor::MonitorConfig;
use crate::store::MonitorPaths;
use crate::types::{LogLevel, StoryPolicy};

/// Application configuration, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub provider_url: Option<String>,
    pub output_dir: PathBuf,
    pub story_policy: StoryPolicy,
    #[allow(dead_code)] // Read from cli.log_level directly in main.rs
    pub log_level: LogLevel,
    pub skip_auxiliary: bool,
    pub status: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Usernames end up in directory and file names, so only the characters the
/// platform allows in handles are accepted.
fn validate_username(username: &str) -> anyhow::Result<()> {
    if username.is_empty() {
        anyhow::bail!("Username must not be empty");
    }
    if let Some(bad) = username
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '.'))
    {
        anyhow::bail!("Username '{}' contains invalid character '{}'", username, bad);
    }
    if username.chars().all(|c| c == '.') {
        anyhow::bail!("Username '{}' is not a valid handle", username);
    }
    Ok(())
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        validate_username(&cli.username)?;

        if !cli.status && cli.provider_url.is_none() {
            anyhow::bail!("--provider-url is required unless --status is given");
        }

        Ok(Self {
            username: cli.username,
            provider_url: cli.provider_url,
            output_dir: expand_tilde(&cli.output_dir),
            story_policy: cli.story_policy,
            log_level: cli.log_level,
            skip_auxiliary: cli.skip_auxiliary,
            status: cli.status,
        })
    }

    pub fn paths(&self) -> MonitorPaths {
        MonitorPaths::new(&self.output_dir, &self.username)
    }

    /// Subset consumed by the monitor, decoupled from argument parsing.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            username: self.username.clone(),
            paths: self.paths(),
            story_policy: self.story_policy,
            skip_auxiliary: self.skip_auxiliary,
        }
    }
}
