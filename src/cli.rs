use clap::Parser;

use crate::types::{LogLevel, StoryPolicy};

#[derive(Parser, Debug)]
#[command(
    name = "profile-monitor",
    about = "Snapshot a profile's followers, highlights and stories into local JSON files"
)]
pub struct Cli {
    /// Username of the profile to monitor
    #[arg(short = 'u', long)]
    pub username: String,

    /// Base URL of the provider gateway
    #[arg(long, env = "PROFILE_MONITOR_PROVIDER_URL")]
    pub provider_url: Option<String>,

    /// Root directory for per-profile output
    #[arg(short = 'd', long, default_value = "output")]
    pub output_dir: String,

    /// Which active stories to download on each run
    #[arg(long, value_enum, default_value = "always")]
    pub story_policy: StoryPolicy,

    /// Don't download the profile picture and tagged posts
    #[arg(long)]
    pub skip_auxiliary: bool,

    /// Print what is stored locally and exit without contacting the provider
    #[arg(long)]
    pub status: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["profile-monitor", "-u", "alice"]).unwrap();
        assert_eq!(cli.username, "alice");
        assert_eq!(cli.output_dir, "output");
        assert_eq!(cli.story_policy, StoryPolicy::Always);
        assert_eq!(cli.log_level, LogLevel::Info);
        assert!(!cli.skip_auxiliary);
        assert!(!cli.status);
    }

    #[test]
    fn test_story_policy_value() {
        let cli = Cli::try_parse_from([
            "profile-monitor",
            "--username",
            "alice",
            "--story-policy",
            "new-only",
            "--provider-url",
            "http://localhost:8080",
        ])
        .unwrap();
        assert_eq!(cli.story_policy, StoryPolicy::NewOnly);
        assert_eq!(cli.provider_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_username_required() {
        assert!(Cli::try_parse_from(["profile-monitor"]).is_err());
    }
}
