#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Which active stories are downloaded on each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StoryPolicy {
    /// Every currently active story, whether or not an earlier run saw it.
    #[default]
    Always,
    /// Only stories whose id is not in the downloaded-stories list.
    #[value(name = "new-only")]
    NewOnly,
}
