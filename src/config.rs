//! Runtime configuration, read from the process environment (after `.env` is loaded).

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

/// Settings the bot needs at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot token, from `DISCORD_TOKEN`.
    pub discord_token: String,
    /// Path or name of the yt-dlp executable, from `YTDLP_PATH`.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,
    /// Retry count handed to yt-dlp, from `RESOLVER_RETRIES`.
    #[serde(default = "default_resolver_retries")]
    pub resolver_retries: u32,
    /// Upper bound on a single link resolution, from `RESOLVE_TIMEOUT` (e.g. "45s").
    #[serde(default = "default_resolve_timeout", with = "humantime_serde")]
    pub resolve_timeout: Duration,
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_resolver_retries() -> u32 {
    3
}

fn default_resolve_timeout() -> Duration {
    Duration::from_secs(60)
}

impl BotConfig {
    /// Load the configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(Environment::default().try_parsing(true))
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: BotConfig = config.try_deserialize()?;

        if settings.discord_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "DISCORD_TOKEN is not set. Add it to your .env file.".to_string(),
            ));
        }

        Ok(settings)
    }
}
