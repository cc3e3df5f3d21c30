use super::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_NOW_PLAYING_URL: &str = "https://api.spotify.com/v1/me/player/currently-playing";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub token_url: Option<String>,
    pub now_playing_url: Option<String>,
}

impl SpotifyConfig {
    pub fn token_url(&self) -> &str {
        self.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL)
    }

    pub fn now_playing_url(&self) -> &str {
        self.now_playing_url
            .as_deref()
            .unwrap_or(DEFAULT_NOW_PLAYING_URL)
    }

    pub fn has_credentials(&self) -> bool {
        [&self.client_id, &self.client_secret, &self.refresh_token]
            .iter()
            .all(|value| value.as_deref().is_some_and(|v| !v.is_empty()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub refresh_interval_secs: Option<u64>,
    pub progress_tick_ms: Option<u64>,
    pub touch: Option<bool>,
}

impl WidgetConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.unwrap_or(30).max(1))
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms.unwrap_or(1000).max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub spotify_config: Option<SpotifyConfig>,
    pub widget: Option<WidgetConfig>,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Reads `./config.json` if present, then applies `SPOTIFY_*` environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        let path = Path::new("./config.json");
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = fs::read_to_string(path)?;
        Self::from_json(&config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str::<Config>(json)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let spotify = self.spotify_config.get_or_insert_with(SpotifyConfig::default);
        if let Some(value) = lookup("SPOTIFY_CLIENT_ID") {
            spotify.client_id = Some(value);
        }
        if let Some(value) = lookup("SPOTIFY_CLIENT_SECRET") {
            spotify.client_secret = Some(value);
        }
        if let Some(value) = lookup("SPOTIFY_REFRESH_TOKEN") {
            spotify.refresh_token = Some(value);
        }
    }

    /// Credentials are left unchecked so a missing one fails closed at fetch time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(spotify) = &self.spotify_config {
            Url::parse(spotify.token_url()).map_err(|source| ConfigError::InvalidUrl {
                field: "tokenUrl",
                source,
            })?;
            Url::parse(spotify.now_playing_url()).map_err(|source| ConfigError::InvalidUrl {
                field: "nowPlayingUrl",
                source,
            })?;
        }
        Ok(())
    }

    pub fn spotify(&self) -> SpotifyConfig {
        self.spotify_config.clone().unwrap_or_default()
    }

    pub fn widget(&self) -> WidgetConfig {
        self.widget.clone().unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .map(|logging| logging.level.as_str())
            .unwrap_or("info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_json("{}").unwrap();
        let spotify = config.spotify();
        let widget = config.widget();

        assert_eq!(spotify.token_url(), DEFAULT_TOKEN_URL);
        assert_eq!(spotify.now_playing_url(), DEFAULT_NOW_PLAYING_URL);
        assert!(!spotify.has_credentials());
        assert_eq!(widget.refresh_interval(), Duration::from_secs(30));
        assert_eq!(widget.progress_tick(), Duration::from_secs(1));
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn parses_camel_case_keys() {
        let config = Config::from_json(
            r#"{
                "spotifyConfig": { "clientId": "id", "clientSecret": "secret", "refreshToken": "refresh" },
                "widget": { "refreshIntervalSecs": 15, "touch": true },
                "logging": { "level": "debug" }
            }"#,
        )
        .unwrap();

        assert!(config.spotify().has_credentials());
        assert_eq!(config.widget().refresh_interval(), Duration::from_secs(15));
        assert_eq!(config.widget().touch, Some(true));
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::from_json(
            r#"{ "spotifyConfig": { "clientId": "from-file", "clientSecret": "secret" } }"#,
        )
        .unwrap();
        let env = HashMap::from([
            ("SPOTIFY_CLIENT_ID", "from-env"),
            ("SPOTIFY_REFRESH_TOKEN", "refresh"),
        ]);
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        let spotify = config.spotify();
        assert_eq!(spotify.client_id.as_deref(), Some("from-env"));
        assert_eq!(spotify.client_secret.as_deref(), Some("secret"));
        assert_eq!(spotify.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn empty_credentials_do_not_count() {
        let spotify = SpotifyConfig {
            client_id: Some("id".into()),
            client_secret: Some(String::new()),
            refresh_token: Some("refresh".into()),
            ..Default::default()
        };
        assert!(!spotify.has_credentials());
    }

    #[test]
    fn rejects_malformed_endpoint() {
        let config =
            Config::from_json(r#"{ "spotifyConfig": { "tokenUrl": "not a url" } }"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { field: "tokenUrl", .. })
        ));
    }
}
