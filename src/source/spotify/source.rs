use super::model::{CurrentlyPlaying, TokenResponse, Track};
use super::{GRANT_TYPE, SOURCE_NAME};
use crate::models::{NowPlaying, PlaybackSnapshot};
use crate::util::config::SpotifyConfig;
use crate::util::errors::ResolverError;
use crate::util::http::{HttpOptions, make_request};
use crate::util::source::PlaybackSource;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};

pub struct Spotify {
    http: Client,
    config: SpotifyConfig,
}

impl Spotify {
    pub fn new(http: Option<Client>, config: SpotifyConfig) -> Self {
        if !config.has_credentials() {
            warn!("Spotify credentials are incomplete, every fetch will report nothing playing");
        }
        Self {
            http: http.unwrap_or_default(),
            config,
        }
    }

    fn basic_auth(&self) -> Result<String, ResolverError> {
        let client_id = self
            .config
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ResolverError::MissingConfig("clientId"))?;
        let client_secret = self
            .config
            .client_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or(ResolverError::MissingConfig("clientSecret"))?;
        let auth = general_purpose::STANDARD.encode(format!("{}:{}", client_id, client_secret));
        Ok(format!("Basic {}", auth))
    }

    fn token_request_body(&self) -> Result<String, ResolverError> {
        let refresh_token = self
            .config
            .refresh_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(ResolverError::MissingConfig("refreshToken"))?;
        Ok(format!(
            "grant_type={}&refresh_token={}",
            GRANT_TYPE,
            urlencoding::encode(refresh_token)
        ))
    }

    /// Mints a fresh access token. Tokens are never reused between fetches.
    async fn get_access_token(&self) -> Result<String, ResolverError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.basic_auth()?.parse()?);
        headers.insert(
            CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse()?,
        );

        let options = HttpOptions {
            method: Method::POST,
            headers,
            body: Some(Bytes::from(self.token_request_body()?)),
            ..Default::default()
        };

        let res = make_request(self.config.token_url(), &self.http, options)
            .await?
            .ensure_success()?;

        let json = res
            .json
            .ok_or(ResolverError::MissingRequiredData("token response body"))?;
        let token: TokenResponse = serde_json::from_value(json)?;

        debug!(
            "Obtained access token (type: {}, expires in: {}s)",
            token.token_type.as_deref().unwrap_or("unknown"),
            token.expires_in.unwrap_or_default()
        );

        Ok(token.access_token)
    }

    async fn get_currently_playing(&self, token: &str) -> Result<PlaybackSnapshot, ResolverError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse()?);

        let options = HttpOptions {
            headers,
            ..Default::default()
        };

        let res = make_request(self.config.now_playing_url(), &self.http, options).await?;

        if res.status == StatusCode::NO_CONTENT {
            debug!("No active playback session");
            return Ok(PlaybackSnapshot::NotPlaying);
        }

        let res = res.ensure_success()?;

        let Some(json) = res.json else {
            return Ok(PlaybackSnapshot::NotPlaying);
        };

        normalize(serde_json::from_value(json)?)
    }

    async fn try_fetch(&self) -> Result<PlaybackSnapshot, ResolverError> {
        if !self.config.has_credentials() {
            return Err(ResolverError::MissingConfig("credentials"));
        }
        let token = self.get_access_token().await?;
        self.get_currently_playing(&token).await
    }
}

/// Flattens the upstream payload into a snapshot. Paused sessions and payloads without a track item count as not playing.
pub fn normalize(body: CurrentlyPlaying) -> Result<PlaybackSnapshot, ResolverError> {
    let Some(item) = body.item.filter(|item| !item.is_null()) else {
        return Ok(PlaybackSnapshot::NotPlaying);
    };

    if !body.is_playing {
        return Ok(PlaybackSnapshot::NotPlaying);
    }

    let track: Track = serde_json::from_value(item)?;

    if track.duration_ms == 0 {
        return Err(ResolverError::MissingRequiredData("item.duration_ms"));
    }

    let artist = track
        .artists
        .iter()
        .map(|artist| artist.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let album_image_url = track.album.images.first().map(|image| image.url.clone());

    Ok(PlaybackSnapshot::Playing(NowPlaying {
        title: track.name,
        artist,
        album: track.album.name,
        album_image_url,
        track_url: track.external_urls.spotify,
        progress_ms: body.progress_ms.unwrap_or(0).min(track.duration_ms),
        duration_ms: track.duration_ms,
    }))
}

#[async_trait]
impl PlaybackSource for Spotify {
    fn get_name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch_snapshot(&self) -> PlaybackSnapshot {
        match self.try_fetch().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!("Failed to fetch now playing, reporting idle: {}", error);
                PlaybackSnapshot::NotPlaying
            }
        }
    }
}
