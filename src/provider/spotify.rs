use std::{sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture, future::join_all};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    bingo::card::CandidateItem,
    playback::device::{DeviceCommandError, DeviceRef, DeviceResult, PlaybackDevice},
    provider::{MusicProvider, PoolCriteria, ProviderError, RefreshedToken, TrackSource, dedup_by_id},
};

const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Endpoints and client credentials of the Spotify Web API.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub api_base: String,
    pub accounts_base: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            accounts_base: DEFAULT_ACCOUNTS_BASE.into(),
            client_id: None,
            client_secret: None,
        }
    }
}

impl SpotifyConfig {
    /// Read `SPOTIFY_CLIENT_ID`, `SPOTIFY_CLIENT_SECRET` and the optional
    /// `SPOTIFY_API_BASE`/`SPOTIFY_ACCOUNTS_BASE` overrides.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_base: var("SPOTIFY_API_BASE").unwrap_or(defaults.api_base),
            accounts_base: var("SPOTIFY_ACCOUNTS_BASE").unwrap_or(defaults.accounts_base),
            client_id: var("SPOTIFY_CLIENT_ID"),
            client_secret: var("SPOTIFY_CLIENT_SECRET"),
        }
    }
}

/// [`MusicProvider`] backed by the Spotify Web API.
#[derive(Clone)]
pub struct SpotifyProvider {
    client: Client,
    api_base: Arc<str>,
    accounts_base: Arc<str>,
    client_credentials: Option<(Arc<str>, Arc<str>)>,
}

impl SpotifyProvider {
    /// Build the HTTP client. Token refresh needs both client id and secret.
    pub fn new(config: SpotifyConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ProviderError::Request {
                path: "client".into(),
                source,
            })?;

        if config.client_id.is_none() || config.client_secret.is_none() {
            warn!("SPOTIFY_CLIENT_ID/SPOTIFY_CLIENT_SECRET not set; token refresh disabled");
        }

        Ok(Self {
            client,
            api_base: Arc::from(config.api_base.trim_end_matches('/')),
            accounts_base: Arc::from(config.accounts_base.trim_end_matches('/')),
            client_credentials: config
                .client_id
                .zip(config.client_secret)
                .map(|(id, secret)| (Arc::from(id), Arc::from(secret))),
        })
    }

    fn api(&self, access_token: &str) -> SpotifyApi {
        SpotifyApi {
            client: self.client.clone(),
            base: Arc::clone(&self.api_base),
            token: Arc::from(access_token),
        }
    }
}

impl MusicProvider for SpotifyProvider {
    fn track_source(&self, access_token: &str) -> Arc<dyn TrackSource> {
        Arc::new(self.api(access_token))
    }

    fn playback_device(&self, access_token: &str) -> Arc<dyn PlaybackDevice> {
        Arc::new(self.api(access_token))
    }

    fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> BoxFuture<'static, Result<RefreshedToken, ProviderError>> {
        let provider = self.clone();
        let refresh_token = refresh_token.to_string();
        async move {
            let (client_id, client_secret) = provider
                .client_credentials
                .clone()
                .ok_or(ProviderError::NotConfigured)?;
            let path = format!("{}/api/token", provider.accounts_base);

            let response = provider
                .client
                .post(&path)
                .basic_auth(client_id.as_ref(), Some(client_secret.as_ref()))
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                ])
                .send()
                .await
                .map_err(|source| ProviderError::Request {
                    path: path.clone(),
                    source,
                })?;

            if !response.status().is_success() {
                return Err(ProviderError::RefreshRejected {
                    status: response.status(),
                });
            }

            response
                .json::<RefreshedToken>()
                .await
                .map_err(|source| ProviderError::Decode { path, source })
        }
        .boxed()
    }
}

/// Web API client acting with one user's access token.
#[derive(Clone)]
struct SpotifyApi {
    client: Client,
    base: Arc<str>,
    token: Arc<str>,
}

impl SpotifyApi {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base, path))
            .bearer_auth(self.token.as_ref())
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Response, ProviderError> {
        let response = builder
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                path: path.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ProviderError::CredentialExpired),
            status if status.is_success() => Ok(response),
            status => Err(ProviderError::Status {
                path: path.to_string(),
                status,
            }),
        }
    }

    async fn command(
        &self,
        command: &'static str,
        path: &str,
        builder: RequestBuilder,
    ) -> DeviceResult<()> {
        self.send(path, builder)
            .await
            .map(|_| ())
            .map_err(|source| DeviceCommandError::new(command, source))
    }

    async fn search(
        &self,
        query: &str,
        criteria: &PoolCriteria,
    ) -> Result<Vec<CandidateItem>, ProviderError> {
        const PATH: &str = "/search";
        let limit = criteria.per_query_limit.to_string();
        let builder = self.request(Method::GET, PATH).query(&[
            ("q", query),
            ("type", "track"),
            ("limit", limit.as_str()),
            ("market", criteria.market.as_str()),
        ]);

        let response = self.send(PATH, builder).await?;
        let payload = response
            .json::<SearchResponse>()
            .await
            .map_err(|source| ProviderError::Decode {
                path: PATH.into(),
                source,
            })?;
        Ok(payload.into_candidates())
    }
}

impl TrackSource for SpotifyApi {
    fn fetch_pool(
        &self,
        criteria: &PoolCriteria,
    ) -> BoxFuture<'static, Result<Vec<CandidateItem>, ProviderError>> {
        let api = self.clone();
        let criteria = criteria.clone();
        async move {
            let queries = criteria.queries();
            let results = join_all(queries.iter().map(|query| api.search(query, &criteria))).await;

            let mut items = Vec::new();
            for (query, result) in queries.iter().zip(results) {
                match result {
                    Ok(found) => items.extend(found),
                    Err(ProviderError::CredentialExpired) => {
                        return Err(ProviderError::CredentialExpired);
                    }
                    Err(err) => warn!(query = %query, error = %err, "track search failed; skipping"),
                }
            }

            let items = dedup_by_id(items);
            debug!(count = items.len(), "fetched candidate pool");
            Ok(items)
        }
        .boxed()
    }
}

impl PlaybackDevice for SpotifyApi {
    fn list_devices(&self) -> BoxFuture<'static, DeviceResult<Vec<DeviceRef>>> {
        let api = self.clone();
        async move {
            const PATH: &str = "/me/player/devices";
            let response = api
                .send(PATH, api.request(Method::GET, PATH))
                .await
                .map_err(|source| DeviceCommandError::new("list_devices", source))?;
            let payload = response.json::<DevicesResponse>().await.map_err(|source| {
                DeviceCommandError::new(
                    "list_devices",
                    ProviderError::Decode {
                        path: PATH.into(),
                        source,
                    },
                )
            })?;
            Ok(payload.into_devices())
        }
        .boxed()
    }

    fn transfer(&self, device_id: &str) -> BoxFuture<'static, DeviceResult<()>> {
        let api = self.clone();
        let body = json!({ "device_ids": [device_id], "play": false });
        async move {
            const PATH: &str = "/me/player";
            api.command("transfer", PATH, api.request(Method::PUT, PATH).json(&body))
                .await
        }
        .boxed()
    }

    fn play_at(
        &self,
        device_id: &str,
        item_id: &str,
        position_ms: u64,
    ) -> BoxFuture<'static, DeviceResult<()>> {
        let api = self.clone();
        let device_id = device_id.to_string();
        let body = json!({
            "uris": [format!("spotify:track:{item_id}")],
            "position_ms": position_ms,
        });
        async move {
            const PATH: &str = "/me/player/play";
            let builder = api
                .request(Method::PUT, PATH)
                .query(&[("device_id", device_id.as_str())])
                .json(&body);
            api.command("play", PATH, builder).await
        }
        .boxed()
    }

    fn pause(&self, device_id: &str) -> BoxFuture<'static, DeviceResult<()>> {
        let api = self.clone();
        let device_id = device_id.to_string();
        async move {
            const PATH: &str = "/me/player/pause";
            let builder = api
                .request(Method::PUT, PATH)
                .query(&[("device_id", device_id.as_str())])
                .body("");
            api.command("pause", PATH, builder).await
        }
        .boxed()
    }

    fn set_volume(&self, device_id: &str, percent: u8) -> BoxFuture<'static, DeviceResult<()>> {
        let api = self.clone();
        let device_id = device_id.to_string();
        let percent = percent.min(100).to_string();
        async move {
            const PATH: &str = "/me/player/volume";
            let builder = api
                .request(Method::PUT, PATH)
                .query(&[
                    ("volume_percent", percent.as_str()),
                    ("device_id", device_id.as_str()),
                ])
                .body("");
            api.command("set_volume", PATH, builder).await
        }
        .boxed()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<Option<TrackObject>>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: Option<String>,
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    #[serde(default)]
    album: Option<AlbumObject>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    #[serde(default)]
    images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

impl SearchResponse {
    fn into_candidates(self) -> Vec<CandidateItem> {
        self.tracks
            .map(|page| page.items)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|track| {
                let id = track.id?;
                let artist = track
                    .artists
                    .into_iter()
                    .next()
                    .map(|artist| artist.name)
                    .unwrap_or_else(|| UNKNOWN_ARTIST.into());
                let images = track
                    .album
                    .map(|album| album.images.into_iter().map(|image| image.url).collect())
                    .unwrap_or_default();
                Some(CandidateItem {
                    id,
                    title: track.name,
                    artist,
                    duration_ms: track.duration_ms,
                    images,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<DeviceObject>,
}

#[derive(Debug, Deserialize)]
struct DeviceObject {
    id: Option<String>,
    name: String,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    volume_percent: Option<u8>,
}

impl DevicesResponse {
    fn into_devices(self) -> Vec<DeviceRef> {
        self.devices
            .into_iter()
            .filter_map(|device| {
                Some(DeviceRef {
                    id: device.id?,
                    name: device.name,
                    is_active: device.is_active,
                    volume_percent: device.volume_percent.map(|volume| volume.min(100)),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn search_results_become_candidates() {
        let payload: SearchResponse = serde_json::from_value(json!({
            "tracks": {
                "items": [
                    {
                        "id": "t1",
                        "name": "Song (feat. X)",
                        "duration_ms": 200000,
                        "artists": [{ "name": "Lead" }, { "name": "Guest" }],
                        "album": { "images": [{ "url": "https://i/640" }, { "url": "https://i/64" }] }
                    },
                    null,
                    { "id": null, "name": "Local file", "duration_ms": 1000 },
                    { "id": "t2", "name": "Solo", "duration_ms": 1000, "artists": [] }
                ]
            }
        }))
        .unwrap();

        let items = payload.into_candidates();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].artist, "Lead");
        assert_eq!(items[0].images, vec!["https://i/640", "https://i/64"]);
        assert_eq!(items[1].artist, UNKNOWN_ARTIST);
        assert!(items[1].images.is_empty());
    }

    #[test]
    fn empty_search_has_no_candidates() {
        let payload: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(payload.into_candidates().is_empty());
    }

    #[test]
    fn devices_without_id_are_skipped() {
        let payload: DevicesResponse = serde_json::from_value(json!({
            "devices": [
                { "id": "d1", "name": "Phone", "is_active": true, "volume_percent": 70 },
                { "id": null, "name": "Restricted" },
                { "id": "d2", "name": "Speaker", "volume_percent": null }
            ]
        }))
        .unwrap();

        let devices = payload.into_devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].volume_percent, Some(70));
        assert!(!devices[1].is_active);
        assert_eq!(devices[1].volume_percent, None);
    }

    #[test]
    fn refresh_without_client_credentials_is_not_configured() {
        let provider = SpotifyProvider::new(SpotifyConfig::default()).unwrap();
        let result = futures::executor::block_on(provider.refresh_token("r"));
        assert!(matches!(result, Err(ProviderError::NotConfigured)));
    }

    #[test]
    fn refreshed_token_keeps_optional_fields_optional() {
        let token: RefreshedToken = serde_json::from_value(json!({
            "access_token": "new",
            "token_type": "Bearer",
            "expires_in": 3600
        }))
        .unwrap();
        assert_eq!(token.refresh_token, None);
        assert_eq!(token.expires_in, 3600);
    }
}
