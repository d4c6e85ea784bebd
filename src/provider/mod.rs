//! Music provider collaborators: track search, playback devices and token refresh.

/// Spotify Web API implementation.
pub mod spotify;

use std::{collections::HashSet, sync::Arc};

use futures::future::BoxFuture;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::{bingo::card::CandidateItem, playback::device::PlaybackDevice};

/// Failures reported by the music provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The access token was rejected; refresh it and retry once.
    #[error("music provider rejected the access token")]
    CredentialExpired,
    /// Client id/secret needed for token refresh are missing.
    #[error("music provider client credentials are not configured")]
    NotConfigured,
    /// The request could not be sent.
    #[error("failed to send music provider request to `{path}`")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with an unexpected status.
    #[error("unexpected music provider status {status} for `{path}`")]
    Status { path: String, status: StatusCode },
    /// The response body did not match the expected shape.
    #[error("failed to decode music provider response for `{path}`")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The accounts service refused the refresh token.
    #[error("token refresh rejected with status {status}")]
    RefreshRejected { status: StatusCode },
}

impl ProviderError {
    /// Whether the failure means the access token must be refreshed.
    pub fn is_credential_expired(&self) -> bool {
        matches!(self, ProviderError::CredentialExpired)
    }
}

/// Tokens returned by a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedToken {
    /// New access token.
    pub access_token: String,
    /// Rotated refresh token, when the provider issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

/// One decade slice of the search space.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DecadeRange {
    /// Display label such as `"90s"`.
    pub label: String,
    /// First release year, inclusive.
    pub from: u16,
    /// Last release year, inclusive.
    pub to: u16,
}

/// What to search for when filling a pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolCriteria {
    /// Decades to cover.
    pub decades: Vec<DecadeRange>,
    /// Genres crossed with every decade.
    pub genres: Vec<String>,
    /// Result limit per search query.
    pub per_query_limit: u8,
    /// Market the results must be playable in.
    pub market: String,
}

impl Default for PoolCriteria {
    fn default() -> Self {
        let decade = |label: &str, from, to| DecadeRange {
            label: label.into(),
            from,
            to,
        };
        Self {
            decades: vec![
                decade("80s", 1980, 1989),
                decade("90s", 1990, 1999),
                decade("2000s", 2000, 2009),
                decade("2010s", 2010, 2019),
                decade("2020s", 2020, 2024),
            ],
            genres: ["pop", "rock", "hip-hop", "r&b"]
                .into_iter()
                .map(String::from)
                .collect(),
            per_query_limit: 25,
            market: "US".into(),
        }
    }
}

impl PoolCriteria {
    /// Search queries issued for a pool, one per decade and genre.
    pub fn queries(&self) -> Vec<String> {
        self.decades
            .iter()
            .flat_map(|decade| {
                self.genres
                    .iter()
                    .map(move |genre| format!("year:{}-{} genre:{genre}", decade.from, decade.to))
            })
            .collect()
    }
}

/// Supplies candidate items for card generation.
pub trait TrackSource: Send + Sync {
    /// Fetch a deduplicated pool of items matching `criteria`.
    fn fetch_pool(
        &self,
        criteria: &PoolCriteria,
    ) -> BoxFuture<'static, Result<Vec<CandidateItem>, ProviderError>>;
}

/// Entry point to a music provider for a given access token.
pub trait MusicProvider: Send + Sync {
    /// Track source acting on behalf of the token owner.
    fn track_source(&self, access_token: &str) -> Arc<dyn TrackSource>;
    /// Playback device API acting on behalf of the token owner.
    fn playback_device(&self, access_token: &str) -> Arc<dyn PlaybackDevice>;
    /// Exchange a refresh token for a new access token.
    fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> BoxFuture<'static, Result<RefreshedToken, ProviderError>>;
}

/// Drop items whose identifier was already seen, keeping the first occurrence.
pub fn dedup_by_id(items: Vec<CandidateItem>) -> Vec<CandidateItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}
