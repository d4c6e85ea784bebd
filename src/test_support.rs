//! In-process fakes of the music provider shared by service tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};

use futures::{FutureExt, future::BoxFuture};
use tokio::sync::Notify;

use crate::{
    bingo::card::CandidateItem,
    config::AppConfig,
    dao::{bingo_store::memory::InMemoryBingoStore, models::CredentialEntity},
    playback::device::{DeviceCommandError, DeviceRef, DeviceResult, PlaybackDevice},
    provider::{MusicProvider, PoolCriteria, ProviderError, RefreshedToken, TrackSource},
    state::{AppState, SharedState},
};

pub const USER: &str = "player-1";

/// Scripted provider: tokens listed in `rejected` fail with `CredentialExpired`.
#[derive(Default)]
pub struct FakeProvider {
    pub pool: Mutex<Vec<CandidateItem>>,
    pub devices: Mutex<Vec<DeviceRef>>,
    pub rejected: Mutex<Vec<String>>,
    pub fail_search: Mutex<bool>,
    pub refreshes: AtomicUsize,
    pub rotate_refresh_token: bool,
    pub seen_tokens: Mutex<Vec<String>>,
    pub commands: Arc<Mutex<VecDeque<String>>>,
    pub device_gate: Mutex<Option<DeviceGate>>,
}

/// Holds `list_devices` until released, so a test can act in between.
#[derive(Clone, Default)]
pub struct DeviceGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl FakeProvider {
    pub fn with_pool(count: usize) -> Self {
        let provider = Self::default();
        *provider.pool.lock().unwrap() = pool(count);
        *provider.devices.lock().unwrap() = vec![DeviceRef {
            id: "speaker".into(),
            name: "Speaker".into(),
            is_active: true,
            volume_percent: Some(60),
        }];
        provider
    }

    pub fn reject(&self, token: &str) {
        self.rejected.lock().unwrap().push(token.to_string());
    }

    fn check(&self, token: &str) -> Result<(), ProviderError> {
        self.seen_tokens.lock().unwrap().push(token.to_string());
        if self.rejected.lock().unwrap().iter().any(|t| t == token) {
            Err(ProviderError::CredentialExpired)
        } else {
            Ok(())
        }
    }
}

pub fn pool(count: usize) -> Vec<CandidateItem> {
    pool_from(0, count)
}

/// `count` tracks numbered from `first`.
pub fn pool_from(first: usize, count: usize) -> Vec<CandidateItem> {
    (first..first + count)
        .map(|n| CandidateItem {
            id: format!("track-{n}"),
            title: format!("Song {n} (Remastered 2011)"),
            artist: format!("Band {n}"),
            duration_ms: 180_000,
            images: Vec::new(),
        })
        .collect()
}

struct FakeSession {
    provider: Arc<FakeProvider>,
    token: String,
}

impl TrackSource for FakeSession {
    fn fetch_pool(
        &self,
        _criteria: &PoolCriteria,
    ) -> BoxFuture<'static, Result<Vec<CandidateItem>, ProviderError>> {
        let result = self.provider.check(&self.token).and_then(|()| {
            if *self.provider.fail_search.lock().unwrap() {
                Err(ProviderError::Status {
                    path: "/search".into(),
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                })
            } else {
                Ok(self.provider.pool.lock().unwrap().clone())
            }
        });
        async move { result }.boxed()
    }
}

impl FakeSession {
    fn command(&self, name: &'static str, detail: String) -> BoxFuture<'static, DeviceResult<()>> {
        let result = self
            .provider
            .check(&self.token)
            .map_err(|source| DeviceCommandError::new(name, source));
        self.provider.commands.lock().unwrap().push_back(detail);
        async move { result }.boxed()
    }
}

impl PlaybackDevice for FakeSession {
    fn list_devices(&self) -> BoxFuture<'static, DeviceResult<Vec<DeviceRef>>> {
        let result = self
            .provider
            .check(&self.token)
            .map(|()| self.provider.devices.lock().unwrap().clone())
            .map_err(|source| DeviceCommandError::new("list_devices", source));
        let gate = self.provider.device_gate.lock().unwrap().clone();
        async move {
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            result
        }
        .boxed()
    }

    fn transfer(&self, device_id: &str) -> BoxFuture<'static, DeviceResult<()>> {
        self.command("transfer", format!("transfer {device_id}"))
    }

    fn play_at(
        &self,
        _device_id: &str,
        item_id: &str,
        position_ms: u64,
    ) -> BoxFuture<'static, DeviceResult<()>> {
        self.command("play", format!("play {item_id}@{position_ms}"))
    }

    fn pause(&self, _device_id: &str) -> BoxFuture<'static, DeviceResult<()>> {
        self.command("pause", "pause".into())
    }

    fn set_volume(&self, _device_id: &str, percent: u8) -> BoxFuture<'static, DeviceResult<()>> {
        self.command("set_volume", format!("volume {percent}"))
    }
}

/// Handle sharing the fake between the state and the test body.
#[derive(Clone)]
pub struct SharedFake(pub Arc<FakeProvider>);

impl MusicProvider for SharedFake {
    fn track_source(&self, access_token: &str) -> Arc<dyn TrackSource> {
        Arc::new(FakeSession {
            provider: Arc::clone(&self.0),
            token: access_token.to_string(),
        })
    }

    fn playback_device(&self, access_token: &str) -> Arc<dyn PlaybackDevice> {
        Arc::new(FakeSession {
            provider: Arc::clone(&self.0),
            token: access_token.to_string(),
        })
    }

    fn refresh_token(
        &self,
        _refresh_token: &str,
    ) -> BoxFuture<'static, Result<RefreshedToken, ProviderError>> {
        let n = self.0.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        let refresh_token = self
            .0
            .rotate_refresh_token
            .then(|| format!("refresh-{n}"));
        async move {
            Ok(RefreshedToken {
                access_token: format!("fresh-{n}"),
                refresh_token,
                expires_in: 3600,
                scope: None,
            })
        }
        .boxed()
    }
}

/// State wired to `provider` and an in-memory store.
pub async fn state_with(provider: FakeProvider) -> (SharedState, Arc<FakeProvider>, InMemoryBingoStore) {
    let provider = Arc::new(provider);
    let state = AppState::new(AppConfig::default(), Arc::new(SharedFake(Arc::clone(&provider))));
    let store = InMemoryBingoStore::new();
    state.set_store(Arc::new(store.clone())).await;
    (state, provider, store)
}

/// Credentials for [`USER`] expiring at `expires_at`.
pub fn credentials(access_token: &str, expires_at: SystemTime) -> CredentialEntity {
    CredentialEntity {
        user_id: USER.into(),
        access_token: access_token.into(),
        refresh_token: "refresh-0".into(),
        expires_at,
        scope: Some("streaming".into()),
        updated_at: SystemTime::now(),
    }
}

pub fn in_one_hour() -> SystemTime {
    SystemTime::now() + Duration::from_secs(3600)
}
