//! Application-level configuration loading: pattern catalog, auto-play timing and track pool.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{bingo::patterns::PatternVariant, playback::PlaybackConfig, provider::PoolCriteria};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MUSIC_BINGO_BACK_CONFIG_PATH";
/// Largest page size the search endpoint accepts.
const MAX_QUERY_LIMIT: u8 = 50;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Which winning patterns count.
    pub pattern_catalog: PatternVariant,
    /// Auto-play timing and volumes.
    pub playback: PlaybackConfig,
    /// Search space used to fill cards.
    pub track_pool: PoolCriteria,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        catalog = ?config.pattern_catalog,
                        interval_secs = config.playback.interval_secs,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document, bringing out-of-range values back into range.
    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Self>(contents).map(Self::normalized)
    }

    fn normalized(mut self) -> Self {
        let playback = &mut self.playback;
        if playback.interval_secs == 0 {
            warn!("playback.interval_secs must be positive; using 1");
            playback.interval_secs = 1;
        }
        playback.fade_in_start_volume = playback.fade_in_start_volume.min(100);
        playback.default_volume = playback.default_volume.min(100);
        if !(0.0..=1.0).contains(&playback.start_position_fraction) {
            warn!(
                fraction = playback.start_position_fraction,
                "playback.start_position_fraction out of range; clamping"
            );
            playback.start_position_fraction = playback.start_position_fraction.clamp(0.0, 1.0);
        }

        let pool = &mut self.track_pool;
        pool.per_query_limit = pool.per_query_limit.clamp(1, MAX_QUERY_LIMIT);
        if pool.decades.is_empty() || pool.genres.is_empty() {
            warn!("track_pool has no decades or genres; using the default search space");
            let defaults = PoolCriteria::default();
            if pool.decades.is_empty() {
                pool.decades = defaults.decades;
            }
            if pool.genres.is_empty() {
                pool.genres = defaults.genres;
            }
        }
        self
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::parse("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.pattern_catalog, PatternVariant::Base);
        assert_eq!(config.playback.interval_secs, 30);
        assert_eq!(config.track_pool.per_query_limit, 25);
    }

    #[test]
    fn sections_override_individual_fields() {
        let config = AppConfig::parse(
            r#"{
                "pattern_catalog": "extended",
                "playback": { "interval_secs": 45, "fade_out_lead_secs": 3 },
                "track_pool": { "genres": ["jazz"], "market": "FR" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.pattern_catalog, PatternVariant::Extended);
        assert_eq!(config.playback.interval_secs, 45);
        assert_eq!(config.playback.fade_out_lead_secs, 3);
        assert_eq!(config.playback.fade_in_steps, 20);
        assert_eq!(config.track_pool.genres, vec!["jazz".to_string()]);
        assert_eq!(config.track_pool.market, "FR");
        assert_eq!(config.track_pool.decades.len(), 5);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = AppConfig::parse(
            r#"{
                "playback": { "interval_secs": 0, "start_position_fraction": 1.5 },
                "track_pool": { "per_query_limit": 200, "decades": [] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.playback.interval_secs, 1);
        assert_eq!(config.playback.start_position_fraction, 1.0);
        assert_eq!(config.track_pool.per_query_limit, MAX_QUERY_LIMIT);
        assert_eq!(config.track_pool.decades.len(), 5);
    }

    #[test]
    fn unknown_catalog_is_rejected() {
        assert!(AppConfig::parse(r#"{ "pattern_catalog": "giant" }"#).is_err());
    }
}
