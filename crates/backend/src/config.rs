use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
};

use replaiced_shared::config::{ConfigError, MapConfig};
use thiserror::Error;

// Runtime settings come from the environment; map tuning comes from MapConfig.

pub fn http_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

pub fn db_path() -> PathBuf {
    PathBuf::from(env::var("DB_PATH").unwrap_or_else(|_| "data/replaiced.redb".to_string()))
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read map config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse map config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

pub fn read_map_config(path: &Path) -> Result<MapConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = MapConfig::from_json(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Load the startup map config from `MAP_CONFIG_PATH`, falling back to defaults.
pub fn load_map_config_from_env() -> MapConfig {
    let Some(path) = env::var("MAP_CONFIG_PATH").ok().map(PathBuf::from) else {
        tracing::info!("MAP_CONFIG_PATH not set, using default map config");
        return MapConfig::default();
    };

    match read_map_config(&path) {
        Ok(config) => {
            tracing::info!(
                path = %path.display(),
                world_size = config.world_size,
                "map_config.loaded"
            );
            config
        }
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "map_config.load_failed, using defaults"
            );
            MapConfig::default()
        }
    }
}

/// The map config currently in effect. Swapped when a saved configuration is loaded.
pub struct ActiveConfig {
    inner: RwLock<MapConfig>,
}

impl ActiveConfig {
    pub fn new(config: MapConfig) -> Self {
        ActiveConfig {
            inner: RwLock::new(config),
        }
    }

    pub fn get(&self) -> MapConfig {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, config: MapConfig) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = config;
    }
}
