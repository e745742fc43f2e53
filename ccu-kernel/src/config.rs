use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "CCU_KERNEL_CONFIG";
pub const DATA_FILE_ENV: &str = "CCU_DATA_FILE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {path:?}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct KernelConfig {
    /// Fichier CSV de la table (ex: "data.csv")
    pub data_file: PathBuf,
    /// Adresse d'écoute HTTP
    pub bind: SocketAddr,
    /// Inactivité (secondes) au-delà de laquelle une session est évincée
    pub session_idle_secs: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data.csv"),
            bind: SocketAddr::from(([0, 0, 0, 0], 8501)),
            session_idle_secs: 8 * 60 * 60,
        }
    }
}

impl KernelConfig {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// Parse un document YAML ; un document vide donne la config par défaut
    pub fn from_yaml(txt: &str, path: &Path) -> Result<Self, ConfigError> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(txt).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Surcharge par variable d'environnement (CCU_DATA_FILE)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(data_file) = std::env::var(DATA_FILE_ENV) {
            if !data_file.trim().is_empty() {
                self.data_file = PathBuf::from(data_file);
            }
        }
        self
    }
}

/// Charge la config depuis le fichier désigné par `path`. Fichier absent = défauts.
pub async fn load_config_from(path: &Path) -> Result<KernelConfig, ConfigError> {
    if !path.exists() {
        warn!(path = ?path, "no config file, using defaults");
        return Ok(KernelConfig::default());
    }

    let txt = fs::read_to_string(path).await.map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = KernelConfig::from_yaml(&txt, path)?;
    info!(path = ?path, "config loaded");
    Ok(cfg)
}

/// Config du kernel : fichier CCU_KERNEL_CONFIG (défaut "ccu.yaml") puis surcharges env
pub async fn load_config() -> Result<KernelConfig, ConfigError> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "ccu.yaml".into());
    Ok(load_config_from(Path::new(&path)).await?.with_env_overrides())
}
