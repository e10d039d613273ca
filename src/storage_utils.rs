use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::bars::Period;
use crate::cache::DEFAULT_TTL;
use crate::klines::DEFAULT_USER_AGENT;

// CONFIGURATION

fn default_symbol() -> String {
    "TSLA".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Contents of `config.json`. Every field is optional in the file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String, // e.g., "TSLA", "AAPL", "0700.HK"
    #[serde(default)]
    pub period: Period,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            period: Period::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// STORAGE MANAGER

pub struct AsyncStorageManager {
    // Absolute path of the storage directory (e.g., ".../target/debug/storage")
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Storage directory relative to the running executable, created if missing.
    pub async fn new_relative<P: AsRef<Path>>(relative_path: P) -> anyhow::Result<Self> {
        let exe_path = std::env::current_exe()?;
        let base_dir = exe_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not find binary directory"))?
            .join(relative_path);

        Self::new(base_dir).await
    }

    pub async fn new<P: Into<PathBuf>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.into();
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).await?;
        }
        Ok(Self { base_dir })
    }

    /// Writes `contents` under `file_name` via a temporary file and a rename,
    /// so a crash mid-write never leaves a truncated file behind.
    pub async fn save_text(&self, file_name: &str, contents: &str) -> anyhow::Result<PathBuf> {
        let final_path = self.base_dir.join(file_name);
        let tmp_path = self.base_dir.join(format!("{}.tmp", file_name));

        fs::write(&tmp_path, contents.as_bytes()).await?;
        fs::rename(&tmp_path, &final_path).await?;

        debug!(path = %final_path.display(), bytes = contents.len(), "saved");
        Ok(final_path)
    }

    /// Saves any `Serialize` value as pretty JSON in `<filename>.json`.
    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> anyhow::Result<PathBuf> {
        let json = serde_json::to_string_pretty(data)?;
        self.save_text(&format!("{}.json", filename), &json).await
    }

    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> anyhow::Result<T> {
        let path = self.base_dir.join(format!("{}.json", filename));

        // serde_json validates UTF-8 while parsing, so read raw bytes.
        let content = fs::read(path).await?;

        let data = serde_json::from_slice(&content)?;
        Ok(data)
    }

    /// Like `load`, but a missing file yields `T::default()`. A present but
    /// malformed file is still an error.
    pub async fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        filename: &str,
    ) -> anyhow::Result<T> {
        let path = self.base_dir.join(format!("{}.json", filename));
        if !fs::try_exists(&path).await? {
            debug!(path = %path.display(), "no file, using defaults");
            return Ok(T::default());
        }
        self.load(filename).await
    }
}
