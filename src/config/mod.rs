use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:5000";
pub const DEFAULT_AD_LINK: &str = "https://example.com/sponsor";

/// Body shape sent to `/api/process-download`. Backends accept one or the
/// other, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DownloadContract {
    /// `{ url, quality, title }`
    UrlAndTitle,
    /// `{ video_id, quality }`
    VideoId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Read the whole body, then save.
    Buffered,
    /// Read chunk by chunk and report progress.
    Streaming,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub ad_link: String,
    pub unlock_steps: u32,
    pub countdown_secs: u32,
    pub download_contract: DownloadContract,
    pub transfer_mode: TransferMode,
    pub output_dir: PathBuf,
    pub user_agent: String,
    /// Seconds allowed for connecting, for a whole metadata lookup, and
    /// between two reads of a download body.
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            ad_link: DEFAULT_AD_LINK.to_string(),
            unlock_steps: 2,
            countdown_secs: 5,
            download_contract: DownloadContract::UrlAndTitle,
            transfer_mode: TransferMode::Streaming,
            output_dir: PathBuf::from("."),
            user_agent: format!("ytv-client/{}", env!("CARGO_PKG_VERSION")),
            timeout: 300,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file if it exists, then environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                tracing::debug!("no config file at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self) {
        if let Ok(api_base) = env::var("YTV_API_URL") {
            if !api_base.trim().is_empty() {
                self.api_base = api_base.trim().to_string();
            }
        }

        if let Ok(ad_link) = env::var("YTV_AD_LINK") {
            if !ad_link.trim().is_empty() {
                self.ad_link = ad_link.trim().to_string();
            }
        }

        if let Ok(output_dir) = env::var("YTV_OUTPUT_DIR") {
            if !output_dir.trim().is_empty() {
                self.output_dir = PathBuf::from(output_dir.trim());
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.api_url()?;
        Url::parse(&self.ad_link).with_context(|| format!("invalid ad link: {}", self.ad_link))?;
        Ok(())
    }

    /// `api_base` as a URL ending in `/`, so endpoint paths join under it.
    pub fn api_url(&self) -> anyhow::Result<Url> {
        let mut base = self.api_base.trim_end_matches('/').to_string();
        base.push('/');
        Url::parse(&base).with_context(|| format!("invalid api base URL: {}", self.api_base))
    }
}
