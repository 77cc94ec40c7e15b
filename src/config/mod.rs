//! Settings for shelfsync.
//!
//! Settings are read from `~/.config/shelfsync/config.toml` (or the path given
//! with `--config`) at startup. If the file doesn't exist, a default
//! configuration with comments is created.
//!
//! The file also records the UUIDs of the target folder and the reload marker
//! for each provider, so it is rewritten whenever one of those is generated.

pub mod extract;

pub use extract::ExtractConfig;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default number of articles handled by one pass.
pub const DEFAULT_MAX_ARTICLES: usize = 10;

/// The reading-list providers shelfsync knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Pocket,
    Omnivore,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Pocket => "pocket",
            Provider::Omnivore => "omnivore",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pocket" => Ok(Provider::Pocket),
            "omnivore" => Ok(Provider::Omnivore),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Active provider, `"pocket"` or `"omnivore"`.
    pub service: String,
    /// Root of the document store. Defaults to the xochitl data directory.
    pub store_dir: Option<PathBuf>,
    /// Articles handled per pass.
    pub max_articles: usize,
    pub pocket: PocketConfig,
    pub omnivore: OmnivoreConfig,
    pub fetch: FetchConfig,
    pub extract: ExtractConfig,
    pub watcher: WatcherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: "pocket".to_string(),
            store_dir: None,
            max_articles: DEFAULT_MAX_ARTICLES,
            pocket: PocketConfig::default(),
            omnivore: OmnivoreConfig::default(),
            fetch: FetchConfig::default(),
            extract: ExtractConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PocketConfig {
    pub consumer_key: String,
    pub access_token: String,
    pub api_base_url: String,
    /// Tag added to articles once they are on the tablet.
    pub handled_tag: String,
    pub reload_uuid: String,
    pub target_folder_uuid: String,
    /// Extra parameters sent with the retrieve call.
    pub request_params: BTreeMap<String, String>,
}

impl Default for PocketConfig {
    fn default() -> Self {
        let request_params = [
            ("count", "15"),
            ("contentType", "article"),
            ("detailType", "complete"),
            ("sort", "newest"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            consumer_key: String::new(),
            access_token: String::new(),
            api_base_url: "https://getpocket.com".to_string(),
            handled_tag: "remarkable".to_string(),
            reload_uuid: String::new(),
            target_folder_uuid: String::new(),
            request_params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OmnivoreConfig {
    pub username: String,
    pub api_key: String,
    pub api_url: String,
    /// Search query used to list candidates.
    pub query: String,
    pub page_size: u32,
    pub handled_label: String,
    pub skipped_label: String,
    pub reload_uuid: String,
    pub target_folder_uuid: String,
}

impl Default for OmnivoreConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            api_key: String::new(),
            api_url: "https://api-prod.omnivore.app/api/graphql".to_string(),
            query: "in:inbox".to_string(),
            page_size: 10,
            handled_label: "remarkable".to_string(),
            skipped_label: "remarkable-skipped".to_string(),
            reload_uuid: String::new(),
            target_folder_uuid: String::new(),
        }
    }
}

/// HTTP settings for article and PDF downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: Some(
                "Mozilla/5.0 (X11; Linux armv7l) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Seconds between two checks of the reload marker.
    pub interval_secs: u64,
    /// Command run when the marker is gone. Empty runs the pass in-process.
    pub restart_command: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            restart_command: vec![
                "systemctl".to_string(),
                "restart".to_string(),
                "shelfsync".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load configuration from `path`.
    ///
    /// If the file doesn't exist, creates a default one with comments.
    /// Missing fields in the file use default values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the whole configuration to `path`, replacing the previous file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(|e| ConfigError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Get the default config file path: `~/.config/shelfsync/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("shelfsync").join("config.toml"))
    }

    pub fn provider(&self) -> Result<Provider, ConfigError> {
        self.service.parse()
    }

    /// Directory holding the `.metadata`/`.content`/payload files.
    pub fn store_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
                Ok(home.join(".local/share/remarkable/xochitl"))
            }
        }
    }

    /// Check that the active provider is known and has its credentials.
    pub fn validate(&self) -> Result<Provider, ConfigError> {
        let provider = self.provider()?;
        let missing = match provider {
            Provider::Pocket => [
                ("pocket.consumer_key", &self.pocket.consumer_key),
                ("pocket.access_token", &self.pocket.access_token),
            ]
            .into_iter()
            .find(|(_, v)| v.trim().is_empty()),
            Provider::Omnivore => [
                ("omnivore.username", &self.omnivore.username),
                ("omnivore.api_key", &self.omnivore.api_key),
            ]
            .into_iter()
            .find(|(_, v)| v.trim().is_empty()),
        };

        match missing {
            Some((key, _)) => Err(ConfigError::MissingCredential(key.to_string())),
            None => Ok(provider),
        }
    }

    pub fn reload_uuid(&self) -> Result<&str, ConfigError> {
        Ok(match self.provider()? {
            Provider::Pocket => &self.pocket.reload_uuid,
            Provider::Omnivore => &self.omnivore.reload_uuid,
        })
    }

    pub fn target_folder_uuid(&self) -> Result<&str, ConfigError> {
        Ok(match self.provider()? {
            Provider::Pocket => &self.pocket.target_folder_uuid,
            Provider::Omnivore => &self.omnivore.target_folder_uuid,
        })
    }

    pub fn set_reload_uuid(&mut self, uuid: String) -> Result<(), ConfigError> {
        match self.provider()? {
            Provider::Pocket => self.pocket.reload_uuid = uuid,
            Provider::Omnivore => self.omnivore.reload_uuid = uuid,
        }
        Ok(())
    }

    pub fn set_target_folder_uuid(&mut self, uuid: String) -> Result<(), ConfigError> {
        match self.provider()? {
            Provider::Pocket => self.pocket.target_folder_uuid = uuid,
            Provider::Omnivore => self.omnivore.target_folder_uuid = uuid,
        }
        Ok(())
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(path, Self::default_config_content()).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# shelfsync configuration
#
# The reload_uuid / target_folder_uuid entries are managed by shelfsync.
# Leave them empty on a fresh install.

# Active provider: "pocket" or "omnivore"
service = "pocket"

# Articles converted per pass
max_articles = 10

# Document store directory (defaults to ~/.local/share/remarkable/xochitl)
# store_dir = "/home/root/.local/share/remarkable/xochitl"

[pocket]
consumer_key = ""
access_token = ""
api_base_url = "https://getpocket.com"
handled_tag = "remarkable"
reload_uuid = ""
target_folder_uuid = ""

[pocket.request_params]
count = "15"
contentType = "article"
detailType = "complete"
sort = "newest"

[omnivore]
username = ""
api_key = ""
api_url = "https://api-prod.omnivore.app/api/graphql"
query = "in:inbox"
page_size = 10
handled_label = "remarkable"
skipped_label = "remarkable-skipped"
reload_uuid = ""
target_folder_uuid = ""

[fetch]
# Timeout for article and PDF downloads
timeout_secs = 30

[extract]
# Minimum text length for a content selector match to be accepted
min_text_length = 100

# CSS selectors to try for article content extraction (in priority order)
content_selectors = [
    "article",
    "[role=\"main\"]",
    "main",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".content",
    "#content",
    ".post",
    ".article",
    ".blog-post",
]

# Elements to remove before extraction (ads, navigation, etc.)
remove_selectors = [
    "nav",
    "header",
    "footer",
    "aside",
    ".sidebar",
    ".advertisement",
    ".ad",
    ".ads",
    ".social-share",
    ".comments",
    ".related-posts",
    "script",
    "style",
    "noscript",
    "iframe",
    "form",
]

[watcher]
# Seconds between checks of the reload marker
interval_secs = 10

# Run when the marker has been removed; an empty list runs the pass in-process
restart_command = ["systemctl", "restart", "shelfsync"]
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown service: {0:?}")]
    UnknownProvider(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.service, "pocket");
        assert_eq!(config.max_articles, DEFAULT_MAX_ARTICLES);
        assert_eq!(config.pocket.request_params["count"], "15");
        assert_eq!(config.omnivore.skipped_label, "remarkable-skipped");
        assert_eq!(config.watcher.interval_secs, 10);
        assert_eq!(
            config.extract.content_selectors.first().map(String::as_str),
            Some("article")
        );
        assert_eq!(
            config.extract.remove_selectors,
            ExtractConfig::default().remove_selectors
        );
        assert_eq!(
            config.extract.content_selectors,
            ExtractConfig::default().content_selectors
        );
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
service = "omnivore"

[omnivore]
query = "label:later"
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        assert_eq!(config.provider().unwrap(), Provider::Omnivore);
        assert_eq!(config.omnivore.query, "label:later");
        assert_eq!(config.omnivore.page_size, 10);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn test_unknown_provider() {
        let config = Config {
            service: "instapaper".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownProvider(name)) if name == "instapaper"
        ));
        assert!(config.reload_uuid().is_err());
    }

    #[test]
    fn test_missing_credentials() {
        let mut config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredential(key)) if key == "pocket.consumer_key"
        ));

        config.pocket.consumer_key = "key".into();
        config.pocket.access_token = "token".into();
        assert_eq!(config.validate().unwrap(), Provider::Pocket);
    }

    #[test]
    fn test_tracked_uuids_follow_active_provider() {
        let mut config = Config::default();
        config.set_target_folder_uuid("folder-p".into()).unwrap();

        config.service = "omnivore".into();
        assert_eq!(config.target_folder_uuid().unwrap(), "");
        config.set_reload_uuid("reload-o".into()).unwrap();

        assert_eq!(config.pocket.target_folder_uuid, "folder-p");
        assert_eq!(config.omnivore.reload_uuid, "reload-o");
        assert_eq!(config.pocket.reload_uuid, "");
    }

    #[test]
    fn test_missing_file_creates_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.service, "pocket");

        // The generated file loads back to the same values.
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.pocket.api_base_url, config.pocket.api_base_url);
    }

    #[test]
    fn test_save_overwrites_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.store_dir = Some(dir.path().join("store"));
        config.set_reload_uuid("abc".into()).unwrap();
        config.save_to(&path).unwrap();

        config.set_reload_uuid("def".into()).unwrap();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.reload_uuid().unwrap(), "def");
        assert_eq!(reloaded.store_root().unwrap(), dir.path().join("store"));
        assert!(!path.with_extension("toml.tmp").exists());
    }
}
