use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::Result;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::render::ContentRenderer;
use crate::source::{self, ArticleSource};
use crate::store::FsStore;

/// Everything one pass needs, built from the settings file.
pub struct AppContext {
    pub config: Config,
    /// Where `config` is saved when a tracked UUID changes.
    pub config_path: PathBuf,
    pub store: Arc<FsStore>,
    pub source: Arc<dyn ArticleSource>,
    pub renderer: ContentRenderer,
}

impl AppContext {
    /// Load settings from `config_path` (or the default location) and build
    /// the store, HTTP client and provider.
    pub fn load(config_path: Option<PathBuf>, store_dir: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(p) => p,
            None => Config::default_config_path()?,
        };
        let config = Config::load_from(&config_path)?;
        Self::new(config, config_path, store_dir)
    }

    /// `store_dir` overrides the configured store directory for this run only.
    pub fn new(config: Config, config_path: PathBuf, store_dir: Option<PathBuf>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetch)?);
        let source = source::from_config(&config, fetcher.clone())?;

        let store_root = match store_dir {
            Some(dir) => dir,
            None => config.store_root()?,
        };
        let store = Arc::new(FsStore::new(&store_root)?);

        Ok(Self::from_parts(
            config,
            config_path,
            store,
            source,
            ContentRenderer::new(fetcher),
        ))
    }

    pub fn from_parts(
        config: Config,
        config_path: PathBuf,
        store: Arc<FsStore>,
        source: Arc<dyn ArticleSource>,
        renderer: ContentRenderer,
    ) -> Self {
        Self {
            config,
            config_path,
            store,
            source,
            renderer,
        }
    }
}
