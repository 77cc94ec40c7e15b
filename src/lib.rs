//! # shelfsync
//!
//! Copies "read later" articles into the file-based document store of an
//! e-ink tablet, where the device's own sync agent picks them up.
//!
//! ## Architecture
//!
//! ```text
//! ArticleSource → ContentRenderer → Store
//!       ↑                              ↓
//!   mark handled  ←──────────── IngestionPipeline
//! ```
//!
//! A pass is gated on a "remove to sync" marker document: while it is still
//! on the tablet, nothing runs. Once the reader deletes it, the reload
//! watcher restarts the service and the next batch is written.
//!
//! ## Quick Start
//!
//! ```bash
//! # One pass with the default quota of 10 articles
//! shelfsync
//!
//! # Watch the marker and restart the service when it is removed
//! shelfsync-reload start --interval 10s
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// provider and renderer.
pub mod app;

/// Command-line interface using clap.
///
/// - `shelfsync [-n N]` - Run one pass
/// - `shelfsync-reload start|stop|status` - Manage the reload watcher
pub mod cli;

/// Settings loaded from `~/.config/shelfsync/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`ArticleItem`](domain::ArticleItem): A candidate listed by a provider
/// - [`Metadata`](domain::Metadata): The `.metadata` record of an entity
/// - [`ContentDescriptor`](domain::ContentDescriptor): The `.content` record of a document
pub mod domain;

/// Readable-content extraction from raw HTML.
pub mod extract;

/// HTTP fetching for article pages and PDF files.
pub mod fetcher;

/// The list → render → store → mark pass.
pub mod ingest;

/// EPUB and PDF payloads.
pub mod render;

/// Reload marker and target folder management.
pub mod sentinel;

/// Reading-list providers (Pocket, Omnivore).
pub mod source;

/// The UUID-keyed document store.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`FsStore`](store::FsStore): Directory-backed implementation
pub mod store;

/// Background watcher that restarts the service once the marker is removed.
pub mod watcher;
