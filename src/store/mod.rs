//! The synced document store.
//!
//! Every entity is a set of sibling files named after its UUID:
//!
//! ```text
//! <root>/<uuid>.metadata   JSON, see Metadata
//! <root>/<uuid>.content    JSON, see ContentDescriptor ("{}" for folders)
//! <root>/<uuid>.<epub|pdf> payload, documents only
//! ```
//!
//! Files are written payload first and metadata last, so metadata presence
//! marks a complete entity.

pub mod fs;

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{FileType, Metadata};

pub use fs::FsStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Entity {uuid} is incomplete: {reason}")]
    Inconsistent { uuid: String, reason: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub trait Store {
    /// True iff the folder's metadata exists and is not flagged deleted.
    fn folder_exists(&self, uuid: &str) -> bool;

    /// True iff the payload exists and the metadata is neither deleted nor
    /// in the trash.
    fn document_exists(&self, uuid: &str) -> bool;

    /// Create a top-level folder, returning its UUID.
    fn create_folder(&self, visible_name: &str) -> StoreResult<String>;

    /// Create a document under `parent`, returning its UUID.
    fn create_document(
        &self,
        visible_name: &str,
        parent: &str,
        file_type: FileType,
        payload: &[u8],
    ) -> StoreResult<String>;

    /// Read an entity's metadata; `None` if it is missing or unreadable.
    fn read_metadata(&self, uuid: &str) -> StoreResult<Option<Metadata>>;
}
