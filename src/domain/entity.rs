//! On-disk records of the synced document store.
//!
//! Field names and default values are what the tablet expects; they are
//! serialized in the same order the device writes them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `parent` value of documents moved to the trash.
pub const TRASH_PARENT: &str = "trash";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "CollectionType")]
    Collection,
    #[default]
    #[serde(rename = "DocumentType")]
    Document,
}

/// Payload format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Epub,
    Pdf,
}

impl FileType {
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Epub => "epub",
            FileType::Pdf => "pdf",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The `<uuid>.metadata` record.
///
/// Fields missing from records written by newer firmware fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub deleted: bool,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
    pub metadatamodified: bool,
    pub modified: bool,
    /// Parent folder UUID, `""` for top level or [`TRASH_PARENT`].
    pub parent: String,
    pub pinned: bool,
    pub synced: bool,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub version: u32,
    #[serde(rename = "visibleName")]
    pub visible_name: String,
}

impl Metadata {
    pub fn new(visible_name: &str, parent: &str, entity_type: EntityType, last_modified: String) -> Self {
        Self {
            deleted: false,
            last_modified,
            metadatamodified: false,
            modified: false,
            parent: parent.to_string(),
            pinned: false,
            synced: false,
            entity_type,
            version: 1,
            visible_name: visible_name.to_string(),
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.parent == TRASH_PARENT
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraMetadata {}

/// Row-major 3x3 page transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub m11: i32,
    pub m12: i32,
    pub m13: i32,
    pub m21: i32,
    pub m22: i32,
    pub m23: i32,
    pub m31: i32,
    pub m32: i32,
    pub m33: i32,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            m11: 1,
            m12: 0,
            m13: 0,
            m21: 0,
            m22: 1,
            m23: 0,
            m31: 0,
            m32: 0,
            m33: 1,
        }
    }
}

/// The `<uuid>.content` record of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
    pub extra_metadata: ExtraMetadata,
    pub file_type: FileType,
    pub font_name: String,
    pub last_opened_page: u32,
    pub line_height: i32,
    pub margins: u32,
    pub orientation: String,
    pub page_count: u32,
    pub text_scale: u32,
    pub transform: Transform,
}

impl ContentDescriptor {
    /// Descriptor with the rendering defaults the device accepts.
    pub fn for_file_type(file_type: FileType) -> Self {
        Self {
            extra_metadata: ExtraMetadata::default(),
            file_type,
            font_name: String::new(),
            last_opened_page: 0,
            line_height: -1,
            margins: 100,
            orientation: "portrait".to_string(),
            page_count: 1,
            text_scale: 1,
            transform: Transform::identity(),
        }
    }
}
