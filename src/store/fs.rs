use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{ContentDescriptor, EntityType, FileType, Metadata};
use crate::store::{Store, StoreError, StoreResult};

const METADATA_EXT: &str = "metadata";
const CONTENT_EXT: &str = "content";

/// Document store backed by a local directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StoreError::Io {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, uuid: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{}.{}", uuid, ext))
    }

    /// Ids come from the settings file, so anything that isn't a UUID is
    /// treated as absent rather than joined into a path.
    fn is_valid_id(uuid: &str) -> bool {
        Uuid::parse_str(uuid).is_ok()
    }

    fn last_modified() -> String {
        Utc::now().timestamp().to_string()
    }

    pub(crate) fn create_folder_with_id(&self, uuid: &str, visible_name: &str) -> StoreResult<()> {
        let metadata = Metadata::new(visible_name, "", EntityType::Collection, Self::last_modified());
        let metadata = serde_json::to_vec(&metadata)?;

        self.write_entity(
            uuid,
            &[
                (self.path_for(uuid, CONTENT_EXT), b"{}".as_slice()),
                (self.path_for(uuid, METADATA_EXT), metadata.as_slice()),
            ],
        )?;
        self.verify(uuid, EntityType::Collection)?;

        debug!("Created folder {} ({})", visible_name, uuid);
        Ok(())
    }

    pub(crate) fn create_document_with_id(
        &self,
        uuid: &str,
        visible_name: &str,
        parent: &str,
        file_type: FileType,
        payload: &[u8],
    ) -> StoreResult<()> {
        let content = serde_json::to_vec(&ContentDescriptor::for_file_type(file_type))?;
        let metadata = Metadata::new(visible_name, parent, EntityType::Document, Self::last_modified());
        let metadata = serde_json::to_vec(&metadata)?;

        self.write_entity(
            uuid,
            &[
                (self.path_for(uuid, file_type.extension()), payload),
                (self.path_for(uuid, CONTENT_EXT), content.as_slice()),
                (self.path_for(uuid, METADATA_EXT), metadata.as_slice()),
            ],
        )?;
        self.verify(uuid, EntityType::Document)?;

        debug!(
            "Created document {} ({}.{}, {} bytes)",
            visible_name,
            uuid,
            file_type,
            payload.len()
        );
        Ok(())
    }

    /// Write the files in order. On failure the files already written for
    /// this entity are removed again.
    fn write_entity(&self, uuid: &str, files: &[(PathBuf, &[u8])]) -> StoreResult<()> {
        let mut written: Vec<&Path> = Vec::with_capacity(files.len());

        for (path, bytes) in files {
            if let Err(e) = fs::write(path, bytes) {
                warn!("Write of {} failed, removing partial entity {}", path.display(), uuid);
                Self::remove_files(&written);
                return Err(StoreError::Io {
                    path: path.clone(),
                    source: e,
                });
            }
            written.push(path);
        }

        Ok(())
    }

    /// Read the metadata back; an entity that can't be read back is removed.
    fn verify(&self, uuid: &str, expected: EntityType) -> StoreResult<()> {
        let reason = match self.read_metadata(uuid) {
            Ok(Some(meta)) if meta.entity_type == expected && !meta.deleted => return Ok(()),
            Ok(Some(_)) => "metadata read back with unexpected values".to_string(),
            Ok(None) => "metadata missing after write".to_string(),
            Err(e) => e.to_string(),
        };

        let exts = ["epub", "pdf", CONTENT_EXT, METADATA_EXT];
        let paths: Vec<PathBuf> = exts.iter().map(|ext| self.path_for(uuid, ext)).collect();
        let paths: Vec<&Path> = paths.iter().map(PathBuf::as_path).filter(|p| p.is_file()).collect();
        Self::remove_files(&paths);

        Err(StoreError::Inconsistent {
            uuid: uuid.to_string(),
            reason,
        })
    }

    fn remove_files(paths: &[&Path]) {
        for path in paths {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

impl Store for FsStore {
    fn folder_exists(&self, uuid: &str) -> bool {
        if !Self::is_valid_id(uuid) {
            return false;
        }

        match self.read_metadata(uuid) {
            Ok(Some(meta)) => !meta.deleted,
            Ok(None) => false,
            Err(e) => {
                warn!("Could not read folder {}: {}", uuid, e);
                false
            }
        }
    }

    fn document_exists(&self, uuid: &str) -> bool {
        if !Self::is_valid_id(uuid) {
            return false;
        }

        let has_payload = [FileType::Epub, FileType::Pdf]
            .iter()
            .any(|ft| self.path_for(uuid, ft.extension()).is_file());
        if !has_payload {
            return false;
        }

        match self.read_metadata(uuid) {
            Ok(Some(meta)) => !meta.deleted && !meta.is_trashed(),
            Ok(None) => false,
            Err(e) => {
                warn!("Could not read document {}: {}", uuid, e);
                false
            }
        }
    }

    fn create_folder(&self, visible_name: &str) -> StoreResult<String> {
        let uuid = Uuid::new_v4().to_string();
        self.create_folder_with_id(&uuid, visible_name)?;
        Ok(uuid)
    }

    fn create_document(
        &self,
        visible_name: &str,
        parent: &str,
        file_type: FileType,
        payload: &[u8],
    ) -> StoreResult<String> {
        let uuid = Uuid::new_v4().to_string();
        self.create_document_with_id(&uuid, visible_name, parent, file_type, payload)?;
        Ok(uuid)
    }

    fn read_metadata(&self, uuid: &str) -> StoreResult<Option<Metadata>> {
        if !Self::is_valid_id(uuid) {
            return Ok(None);
        }

        let path = self.path_for(uuid, METADATA_EXT);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };

        match serde_json::from_slice(&bytes) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) => {
                warn!("Unreadable metadata {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsStore) {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn set_metadata(store: &FsStore, uuid: &str, edit: impl FnOnce(&mut Metadata)) {
        let mut meta = store.read_metadata(uuid).unwrap().unwrap();
        edit(&mut meta);
        fs::write(
            store.path_for(uuid, METADATA_EXT),
            serde_json::to_vec(&meta).unwrap(),
        )
        .unwrap();
    }

    fn file_count(store: &FsStore) -> usize {
        fs::read_dir(store.root()).unwrap().count()
    }

    #[test]
    fn test_create_folder_writes_content_and_metadata() {
        let (_dir, store) = store();
        let uuid = store.create_folder("pocket").unwrap();

        let content = fs::read_to_string(store.path_for(&uuid, CONTENT_EXT)).unwrap();
        assert_eq!(content, "{}");

        let meta = store.read_metadata(&uuid).unwrap().unwrap();
        assert_eq!(meta.entity_type, EntityType::Collection);
        assert_eq!(meta.parent, "");
        assert_eq!(meta.visible_name, "pocket");
        assert!(!meta.deleted);
        assert!(meta.last_modified.parse::<i64>().is_ok());
        assert_eq!(file_count(&store), 2);
    }

    #[test]
    fn test_folder_exists_round_trip() {
        let (_dir, store) = store();
        let uuid = store.create_folder("pocket").unwrap();
        assert!(store.folder_exists(&uuid));

        set_metadata(&store, &uuid, |m| m.deleted = true);
        assert!(!store.folder_exists(&uuid));
    }

    #[test]
    fn test_folder_exists_without_metadata() {
        let (_dir, store) = store();
        let uuid = Uuid::new_v4().to_string();
        fs::write(store.path_for(&uuid, CONTENT_EXT), "{}").unwrap();

        assert!(!store.folder_exists(&uuid));
        assert!(!store.folder_exists(""));
        assert!(!store.folder_exists("../etc/passwd"));
    }

    #[test]
    fn test_create_document_writes_three_files() {
        let (_dir, store) = store();
        let folder = store.create_folder("pocket").unwrap();
        let uuid = store
            .create_document("20240305-0000 :: Hello", &folder, FileType::Epub, b"PK\x03\x04")
            .unwrap();

        assert_eq!(fs::read(store.path_for(&uuid, "epub")).unwrap(), b"PK\x03\x04");

        let content: ContentDescriptor =
            serde_json::from_slice(&fs::read(store.path_for(&uuid, CONTENT_EXT)).unwrap()).unwrap();
        assert_eq!(content, ContentDescriptor::for_file_type(FileType::Epub));

        let meta = store.read_metadata(&uuid).unwrap().unwrap();
        assert_eq!(meta.entity_type, EntityType::Document);
        assert_eq!(meta.parent, folder);
        assert_eq!(meta.visible_name, "20240305-0000 :: Hello");
    }

    #[test]
    fn test_document_exists_round_trip() {
        let (_dir, store) = store();
        let uuid = store
            .create_document("marker", "", FileType::Pdf, b"%PDF-1.5")
            .unwrap();
        assert!(store.document_exists(&uuid));

        set_metadata(&store, &uuid, |m| m.deleted = true);
        assert!(!store.document_exists(&uuid));
    }

    #[test]
    fn test_trashed_document_is_not_present() {
        let (_dir, store) = store();
        let uuid = store
            .create_document("marker", "", FileType::Pdf, b"%PDF-1.5")
            .unwrap();

        set_metadata(&store, &uuid, |m| m.parent = "trash".into());
        assert!(!store.document_exists(&uuid));
    }

    #[test]
    fn test_document_without_payload_is_not_present() {
        let (_dir, store) = store();
        let uuid = store
            .create_document("marker", "", FileType::Pdf, b"%PDF-1.5")
            .unwrap();

        fs::remove_file(store.path_for(&uuid, "pdf")).unwrap();
        assert!(!store.document_exists(&uuid));
    }

    #[test]
    fn test_payload_without_metadata_is_not_present() {
        let (_dir, store) = store();
        let uuid = Uuid::new_v4().to_string();
        fs::write(store.path_for(&uuid, "pdf"), b"%PDF-1.5").unwrap();

        assert!(!store.document_exists(&uuid));
    }

    #[test]
    fn test_unparsable_metadata_is_not_present() {
        let (_dir, store) = store();
        let uuid = store
            .create_document("marker", "", FileType::Pdf, b"%PDF-1.5")
            .unwrap();
        fs::write(store.path_for(&uuid, METADATA_EXT), "{not json").unwrap();

        assert!(!store.document_exists(&uuid));
        assert!(store.read_metadata(&uuid).unwrap().is_none());
    }

    #[test]
    fn test_failed_metadata_write_removes_partial_entity() {
        let (_dir, store) = store();
        let uuid = Uuid::new_v4().to_string();
        // A directory in place of the metadata file makes the last write fail.
        fs::create_dir(store.path_for(&uuid, METADATA_EXT)).unwrap();

        let err = store
            .create_document_with_id(&uuid, "doc", "", FileType::Epub, b"payload")
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));

        assert!(!store.path_for(&uuid, "epub").exists());
        assert!(!store.path_for(&uuid, CONTENT_EXT).exists());
        assert!(!store.document_exists(&uuid));
    }

    #[test]
    fn test_failed_write_leaves_other_entities_alone() {
        let (_dir, store) = store();
        let kept = store
            .create_document("kept", "", FileType::Pdf, b"%PDF-1.5")
            .unwrap();

        let uuid = Uuid::new_v4().to_string();
        fs::create_dir(store.path_for(&uuid, CONTENT_EXT)).unwrap();
        assert!(store
            .create_document_with_id(&uuid, "doc", "", FileType::Pdf, b"%PDF")
            .is_err());

        assert!(store.document_exists(&kept));
        assert!(!store.path_for(&uuid, "pdf").exists());
    }

    #[test]
    fn test_same_name_creates_distinct_entities() {
        let (_dir, store) = store();
        let a = store.create_document("same", "", FileType::Pdf, b"%PDF").unwrap();
        let b = store.create_document("same", "", FileType::Pdf, b"%PDF").unwrap();

        assert_ne!(a, b);
        assert_eq!(file_count(&store), 6);
    }
}
