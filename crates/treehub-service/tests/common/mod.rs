#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use treehub_core::config::TreeConfig;
use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_core::traits::BlobStore;
use treehub_database::{MemoryTreeStore, TreeStore};
use treehub_entity::{Directory, File};
use treehub_service::{CreateFileInput, TreeServices};

/// Blob store that records deletions and can be told to fail them.
#[derive(Debug, Default)]
pub struct RecordingBlobStore {
    deleted: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingBlobStore {
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    fn provider_type(&self) -> &str {
        "recording"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put_signed_url(&self, key: &str) -> AppResult<String> {
        Ok(format!("memory://put/{key}"))
    }

    async fn get_signed_url(&self, key: &str) -> AppResult<String> {
        Ok(format!("memory://get/{key}"))
    }

    async fn put_object(&self, _key: &str, _data: Bytes) -> AppResult<()> {
        Ok(())
    }

    async fn get_object(&self, key: &str) -> AppResult<Bytes> {
        Err(AppError::not_found(format!("Blob not found: {key}")))
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::storage("object store unreachable"));
        }
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryTreeStore>,
    pub blobs: Arc<RecordingBlobStore>,
    pub services: TreeServices,
    pub root: Directory,
}

pub async fn harness() -> Harness {
    harness_with(TreeConfig::default()).await
}

pub async fn harness_with(config: TreeConfig) -> Harness {
    let store = Arc::new(MemoryTreeStore::new());
    let blobs = Arc::new(RecordingBlobStore::default());
    let services = TreeServices::new(
        store.clone() as Arc<dyn TreeStore>,
        blobs.clone() as Arc<dyn BlobStore>,
        &config,
    );
    let root = services.directories.ensure_root().await.unwrap();
    Harness {
        store,
        blobs,
        services,
        root,
    }
}

impl Harness {
    pub async fn mkdir(&self, name: &str, parent: Uuid) -> Directory {
        self.services
            .directories
            .create_directory(name, parent)
            .await
            .unwrap()
    }

    pub async fn touch(&self, name: &str, directory_id: Uuid, size: i64) -> File {
        self.services
            .files
            .create_file(CreateFileInput {
                name: name.to_string(),
                directory_id,
                mime_type: "text/plain".to_string(),
                size,
                key: None,
            })
            .await
            .unwrap()
            .0
    }

    pub async fn dir(&self, id: Uuid) -> Directory {
        self.services
            .directories
            .get_directory(id)
            .await
            .unwrap()
            .unwrap()
    }

    /// Check that every stored chain equals its parent's chain plus the
    /// parent, and that no chain contains a cycle.
    pub async fn assert_chains_consistent(&self) {
        let directories = self.store.list_directories().await.unwrap();
        let by_id: HashMap<Uuid, &Directory> = directories.iter().map(|d| (d.id, d)).collect();

        for directory in &directories {
            assert!(!directory.ancestors.contains(&directory.id), "cycle at {}", directory.name);
            match directory.parent_id {
                None => assert!(directory.ancestors.is_empty()),
                Some(parent_id) => {
                    let parent = by_id[&parent_id];
                    assert_eq!(
                        directory.ancestors,
                        parent.child_ancestors(),
                        "directory {} has a stale chain",
                        directory.name
                    );
                }
            }
        }

        for file in self.store.descendant_files(self.root.id).await.unwrap() {
            let parent = by_id[&file.directory_id];
            assert_eq!(file.ancestors, parent.child_ancestors(), "file {} has a stale chain", file.name);
        }
    }

    /// Check that every surviving file still has at least one version.
    pub async fn assert_files_have_versions(&self) {
        for file in self.store.descendant_files(self.root.id).await.unwrap() {
            let versions = self
                .services
                .versions
                .get_file_versions(file.id, None)
                .await
                .unwrap();
            assert!(!versions.is_empty(), "file {} lost its versions", file.name);
        }
    }
}
