use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{
    path::Path as ObjPath, Attribute, Attributes, ObjectStore, PutOptions, PutPayload,
};

use crate::storage::types::{
    document_metadata::DocumentMetadata, storage_key::StorageKey, tag_set::TagSet,
};
use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Storage manager wrapping the configured object store backend.
#[derive(Clone)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
}

impl StorageManager {
    /// Create a new StorageManager with the specified configuration.
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let backend_kind = cfg.storage.clone();
        let store = create_storage_backend(cfg).await?;

        Ok(Self {
            store,
            backend_kind,
        })
    }

    /// Create a StorageManager with a custom storage backend.
    ///
    /// Useful for tests that want to inspect the backend directly.
    pub fn with_backend(store: DynStore, backend_kind: StorageKind) -> Self {
        Self {
            store,
            backend_kind,
        }
    }

    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    /// Store an uploaded document with its per-field metadata and search tags.
    ///
    /// The local filesystem backend cannot persist attributes, so only the bytes
    /// are written there.
    pub async fn put_document(
        &self,
        key: &StorageKey,
        data: Bytes,
        metadata: &DocumentMetadata,
        tags: &TagSet,
    ) -> object_store::Result<()> {
        let path = ObjPath::from(key.as_str());
        let payload = PutPayload::from_bytes(data);

        let opts = if self.supports_attributes() {
            PutOptions {
                tags: tags.to_object_tags(),
                attributes: document_attributes(metadata),
                ..Default::default()
            }
        } else {
            tracing::debug!(
                key = %key,
                "Backend does not store attributes; writing document bytes only"
            );
            PutOptions::default()
        };

        self.store.put_opts(&path, payload, opts).await.map(|_| ())
    }

    /// List all objects below the specified prefix.
    pub async fn list(
        &self,
        prefix: Option<&str>,
    ) -> object_store::Result<Vec<object_store::ObjectMeta>> {
        let prefix_path = prefix.map(ObjPath::from);
        self.store.list(prefix_path.as_ref()).try_collect().await
    }

    /// Check if an object exists at the specified location.
    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }

    fn supports_attributes(&self) -> bool {
        !matches!(self.backend_kind, StorageKind::Local)
    }
}

fn document_attributes(metadata: &DocumentMetadata) -> Attributes {
    let mut attributes = Attributes::new();
    if let Some(mime_type) = &metadata.mime_type {
        attributes.insert(Attribute::ContentType, mime_type.clone().into());
    }
    for (name, value) in metadata.object_metadata() {
        attributes.insert(Attribute::Metadata(name.into()), value.into());
    }
    attributes
}

/// Create a storage backend based on configuration.
async fn create_storage_backend(cfg: &AppConfig) -> object_store::Result<DynStore> {
    match cfg.storage {
        StorageKind::Local => {
            let base = resolve_base_dir(cfg);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await.map_err(|e| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: e.into(),
                    }
                })?;
            }
            let store = LocalFileSystem::new_with_prefix(base)?;
            Ok(Arc::new(store))
        }
        StorageKind::Memory => {
            let store = InMemory::new();
            Ok(Arc::new(store))
        }
        StorageKind::S3 => {
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(&cfg.s3_bucket)
                .with_region(&cfg.aws_region)
                .build()?;
            Ok(Arc::new(store))
        }
    }
}

/// Resolve the absolute base directory used for local storage from config.
///
/// If `data_dir` is relative, it is resolved against the current working directory.
pub fn resolve_base_dir(cfg: &AppConfig) -> PathBuf {
    if cfg.data_dir.starts_with('/') {
        PathBuf::from(&cfg.data_dir)
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&cfg.data_dir)
    }
}

/// Testing utilities for storage operations.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;

    /// A ready-to-use configuration backed by in-memory storage.
    pub fn test_config_memory() -> AppConfig {
        AppConfig {
            knowledge_base_id: "KBTEST0001".into(),
            data_source_id: "DSTEST0001".into(),
            storage: StorageKind::Memory,
            data_dir: "/tmp/unused".into(), // Ignored for memory storage
            ..Default::default()
        }
    }

    /// A fresh, isolated in-memory StorageManager.
    pub async fn memory_storage() -> StorageManager {
        StorageManager::new(&test_config_memory())
            .await
            .expect("Failed to create test memory storage")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::document_metadata::{DocumentType, Jurisdiction};

    fn sample_metadata() -> DocumentMetadata {
        DocumentMetadata {
            jurisdiction: Jurisdiction::State,
            state: Some("California".into()),
            document_type: DocumentType::Guidance,
            title: "Guidance on X".into(),
            effective_date: None,
            regulation_section: Some("Title 17".into()),
            description: None,
            uploaded_at: None,
            original_filename: Some("x.pdf".into()),
            file_size: Some(4),
            mime_type: Some("application/pdf".into()),
        }
    }

    fn attribute<'a>(attributes: &'a Attributes, key: &Attribute) -> Option<&'a str> {
        attributes.get(key).map(AsRef::as_ref)
    }

    async fn store_document(storage: &StorageManager, location: &str, data: &'static [u8]) {
        let metadata = sample_metadata();
        let key = StorageKey::parse(location).expect("valid key");
        storage
            .put_document(
                &key,
                Bytes::from_static(data),
                &metadata,
                &TagSet::for_document(&metadata),
            )
            .await
            .expect("put document");
    }

    async fn read(store: &InMemory, location: &str) -> Bytes {
        store
            .get(&ObjPath::from(location))
            .await
            .expect("stored object")
            .bytes()
            .await
            .expect("object bytes")
    }

    #[tokio::test]
    async fn test_storage_manager_memory_basic_operations() {
        let store = Arc::new(InMemory::new());
        let storage = StorageManager::with_backend(store.clone(), StorageKind::Memory);
        let location = "federal/regulations/file.pdf";

        store_document(&storage, location, b"test data for storage manager").await;

        assert_eq!(
            read(&store, location).await.as_ref(),
            b"test data for storage manager"
        );
        assert!(storage.exists(location).await.expect("exists check"));
        assert!(!storage
            .exists("federal/regulations/missing.pdf")
            .await
            .expect("exists check for missing object"));
    }

    #[tokio::test]
    async fn test_put_document_stores_attributes() {
        let store = Arc::new(InMemory::new());
        let storage = StorageManager::with_backend(store.clone(), StorageKind::Memory);
        let metadata = sample_metadata();
        let key = StorageKey::parse("states/california/guidance/guidance-on-x-2024-03-01.pdf")
            .expect("valid key");

        storage
            .put_document(
                &key,
                Bytes::from_static(b"%PDF"),
                &metadata,
                &TagSet::for_document(&metadata),
            )
            .await
            .expect("put document");

        let result = store
            .get(&ObjPath::from(key.as_str()))
            .await
            .expect("get stored document");
        let attributes = result.attributes.clone();
        assert_eq!(
            attribute(&attributes, &Attribute::ContentType),
            Some("application/pdf")
        );
        assert_eq!(
            attribute(&attributes, &Attribute::Metadata("document-title".into())),
            Some("Guidance on X")
        );
        assert_eq!(
            attribute(&attributes, &Attribute::Metadata("state".into())),
            Some("California")
        );
        assert_eq!(result.bytes().await.expect("bytes").as_ref(), b"%PDF");
    }

    #[tokio::test]
    async fn test_put_document_overwrites_same_key() {
        let store = Arc::new(InMemory::new());
        let storage = StorageManager::with_backend(store.clone(), StorageKind::Memory);
        let location = "federal/regulations/same-2024-03-01.pdf";

        store_document(&storage, location, b"first").await;
        store_document(&storage, location, b"second").await;

        assert_eq!(read(&store, location).await.as_ref(), b"second");
        assert_eq!(storage.list(None).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn test_storage_manager_local_put_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = AppConfig {
            storage: StorageKind::Local,
            data_dir: dir.path().to_string_lossy().into_owned(),
            ..testing::test_config_memory()
        };
        let storage = StorageManager::new(&cfg)
            .await
            .expect("create storage manager");
        assert_eq!(resolve_base_dir(&cfg), dir.path());

        let location = "states/california/guidance/local-2024-03-01.pdf";
        store_document(&storage, location, b"local bytes").await;

        let on_disk = tokio::fs::read(dir.path().join(location))
            .await
            .expect("document written below the base directory");
        assert_eq!(on_disk, b"local bytes");
        assert!(storage.exists(location).await.expect("exists check"));
    }

    #[tokio::test]
    async fn test_storage_manager_list_operations() {
        let storage = testing::memory_storage().await;

        for location in [
            "federal/regulations/a.pdf",
            "federal/addendums/b.pdf",
            "states/ohio/guidance/c.pdf",
        ] {
            store_document(&storage, location, b"content").await;
        }

        let all_files = storage.list(None).await.expect("list all");
        assert_eq!(all_files.len(), 3);

        let federal = storage.list(Some("federal")).await.expect("list federal");
        assert_eq!(federal.len(), 2);
        assert!(federal
            .iter()
            .any(|meta| meta.location.as_ref().contains("a.pdf")));

        let empty = storage
            .list(Some("nonexistent"))
            .await
            .expect("list nonexistent");
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_storage_manager_isolation() {
        let storage1 = testing::memory_storage().await;
        let storage2 = testing::memory_storage().await;

        store_document(&storage1, "isolation/test.pdf", b"one").await;

        assert!(!storage2
            .exists("isolation/test.pdf")
            .await
            .expect("exists in storage 2"));
    }
}
