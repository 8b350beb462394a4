use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::content::{ContentObject, ContentStore, UploadRouting};
use crate::error::{StoreError, StoreResult};

const MAX_KEY_ATTEMPTS: u32 = 16;

/// Content store that writes objects beneath a local root directory.
///
/// Objects are addressed as `<public_base_url>/<resource>/<folder>/<key>`; the
/// HTTP layer serves `root` read-only under that base.
#[derive(Clone, Debug)]
pub struct FilesystemContentStore {
    root: PathBuf,
    public_base_url: String,
    routing: UploadRouting,
}

impl FilesystemContentStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            routing: UploadRouting::default(),
        }
    }

    pub fn with_routing(mut self, routing: UploadRouting) -> Self {
        self.routing = routing;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL issued by this store back to its on-disk path.
    fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let rel = url.strip_prefix(&self.public_base_url)?.strip_prefix('/')?;
        let rel = Path::new(rel);
        if rel.components().all(|c| matches!(c, Component::Normal(_))) {
            Some(self.root.join(rel))
        } else {
            None
        }
    }
}

#[async_trait]
impl ContentStore for FilesystemContentStore {
    async fn store(&self, object: ContentObject) -> StoreResult<String> {
        let now = Utc::now();
        for attempt in 0..MAX_KEY_ATTEMPTS {
            let rel = self.routing.object_path(&object, now, attempt);
            let path = self.root.join(&rel);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            let bytes = &object.bytes;
            write_or_remove(&path, async move {
                let mut file = file;
                file.write_all(bytes).await?;
                file.sync_all().await
            })
            .await?;

            tracing::debug!(path = %path.display(), bytes = object.len(), "content object stored");
            return Ok(format!("{}/{}", self.public_base_url, rel));
        }
        Err(StoreError::Storage(format!(
            "no free object key after {MAX_KEY_ATTEMPTS} attempts"
        )))
    }

    async fn delete(&self, url: &str) -> StoreResult<bool> {
        let Some(path) = self.path_for_url(url) else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Drive `write` to completion; a failed write leaves nothing behind at `path`.
async fn write_or_remove<F>(path: &Path, write: F) -> io::Result<()>
where
    F: Future<Output = io::Result<()>>,
{
    let Err(err) = write.await else {
        return Ok(());
    };
    if let Err(cleanup) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %cleanup, "partial object not removed");
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zap_types::ContentKind;

    fn store_in(dir: &Path) -> FilesystemContentStore {
        FilesystemContentStore::new(dir, "http://localhost:8080/files/")
    }

    #[tokio::test]
    async fn store_writes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let obj =
            ContentObject::new(b"%PDF-1.7".to_vec(), ContentKind::Pdf).with_file_name("doc.pdf");

        let url = store.store(obj).await.unwrap();
        assert!(url.starts_with("http://localhost:8080/files/image/zaplink_folders/doc_"));
        assert!(url.ends_with(".pdf"));

        let path = store.path_for_url(&url).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn same_name_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let a = ContentObject::new(b"a".to_vec(), ContentKind::File).with_file_name("x.bin");
        let b = ContentObject::new(b"b".to_vec(), ContentKind::File).with_file_name("x.bin");
        let ua = store.store(a).await.unwrap();
        let ub = store.store(b).await.unwrap();
        assert_ne!(ua, ub);
        assert_eq!(std::fs::read(store.path_for_url(&ua).unwrap()).unwrap(), b"a");
        assert_eq!(std::fs::read(store.path_for_url(&ub).unwrap()).unwrap(), b"b");
    }

    #[tokio::test]
    async fn failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        std::fs::write(&path, b"half").unwrap();

        let err = write_or_remove(&path, async { Err(io::Error::other("disk full")) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());

        std::fs::write(&path, b"whole").unwrap();
        write_or_remove(&path, async { Ok(()) }).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"whole");
    }

    #[tokio::test]
    async fn delete_removes_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let url = store
            .store(ContentObject::new(b"bye".to_vec(), ContentKind::Video))
            .await
            .unwrap();
        assert!(store.delete(&url).await.unwrap());
        assert!(!store.delete(&url).await.unwrap());
    }

    #[tokio::test]
    async fn delete_ignores_foreign_and_traversal_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(!store.delete("https://cdn.example.com/raw/x").await.unwrap());
        assert!(!store
            .delete("http://localhost:8080/files/../../etc/passwd")
            .await
            .unwrap());
    }
}
