use crate::utils::{error::ClassifyError, secure_filename};
use crate::Result;
use std::path::{Path, PathBuf};

/// 上传文件对外访问的URL前缀
pub const UPLOAD_URL_PREFIX: &str = "/static/uploads";

/// 上传文件存储：保存到配置的目录，文件名经过清洗
///
/// Files are never deleted; the directory grows with every upload. Saving a
/// second file with the same sanitized name overwrites the first.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

/// 已保存的上传文件
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub file_name: String,
    pub path: PathBuf,
    pub url: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// 确保上传目录存在
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ClassifyError::Config(format!(
                "Cannot create upload directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        tracing::info!("Upload directory ready: {}", self.dir.display());
        tracing::warn!(
            "Uploaded files are kept indefinitely under {}; no retention policy is configured",
            self.dir.display()
        );
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredUpload> {
        if bytes.len() > self.max_bytes {
            return Err(ClassifyError::FileTooLarge(bytes.len(), self.max_bytes));
        }

        let file_name = secure_filename(original_name)
            .unwrap_or_else(|| format!("upload-{}", uuid::Uuid::new_v4().simple()));
        let path = self.dir.join(&file_name);

        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(
            "Saved upload '{}' as {} ({} bytes)",
            original_name,
            path.display(),
            bytes.len()
        );

        Ok(StoredUpload {
            url: format!("{}/{}", UPLOAD_URL_PREFIX, file_name),
            file_name,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_under_sanitized_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), 1024);
        store.init().await.unwrap();

        let stored = store.save("../secret/My Palm.jpg", b"bytes").await.unwrap();
        assert_eq!(stored.file_name, "secret_My_Palm.jpg");
        assert_eq!(stored.url, "/static/uploads/secret_My_Palm.jpg");
        assert_eq!(stored.path, dir.path().join("uploads").join("secret_My_Palm.jpg"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn unusable_names_get_generated() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        let stored = store.save("椰子", b"x").await.unwrap();
        assert!(stored.file_name.starts_with("upload-"));
        assert!(stored.path.exists());
    }

    #[tokio::test]
    async fn same_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);

        store.save("leaf.png", b"first").await.unwrap();
        let stored = store.save("leaf.png", b"second").await.unwrap();
        assert_eq!(std::fs::read(stored.path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn rejects_oversized_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 4);

        let err = store.save("big.jpg", b"12345").await.unwrap_err();
        assert!(matches!(err, ClassifyError::FileTooLarge(5, 4)));
        assert!(!dir.path().join("big.jpg").exists());
    }
}
