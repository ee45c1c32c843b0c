use axum::body::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Local file storage for post uploads. Files land under a date-partitioned
/// directory (`uploads/YYYY/MM/DD/`) below the media root and are addressed
/// by the relative path stored on the post.
#[derive(Clone)]
pub struct LocalUploadStorage {
    root: PathBuf,
}

impl LocalUploadStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(
        &self,
        file_bytes: Bytes,
        original_filename: Option<String>,
    ) -> Result<String, std::io::Error> {
        let extension = original_filename
            .and_then(|name| {
                Path::new(&name)
                    .extension()
                    .and_then(|os_str| os_str.to_str())
                    .map(|s| s.to_owned())
            })
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let partition = Utc::now().format("uploads/%Y/%m/%d").to_string();
        let unique_filename = format!("{}{}", Uuid::new_v4(), extension);

        let dir = self.root.join(&partition);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&unique_filename), file_bytes).await?;

        Ok(format!("{}/{}", partition, unique_filename))
    }

    pub async fn delete(&self, stored_path: &str) -> Result<(), std::io::Error> {
        fs::remove_file(self.root.join(stored_path)).await
    }
}
