use std::path::PathBuf;

use anyhow::Result;
use tokio::fs;
use tracing::info;

/// Disk-backed blob store. Each upload lives as a single flat file at
/// `{dir}/{file_id}`; ids are UUIDs, so names never collide or traverse.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("File storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn path(&self, file_id: &str) -> PathBuf {
        self.dir.join(file_id)
    }

    pub async fn save(&self, file_id: &str, bytes: &[u8]) -> Result<()> {
        fs::write(self.path(file_id), bytes).await?;
        Ok(())
    }

    pub async fn open(&self, file_id: &str) -> Result<fs::File> {
        Ok(fs::File::open(self.path(file_id)).await?)
    }
}
