use crate::serialize::Sink;
use async_trait::async_trait;
use std::path::Path;
use tracing::trace;

/// Writes artifacts to the local filesystem, creating parent directories as needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSink;

#[async_trait]
impl Sink for FileSink {
    async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            trace!("checking directory path: {:?}", dir);
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(path, bytes).await?;
        trace!("{} bytes written to {}", bytes.len(), path.display());
        Ok(())
    }
}
