//! Artifact sinks — where a finished PDF goes after rendering.
//!
//! Every render gets its own location. `InMemorySink` hands the buffer straight back;
//! `DirectorySink` additionally keeps a copy under a fresh `collage-<time>-<uuid>.pdf`
//! name, written to a temp file in the same directory and renamed into place.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to write collage archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive task failed: {0}")]
    Task(String),
}

/// A finished artifact. `location` is set when a copy was written to disk.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub bytes: Bytes,
    pub location: Option<PathBuf>,
}

#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn persist(&self, pdf: Bytes) -> Result<StoredArtifact, PersistError>;
}

/// Returns the buffer to the caller without touching the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemorySink;

#[async_trait]
impl ArtifactSink for InMemorySink {
    async fn persist(&self, pdf: Bytes) -> Result<StoredArtifact, PersistError> {
        Ok(StoredArtifact {
            bytes: pdf,
            location: None,
        })
    }
}

/// Archives every artifact under a unique name in `dir`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Creates `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn persist(&self, pdf: Bytes) -> Result<StoredArtifact, PersistError> {
        let dir = self.dir.clone();
        let data = pdf.clone();

        let location = tokio::task::spawn_blocking(move || write_unique(&dir, &data))
            .await
            .map_err(|e| PersistError::Task(e.to_string()))??;

        info!(path = %location.display(), bytes = pdf.len(), "collage archived");
        Ok(StoredArtifact {
            bytes: pdf,
            location: Some(location),
        })
    }
}

fn write_unique(dir: &Path, data: &[u8]) -> Result<PathBuf, PersistError> {
    let name = format!(
        "collage-{}-{}.pdf",
        Utc::now().format("%Y%m%dT%H%M%S"),
        Uuid::new_v4()
    );
    let target = dir.join(name);

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(&target).map_err(|e| e.error)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_in_memory_sink_returns_bytes_untouched() {
        let stored = InMemorySink
            .persist(Bytes::from_static(b"%PDF-1.5 test"))
            .await
            .unwrap();
        assert_eq!(&stored.bytes[..], b"%PDF-1.5 test");
        assert!(stored.location.is_none());
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path().join("generated")).unwrap();

        let stored = sink.persist(Bytes::from_static(b"pdf")).await.unwrap();
        let path = stored.location.unwrap();
        assert!(path.starts_with(sink.dir()));
        assert_eq!(std::fs::read(&path).unwrap(), b"pdf");
    }

    #[tokio::test]
    async fn test_directory_sink_never_reuses_a_path() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path()).unwrap();

        let (a, b) = tokio::join!(
            sink.persist(Bytes::from_static(b"first")),
            sink.persist(Bytes::from_static(b"second")),
        );
        let a = a.unwrap().location.unwrap();
        let b = b.unwrap().location.unwrap();

        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).unwrap(), b"first");
        assert_eq!(std::fs::read(&b).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_directory_sink_unwritable_dir_fails() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path().join("gone")).unwrap();
        std::fs::remove_dir(sink.dir()).unwrap();

        assert!(matches!(
            sink.persist(Bytes::from_static(b"pdf")).await,
            Err(PersistError::Io(_))
        ));
    }
}
