//! Temporary spillover files
//!
//! Request bodies that outgrow the in-memory staging buffer are appended to a
//! uniquely named file in the configured directory. The store only hands out
//! names and cleans up; each [`Spillover`] is owned by one connection.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Allocates and releases spillover files.
///
/// Safe to share between connections: names come from an atomic counter.
#[derive(Debug)]
pub struct TemporaryStore {
    directory: PathBuf,
    counter: AtomicU64,
}

/// An open, append-only spillover file.
#[derive(Debug)]
pub struct Spillover {
    path: PathBuf,
    file: File,
    written: u64,
}

impl TemporaryStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Next unused name, `<dir>/spillway-<pid>-<n>.tmp`.
    pub fn generate_name(&self) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.directory
            .join(format!("spillway-{}-{}.tmp", std::process::id(), n))
    }

    /// Create a fresh spillover file. Never reuses an existing file.
    pub async fn allocate(&self) -> io::Result<Spillover> {
        let path = self.generate_name();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        tracing::debug!(path = %path.display(), "Allocated spillover file");

        Ok(Spillover {
            path,
            file,
            written: 0,
        })
    }

    /// Close the sink and delete its file.
    ///
    /// The file is removed even when the final flush fails; the first error
    /// is returned.
    pub async fn release(&self, sink: Spillover) -> io::Result<()> {
        let path = sink.path.clone();
        let closed = sink.close().await;
        let removed = tokio::fs::remove_file(&path).await;
        closed?;
        removed?;
        tracing::debug!(path = %path.display(), "Released spillover file");
        Ok(())
    }
}

impl Spillover {
    pub async fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Make every appended byte visible to readers of the file.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.file.flush().await
    }

    /// Flush and close the file, keeping it on disk.
    pub async fn close(mut self) -> io::Result<PathBuf> {
        self.file.flush().await?;
        Ok(self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}
