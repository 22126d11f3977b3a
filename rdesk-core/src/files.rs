//! Chunked file reassembly.
//!
//! Uploads arrive as a sequence of chunks keyed by file name, followed
//! by an end-of-stream marker (`None`):
//!
//! ```text
//! add("a.bin", Some(c1)) ─► pending["a.bin"] = [c1]
//! add("a.bin", Some(c2)) ─► pending["a.bin"] = [c1, c2]
//! add("a.bin", None)     ─► remove entry ─► write <storage>/a.bin = c1 ++ c2
//! ```
//!
//! Chunks are kept in arrival order; the transport is responsible for
//! delivering them in sequence. Nothing survives a disconnect: `reset`
//! drops every unfinished upload.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::RemoteError;

/// Default storage directory, relative to the working directory.
pub const DEFAULT_MEDIA_DIR: &str = "Media";

// ── PendingFile ──────────────────────────────────────────────────

/// Chunks received so far for one file.
#[derive(Debug, Default)]
struct PendingFile {
    chunks: Vec<Bytes>,
    len: usize,
}

impl PendingFile {
    fn push(&mut self, chunk: Bytes) {
        self.len += chunk.len();
        self.chunks.push(chunk);
    }
}

// ── ChunkedFileStore ─────────────────────────────────────────────

/// Accumulates upload chunks per file name and flushes finished files
/// to the storage directory.
pub struct ChunkedFileStore {
    pending: Mutex<HashMap<String, PendingFile>>,
    /// Configured directory; the root for derived names.
    base_dir: PathBuf,
    /// Directory currently in use. Replaced at most once, when the
    /// configured path is taken by something that is not a directory.
    target_dir: tokio::sync::Mutex<PathBuf>,
}

impl ChunkedFileStore {
    /// Create a store that writes into `dir`.
    ///
    /// Nothing touches the disk until the first file completes.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            pending: Mutex::new(HashMap::new()),
            target_dir: tokio::sync::Mutex::new(dir.clone()),
            base_dir: dir,
        }
    }

    /// Add one chunk of `file_name`, or finish it when `chunk` is `None`.
    ///
    /// Finishing a file that never received data writes an empty file.
    pub async fn add(&self, file_name: &str, chunk: Option<Bytes>) -> Result<(), RemoteError> {
        validate_file_name(file_name)?;

        match chunk {
            Some(data) => {
                let mut pending = self.lock();
                let file = pending.entry(file_name.to_string()).or_default();
                file.push(data);
                debug!(file_name, chunks = file.chunks.len(), bytes = file.len, "chunk stored");
                Ok(())
            }
            None => {
                let file = self.lock().remove(file_name).unwrap_or_default();
                self.flush(file_name, file).await
            }
        }
    }

    /// Drop every upload that has not been finished.
    pub fn reset(&self) {
        let mut pending = self.lock();
        if !pending.is_empty() {
            debug!(count = pending.len(), "discarding unfinished uploads");
        }
        pending.clear();
    }

    /// Number of uploads in progress.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// The directory finished files are (or will be) written to.
    pub async fn storage_dir(&self) -> PathBuf {
        self.target_dir.lock().await.clone()
    }

    // ── Internal ─────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingFile>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write all chunks of `file` to `<storage>/<file_name>`.
    ///
    /// A failed write leaves whatever was written on disk.
    async fn flush(&self, file_name: &str, file: PendingFile) -> Result<(), RemoteError> {
        let dir = self.resolve_target_dir().await?;
        let path = dir.join(file_name);

        let mut out = tokio::fs::File::create(&path).await?;
        for chunk in &file.chunks {
            out.write_all(chunk).await?;
        }
        out.flush().await?;

        info!(path = %path.display(), bytes = file.len, "file received");
        Ok(())
    }

    /// Return the storage directory, creating it if needed.
    ///
    /// An existing directory is reused. If the path is occupied by
    /// anything else, random numeric suffixes are appended to the
    /// configured name until a free one is found.
    async fn resolve_target_dir(&self) -> Result<PathBuf, RemoteError> {
        let mut target = self.target_dir.lock().await;

        if is_dir(&target).await {
            return Ok(target.clone());
        }

        let mut candidate = target.clone();
        while tokio::fs::try_exists(&candidate).await? {
            let suffix: u32 = rand::thread_rng().gen_range(0..u32::MAX);
            candidate = with_suffix(&self.base_dir, suffix);
        }

        tokio::fs::create_dir_all(&candidate).await?;
        if candidate != *target {
            info!(
                configured = %self.base_dir.display(),
                resolved = %candidate.display(),
                "storage path taken; using a new directory"
            );
            *target = candidate.clone();
        }
        Ok(candidate)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

fn with_suffix(base: &Path, suffix: u32) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix.to_string());
    PathBuf::from(name)
}

/// Accept only a single plain path component.
fn validate_file_name(file_name: &str) -> Result<(), RemoteError> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !file_name.contains(['/', '\\']) => Ok(()),
        _ => Err(RemoteError::InvalidFileName(file_name.to_string())),
    }
}

// ── Tests ────────────────────────────────────────────────────────
