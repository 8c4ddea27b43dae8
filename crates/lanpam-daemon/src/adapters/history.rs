//! Request history.
//!
//! Newest entry first, bounded. When a file path is configured the whole
//! list is rewritten as JSON after every record; a file that cannot be read
//! at startup yields an empty history.
//!
//! Snapshots are serialized under the entry lock and written outside it. Each
//! snapshot carries a generation number so a slow writer never overwrites a
//! newer file with an older list.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::domain::{Disposition, HistoryEntry, HistoryError, RequestBody, RequestId};
use crate::ports::HistoryRecorder;

/// Bounded, optionally persisted request history.
#[derive(Debug)]
pub struct RequestHistory {
    state: RwLock<HistoryState>,
    max_entries: usize,
    file: Option<Arc<HistoryFile>>,
}

#[derive(Debug, Default)]
struct HistoryState {
    entries: Vec<HistoryEntry>,
    generation: u64,
}

/// Serialized history at one generation.
struct Snapshot {
    generation: u64,
    bytes: Vec<u8>,
}

/// Backing file plus the generation last written to it.
#[derive(Debug)]
struct HistoryFile {
    path: PathBuf,
    written: Mutex<u64>,
}

impl HistoryFile {
    /// Write `snapshot` unless a newer one already landed.
    fn write(&self, snapshot: Snapshot) -> Result<(), HistoryError> {
        let mut written = self.written.lock();
        if snapshot.generation <= *written {
            trace!(generation = snapshot.generation, "Skipping stale history snapshot");
            return Ok(());
        }

        save(&self.path, &snapshot.bytes)?;
        *written = snapshot.generation;
        Ok(())
    }
}

impl RequestHistory {
    /// History that lives only in memory.
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(HistoryState::default()),
            max_entries: max_entries.max(1),
            file: None,
        }
    }

    /// History persisted to `path`, seeded from it if it already exists.
    pub fn open(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        let path = path.into();
        let mut entries = load(&path);
        let max_entries = max_entries.max(1);
        entries.truncate(max_entries);

        debug!(path = %path.display(), entries = entries.len(), "Loaded request history");
        Self {
            state: RwLock::new(HistoryState {
                entries,
                generation: 0,
            }),
            max_entries,
            file: Some(Arc::new(HistoryFile {
                path,
                written: Mutex::new(0),
            })),
        }
    }

    /// Snapshot of all entries, newest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.state.read().entries.clone()
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether no request has been recorded
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Prepend an entry and persist on the calling thread.
    ///
    /// Async callers go through [`HistoryRecorder::record`], which writes on
    /// the blocking pool instead.
    pub fn push(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        match (self.insert(entry)?, &self.file) {
            (Some(snapshot), Some(file)) => file.write(snapshot),
            _ => Ok(()),
        }
    }

    /// Prepend under the lock and serialize the new list if it is persisted.
    fn insert(&self, entry: HistoryEntry) -> Result<Option<Snapshot>, HistoryError> {
        let mut state = self.state.write();
        state.entries.insert(0, entry);
        state.entries.truncate(self.max_entries);

        if self.file.is_none() {
            return Ok(None);
        }
        state.generation += 1;
        Ok(Some(Snapshot {
            generation: state.generation,
            bytes: serde_json::to_vec_pretty(&state.entries)?,
        }))
    }
}

fn load(path: &Path) -> Vec<HistoryEntry> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read history, starting empty");
            return Vec::new();
        }
    };

    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Could not parse history, starting empty");
        Vec::new()
    })
}

fn save(path: &Path, bytes: &[u8]) -> Result<(), HistoryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // Atomic replace
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait]
impl HistoryRecorder for RequestHistory {
    async fn record(
        &self,
        request_id: RequestId,
        body: &RequestBody,
        disposition: Disposition,
    ) -> Result<(), HistoryError> {
        let snapshot = self.insert(HistoryEntry::new(request_id, body, disposition))?;
        let (Some(snapshot), Some(file)) = (snapshot, &self.file) else {
            return Ok(());
        };

        let file = Arc::clone(file);
        tokio::task::spawn_blocking(move || file.write(snapshot))
            .await
            .map_err(io::Error::other)?
    }
}
