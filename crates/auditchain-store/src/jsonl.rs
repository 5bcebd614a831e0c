//! Append-only JSON Lines file store.
//!
//! One sealed entry per line, in sequence order. The file is opened in
//! append mode and every write is followed by `sync_data`, so an entry that
//! `append` reports as stored is on disk. A write that fails half way is
//! truncated away before the error is returned.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use auditchain_contracts::{
    entry::LedgerEntry,
    error::{LedgerError, LedgerResult},
};
use auditchain_core::traits::EntryStore;

use crate::guard::{check_append, Tail};

/// Mutable state guarded by the store's lock.
struct JsonlState {
    file: File,
    tail: Option<Tail>,
    /// Byte length of the file covering only fully committed entries.
    committed_len: u64,
}

/// An `EntryStore` backed by a `.jsonl` file.
pub struct JsonlEntryStore {
    path: PathBuf,
    state: Mutex<JsonlState>,
}

fn io_error(context: &str, path: &Path, e: std::io::Error) -> LedgerError {
    LedgerError::Persistence {
        reason: format!("{context} '{}': {e}", path.display()),
    }
}

impl JsonlEntryStore {
    /// Open (or create) the store at `path`.
    ///
    /// Existing entries are read to locate the tail. A trailing line with no
    /// newline is the remains of an interrupted write and is cut off.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| io_error("failed to create store directory for", &path, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error("failed to open entry store", &path, e))?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| io_error("failed to read entry store", &path, e))?;

        let complete_len = contents
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        if complete_len < contents.len() {
            warn!(
                path = %path.display(),
                discarded_bytes = contents.len() - complete_len,
                "discarding partial trailing record"
            );
            file.set_len(complete_len as u64)
                .map_err(|e| io_error("failed to trim entry store", &path, e))?;
        }

        let entries = parse_lines(&path, &contents[..complete_len])?;
        let tail = entries.last().map(Tail::of);

        info!(
            path = %path.display(),
            entries = entries.len(),
            "opened JSON Lines entry store"
        );

        Ok(Self {
            path,
            state: Mutex::new(JsonlState {
                file,
                tail,
                committed_len: complete_len as u64,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> LedgerResult<std::sync::MutexGuard<'_, JsonlState>> {
        self.state.lock().map_err(|e| LedgerError::Persistence {
            reason: format!("entry store lock poisoned: {e}"),
        })
    }
}

fn parse_lines(path: &Path, bytes: &[u8]) -> LedgerResult<Vec<LedgerEntry>> {
    let mut entries = Vec::new();
    for (index, line) in BufReader::new(bytes).lines().enumerate() {
        let line = line.map_err(|e| io_error("failed to read entry store", path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: LedgerEntry =
            serde_json::from_str(&line).map_err(|e| LedgerError::Persistence {
                reason: format!(
                    "corrupt record on line {} of '{}': {e}",
                    index + 1,
                    path.display()
                ),
            })?;
        entries.push(entry);
    }
    Ok(entries)
}

fn write_line(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.sync_data()
}

impl EntryStore for JsonlEntryStore {
    fn append(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        check_append(state.tail.as_ref(), entry)?;

        let mut line = serde_json::to_string(entry).map_err(|e| LedgerError::Serialization {
            reason: format!("failed to encode entry {}: {e}", entry.sequence_number),
        })?;
        line.push('\n');

        if let Err(e) = write_line(&mut state.file, line.as_bytes()) {
            if let Err(trim) = state.file.set_len(state.committed_len) {
                error!(
                    path = %self.path.display(),
                    sequence = entry.sequence_number,
                    error = %trim,
                    "failed to roll back partial write"
                );
            }
            return Err(io_error("failed to append to entry store", &self.path, e));
        }

        state.committed_len += line.len() as u64;
        state.tail = Some(Tail::of(entry));
        debug!(
            path = %self.path.display(),
            sequence = entry.sequence_number,
            "entry appended to file"
        );
        Ok(())
    }

    fn last_sequence(&self) -> LedgerResult<Option<u64>> {
        Ok(self.lock()?.tail.as_ref().map(|t| t.sequence_number))
    }

    /// Reads the committed prefix of the file through a separate handle, so a
    /// scan never waits on an in-flight append.
    fn scan(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let committed_len = self.lock()?.committed_len;

        let file =
            File::open(&self.path).map_err(|e| io_error("failed to open entry store", &self.path, e))?;
        let mut contents = Vec::new();
        file.take(committed_len)
            .read_to_end(&mut contents)
            .map_err(|e| io_error("failed to read entry store", &self.path, e))?;

        parse_lines(&self.path, &contents)
    }
}
