//! Storage layer for the transaction log
//!
//! The log is an append-only sequence of records, one JSON transaction per
//! line. A medium only has to support a full sequential read at open time
//! and sequential appends afterwards. Committed records are never rewritten,
//! truncated or compacted; a failed append only removes its own partial bytes.
//!
//! # Media
//!
//! - [`FileLog`] - a file opened for read + append
//! - [`MemoryLog`] - an in-process log, with optional write-failure injection

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append+read access to one durable log.
pub trait LogStore {
    /// Read every record, in write order, without line terminators.
    fn read_records(&mut self) -> io::Result<Vec<Vec<u8>>>;

    /// Append one record. On error no part of the record may remain,
    /// so a retry starts a fresh line.
    fn append(&mut self, record: &[u8]) -> io::Result<()>;

    /// Make every appended record durable.
    fn sync(&mut self) -> io::Result<()>;
}

/// Transaction log backed by a file
///
/// A failed append truncates the file back to its length before the call, so
/// a retried record never lands behind a torn prefix. If that truncation
/// fails too the log is poisoned and refuses further appends.
#[derive(Debug)]
pub struct FileLog {
    file: File,
    path: PathBuf,
    poisoned: bool,
    #[cfg(test)]
    faults: Faults,
}

/// Failures injected into the next append
#[cfg(test)]
#[derive(Debug, Default)]
struct Faults {
    /// Write this many bytes of the line, then fail
    short_write: Option<usize>,
    /// Fail the truncation that undoes a short write
    fail_rollback: bool,
}

impl FileLog {
    /// Open the log for read + append.
    ///
    /// With `create_if_missing` a missing file is created empty; the parent
    /// directory must already exist.
    pub fn open(path: impl AsRef<Path>, create_if_missing: bool) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(create_if_missing)
            .open(&path)?;

        tracing::debug!(path = %path.display(), "Transaction log opened");

        Ok(Self {
            file,
            path,
            poisoned: false,
            #[cfg(test)]
            faults: Faults::default(),
        })
    }

    /// Path to the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a torn record could not be removed
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    #[cfg(not(test))]
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line)
    }

    #[cfg(test)]
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        if let Some(bytes) = self.faults.short_write.take() {
            self.file.write_all(&line[..bytes.min(line.len())])?;
            return Err(io::Error::other("injected short write"));
        }
        self.file.write_all(line)
    }

    #[cfg(not(test))]
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    #[cfg(test)]
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        if std::mem::take(&mut self.faults.fail_rollback) {
            return Err(io::Error::other("injected truncate failure"));
        }
        self.file.set_len(len)
    }

    /// Make the next append write only `bytes` bytes and fail
    #[cfg(test)]
    pub(crate) fn inject_short_write(&mut self, bytes: usize, fail_rollback: bool) {
        self.faults = Faults {
            short_write: Some(bytes),
            fail_rollback,
        };
    }
}

impl LogStore for FileLog {
    fn read_records(&mut self) -> io::Result<Vec<Vec<u8>>> {
        // Appends always land at the end regardless of the read position.
        self.file.seek(SeekFrom::Start(0))?;
        BufReader::new(&self.file).split(b'\n').collect()
    }

    fn append(&mut self, record: &[u8]) -> io::Result<()> {
        if self.poisoned {
            return Err(io::Error::other(format!(
                "transaction log {} ends in a torn record",
                self.path.display()
            )));
        }

        let mut line = Vec::with_capacity(record.len() + 1);
        line.extend_from_slice(record);
        line.push(b'\n');

        let len = self.file.metadata()?.len();
        if let Err(e) = self.write_line(&line) {
            match self.truncate(len) {
                Ok(()) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Append failed, partial record removed"
                ),
                Err(rollback) => {
                    self.poisoned = true;
                    tracing::error!(
                        path = %self.path.display(),
                        error = %e,
                        rollback_error = %rollback,
                        "Append failed and partial record could not be removed"
                    );
                }
            }
            return Err(e);
        }

        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.sync_data()
    }
}

/// Transaction log held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Vec<Vec<u8>>,
    /// Appends left before every further append fails
    fail_after: Option<usize>,
    fail_sync: bool,
    syncs: usize,
}

impl MemoryLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that already holds `records`
    pub fn with_records<R: Into<Vec<u8>>>(records: impl IntoIterator<Item = R>) -> Self {
        Self {
            records: records.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Let `successes` more appends through, then fail every append
    pub fn fail_after(&mut self, successes: usize) {
        self.fail_after = Some(successes);
    }

    /// Make every sync fail until healed
    pub fn fail_sync(&mut self) {
        self.fail_sync = true;
    }

    /// Stop injecting failures
    pub fn heal(&mut self) {
        self.fail_after = None;
        self.fail_sync = false;
    }

    /// Records written so far
    pub fn records(&self) -> &[Vec<u8>] {
        &self.records
    }

    /// Number of completed syncs
    pub fn syncs(&self) -> usize {
        self.syncs
    }
}

impl LogStore for MemoryLog {
    fn read_records(&mut self) -> io::Result<Vec<Vec<u8>>> {
        Ok(self.records.clone())
    }

    fn append(&mut self, record: &[u8]) -> io::Result<()> {
        match self.fail_after {
            Some(0) => return Err(io::Error::other("injected write failure")),
            Some(ref mut left) => *left -= 1,
            None => {}
        }
        self.records.push(record.to_vec());
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        if self.fail_sync {
            return Err(io::Error::other("injected sync failure"));
        }
        self.syncs += 1;
        Ok(())
    }
}
