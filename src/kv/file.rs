//! File-backed key-value store.

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::kv::{KvError, KvStore, Namespace};

/// Bytes preceding every record payload: payload length and CRC32.
const RECORD_HEADER_SIZE: usize = 8;

/// A mutation appended to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum LogRecord {
    Put {
        ns: Namespace,
        key: String,
        value: Vec<u8>,
    },
    Delete {
        ns: Namespace,
        key: String,
    },
}

/// File-backed key-value store.
///
/// Every mutation is appended to a single log file and synced before it
/// becomes visible. The full contents are kept in memory and rebuilt by
/// replaying the log on open.
///
/// # File Layout
///
/// ```text
/// +---------+---------+------------------+---------+---------+-----
/// | len u32 | crc u32 | bincode(record)  | len u32 | crc u32 | ...
/// +---------+---------+------------------+---------+---------+-----
/// ```
///
/// Integers are little-endian. A record whose header or payload is cut
/// short, or whose checksum does not match, ends the log: it and anything
/// after it are truncated on open.
///
/// A failed append is cut back off the file before the error is returned.
/// If that cut fails too, the store rejects every later write with
/// [`KvError::Failed`].
pub struct FileKvStore {
    path: PathBuf,
    inner: Mutex<Inner>,
}

struct Inner {
    log: LogWriter<File>,
    namespaces: HashMap<Namespace, BTreeMap<String, Vec<u8>>>,
}

/// What [`LogWriter`] needs from the file under it.
trait LogFile: Write {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Appends whole frames to the log.
struct LogWriter<F> {
    file: F,
    /// Length of the log up to the end of the last synced frame.
    len: u64,
    /// Set once a failed append could not be rolled back.
    failed: bool,
}

impl<F: LogFile> LogWriter<F> {
    fn new(file: F, len: u64) -> Self {
        Self {
            file,
            len,
            failed: false,
        }
    }

    /// Writes and syncs `frame`. On error the file is truncated back to
    /// its length before the call.
    fn append(&mut self, frame: &[u8]) -> Result<(), KvError> {
        if self.failed {
            return Err(KvError::Failed);
        }

        let written = self.file.write_all(frame).and_then(|()| self.file.sync());
        if let Err(e) = written {
            if let Err(rollback) = self.file.truncate(self.len) {
                tracing::error!(
                    error = %rollback,
                    len = self.len,
                    "could not roll back failed log append"
                );
                self.failed = true;
            }
            return Err(e.into());
        }

        self.len += frame.len() as u64;
        Ok(())
    }
}

impl FileKvStore {
    /// Opens or creates the log at `path` and replays it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KvError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let contents = std::fs::read(&path)?;
        let (records, valid_len) = replay(&contents)?;
        if valid_len < contents.len() {
            tracing::warn!(
                path = %path.display(),
                discarded = contents.len() - valid_len,
                "truncating torn tail of metadata log"
            );
            file.set_len(valid_len as u64)?;
        }

        let mut namespaces: HashMap<Namespace, BTreeMap<String, Vec<u8>>> = HashMap::new();
        let count = records.len();
        for record in records {
            apply(&mut namespaces, record);
        }
        tracing::debug!(path = %path.display(), records = count, "replayed metadata log");

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                log: LogWriter::new(file, valid_len as u64),
                namespaces,
            }),
        })
    }

    /// Returns the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: LogRecord) -> Result<(), KvError> {
        let frame = encode_record(&record)?;
        let mut inner = self.inner.lock();
        inner.log.append(&frame)?;
        apply(&mut inner.namespaces, record);
        Ok(())
    }
}

fn encode_record(record: &LogRecord) -> Result<Vec<u8>, KvError> {
    let payload = bincode::serialize(record)?;
    let mut frame = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes records from the start of `contents`.
///
/// Returns the records and the length of the valid prefix.
fn replay(contents: &[u8]) -> Result<(Vec<LogRecord>, usize), KvError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while contents.len() - offset >= RECORD_HEADER_SIZE {
        let header = &contents[offset..offset + RECORD_HEADER_SIZE];
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + RECORD_HEADER_SIZE;
        let Some(payload) = contents.get(start..start + len) else {
            break;
        };
        if crc32fast::hash(payload) != crc {
            break;
        }

        let record: LogRecord = bincode::deserialize(payload).map_err(|e| {
            KvError::Corrupted(format!("record at offset {} does not decode: {}", offset, e))
        })?;
        records.push(record);
        offset = start + len;
    }

    Ok((records, offset))
}

fn apply(namespaces: &mut HashMap<Namespace, BTreeMap<String, Vec<u8>>>, record: LogRecord) {
    match record {
        LogRecord::Put { ns, key, value } => {
            namespaces.entry(ns).or_default().insert(key, value);
        }
        LogRecord::Delete { ns, key } => {
            if let Some(entries) = namespaces.get_mut(&ns) {
                entries.remove(&key);
            }
        }
    }
}

impl KvStore for FileKvStore {
    fn put(&self, ns: Namespace, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.append(LogRecord::Put {
            ns,
            key: key.to_string(),
            value: value.to_vec(),
        })
    }

    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self
            .inner
            .lock()
            .namespaces
            .get(&ns)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn get_all(&self, ns: Namespace) -> Result<Vec<(String, Vec<u8>)>, KvError> {
        Ok(self
            .inner
            .lock()
            .namespaces
            .get(&ns)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn delete(&self, ns: Namespace, key: &str) -> Result<bool, KvError> {
        let existed = self
            .inner
            .lock()
            .namespaces
            .get(&ns)
            .is_some_and(|entries| entries.contains_key(key));
        if !existed {
            return Ok(false);
        }
        self.append(LogRecord::Delete {
            ns,
            key: key.to_string(),
        })?;
        Ok(true)
    }
}
