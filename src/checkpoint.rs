//! Durable, restart-loadable progress snapshots for the pipeline stages.
//!
//! Each stage owns one checkpoint: the listing checkpoint holds `PostRef`s,
//! the content checkpoint holds `PostRecord`s. The backing file is a UTF-8
//! JSON array rewritten in full on every append; `append` does not return
//! until the updated snapshot is on disk, so a crash loses at most the one
//! in-flight item.

use crate::model::{PostRecord, PostRef};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from checkpoint load or persist.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Cannot read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid checkpoint {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot serialize checkpoint {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Records with a unique string key (the post url).
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for PostRef {
    fn key(&self) -> &str {
        &self.url
    }
}

impl Keyed for PostRecord {
    fn key(&self) -> &str {
        &self.url
    }
}

/// Storage interface for one pipeline stage.
///
/// Implementations must persist durably inside `append`, before returning;
/// the detail fetcher relies on this for crash resumability. The key index
/// always equals the key projection of the record sequence.
pub trait Checkpoint<T: Keyed> {
    /// All records in append order.
    fn records(&self) -> &[T];

    /// O(1) membership test against the key index.
    fn contains(&self, key: &str) -> bool;

    /// Append one record and persist the full snapshot before returning.
    fn append(&mut self, record: T) -> Result<(), CheckpointError>;

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// File-backed checkpoint: a pretty-printed JSON array, one object per record.
#[derive(Debug)]
pub struct JsonCheckpoint<T> {
    path: PathBuf,
    records: Vec<T>,
    keys: HashSet<String>,
}

impl<T: Keyed + Serialize + DeserializeOwned> JsonCheckpoint<T> {
    /// Open a checkpoint file, loading existing records if the file exists.
    /// A missing file is an empty checkpoint, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let path = path.into();
        let records: Vec<T> = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).map_err(|e| CheckpointError::Parse {
                path: path.clone(),
                source: e,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(CheckpointError::Read {
                    path,
                    source: e,
                })
            }
        };
        let keys = records.iter().map(|r| r.key().to_string()).collect();
        Ok(Self {
            path,
            records,
            keys,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full rewrite of the backing file from the in-memory sequence.
    fn persist(&self) -> Result<(), CheckpointError> {
        let json =
            serde_json::to_string_pretty(&self.records).map_err(|e| CheckpointError::Serialize {
                path: self.path.clone(),
                source: e,
            })?;
        std::fs::write(&self.path, json).map_err(|e| CheckpointError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl<T: Keyed + Serialize + DeserializeOwned> Checkpoint<T> for JsonCheckpoint<T> {
    fn records(&self) -> &[T] {
        &self.records
    }

    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn append(&mut self, record: T) -> Result<(), CheckpointError> {
        self.keys.insert(record.key().to_string());
        self.records.push(record);
        self.persist()
    }
}

/// In-memory checkpoint for tests and dry runs. Same index semantics, no file.
#[derive(Debug, Default)]
pub struct MemoryCheckpoint<T> {
    records: Vec<T>,
    keys: HashSet<String>,
}

impl<T: Keyed> MemoryCheckpoint<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            keys: HashSet::new(),
        }
    }
}

impl<T: Keyed> Checkpoint<T> for MemoryCheckpoint<T> {
    fn records(&self) -> &[T] {
        &self.records
    }

    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn append(&mut self, record: T) -> Result<(), CheckpointError> {
        self.keys.insert(record.key().to_string());
        self.records.push(record);
        Ok(())
    }
}
