//! JSON-file message log.
//!
//! The whole log is one pretty-printed JSON array, rewritten on every
//! mutation through a temp file and a rename so readers never see a partial
//! document. Mutations inside this process are serialised; separate processes
//! writing the same file still race and the last rename wins.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use teamalert_common::message::{random_id, MessageRecord, SeenEvent};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to prepare data directory {}: {source}", .path.display())]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode message log: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to replace {}: {source}", .path.display())]
    Replace {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("refusing to rewrite {}: {reason}", .path.display())]
    Inaccessible { path: PathBuf, reason: String },
    #[error("failed to move damaged log aside to {}: {source}", .path.display())]
    SetAside {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("message id {0} already exists")]
    DuplicateId(String),
}

/// Result of reading the log. Reads never fail; this says what was found.
#[derive(Debug)]
pub enum StoreRead {
    Loaded(Vec<MessageRecord>),
    Missing,
    /// The file exists but could not be read (permissions, not a file...).
    Unreadable(String),
    /// The file was read but is not a valid message log.
    Corrupt(String),
}

impl StoreRead {
    /// Collapse to the record list, treating a missing or broken file as empty.
    pub fn into_records(self) -> Vec<MessageRecord> {
        match self {
            StoreRead::Loaded(records) => records,
            StoreRead::Missing | StoreRead::Unreadable(_) | StoreRead::Corrupt(_) => Vec::new(),
        }
    }
}

/// Persistent, ordered sequence of message records.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Read the log, reporting why it came back empty if it did.
    async fn read(&self) -> StoreRead;

    /// Replace the whole log with `records`.
    async fn save(&self, records: &[MessageRecord]) -> Result<(), StoreError>;

    /// Add a new record at the end. Fails if its id is already taken.
    async fn append(&self, record: MessageRecord) -> Result<(), StoreError>;

    /// Append `event` to the `seen_by` list of record `id`.
    ///
    /// Returns `false` without touching the file when no record matches.
    async fn append_seen(&self, id: &str, event: SeenEvent) -> Result<bool, StoreError>;

    async fn load(&self) -> Vec<MessageRecord> {
        self.read().await.into_records()
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &[MessageRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Prepare {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let payload = serde_json::to_vec_pretty(records)?;
        let temp_path = self.path.with_extension(format!("{}.tmp", random_id()));
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|source| StoreError::Write {
                path: temp_path.clone(),
                source,
            })?;

        if let Err(source) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StoreError::Replace {
                path: self.path.clone(),
                source,
            });
        }
        debug!(path = %self.path.display(), records = records.len(), "message log written");
        Ok(())
    }

    /// Read for a mutation. A corrupt file is moved aside under a unique
    /// name first so the rewrite that follows does not destroy it; a file
    /// that cannot be read at all is left alone and the mutation fails.
    async fn read_for_update(&self) -> Result<Vec<MessageRecord>, StoreError> {
        match self.read().await {
            StoreRead::Loaded(records) => Ok(records),
            StoreRead::Missing => Ok(Vec::new()),
            StoreRead::Unreadable(reason) => Err(StoreError::Inaccessible {
                path: self.path.clone(),
                reason,
            }),
            StoreRead::Corrupt(_) => {
                let aside = self.path.with_extension(format!(
                    "json.{}-{}.corrupt",
                    chrono::Local::now().format("%Y%m%d%H%M%S"),
                    random_id()
                ));
                tokio::fs::rename(&self.path, &aside)
                    .await
                    .map_err(|source| StoreError::SetAside {
                        path: aside.clone(),
                        source,
                    })?;
                warn!(
                    path = %aside.display(),
                    "corrupt message log moved aside; starting a fresh one"
                );
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl MessageStore for JsonFileStore {
    async fn read(&self) -> StoreRead {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return StoreRead::Missing;
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to read message log; treating as empty");
                return StoreRead::Unreadable(error.to_string());
            }
        };

        match serde_json::from_str::<Vec<MessageRecord>>(&raw) {
            Ok(records) => StoreRead::Loaded(records),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to parse message log; treating as empty");
                StoreRead::Corrupt(error.to_string())
            }
        }
    }

    async fn save(&self, records: &[MessageRecord]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.persist(records).await
    }

    async fn append(&self, record: MessageRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_for_update().await?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        records.push(record);
        self.persist(&records).await
    }

    async fn append_seen(&self, id: &str, event: SeenEvent) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let StoreRead::Loaded(mut records) = self.read().await else {
            return Ok(false);
        };
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        record.seen_by.push(event);
        self.persist(&records).await?;
        Ok(true)
    }
}
