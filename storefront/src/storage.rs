//! Local key-value persistence.
//!
//! Values are JSON text under fixed keys, like device storage. Reads and
//! writes never fail the caller: problems are logged and the caller falls
//! back to defaults.

use freshcart_core::environment::{KeyValueStore, StorageError};
use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Storage keys
pub mod keys {
    /// Display name
    pub const USER_NAME: &str = "userName";
    /// Email address
    pub const USER_EMAIL: &str = "userEmail";
    /// Phone number (digits only)
    pub const USER_PHONE: &str = "userPhone";
    /// Order history (JSON array)
    pub const USER_ORDERS: &str = "userOrders";
    /// Saved addresses (JSON array)
    pub const USER_ADDRESSES: &str = "userAddresses";
    /// Address used for new orders
    pub const DELIVERY_ADDRESS: &str = "deliveryAddress";
}

/// Every key kept in one JSON object file
///
/// A missing file reads as empty. Each write stages the whole file next to
/// the target and renames it into place, so a crash never leaves it torn.
/// A file that no longer decodes is replaced by the next write.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStorage {
    /// Storage backed by the file at `path` (created on first write)
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(error.into()),
        }
    }

    fn write_values(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let text = serde_json::to_string_pretty(values)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(text.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|error| error.error)?;
        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = match self.read_all() {
            Ok(values) => values,
            Err(StorageError::Serialization(error)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "Replacing unreadable storage file"
                );
                metrics::counter!("storefront.storage.failures", "op" => "recover").increment(1);
                BTreeMap::new()
            },
            Err(error) => return Err(error),
        };
        change(&mut values);
        self.write_values(&values)
    }
}

impl KeyValueStore for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.update(|values| {
            values.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

/// Read and decode the JSON value under `key`
///
/// Returns `None` when the key is absent. Storage and decoding failures are
/// logged and also read as `None`.
pub fn load_json<T: DeserializeOwned>(storage: &dyn KeyValueStore, key: &str) -> Option<T> {
    let text = match storage.get(key) {
        Ok(text) => text?,
        Err(error) => {
            tracing::warn!(key, %error, "Failed to read from storage");
            metrics::counter!("storefront.storage.failures", "op" => "read").increment(1);
            return None;
        },
    };

    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, %error, "Ignoring malformed stored value");
            metrics::counter!("storefront.storage.failures", "op" => "decode").increment(1);
            None
        },
    }
}

/// Encode `value` as JSON and store it under `key`
///
/// Returns whether the write happened; failures are logged.
pub fn save_json<T: Serialize + ?Sized>(storage: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let text = match serde_json::to_string(value) {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(key, %error, "Failed to encode value for storage");
            metrics::counter!("storefront.storage.failures", "op" => "encode").increment(1);
            return false;
        },
    };

    match storage.set(key, text) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(key, %error, "Failed to write to storage");
            metrics::counter!("storefront.storage.failures", "op" => "write").increment(1);
            false
        },
    }
}

/// Persists the most recently published value under one key
///
/// [`publish`](Self::publish) only swaps the pending value, so it is safe to
/// call from store listeners. A background task writes with blocking I/O on
/// the blocking pool. Values published while a write is running collapse
/// into the next write.
pub struct LatestValueWriter<T> {
    shared: Arc<WriterShared<T>>,
    task: JoinHandle<()>,
}

struct WriterShared<T> {
    storage: Arc<dyn KeyValueStore>,
    key: &'static str,
    latest: watch::Sender<T>,
    // Held across each write so the last one to run sees the newest value
    writing: Mutex<()>,
}

impl<T> WriterShared<T>
where
    T: Serialize + Clone,
{
    fn write_latest(&self) -> bool {
        let _writing = self.writing.lock().unwrap_or_else(PoisonError::into_inner);
        let value = self.latest.borrow().clone();
        save_json(self.storage.as_ref(), self.key, &value)
    }
}

impl<T> LatestValueWriter<T>
where
    T: Serialize + Clone + Send + Sync + 'static,
{
    /// Start writing `key`; `initial` is pending but not yet written
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(storage: Arc<dyn KeyValueStore>, key: &'static str, initial: T) -> Self {
        let (latest, mut published) = watch::channel(initial);
        let shared = Arc::new(WriterShared {
            storage,
            key,
            latest,
            writing: Mutex::new(()),
        });

        let background = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            // `changed` marks the newest value seen, so a burst of publishes
            // wakes this loop once.
            while published.changed().await.is_ok() {
                let job = Arc::clone(&background);
                if let Err(error) = tokio::task::spawn_blocking(move || job.write_latest()).await {
                    tracing::warn!(key = background.key, %error, "Background write did not finish");
                }
            }
        });

        Self { shared, task }
    }

    /// Replace the pending value and wake the writer
    pub fn publish(&self, value: T) {
        self.shared.latest.send_replace(value);
    }

    /// Write the pending value now, waiting for the write to finish
    ///
    /// Returns whether the write happened.
    pub async fn flush(&self) -> bool {
        let job = Arc::clone(&self.shared);
        match tokio::task::spawn_blocking(move || job.write_latest()).await {
            Ok(written) => written,
            Err(error) => {
                tracing::warn!(key = self.shared.key, %error, "Flush did not finish");
                false
            },
        }
    }
}

impl<T> Drop for LatestValueWriter<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
