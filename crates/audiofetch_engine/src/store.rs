//! Durable key/value storage shared by every client instance on a machine.
//!
//! A write made through one handle is delivered as a [`StoreChange`] to every
//! *other* handle's subscribers, never to the writer itself.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use audiofetch_logging::{af_debug, af_warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

pub const CREDENTIAL_KEY: &str = "authToken";
pub const LEDGER_KEY: &str = "autoDownloadedJobs";

const VALUE_EXT: &str = "value";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("could not encode value: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not watch store directory: {0}")]
    Watch(#[from] notify::Error),
    #[error("invalid store key {0:?}")]
    InvalidKey(String),
}

/// A value written by another client instance. `None` means removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
    pub value: Option<String>,
}

pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// New receiver for changes made by other instances.
    fn subscribe(&self) -> Receiver<StoreChange>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn broadcast(subscribers: &mut Vec<Sender<StoreChange>>, change: &StoreChange) {
    subscribers.retain(|tx| tx.send(change.clone()).is_ok());
}

#[derive(Default)]
struct SharedMemory {
    values: HashMap<String, String>,
    subscribers: Vec<(u64, Sender<StoreChange>)>,
}

/// In-process store. Every handle from [`MemoryStore::open_tab`] behaves like a
/// separate client instance over the same storage.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Mutex<SharedMemory>>,
    next_tab: Arc<AtomicU64>,
    tab: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(SharedMemory::default())),
            next_tab: Arc::new(AtomicU64::new(1)),
            tab: 0,
        }
    }

    pub fn open_tab(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            next_tab: Arc::clone(&self.next_tab),
            tab: self.next_tab.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn publish(&self, shared: &mut SharedMemory, change: StoreChange) {
        let tab = self.tab;
        shared
            .subscribers
            .retain(|(owner, tx)| *owner == tab || tx.send(change.clone()).is_ok());
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.shared).values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut shared = lock(&self.shared);
        shared.values.insert(key.to_string(), value.to_string());
        self.publish(
            &mut shared,
            StoreChange {
                key: key.to_string(),
                value: Some(value.to_string()),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut shared = lock(&self.shared);
        if shared.values.remove(key).is_some() {
            self.publish(
                &mut shared,
                StoreChange {
                    key: key.to_string(),
                    value: None,
                },
            );
        }
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StoreChange> {
        let (tx, rx) = mpsc::channel();
        lock(&self.shared).subscribers.push((self.tab, tx));
        rx
    }
}

/// One `{key}.value` file per key in a directory shared between processes.
///
/// Each handle remembers the values it last saw; [`FileStore::refresh`] diffs
/// the directory against that snapshot and reports what other processes
/// changed. [`FileStore::watch`] runs the refresh on filesystem events.
pub struct FileStore {
    writer: AtomicFileWriter,
    seen: Mutex<HashMap<String, String>>,
    subscribers: Mutex<Vec<Sender<StoreChange>>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileStore {
    pub fn open(dir: PathBuf) -> Result<Self, StoreError> {
        let writer = AtomicFileWriter::new(dir);
        crate::persist::ensure_output_dir(writer.dir())?;
        let seen = read_all(writer.dir())?;
        af_debug!(
            "Opened store at {} with {} keys",
            writer.dir().display(),
            seen.len()
        );
        Ok(Self {
            writer,
            seen: Mutex::new(seen),
            subscribers: Mutex::new(Vec::new()),
            watcher: Mutex::new(None),
        })
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    /// Reports (and delivers to subscribers) every key whose on-disk value
    /// differs from what this handle last saw.
    pub fn refresh(&self) -> Result<Vec<StoreChange>, StoreError> {
        let mut seen = lock(&self.seen);
        let current = read_all(self.writer.dir())?;

        let mut changes: Vec<StoreChange> = current
            .iter()
            .filter(|(key, value)| seen.get(*key) != Some(*value))
            .map(|(key, value)| StoreChange {
                key: key.clone(),
                value: Some(value.clone()),
            })
            .collect();
        changes.extend(
            seen.keys()
                .filter(|key| !current.contains_key(*key))
                .map(|key| StoreChange {
                    key: key.clone(),
                    value: None,
                }),
        );
        changes.sort_by(|a, b| a.key.cmp(&b.key));
        *seen = current;
        drop(seen);

        if !changes.is_empty() {
            let mut subscribers = lock(&self.subscribers);
            for change in &changes {
                broadcast(&mut subscribers, change);
            }
        }
        Ok(changes)
    }

    /// Starts refreshing on filesystem events. The watcher lives as long as
    /// the store.
    pub fn watch(self: &Arc<Self>) -> Result<(), StoreError> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            let Some(store) = weak.upgrade() else {
                return;
            };
            match event {
                Ok(_) => {
                    if let Err(err) = store.refresh() {
                        af_warn!("Store refresh failed: {err}");
                    }
                }
                Err(err) => af_warn!("Store watcher error: {err}"),
            }
        })?;
        watcher.watch(self.writer.dir(), RecursiveMode::NonRecursive)?;
        *lock(&self.watcher) = Some(watcher);
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.writer.dir().join(file_name(key)?);
        match fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let name = file_name(key)?;
        let mut seen = lock(&self.seen);
        self.writer.write(&name, value.as_bytes())?;
        seen.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let name = file_name(key)?;
        let mut seen = lock(&self.seen);
        self.writer.remove(&name)?;
        seen.remove(key);
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StoreChange> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }
}

fn file_name(key: &str) -> Result<String, StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(format!("{key}.{VALUE_EXT}"))
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

fn read_all(dir: &Path) -> Result<HashMap<String, String>, StoreError> {
    let mut values = HashMap::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(VALUE_EXT) {
            continue;
        }
        let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        match fs::read_to_string(&path) {
            Ok(value) => {
                values.insert(key.to_string(), value);
            }
            // Removed between listing and reading.
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(values)
}

/// Job ids in a stored ledger value. Malformed values read as empty.
pub fn decode_ledger(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => ids,
        Err(err) => {
            af_warn!("Ignoring malformed ledger value: {err}");
            Vec::new()
        }
    }
}

pub fn encode_ledger<'a>(ids: impl IntoIterator<Item = &'a String>) -> Result<String, StoreError> {
    let ids: BTreeSet<&String> = ids.into_iter().collect();
    Ok(serde_json::to_string(&ids)?)
}

/// Writes the union of the stored ledger and `ids`, so an entry another
/// instance added since this one last synced is never dropped. Returns the
/// merged ledger.
pub fn write_ledger_union(
    store: &dyn DurableStore,
    ids: &[String],
) -> Result<Vec<String>, StoreError> {
    let stored = decode_ledger(store.get(LEDGER_KEY)?.as_deref());
    let merged: BTreeSet<String> = stored.into_iter().chain(ids.iter().cloned()).collect();
    store.set(LEDGER_KEY, &encode_ledger(&merged)?)?;
    Ok(merged.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_restricted_to_plain_names() {
        assert_eq!(file_name("authToken").unwrap(), "authToken.value");
        assert!(matches!(file_name("../x"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(file_name(""), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn ledger_codec_is_sorted_and_tolerant() {
        let ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(encode_ledger(&ids).unwrap(), r#"["a","b"]"#);
        assert_eq!(decode_ledger(Some(r#"["x"]"#)), vec!["x".to_string()]);
        assert!(decode_ledger(Some("{broken")).is_empty());
        assert!(decode_ledger(None).is_empty());
    }
}
