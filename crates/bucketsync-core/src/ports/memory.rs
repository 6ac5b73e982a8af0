//! In-memory object store
//!
//! A thread-safe [`IObjectStore`] over a `BTreeMap`, with failure injection
//! and call counters. Used by the engine and scheduler tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::domain::newtypes::RemoteKey;

use super::object_store::{IObjectStore, ObjectBody, ObjectEntry, StoreError};

/// Object held by the in-memory store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
struct Failure {
    error: StoreError,
    /// Calls that succeed before the failure kicks in
    skip: usize,
    /// `None` fails forever
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct Faults {
    put: HashMap<String, Failure>,
    exists: HashMap<String, Failure>,
    list: Option<Failure>,
    delete: Option<Failure>,
    hidden: HashSet<String>,
    delay: Option<Duration>,
}

impl Faults {
    fn take(slot: &mut Option<Failure>) -> Option<StoreError> {
        let failure = slot.as_mut()?;
        if failure.skip > 0 {
            failure.skip -= 1;
            return None;
        }
        let error = failure.error.clone();
        if let Some(n) = failure.remaining.as_mut() {
            *n -= 1;
            if *n == 0 {
                *slot = None;
            }
        }
        Some(error)
    }

    fn take_keyed(map: &mut HashMap<String, Failure>, key: &str) -> Option<StoreError> {
        let mut slot = map.remove(key);
        let error = Self::take(&mut slot);
        if let Some(failure) = slot {
            map.insert(key.to_string(), failure);
        }
        error
    }
}

/// Call counters, one per port operation
#[derive(Debug, Default)]
pub struct CallCounts {
    pub exists: AtomicUsize,
    pub put: AtomicUsize,
    pub list: AtomicUsize,
    pub delete_batch: AtomicUsize,
}

/// In-memory [`IObjectStore`]
///
/// The bucket argument is ignored; all calls address one key space.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    faults: Mutex<Faults>,
    deleted: Mutex<Vec<Vec<String>>>,
    calls: CallCounts,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryObjectStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object directly, bypassing counters and faults
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        lock(&self.objects).insert(
            key.into(),
            StoredObject {
                data: data.into(),
                content_type: None,
            },
        );
    }

    /// Removes an object directly, simulating an external deletion
    pub fn remove(&self, key: &str) -> Option<StoredObject> {
        lock(&self.objects).remove(key)
    }

    /// Returns a copy of the object at `key`
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        lock(&self.objects).get(key).cloned()
    }

    /// Returns true if the store holds `key`
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.objects).contains_key(key)
    }

    /// All stored keys in lexicographic order
    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Makes every `put` of `key` fail with `error`
    pub fn fail_put(&self, key: impl Into<String>, error: StoreError) {
        lock(&self.faults).put.insert(
            key.into(),
            Failure {
                error,
                skip: 0,
                remaining: None,
            },
        );
    }

    /// Makes the next `times` puts of `key` fail with `error`
    pub fn fail_put_times(&self, key: impl Into<String>, error: StoreError, times: usize) {
        if times == 0 {
            return;
        }
        lock(&self.faults).put.insert(
            key.into(),
            Failure {
                error,
                skip: 0,
                remaining: Some(times),
            },
        );
    }

    /// Makes every `exists` of `key` fail with `error`
    pub fn fail_exists(&self, key: impl Into<String>, error: StoreError) {
        lock(&self.faults).exists.insert(
            key.into(),
            Failure {
                error,
                skip: 0,
                remaining: None,
            },
        );
    }

    /// Makes the next `times` lookups of `key` fail with `error`
    pub fn fail_exists_times(&self, key: impl Into<String>, error: StoreError, times: usize) {
        if times == 0 {
            return;
        }
        lock(&self.faults).exists.insert(
            key.into(),
            Failure {
                error,
                skip: 0,
                remaining: Some(times),
            },
        );
    }

    /// Lets the first `successes` lookups of `key` through, then fails every later one
    pub fn fail_exists_after(&self, key: impl Into<String>, error: StoreError, successes: usize) {
        lock(&self.faults).exists.insert(
            key.into(),
            Failure {
                error,
                skip: successes,
                remaining: None,
            },
        );
    }

    /// Makes every `list` fail with `error`
    pub fn fail_list(&self, error: StoreError) {
        lock(&self.faults).list = Some(Failure {
            error,
            skip: 0,
            remaining: None,
        });
    }

    /// Makes every `delete_batch` fail with `error`
    pub fn fail_delete(&self, error: StoreError) {
        lock(&self.faults).delete = Some(Failure {
            error,
            skip: 0,
            remaining: None,
        });
    }

    /// Accepts puts of `key` without storing them
    ///
    /// Models a store that acknowledged a write which is not yet visible,
    /// so a later verification finds the key missing.
    pub fn hide_after_put(&self, key: impl Into<String>) {
        lock(&self.faults).hidden.insert(key.into());
    }

    /// Sleeps for `delay` at the start of every call
    pub fn set_delay(&self, delay: Duration) {
        lock(&self.faults).delay = Some(delay);
    }

    /// Clears all injected faults
    pub fn clear_faults(&self) {
        *lock(&self.faults) = Faults::default();
    }

    /// Call counters
    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    pub fn put_count(&self) -> usize {
        self.calls.put.load(Ordering::SeqCst)
    }

    pub fn exists_count(&self) -> usize {
        self.calls.exists.load(Ordering::SeqCst)
    }

    pub fn delete_batch_count(&self) -> usize {
        self.calls.delete_batch.load(Ordering::SeqCst)
    }

    /// Keys passed to each successful `delete_batch` call, in call order
    pub fn deleted_batches(&self) -> Vec<Vec<String>> {
        lock(&self.deleted).clone()
    }

    async fn pause(&self) {
        let delay = lock(&self.faults).delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl IObjectStore for InMemoryObjectStore {
    async fn exists(&self, _bucket: &str, key: &RemoteKey) -> Result<bool, StoreError> {
        self.calls.exists.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if let Some(error) = Faults::take_keyed(&mut lock(&self.faults).exists, key.as_str()) {
            return Err(error);
        }
        Ok(lock(&self.objects).contains_key(key.as_str()))
    }

    async fn put(&self, _bucket: &str, key: &RemoteKey, body: ObjectBody) -> Result<(), StoreError> {
        self.calls.put.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let hidden = {
            let mut faults = lock(&self.faults);
            if let Some(error) = Faults::take_keyed(&mut faults.put, key.as_str()) {
                return Err(error);
            }
            faults.hidden.contains(key.as_str())
        };

        let object = match body {
            ObjectBody::File(path) => StoredObject {
                data: tokio::fs::read(&path)
                    .await
                    .map_err(|e| StoreError::Body(format!("{}: {e}", path.display())))?,
                content_type: None,
            },
            ObjectBody::Bytes { data, content_type } => StoredObject {
                data,
                content_type: Some(content_type),
            },
        };

        if !hidden {
            lock(&self.objects).insert(key.as_str().to_string(), object);
        }
        Ok(())
    }

    async fn list(&self, _bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if let Some(error) = Faults::take(&mut lock(&self.faults).list) {
            return Err(error);
        }

        let objects = lock(&self.objects);
        objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| {
                Ok(ObjectEntry {
                    key: RemoteKey::new(key.clone())
                        .map_err(|e| StoreError::Transport(e.to_string()))?,
                    size: object.data.len() as u64,
                    last_modified: None,
                })
            })
            .collect()
    }

    async fn delete_batch(&self, _bucket: &str, keys: &[RemoteKey]) -> Result<(), StoreError> {
        self.calls.delete_batch.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if let Some(error) = Faults::take(&mut lock(&self.faults).delete) {
            return Err(error);
        }

        let mut objects = lock(&self.objects);
        for key in keys {
            objects.remove(key.as_str());
        }
        lock(&self.deleted).push(keys.iter().map(|k| k.as_str().to_string()).collect());
        Ok(())
    }
}
