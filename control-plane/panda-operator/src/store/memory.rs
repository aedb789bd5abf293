//! In-process [`ObjectStore`] with API-server-like write semantics: create
//! fails when the key is taken, update fails when it is missing or when the
//! caller's `resourceVersion` is stale. Every call is counted and any
//! operation can be made to fail, which is what the engine tests lean on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::store::error::StoreError;
use crate::store::traits::{
    Lookup, ManagedKind, ObjectKey, ObjectStore, StoreResult,
};

type Entries = Arc<RwLock<HashMap<(&'static str, ObjectKey), Value>>>;

#[derive(Debug, Default)]
struct CallCounts {
    get: AtomicUsize,
    create: AtomicUsize,
    update: AtomicUsize,
}

#[derive(Debug, Default)]
struct Faults {
    get: Option<String>,
    create: Option<String>,
    update: Option<String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Entries,
    calls: Arc<CallCounts>,
    faults: Arc<Mutex<Faults>>,
    revision: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without counting it as a create.
    pub async fn insert<K: ManagedKind>(&self, obj: &K) -> StoreResult<()> {
        let key = ObjectKey::of(obj)?;
        let value = self.stamp(obj)?;
        self.entries.write().await.insert((K::KIND, key), value);
        Ok(())
    }

    /// Read an object without counting it as a get.
    pub async fn fetch<K: ManagedKind>(&self, key: &ObjectKey) -> Option<K> {
        let entries = self.entries.read().await;
        entries
            .get(&(K::KIND, key.clone()))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn fail_gets(&self, message: impl Into<String>) {
        self.faults().get = Some(message.into());
    }

    pub fn fail_creates(&self, message: impl Into<String>) {
        self.faults().create = Some(message.into());
    }

    pub fn fail_updates(&self, message: impl Into<String>) {
        self.faults().update = Some(message.into());
    }

    pub fn clear_faults(&self) {
        *self.faults() = Faults::default();
    }

    pub fn gets(&self) -> usize {
        self.calls.get.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.calls.update.load(Ordering::SeqCst)
    }

    /// Total create and update calls.
    pub fn mutations(&self) -> usize {
        self.creates() + self.updates()
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn stamp<K: ManagedKind>(&self, obj: &K) -> StoreResult<Value> {
        let mut value = serde_json::to_value(obj)?;
        let rev = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(meta) = value
            .as_object_mut()
            .and_then(|o| o.get_mut("metadata"))
            .and_then(Value::as_object_mut)
        {
            meta.insert(
                "resourceVersion".to_string(),
                Value::String(rev.to_string()),
            );
        }
        Ok(value)
    }
}

fn stored_version(value: &Value) -> Option<&str> {
    value
        .pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: ManagedKind>(&self, key: &ObjectKey) -> Lookup<K> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.faults().get.clone() {
            return Lookup::Failed(StoreError::Backend(msg));
        }
        let entries = self.entries.read().await;
        match entries.get(&(K::KIND, key.clone())) {
            None => Lookup::Absent,
            Some(v) => match serde_json::from_value(v.clone()) {
                Ok(obj) => Lookup::Found(obj),
                Err(e) => Lookup::Failed(e.into()),
            },
        }
    }

    async fn create<K: ManagedKind>(&self, obj: &K) -> StoreResult<()> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.faults().create.clone() {
            return Err(StoreError::Backend(msg));
        }
        let key = ObjectKey::of(obj)?;
        let mut entries = self.entries.write().await;
        let slot = (K::KIND, key);
        if entries.contains_key(&slot) {
            return Err(StoreError::AlreadyExists(slot.1.to_string()));
        }
        let value = self.stamp(obj)?;
        entries.insert(slot, value);
        Ok(())
    }

    async fn update<K: ManagedKind>(&self, obj: &K) -> StoreResult<()> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.faults().update.clone() {
            return Err(StoreError::Backend(msg));
        }
        let key = ObjectKey::of(obj)?;
        let mut entries = self.entries.write().await;
        let slot = (K::KIND, key);
        let Some(current) = entries.get(&slot) else {
            return Err(StoreError::NotFound(slot.1.to_string()));
        };
        if let Some(expected) = obj.metadata().resource_version.as_deref() {
            if stored_version(current) != Some(expected) {
                return Err(StoreError::Conflict(slot.1.to_string()));
            }
        }
        let value = self.stamp(obj)?;
        entries.insert(slot, value);
        Ok(())
    }
}
