use std::fmt;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::{Metadata, NamespaceResourceScope, Resource};
use serde::{Serialize, de::DeserializeOwned};

use crate::store::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Any namespaced Kubernetes object kind the store can hold.
pub trait ManagedKind:
    Resource<Scope = NamespaceResourceScope>
    + Metadata<Ty = ObjectMeta>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> ManagedKind for T where
    T: Resource<Scope = NamespaceResourceScope>
        + Metadata<Ty = ObjectMeta>
        + Clone
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Namespace/name address of a stored object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Address an object by its own metadata.
    pub fn of<K: ManagedKind>(obj: &K) -> StoreResult<Self> {
        let meta = obj.metadata();
        match (meta.namespace.as_deref(), meta.name.as_deref()) {
            (Some(ns), Some(name)) if !ns.is_empty() && !name.is_empty() => {
                Ok(Self::new(ns, name))
            }
            _ => Err(StoreError::InvalidKey(format!(
                "{} without namespace/name",
                K::KIND
            ))),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Result of fetching one object: present, absent, or the fetch itself failed.
#[derive(Debug)]
pub enum Lookup<K> {
    Found(K),
    Absent,
    Failed(StoreError),
}

impl<K> Lookup<K> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }
}

impl<K> From<StoreResult<Option<K>>> for Lookup<K> {
    fn from(res: StoreResult<Option<K>>) -> Self {
        match res {
            Ok(Some(obj)) => Lookup::Found(obj),
            Ok(None) | Err(StoreError::NotFound(_)) => Lookup::Absent,
            Err(e) => Lookup::Failed(e),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get<K: ManagedKind>(&self, key: &ObjectKey) -> Lookup<K>;

    /// Create `obj`; fails with [`StoreError::AlreadyExists`] when an object
    /// already lives at its key.
    async fn create<K: ManagedKind>(&self, obj: &K) -> StoreResult<()>;

    /// Replace the object at `obj`'s key. A set `resourceVersion` must match
    /// the stored one.
    async fn update<K: ManagedKind>(&self, obj: &K) -> StoreResult<()>;
}
