use async_trait::async_trait;
use kube::{
    Client,
    api::{Api, PostParams},
};

use crate::store::error::StoreError;
use crate::store::traits::{
    Lookup, ManagedKind, ObjectKey, ObjectStore, StoreResult,
};

pub const FIELD_MANAGER: &str = "panda-operator";

/// [`ObjectStore`] backed by the Kubernetes API server.
///
/// `kube::Client` is cheap to clone and safe to share, so one store can serve
/// every resource instance reconciling in parallel.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: ManagedKind>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

fn classify_write(err: kube::Error, key: &ObjectKey) -> StoreError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => {
            StoreError::NotFound(key.to_string())
        }
        kube::Error::Api(ae)
            if ae.code == 409 && ae.reason == "AlreadyExists" =>
        {
            StoreError::AlreadyExists(key.to_string())
        }
        kube::Error::Api(ae) if ae.code == 409 => {
            StoreError::Conflict(key.to_string())
        }
        e => StoreError::Kube(e),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: ManagedKind>(&self, key: &ObjectKey) -> Lookup<K> {
        // `get_opt` maps 404 to `None`.
        self.api::<K>(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(StoreError::Kube)
            .into()
    }

    async fn create<K: ManagedKind>(&self, obj: &K) -> StoreResult<()> {
        let key = ObjectKey::of(obj)?;
        self.api::<K>(&key.namespace)
            .create(&post_params(), obj)
            .await
            .map(|_| ())
            .map_err(|e| classify_write(e, &key))
    }

    async fn update<K: ManagedKind>(&self, obj: &K) -> StoreResult<()> {
        let key = ObjectKey::of(obj)?;
        self.api::<K>(&key.namespace)
            .replace(&key.name, &post_params(), obj)
            .await
            .map(|_| ())
            .map_err(|e| classify_write(e, &key))
    }
}
