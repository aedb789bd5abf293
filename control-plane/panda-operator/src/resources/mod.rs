//! Child objects a [`Cluster`] owns, behind one uniform contract.

pub mod configmap;
pub mod engine;
pub mod error;
pub mod service;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;

use crate::crd::cluster::Cluster;
use crate::store::{ObjectKey, ObjectStore};

pub use configmap::ConfigMapResource;
pub use engine::{DesiredState, DriftPolicy, converge};
pub use error::ResourceError;
pub use service::ServiceResource;

/// What a single `ensure` pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// Desired object of any kind this operator manages.
#[derive(Clone, Debug, PartialEq)]
pub enum ManagedObject {
    Service(Service),
    ConfigMap(ConfigMap),
}

impl ManagedObject {
    pub fn kind(&self) -> &'static str {
        use k8s_openapi::Resource as _;
        match self {
            ManagedObject::Service(_) => Service::KIND,
            ManagedObject::ConfigMap(_) => ConfigMap::KIND,
        }
    }
}

/// Contract every child kind implements so the controller can drive them
/// without knowing which kind it holds.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Converge the child object toward [`Resource::obj`].
    async fn ensure(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ResourceError>;

    /// Desired state of the child object.
    fn obj(&self) -> Result<ManagedObject, ResourceError>;

    /// Address used both to fetch current state and to stamp desired state.
    fn key(&self) -> ObjectKey;

    /// Type tag of the child object, for logs.
    fn kind(&self) -> &'static str;
}

/// Handles every resource instance is constructed with.
pub struct ResourceContext<S> {
    pub store: Arc<S>,
    pub drift: DriftPolicy,
    pub cluster_domain: String,
}

impl<S> ResourceContext<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            drift: DriftPolicy::default(),
            cluster_domain: "cluster.local".to_string(),
        }
    }

    pub fn with_drift(mut self, drift: DriftPolicy) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_cluster_domain(mut self, domain: impl Into<String>) -> Self {
        self.cluster_domain = domain.into();
        self
    }
}

impl<S> Clone for ResourceContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            drift: self.drift,
            cluster_domain: self.cluster_domain.clone(),
        }
    }
}

/// A cluster owns at most one child per kind, named after itself.
pub fn cluster_key(cluster: &Cluster) -> ObjectKey {
    ObjectKey::new(
        cluster.namespace().unwrap_or_else(|| "default".to_string()),
        cluster.name_any(),
    )
}

pub(crate) fn controller_reference(
    cluster: &Cluster,
    child_kind: &'static str,
    child_name: &str,
) -> Result<OwnerReference, ResourceError> {
    let mut oref = kube::Resource::controller_owner_ref(cluster, &())
        .ok_or_else(|| ResourceError::OwnerReference {
            kind: child_kind,
            name: child_name.to_string(),
            owner: cluster.name_any(),
        })?;
    oref.block_owner_deletion = Some(true);
    Ok(oref)
}

/// Every child resource of one cluster, keyed by kind.
pub struct ClusterResources {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
}

impl ClusterResources {
    pub fn for_cluster<S: ObjectStore + 'static>(
        ctx: &ResourceContext<S>,
        cluster: Arc<Cluster>,
    ) -> Self {
        let list: Vec<Box<dyn Resource>> = vec![
            Box::new(ConfigMapResource::new(ctx.clone(), cluster.clone())),
            Box::new(ServiceResource::new(ctx.clone(), cluster)),
        ];
        Self {
            resources: list.into_iter().map(|r| (r.kind(), r)).collect(),
        }
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Resource> {
        self.resources.get(kind).map(|r| r.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Resource> {
        self.resources.values().map(|r| r.as_ref())
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use kube::core::ObjectMeta;

    use crate::crd::cluster::{
        Cluster, ClusterSpec, RedpandaConfig, SocketAddress,
    };

    pub fn cluster(ns: &str, name: &str, kafka_port: i32) -> Cluster {
        let mut c = Cluster::new(
            name,
            ClusterSpec {
                image: None,
                version: None,
                replicas: Some(1),
                configuration: RedpandaConfig {
                    kafka_api: SocketAddress::on_port(kafka_port),
                    admin_api: None,
                    rpc_server: None,
                },
            },
        );
        c.metadata = ObjectMeta {
            namespace: Some(ns.to_string()),
            uid: Some(format!("uid-{}", name)),
            ..c.metadata
        };
        c
    }
}
