use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::Resource as _;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::core::ObjectMeta;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::engine::{
    DesiredState, converge, metadata_drifted, overlay_metadata,
};
use super::service::headless_service_fqdn;
use super::{
    ManagedObject, Outcome, Resource, ResourceContext, ResourceError,
    cluster_key, controller_reference,
};
use crate::crd::cluster::{Cluster, SocketAddress};
use crate::labels::ClusterLabels;
use crate::store::{ObjectKey, ObjectStore};

pub const CONFIG_FILE: &str = "redpanda.yaml";
pub const DATA_DIRECTORY: &str = "/var/lib/redpanda/data";
pub const DEFAULT_RPC_PORT: i32 = 33145;
const ANY_ADDRESS: &str = "0.0.0.0";

#[derive(Serialize)]
struct NodeConfigFile {
    redpanda: NodeConfig,
}

#[derive(Serialize)]
struct NodeConfig {
    data_directory: String,
    rpc_server: Listener,
    kafka_api: Vec<NamedListener>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    admin: Vec<NamedListener>,
    seed_servers: Vec<SeedServer>,
}

#[derive(Serialize)]
struct Listener {
    address: String,
    port: i32,
}

#[derive(Serialize)]
struct NamedListener {
    name: String,
    address: String,
    port: i32,
}

#[derive(Serialize)]
struct SeedServer {
    host: Listener,
}

fn listener(addr: &SocketAddress) -> Listener {
    Listener {
        address: addr.address.clone().unwrap_or_else(|| ANY_ADDRESS.into()),
        port: addr.port,
    }
}

fn named(name: &str, addr: &SocketAddress) -> NamedListener {
    let Listener { address, port } = listener(addr);
    NamedListener {
        name: name.to_string(),
        address,
        port,
    }
}

/// Node configuration file shared by the brokers of a cluster.
pub struct ConfigMapResource<S> {
    ctx: ResourceContext<S>,
    cluster: Arc<Cluster>,
}

impl<S> ConfigMapResource<S> {
    pub fn new(ctx: ResourceContext<S>, cluster: Arc<Cluster>) -> Self {
        Self { ctx, cluster }
    }

    fn render(&self, key: &ObjectKey) -> Result<String, ResourceError> {
        let cfg = &self.cluster.spec.configuration;
        let rpc = cfg
            .rpc_server
            .clone()
            .unwrap_or_else(|| SocketAddress::on_port(DEFAULT_RPC_PORT));
        let node = NodeConfigFile {
            redpanda: NodeConfig {
                data_directory: DATA_DIRECTORY.to_string(),
                rpc_server: listener(&rpc),
                kafka_api: vec![named("kafka", &cfg.kafka_api)],
                admin: cfg
                    .admin_api
                    .iter()
                    .map(|a| named("admin", a))
                    .collect(),
                seed_servers: vec![SeedServer {
                    host: Listener {
                        address: headless_service_fqdn(
                            key,
                            &self.ctx.cluster_domain,
                        ),
                        port: rpc.port,
                    },
                }],
            },
        };
        serde_yaml::to_string(&node).map_err(|source| ResourceError::Render {
            kind: ConfigMap::KIND,
            name: key.name.clone(),
            source,
        })
    }
}

impl<S: Send + Sync> DesiredState for ConfigMapResource<S> {
    type Object = ConfigMap;

    fn desired(&self) -> Result<ConfigMap, ResourceError> {
        let key = cluster_key(&self.cluster);
        let lbls = ClusterLabels::for_cluster(&self.cluster);
        let owner =
            controller_reference(&self.cluster, ConfigMap::KIND, &key.name)?;
        let data =
            BTreeMap::from([(CONFIG_FILE.to_string(), self.render(&key)?)]);

        Ok(ConfigMap {
            metadata: ObjectMeta {
                namespace: Some(key.namespace),
                name: Some(key.name),
                labels: Some(lbls.into_map()),
                owner_references: Some(vec![owner]),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        })
    }

    fn correct_drift(
        &self,
        current: &ConfigMap,
        desired: ConfigMap,
    ) -> Option<ConfigMap> {
        let want = desired
            .data
            .as_ref()
            .and_then(|d| d.get(CONFIG_FILE))
            .cloned();
        let have = current.data.as_ref().and_then(|d| d.get(CONFIG_FILE));
        if have == want.as_ref()
            && !metadata_drifted(&current.metadata, &desired.metadata)
        {
            return None;
        }

        let mut next = current.clone();
        overlay_metadata(&mut next.metadata, desired.metadata);
        if let Some(contents) = want {
            next.data
                .get_or_insert_with(Default::default)
                .insert(CONFIG_FILE.to_string(), contents);
        }
        Some(next)
    }
}

#[async_trait]
impl<S: ObjectStore + 'static> Resource for ConfigMapResource<S> {
    async fn ensure(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ResourceError> {
        let key = self.key();
        converge(self.ctx.store.as_ref(), cancel, &key, self, self.ctx.drift)
            .await
    }

    fn obj(&self) -> Result<ManagedObject, ResourceError> {
        self.desired().map(ManagedObject::ConfigMap)
    }

    fn key(&self) -> ObjectKey {
        cluster_key(&self.cluster)
    }

    fn kind(&self) -> &'static str {
        ConfigMap::KIND
    }
}
