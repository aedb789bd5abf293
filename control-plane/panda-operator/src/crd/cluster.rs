use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "redpanda.vectorized.io",
    version = "v1alpha1",
    kind = "Cluster",
    plural = "clusters",
    shortname = "rp",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Container image repository for the broker pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Broker version (image tag)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Listener and node configuration
    pub configuration: RedpandaConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedpandaConfig {
    pub kafka_api: SocketAddress,
    /// Admin HTTP API; exposed on the headless service when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_api: Option<SocketAddress>,
    /// Internal RPC listener used between brokers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_server: Option<SocketAddress>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
pub struct SocketAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub port: i32,
}

impl SocketAddress {
    pub fn on_port(port: i32) -> Self {
        Self {
            address: None,
            port,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Child objects converged during the last successful pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceRef>>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: String,
    pub name: String,
}
