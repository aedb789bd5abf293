#![allow(dead_code)]

use std::sync::Arc;

use kube::core::ObjectMeta;
use panda_operator::crd::cluster::{
    Cluster, ClusterSpec, RedpandaConfig, SocketAddress,
};
use panda_operator::resources::{
    DriftPolicy, ResourceContext, ServiceResource,
};
use panda_operator::store::MemoryStore;

pub const NS: &str = "ns";
pub const NAME: &str = "cluster1";

pub fn cluster(kafka_port: i32) -> Cluster {
    let mut c = Cluster::new(
        NAME,
        ClusterSpec {
            image: Some("vectorized/redpanda".into()),
            version: Some("v21.4.1".into()),
            replicas: Some(1),
            configuration: RedpandaConfig {
                kafka_api: SocketAddress::on_port(kafka_port),
                admin_api: None,
                rpc_server: None,
            },
        },
    );
    c.metadata = ObjectMeta {
        namespace: Some(NS.to_string()),
        uid: Some("7d1c4ad4-5e1a-4a8f-9d55-3f0f3c1b7a10".to_string()),
        generation: Some(1),
        ..c.metadata
    };
    c
}

pub fn service_resource(
    store: &Arc<MemoryStore>,
    c: Cluster,
    drift: DriftPolicy,
) -> ServiceResource<MemoryStore> {
    ServiceResource::new(
        ResourceContext::new(store.clone()).with_drift(drift),
        Arc::new(c),
    )
}
