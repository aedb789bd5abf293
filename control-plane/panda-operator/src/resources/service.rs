use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::Resource as _;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::core::ObjectMeta;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::engine::{
    DesiredState, converge, metadata_drifted, overlay_metadata,
};
use super::{
    ManagedObject, Outcome, Resource, ResourceContext, ResourceError,
    cluster_key, controller_reference,
};
use crate::crd::cluster::Cluster;
use crate::labels::ClusterLabels;
use crate::store::{ObjectKey, ObjectStore};

pub const KAFKA_PORT_NAME: &str = "kafka-tcp";
pub const ADMIN_PORT_NAME: &str = "admin";
const CLUSTER_IP_NONE: &str = "None";

/// Headless Service giving every broker of a cluster a stable DNS identity.
pub struct ServiceResource<S> {
    ctx: ResourceContext<S>,
    cluster: Arc<Cluster>,
}

impl<S> ServiceResource<S> {
    pub fn new(ctx: ResourceContext<S>, cluster: Arc<Cluster>) -> Self {
        Self { ctx, cluster }
    }

    /// Fully qualified domain name of the headless service. Usable across
    /// namespaces when network policy allows it.
    pub fn headless_service_fqdn(&self) -> String {
        headless_service_fqdn(
            &cluster_key(&self.cluster),
            &self.ctx.cluster_domain,
        )
    }
}

pub fn headless_service_fqdn(key: &ObjectKey, cluster_domain: &str) -> String {
    format!("{}.{}.svc.{}", key.name, key.namespace, cluster_domain)
}

fn tcp_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        protocol: Some("TCP".to_string()),
        port,
        target_port: Some(IntOrString::Int(port)),
        ..Default::default()
    }
}

impl<S: Send + Sync> DesiredState for ServiceResource<S> {
    type Object = Service;

    fn desired(&self) -> Result<Service, ResourceError> {
        let key = cluster_key(&self.cluster);
        let lbls = ClusterLabels::for_cluster(&self.cluster);
        let owner =
            controller_reference(&self.cluster, Service::KIND, &key.name)?;

        let cfg = &self.cluster.spec.configuration;
        let mut ports = vec![tcp_port(KAFKA_PORT_NAME, cfg.kafka_api.port)];
        if let Some(admin) = cfg.admin_api.as_ref() {
            ports.push(tcp_port(ADMIN_PORT_NAME, admin.port));
        }

        Ok(Service {
            metadata: ObjectMeta {
                namespace: Some(key.namespace),
                name: Some(key.name),
                labels: Some(lbls.as_map().clone()),
                owner_references: Some(vec![owner]),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                cluster_ip: Some(CLUSTER_IP_NONE.to_string()),
                ports: Some(ports),
                selector: Some(lbls.selector_map()),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn correct_drift(
        &self,
        current: &Service,
        desired: Service,
    ) -> Option<Service> {
        let want = desired.spec.unwrap_or_default();
        let have = current.spec.clone().unwrap_or_default();

        // clusterIP is immutable once the API server assigned one.
        let assigned_ip = have
            .cluster_ip
            .as_deref()
            .filter(|ip| !ip.is_empty() && *ip != CLUSTER_IP_NONE);
        if let Some(ip) = assigned_ip {
            warn!(
                "Service {} has clusterIP {}, it cannot become headless",
                current.metadata.name.as_deref().unwrap_or_default(),
                ip
            );
        }
        let rewrite_ip =
            assigned_ip.is_none() && have.cluster_ip != want.cluster_ip;

        let spec_drifted = have.ports != want.ports
            || have.selector != want.selector
            || rewrite_ip;
        if !spec_drifted
            && !metadata_drifted(&current.metadata, &desired.metadata)
        {
            return None;
        }

        let mut next = current.clone();
        next.status = None;
        overlay_metadata(&mut next.metadata, desired.metadata);
        let spec = next.spec.get_or_insert_with(Default::default);
        spec.ports = want.ports;
        spec.selector = want.selector;
        if rewrite_ip {
            spec.cluster_ip = want.cluster_ip;
        }
        Some(next)
    }
}

#[async_trait]
impl<S: ObjectStore + 'static> Resource for ServiceResource<S> {
    async fn ensure(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ResourceError> {
        let key = self.key();
        converge(self.ctx.store.as_ref(), cancel, &key, self, self.ctx.drift)
            .await
    }

    fn obj(&self) -> Result<ManagedObject, ResourceError> {
        self.desired().map(ManagedObject::Service)
    }

    fn key(&self) -> ObjectKey {
        cluster_key(&self.cluster)
    }

    fn kind(&self) -> &'static str {
        Service::KIND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::cluster::SocketAddress;
    use crate::labels::INSTANCE_KEY;
    use crate::resources::fixtures::cluster;
    use crate::store::MemoryStore;

    fn resource(c: Cluster) -> ServiceResource<MemoryStore> {
        ServiceResource::new(
            ResourceContext::new(Arc::new(MemoryStore::new())),
            Arc::new(c),
        )
    }

    #[test]
    fn obj_exposes_kafka_port_headless() {
        let svc = resource(cluster("ns", "cluster1", 9092))
            .desired()
            .expect("desired service");

        assert_eq!(svc.metadata.namespace.as_deref(), Some("ns"));
        assert_eq!(svc.metadata.name.as_deref(), Some("cluster1"));
        let spec = svc.spec.as_ref().expect("spec");
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        let ports = spec.ports.as_ref().expect("ports");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].name.as_deref(), Some(KAFKA_PORT_NAME));
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));
        assert_eq!(ports[0].port, 9092);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(9092)));

        let owners = svc.metadata.owner_references.as_ref().expect("owners");
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].name, "cluster1");
        assert_eq!(owners[0].kind, "Cluster");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn selector_comes_from_labels() {
        let svc = resource(cluster("ns", "cluster1", 9092))
            .desired()
            .expect("desired service");
        let lbls = svc.metadata.labels.expect("labels");
        let selector = svc.spec.and_then(|s| s.selector).expect("selector");
        assert_eq!(
            selector.get(INSTANCE_KEY).map(String::as_str),
            Some("cluster1")
        );
        for (k, v) in &selector {
            assert_eq!(lbls.get(k), Some(v));
        }
    }

    #[test]
    fn admin_api_adds_port() {
        let mut c = cluster("ns", "cluster1", 9092);
        c.spec.configuration.admin_api = Some(SocketAddress::on_port(9644));
        let svc = resource(c).desired().expect("desired service");
        let ports = svc.spec.and_then(|s| s.ports).expect("ports");
        let names: Vec<_> =
            ports.iter().filter_map(|p| p.name.as_deref()).collect();
        assert_eq!(names, vec![KAFKA_PORT_NAME, ADMIN_PORT_NAME]);
        assert_eq!(ports[1].port, 9644);
    }

    #[test]
    fn obj_is_deterministic() {
        let r = resource(cluster("ns", "cluster1", 9092));
        assert_eq!(r.obj().expect("first"), r.obj().expect("second"));
        assert_eq!(r.key(), r.key());
        assert_eq!(r.kind(), "Service");
    }

    #[test]
    fn missing_owner_uid_fails_build() {
        let mut c = cluster("ns", "cluster1", 9092);
        c.metadata.uid = None;
        let err = resource(c).obj().unwrap_err();
        assert!(matches!(err, ResourceError::OwnerReference { .. }));
    }

    #[test]
    fn fqdn_uses_configured_domain() {
        let r = ServiceResource::new(
            ResourceContext::new(Arc::new(MemoryStore::new()))
                .with_cluster_domain("example.internal"),
            Arc::new(cluster("ns", "cluster1", 9092)),
        );
        assert_eq!(
            r.headless_service_fqdn(),
            "cluster1.ns.svc.example.internal"
        );
    }

    #[test]
    fn drift_ignores_server_assigned_fields() {
        let r = resource(cluster("ns", "cluster1", 9092));
        let mut current = r.desired().expect("desired");
        current.metadata.resource_version = Some("12".into());
        current.metadata.uid = Some("svc-uid".into());
        assert!(
            r.correct_drift(&current, r.desired().expect("desired"))
                .is_none()
        );
    }

    #[test]
    fn drift_rewrites_ports_and_keeps_version() {
        let r = resource(cluster("ns", "cluster1", 9092));
        let mut current = r.desired().expect("desired");
        current.metadata.resource_version = Some("12".into());
        if let Some(spec) = current.spec.as_mut() {
            spec.ports = Some(vec![tcp_port(KAFKA_PORT_NAME, 19092)]);
        }
        let next = r
            .correct_drift(&current, r.desired().expect("desired"))
            .expect("drift detected");
        assert_eq!(next.metadata.resource_version.as_deref(), Some("12"));
        let ports = next.spec.and_then(|s| s.ports).expect("ports");
        assert_eq!(ports[0].port, 9092);
    }

    #[test]
    fn assigned_cluster_ip_is_not_drift() {
        let r = resource(cluster("ns", "cluster1", 9092));
        let mut current = r.desired().expect("desired");
        if let Some(spec) = current.spec.as_mut() {
            spec.cluster_ip = Some("10.96.14.7".into());
        }
        assert!(
            r.correct_drift(&current, r.desired().expect("desired"))
                .is_none()
        );
    }

    #[test]
    fn drift_keeps_assigned_cluster_ip() {
        let r = resource(cluster("ns", "cluster1", 9092));
        let mut current = r.desired().expect("desired");
        if let Some(spec) = current.spec.as_mut() {
            spec.cluster_ip = Some("10.96.14.7".into());
            spec.ports = Some(vec![tcp_port(KAFKA_PORT_NAME, 19092)]);
        }
        let spec = r
            .correct_drift(&current, r.desired().expect("desired"))
            .and_then(|next| next.spec)
            .expect("drift detected");
        assert_eq!(spec.cluster_ip.as_deref(), Some("10.96.14.7"));
        assert_eq!(spec.ports.expect("ports")[0].port, 9092);
    }

    #[test]
    fn missing_cluster_ip_is_made_headless() {
        let r = resource(cluster("ns", "cluster1", 9092));
        let mut current = r.desired().expect("desired");
        if let Some(spec) = current.spec.as_mut() {
            spec.cluster_ip = None;
        }
        let spec = r
            .correct_drift(&current, r.desired().expect("desired"))
            .and_then(|next| next.spec)
            .expect("drift detected");
        assert_eq!(spec.cluster_ip.as_deref(), Some(CLUSTER_IP_NONE));
    }
}
