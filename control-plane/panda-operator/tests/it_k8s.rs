// Integration tests require a running Kubernetes cluster with the Cluster CRD
// applied (`cargo run --bin crdgen | kubectl apply -f -`). Ignored by default.

use std::sync::Arc;

use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::{
    Client,
    api::{Api, DeleteParams, PostParams},
};
use panda_operator::crd::cluster::Cluster;
use panda_operator::resources::{
    ClusterResources, DriftPolicy, Outcome, ResourceContext,
};
use panda_operator::store::KubeStore;
use tokio_util::sync::CancellationToken;

mod common;

#[test_log::test(tokio::test)]
#[ignore]
async fn ensures_children_against_api_server() {
    let client = Client::try_default().await.expect("kube client");
    let ns = "default";
    let mut desired = common::cluster(9092);
    desired.metadata.namespace = Some(ns.to_string());
    desired.metadata.uid = None;
    desired.metadata.generation = None;

    let clusters: Api<Cluster> = Api::namespaced(client.clone(), ns);
    let created = clusters
        .create(&PostParams::default(), &desired)
        .await
        .expect("create cluster");

    let ctx = ResourceContext::new(Arc::new(KubeStore::new(client.clone())))
        .with_drift(DriftPolicy::Replace);
    let set = ClusterResources::for_cluster(&ctx, Arc::new(created));
    let cancel = CancellationToken::new();
    for res in set.iter() {
        assert_eq!(
            res.ensure(&cancel).await.expect("first ensure"),
            Outcome::Created
        );
        assert_eq!(
            res.ensure(&cancel).await.expect("second ensure"),
            Outcome::Unchanged
        );
    }

    let services: Api<Service> = Api::namespaced(client.clone(), ns);
    let configmaps: Api<ConfigMap> = Api::namespaced(client.clone(), ns);
    assert!(
        services
            .get_opt(common::NAME)
            .await
            .expect("get service")
            .is_some()
    );
    assert!(
        configmaps
            .get_opt(common::NAME)
            .await
            .expect("get configmap")
            .is_some()
    );

    let _ = clusters.delete(common::NAME, &DeleteParams::default()).await;
    let _ = services.delete(common::NAME, &DeleteParams::default()).await;
    let _ = configmaps.delete(common::NAME, &DeleteParams::default()).await;
}
