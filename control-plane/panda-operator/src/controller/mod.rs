pub mod status;

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::{
    Client, Resource, ResourceExt,
    api::{Api, Patch, PatchParams},
    runtime::{Controller, controller::Action, watcher::Config},
};
use serde_json::json;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::OperatorConfig;
use crate::crd::cluster::{Cluster, ResourceRef};
use crate::resources::{
    ClusterResources, ResourceContext, ResourceError, cluster_key,
};
use crate::store::{KubeStore, ObjectKey};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("ensure {kind} {key}: {source}")]
    Resource {
        kind: &'static str,
        key: ObjectKey,
        #[source]
        source: ResourceError,
    },
    #[error("status update failed: {0}")]
    Status(#[source] kube::Error),
}

#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    pub cfg: OperatorConfig,
    pub resources: ResourceContext<KubeStore>,
    pub shutdown: CancellationToken,
}

impl ControllerContext {
    pub fn new(
        client: Client,
        cfg: OperatorConfig,
        shutdown: CancellationToken,
    ) -> Self {
        let resources =
            ResourceContext::new(Arc::new(KubeStore::new(client.clone())))
                .with_drift(cfg.drift_policy())
                .with_cluster_domain(cfg.cluster_domain.clone());
        Self {
            client,
            cfg,
            resources,
            shutdown,
        }
    }
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

pub async fn run_controller(
    client: Client,
    cfg: OperatorConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let ns = cfg.watch_namespace().map(str::to_string);
    let clusters: Api<Cluster> = scoped_api(&client, ns.as_deref());
    let services: Api<Service> = scoped_api(&client, ns.as_deref());
    let configmaps: Api<ConfigMap> = scoped_api(&client, ns.as_deref());
    info!(
        namespace = ?ns,
        drift = ?cfg.drift_policy(),
        "starting cluster controller"
    );

    let ctx = Arc::new(ControllerContext::new(client, cfg, shutdown));

    Controller::new(clusters, Config::default())
        .owns(services, Config::default())
        .owns(configmaps, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(
                        cluster = %obj_ref.name,
                        "reconciled: requeue={:?}",
                        action
                    )
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

#[instrument(
    skip_all,
    fields(
        ns = %obj.namespace().unwrap_or_else(|| "default".into()),
        name = %obj.name_any()
    )
)]
pub async fn reconcile(
    obj: Arc<Cluster>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    // Children carry a controller owner reference; the garbage collector
    // removes them once the cluster is gone.
    if obj.meta().deletion_timestamp.is_some() {
        info!("reconcile: deletion timestamp detected; leaving children to GC");
        return Ok(Action::await_change());
    }

    let cancel = ctx.shutdown.child_token();
    let resources = ClusterResources::for_cluster(&ctx.resources, obj.clone());
    let refs = ensure_resources(&resources, &cancel).await?;

    let desired = status::reconciled(
        Utc::now().to_rfc3339(),
        obj.meta().generation,
        refs,
    );
    if status::should_patch(obj.status.as_ref(), &desired) {
        let key = cluster_key(&obj);
        let api: Api<Cluster> =
            Api::namespaced(ctx.client.clone(), &key.namespace);
        let patch = json!({ "status": desired });
        api.patch_status(
            &key.name,
            &PatchParams::default(),
            &Patch::Merge(&patch),
        )
        .await
        .map_err(ReconcileErr::Status)?;
        debug!("status patched");
    }

    Ok(Action::requeue(Duration::from_secs(ctx.cfg.requeue_secs)))
}

/// Ensure every child in kind order, stopping at the first failure.
pub async fn ensure_resources(
    resources: &ClusterResources,
    cancel: &CancellationToken,
) -> Result<Vec<ResourceRef>, ReconcileErr> {
    let mut refs = Vec::with_capacity(resources.len());
    for res in resources.iter() {
        let key = res.key();
        let outcome = res.ensure(cancel).await.map_err(|source| {
            ReconcileErr::Resource {
                kind: res.kind(),
                key: key.clone(),
                source,
            }
        })?;
        debug!(kind = res.kind(), %key, ?outcome, "resource ensured");
        refs.push(ResourceRef {
            kind: res.kind().to_string(),
            name: key.name,
        });
    }
    Ok(refs)
}

fn error_policy(
    _obj: Arc<Cluster>,
    _error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    Action::requeue(Duration::from_secs(ctx.cfg.error_requeue_secs))
}
