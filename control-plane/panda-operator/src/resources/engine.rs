//! Convergence of a single child object: observe, compare, apply the
//! smallest corrective write.

use std::future::Future;

use k8s_openapi::Resource;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::{Outcome, ResourceError};
use crate::store::{Lookup, ManagedKind, ObjectKey, ObjectStore};

/// What to do with a child object that already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriftPolicy {
    /// Presence alone counts as converged.
    #[default]
    Ignore,
    /// Rewrite operator-owned fields when they differ from the desired
    /// object, keeping everything else the server or other actors set.
    Replace,
}

/// Typed half of a resource kind.
pub trait DesiredState: Send + Sync {
    type Object: ManagedKind;

    /// Build the fully specified desired object.
    fn desired(&self) -> Result<Self::Object, ResourceError>;

    /// Compare owned fields of `current` against `desired`. Returns the
    /// object to write back, or `None` when nothing owned has drifted.
    fn correct_drift(
        &self,
        current: &Self::Object,
        desired: Self::Object,
    ) -> Option<Self::Object>;
}

/// Run `fut` unless `cancel` fires first. Cancellation is checked before the
/// round-trip starts so a cancelled pass issues no call at all.
async fn round_trip<F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, ResourceError>
where
    F: Future,
{
    if cancel.is_cancelled() {
        return Err(ResourceError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ResourceError::Cancelled),
        out = fut => Ok(out),
    }
}

#[instrument(level = "debug", skip_all, fields(key = %key))]
pub async fn converge<S, D>(
    store: &S,
    cancel: &CancellationToken,
    key: &ObjectKey,
    state: &D,
    policy: DriftPolicy,
) -> Result<Outcome, ResourceError>
where
    S: ObjectStore,
    D: DesiredState,
{
    let kind = <D::Object as Resource>::KIND;
    let current: Lookup<D::Object> = round_trip(cancel, store.get(key)).await?;
    match current {
        Lookup::Failed(e) => Err(e.into()),
        Lookup::Absent => {
            info!(
                "{} {} does not exist, going to create one",
                kind, key.name
            );
            let obj = state.desired()?;
            round_trip(cancel, store.create(&obj)).await??;
            Ok(Outcome::Created)
        }
        Lookup::Found(current) => match policy {
            DriftPolicy::Ignore => {
                debug!("object present; drift correction disabled");
                Ok(Outcome::Unchanged)
            }
            DriftPolicy::Replace => {
                let desired = state.desired()?;
                match state.correct_drift(&current, desired) {
                    None => {
                        debug!("object matches desired state");
                        Ok(Outcome::Unchanged)
                    }
                    Some(next) => {
                        info!("{} {} has drifted, updating", kind, key.name);
                        round_trip(cancel, store.update(&next)).await??;
                        Ok(Outcome::Updated)
                    }
                }
            }
        },
    }
}

/// True when `current` lacks any desired label or owner reference.
pub fn metadata_drifted(current: &ObjectMeta, desired: &ObjectMeta) -> bool {
    let labels_missing = desired.labels.iter().flatten().any(|(k, v)| {
        current.labels.as_ref().and_then(|l| l.get(k)) != Some(v)
    });
    let owners_missing = desired.owner_references.iter().flatten().any(|o| {
        !current
            .owner_references
            .iter()
            .flatten()
            .any(|c| c.uid == o.uid && c.controller == o.controller)
    });
    labels_missing || owners_missing
}

/// Merge desired labels and owner references into `current`. Labels and
/// references added by others are kept.
pub fn overlay_metadata(current: &mut ObjectMeta, desired: ObjectMeta) {
    if let Some(lbls) = desired.labels {
        current.labels.get_or_insert_with(Default::default).extend(lbls);
    }
    if let Some(owners) = desired.owner_references {
        let refs = current.owner_references.get_or_insert_with(Vec::new);
        for o in owners {
            refs.retain(|c| c.uid != o.uid);
            refs.push(o);
        }
    }
}
