use crate::crd::cluster::{ClusterStatus, ResourceRef};

pub const PHASE_RECONCILED: &str = "Reconciled";

pub fn reconciled(
    now: String,
    generation: Option<i64>,
    resources: Vec<ResourceRef>,
) -> ClusterStatus {
    ClusterStatus {
        phase: Some(PHASE_RECONCILED.to_string()),
        message: Some(format!("{} child resources converged", resources.len())),
        observed_generation: generation,
        last_updated: Some(now),
        resources: Some(resources),
    }
}

/// Skip status writes that would only bump `last_updated`; every status
/// patch triggers another watch event on the cluster.
pub fn should_patch(
    current: Option<&ClusterStatus>,
    desired: &ClusterStatus,
) -> bool {
    match current {
        None => true,
        Some(cur) => {
            cur.phase != desired.phase
                || cur.message != desired.message
                || cur.observed_generation != desired.observed_generation
                || cur.resources != desired.resources
        }
    }
}
