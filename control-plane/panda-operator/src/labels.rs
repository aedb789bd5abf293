//! Label derivation for objects owned by a [`Cluster`].
//!
//! Child labels and the selectors used to find those children are both cut
//! from the same map, so a selector can never ask for a label the children
//! were not stamped with.

use std::collections::BTreeMap;

use kube::ResourceExt;

use crate::crd::cluster::Cluster;

pub const NAME_KEY: &str = "app.kubernetes.io/name";
pub const INSTANCE_KEY: &str = "app.kubernetes.io/instance";
pub const COMPONENT_KEY: &str = "app.kubernetes.io/component";
pub const MANAGED_BY_KEY: &str = "app.kubernetes.io/managed-by";

pub const APP_NAME: &str = "redpanda";
pub const MANAGER: &str = "panda-operator";

const SELECTOR_KEYS: [&str; 2] = [NAME_KEY, INSTANCE_KEY];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterLabels(BTreeMap<String, String>);

impl ClusterLabels {
    pub fn for_cluster(cluster: &Cluster) -> Self {
        let mut lbls = BTreeMap::new();
        lbls.insert(NAME_KEY.to_string(), APP_NAME.to_string());
        lbls.insert(INSTANCE_KEY.to_string(), cluster.name_any());
        lbls.insert(COMPONENT_KEY.to_string(), APP_NAME.to_string());
        lbls.insert(MANAGED_BY_KEY.to_string(), MANAGER.to_string());
        Self(lbls)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }

    /// Subset of the labels identifying every child of one cluster.
    pub fn selector_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter(|(k, _)| SELECTOR_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
