use envconfig::Envconfig;

use crate::resources::DriftPolicy;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    #[envconfig(from = "PANDA_OPERATOR_PROFILE", default = "dev")]
    pub profile: String,

    /// Namespace to watch. Unset watches every namespace.
    #[envconfig(from = "PANDA_OPERATOR_NAMESPACE")]
    pub namespace: Option<String>,

    /// DNS suffix used when building in-cluster service FQDNs.
    #[envconfig(
        from = "PANDA_OPERATOR_CLUSTER_DOMAIN",
        default = "cluster.local"
    )]
    pub cluster_domain: String,

    #[envconfig(from = "PANDA_OPERATOR_REQUEUE_SECS", default = "300")]
    pub requeue_secs: u64,

    #[envconfig(from = "PANDA_OPERATOR_ERROR_REQUEUE_SECS", default = "30")]
    pub error_requeue_secs: u64,

    #[envconfig(nested)]
    pub features: FeaturesConfig,
}

#[derive(Envconfig, Clone, Debug, Default)]
pub struct FeaturesConfig {
    /// If Some, env explicitly set; otherwise, profile defaults apply
    #[envconfig(from = "PANDA_OPERATOR_FEATURES_DRIFT_CORRECTION")]
    pub drift_correction: Option<bool>,
}

impl OperatorConfig {
    /// Apply profile → defaults mapping, while respecting explicit env
    /// overrides.
    ///
    /// - dev: drift_correction=false
    /// - full: drift_correction=true
    pub fn apply_profile_defaults(mut self) -> Self {
        let def_drift = match self.profile.as_str() {
            "full" | "prod" | "production" => true,
            _ /* dev */ => false,
        };

        if self.features.drift_correction.is_none() {
            self.features.drift_correction = Some(def_drift);
        }

        self
    }

    pub fn drift_policy(&self) -> DriftPolicy {
        if self.features.drift_correction.unwrap_or(false) {
            DriftPolicy::Replace
        } else {
            DriftPolicy::Ignore
        }
    }

    /// Watched namespace, treating an empty value as "all namespaces".
    pub fn watch_namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}
