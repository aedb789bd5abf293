use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// Store failure other than "not found", passed through untouched.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(
        "cannot set controller reference on {kind} {name}: \
         owner {owner} has no name or uid"
    )]
    OwnerReference {
        kind: &'static str,
        name: String,
        owner: String,
    },

    #[error("failed to render {kind} {name}: {source}")]
    Render {
        kind: &'static str,
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("reconciliation cancelled")]
    Cancelled,
}
