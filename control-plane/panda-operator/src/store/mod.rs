//! Object store collaborator the reconciliation engine reads and writes
//! through. One call is one round-trip; atomicity is per call.

pub mod error;
pub mod kube_store;
pub mod memory;
pub mod traits;

pub use error::*;
pub use kube_store::KubeStore;
pub use memory::MemoryStore;
pub use traits::*;
