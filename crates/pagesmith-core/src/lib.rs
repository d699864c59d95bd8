pub mod config;
pub mod error;
pub mod github;
pub mod hosting;
pub mod lease;
pub mod memory;
pub mod reconcile;
pub mod remote;
pub mod resolver;
pub mod revision;
pub mod scaffold;
pub mod settle;
pub mod sync;
pub mod types;

pub use error::{CoreError, RemoteError, Result};
pub use remote::{RepoHandle, RepoHost};
pub use sync::{SyncRequest, Synchronizer};
pub use types::{DesiredFiles, PublicationResult, Revision, SyncMode};
