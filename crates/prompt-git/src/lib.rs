//! Git synchronisation for prompt-manager
//!
//! Keeps a local checkout of a prompt repository in step with its remote:
//! fresh clone when the target is not a repository, fast-forward when
//! possible, hard reset to the remote branch on divergence.

pub mod error;
pub mod head;
pub mod sync;

pub use error::{Error, Result};
pub use head::{head_commit, is_repository, remote_head};
pub use sync::{sync_repo, DEFAULT_MAX_RETRIES};
