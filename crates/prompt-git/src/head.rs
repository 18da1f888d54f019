//! Head resolution for polling and health reporting

use std::path::Path;

use git2::Repository;

use crate::{Error, Result};

/// Returns `true` when `target` can be opened as a git repository.
pub fn is_repository(target: &Path) -> bool {
    Repository::open(target).is_ok()
}

/// Current HEAD commit id of the local checkout.
pub fn head_commit(target: &Path) -> Result<String> {
    let repo = Repository::open(target).map_err(|_| Error::NotARepository {
        path: target.to_path_buf(),
    })?;
    let head = repo.head()?;
    let commit = head.peel_to_commit()?;
    Ok(commit.id().to_string())
}

/// Fetch `branch` from origin and return the commit id of
/// `refs/remotes/origin/<branch>`.
///
/// This is the polling primitive: a hash differing from the last one seen
/// means the remote moved.
pub fn remote_head(target: &Path, branch: &str) -> Result<String> {
    let repo = Repository::open(target).map_err(|_| Error::NotARepository {
        path: target.to_path_buf(),
    })?;
    let mut remote = repo.find_remote("origin")?;
    remote.fetch(&[branch], None, None)?;
    let oid = repo.refname_to_id(&format!("refs/remotes/origin/{branch}"))?;
    Ok(oid.to_string())
}
