//! Idempotent repository synchronisation
//!
//! `sync_repo` converges the target directory onto `origin/<branch>`
//! whatever state it starts in: missing or non-repo directories get a fresh
//! clone; existing clones fetch and fast-forward; diverged clones are hard
//! reset to the remote branch. Transient failures are retried with a
//! `1s * attempt` backoff.

use std::fs;
use std::path::Path;
use std::time::Duration;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Repository, ResetType};

use crate::{Error, Result};

/// Default number of sync attempts before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Synchronise `target` with `url` at `branch`.
///
/// Retries up to `max_retries` attempts (at least one), sleeping
/// `1s * attempt` between attempts. The last error is preserved inside
/// [`Error::SyncFailed`] when all attempts are exhausted.
pub fn sync_repo(url: &str, target: &Path, branch: &str, max_retries: u32) -> Result<()> {
    let attempts = max_retries.max(1);
    let mut last_err: Option<Error> = None;

    for attempt in 1..=attempts {
        match sync_once(url, target, branch) {
            Ok(()) => {
                tracing::debug!(url, branch, attempt, "repository synchronised");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(url, branch, attempt, error = %e, "sync attempt failed");
                last_err = Some(e);
                if attempt < attempts {
                    std::thread::sleep(Duration::from_secs(u64::from(attempt)));
                }
            }
        }
    }

    let source = last_err.unwrap_or_else(|| Error::NotARepository {
        path: target.to_path_buf(),
    });
    Err(Error::sync_failed(url, attempts, source))
}

fn sync_once(url: &str, target: &Path, branch: &str) -> Result<()> {
    match Repository::open(target) {
        Ok(repo) => update_existing(&repo, branch),
        Err(_) => clone_fresh(url, target, branch),
    }
}

/// Fresh clone into `target`, replacing whatever non-repository content was
/// there.
fn clone_fresh(url: &str, target: &Path, branch: &str) -> Result<()> {
    if target.exists() {
        fs::remove_dir_all(target).map_err(|e| Error::Io {
            path: target.to_path_buf(),
            source: e,
        })?;
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    tracing::info!(url, branch, target = ?target, "cloning prompt repository");
    RepoBuilder::new().branch(branch).clone(url, target)?;
    Ok(())
}

/// Fetch and converge an existing clone onto `origin/<branch>`.
fn update_existing(repo: &Repository, branch: &str) -> Result<()> {
    let mut remote = repo.find_remote("origin")?;
    remote.fetch(&[branch], None, None)?;

    let remote_ref = format!("refs/remotes/origin/{branch}");
    let remote_oid = repo.refname_to_id(&remote_ref)?;
    let annotated = repo.find_annotated_commit(remote_oid)?;
    let (analysis, _) = repo.merge_analysis(&[&annotated])?;

    if analysis.is_up_to_date() {
        return Ok(());
    }

    if analysis.is_fast_forward() {
        let refname = format!("refs/heads/{branch}");
        match repo.find_reference(&refname) {
            Ok(mut reference) => {
                reference.set_target(
                    remote_oid,
                    &format!("sync: fast-forward to {remote_oid}"),
                )?;
            }
            Err(_) => {
                repo.reference(&refname, remote_oid, true, "sync: create branch")?;
            }
        }
        repo.set_head(&refname)?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
        return Ok(());
    }

    // Diverged from the remote. The checkout is a read-only mirror, so the
    // remote wins unconditionally.
    tracing::warn!(branch, "local checkout diverged, hard resetting to remote");
    let commit = repo.find_commit(remote_oid)?;
    repo.reset(commit.as_object(), ResetType::Hard, None)?;
    Ok(())
}
