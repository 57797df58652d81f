//! Source acquisition: a fresh clone of the upstream repository, checked out
//! at the pinned revision or at the revision the library's policy selects.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};
use vendorgen_native::{CommandRunner, Git, NativeError};

use crate::error::{Result, VendorError};
use crate::library::{LibrarySpec, RevisionPolicy};

/// A checked out upstream tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    /// Commit id of the checked out tree.
    pub revision: String,
    pub workdir: PathBuf,
    /// Stable branch the revision belongs to, for stable-channel libraries.
    pub stable_branch: Option<String>,
    /// Committer date of the revision, when the library stamps it.
    pub commit_date: Option<String>,
}

/// Remote stable branches in a `git branch -a` listing, in listing order.
pub fn stable_branches(library: &str, listing: &str, pattern: &str) -> Result<Vec<String>> {
    let re = Regex::new(pattern).map_err(|e| {
        VendorError::configuration(library, format!("invalid stable branch pattern: {e}"))
    })?;
    Ok(re
        .captures_iter(listing)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect())
}

/// Clones and checks out upstream trees through a [`CommandRunner`].
pub struct SourceAcquirer<'a> {
    git: Git<'a>,
}

impl<'a> SourceAcquirer<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            git: Git::new(runner),
        }
    }

    /// Replace `workdir` with a checkout of `spec`'s upstream.
    ///
    /// With a `pin` the exact commit is checked out; without one the
    /// library's [`RevisionPolicy`] decides.
    pub async fn acquire(
        &self,
        spec: &LibrarySpec,
        workdir: &Path,
        pin: Option<&str>,
    ) -> Result<Acquired> {
        let library = spec.name();
        let native = |source: NativeError| VendorError::Acquisition {
            library: library.to_string(),
            source,
        };
        let not_found = |revision: &str| VendorError::RevisionNotFound {
            library: library.to_string(),
            revision: revision.to_string(),
        };

        if workdir.exists() {
            debug!(library, path = %workdir.display(), "Removing stale tree");
            std::fs::remove_dir_all(workdir).map_err(|e| native(e.into()))?;
        }
        if let Some(parent) = workdir.parent() {
            std::fs::create_dir_all(parent).map_err(|e| native(e.into()))?;
        }
        self.git
            .clone_into(spec.upstream, workdir)
            .await
            .map_err(native)?;

        let mut stable_branch = None;
        match (pin, &spec.revision_policy) {
            (Some(rev), policy) => {
                if !self.git.has_revision(workdir, rev).await.map_err(native)? {
                    return Err(not_found(rev));
                }
                self.git.checkout(workdir, rev).await.map_err(native)?;
                if let RevisionPolicy::LatestStable { pattern } = policy {
                    let listing = self
                        .git
                        .branches(workdir, Some(rev))
                        .await
                        .map_err(native)?;
                    stable_branch = Some(self.last_stable(library, &listing, pattern)?);
                }
            }
            (None, RevisionPolicy::DefaultBranch) => {}
            (None, RevisionPolicy::Branch(branch)) => {
                self.git
                    .checkout(workdir, branch)
                    .await
                    .map_err(|_| not_found(*branch))?;
            }
            (None, RevisionPolicy::LatestStable { pattern }) => {
                let listing = self.git.branches(workdir, None).await.map_err(native)?;
                let branch = self.last_stable(library, &listing, pattern)?;
                self.git.checkout(workdir, &branch).await.map_err(native)?;
                stable_branch = Some(branch);
            }
        }

        let revision = self.git.head(workdir).await.map_err(native)?;
        let commit_date = if spec.needs_build_date {
            let date = self.git.commit_date(workdir).await.map_err(native)?;
            if date.is_empty() {
                return Err(VendorError::configuration(library, "empty commit date"));
            }
            Some(date)
        } else {
            None
        };

        info!(
            library,
            revision = %revision,
            branch = stable_branch.as_deref().unwrap_or("-"),
            "Acquired upstream source"
        );
        Ok(Acquired {
            revision,
            workdir: workdir.to_path_buf(),
            stable_branch,
            commit_date,
        })
    }

    fn last_stable(&self, library: &str, listing: &str, pattern: &str) -> Result<String> {
        stable_branches(library, listing, pattern)?
            .pop()
            .ok_or_else(|| VendorError::NoStableChannel {
                library: library.to_string(),
            })
    }
}
