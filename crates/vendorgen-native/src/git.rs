//! Git plumbing for fetching upstream source trees.

use std::path::Path;

use tracing::info;

use crate::error::NativeError;
use crate::invocation::Invocation;
use crate::runner::CommandRunner;
use crate::Result;

/// Git operations routed through a [`CommandRunner`].
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Clone `url` into `dest`. The parent of `dest` must exist.
    pub async fn clone_into(&self, url: &str, dest: &Path) -> Result<()> {
        info!(url, dest = %dest.display(), "Cloning upstream repository");
        let inv = Invocation::new("git").args(["clone", url, &dest.to_string_lossy()]);
        self.runner.run_checked(&inv).await?;
        Ok(())
    }

    /// Whether `rev` names a commit known to the repository.
    pub async fn has_revision(&self, repo: &Path, rev: &str) -> Result<bool> {
        let inv = Invocation::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("{rev}^{{commit}}")])
            .current_dir(repo);
        Ok(self.runner.run(&inv).await?.success())
    }

    /// Check out `rev` (commit, branch or tag).
    pub async fn checkout(&self, repo: &Path, rev: &str) -> Result<()> {
        let inv = Invocation::new("git")
            .args(["checkout", "--quiet", rev])
            .current_dir(repo);
        self.runner.run_checked(&inv).await?;
        Ok(())
    }

    /// The commit id HEAD currently points to.
    pub async fn head(&self, repo: &Path) -> Result<String> {
        let inv = Invocation::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(repo);
        let out = self.runner.run_checked(&inv).await?;
        let sha = out.stdout.trim().to_string();
        if sha.is_empty() {
            return Err(NativeError::UnexpectedOutput {
                command: inv.to_string(),
                reason: "empty commit id".to_string(),
            });
        }
        Ok(sha)
    }

    /// Raw `git branch -a` listing, optionally restricted to branches
    /// containing `rev`.
    pub async fn branches(&self, repo: &Path, containing: Option<&str>) -> Result<String> {
        let mut inv = Invocation::new("git").args(["branch", "-a"]);
        if let Some(rev) = containing {
            inv = inv.args(["--contains", rev]);
        }
        let out = self.runner.run_checked(&inv.current_dir(repo)).await?;
        Ok(out.stdout)
    }

    /// Committer date of HEAD in git's default date format.
    pub async fn commit_date(&self, repo: &Path) -> Result<String> {
        let inv = Invocation::new("git")
            .args(["show", "-s", "--format=%cd"])
            .current_dir(repo);
        let out = self.runner.run_checked(&inv).await?;
        Ok(out.stdout.trim().to_string())
    }
}
