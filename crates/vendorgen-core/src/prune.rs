//! Source tree pruning.
//!
//! An acquired tree is cut down, level by level, to the directories, files
//! and extensions its library retains. Retained directories are kept whole
//! unless a nested level narrows them further. Pruning a pruned tree changes
//! nothing.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, VendorError};

/// What survives in one directory.
#[derive(Debug, Clone, Default)]
pub struct LevelRules {
    /// Child directories kept with all their contents.
    pub keep_dirs: &'static [&'static str],
    /// Files kept by exact name.
    pub keep_files: &'static [&'static str],
    /// Files kept by extension (without the dot).
    pub keep_extensions: &'static [&'static str],
}

impl LevelRules {
    fn keeps(&self, name: &str, is_dir: bool) -> bool {
        if is_dir {
            return self.keep_dirs.contains(&name);
        }
        self.keep_files.contains(&name)
            || Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| self.keep_extensions.contains(&e))
    }
}

/// Literal text replacement inside one retained source file.
#[derive(Debug, Clone)]
pub struct SourceRewrite {
    pub file: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// Complete pruning rules of a library.
#[derive(Debug, Clone, Default)]
pub struct PruneRules {
    pub root: LevelRules,
    /// Rules for directories below the root, applied after their parent.
    pub nested: Vec<(&'static str, LevelRules)>,
    /// Directory names removed anywhere in the tree.
    pub purge_dir_names: &'static [&'static str],
    pub rewrites: Vec<SourceRewrite>,
}

impl PruneRules {
    /// Rules that only act on the top-level directory.
    pub fn top_level(root: LevelRules) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }
}

/// What a prune pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub removed_dirs: usize,
    pub removed_files: usize,
    pub rewritten_files: usize,
}

impl PruneReport {
    pub fn is_noop(&self) -> bool {
        self.removed_dirs == 0 && self.removed_files == 0 && self.rewritten_files == 0
    }
}

/// Prune `workdir` according to `rules`.
pub fn prune(library: &str, workdir: &Path, rules: &PruneRules) -> Result<PruneReport> {
    let err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| VendorError::Pruning {
            library: library.to_string(),
            path,
            source,
        }
    };

    let mut report = PruneReport::default();

    prune_level(workdir, &rules.root, &mut report).map_err(err(workdir))?;
    for (sub, level) in &rules.nested {
        let dir = workdir.join(sub);
        if dir.is_dir() {
            prune_level(&dir, level, &mut report).map_err(err(&dir))?;
        }
    }

    if !rules.purge_dir_names.is_empty() {
        purge_named_dirs(workdir, rules.purge_dir_names, &mut report).map_err(err(workdir))?;
    }

    for rewrite in &rules.rewrites {
        let path = workdir.join(rewrite.file);
        if apply_rewrite(&path, rewrite).map_err(err(&path))? {
            report.rewritten_files += 1;
        }
    }

    info!(
        library,
        removed_dirs = report.removed_dirs,
        removed_files = report.removed_files,
        rewritten = report.rewritten_files,
        "Pruned source tree"
    );
    Ok(report)
}

fn prune_level(dir: &Path, rules: &LevelRules, report: &mut PruneReport) -> std::io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<PathBuf>>>()?;
    entries.sort();

    for path in entries {
        // Symlinks are judged as files and never followed.
        let is_dir = std::fs::symlink_metadata(&path)?.is_dir();
        // Rules are UTF-8, so a name that is not can never be retained.
        let kept = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |name| rules.keeps(name, is_dir));
        if kept {
            continue;
        }
        debug!(path = %path.display(), "Removing");
        if is_dir {
            std::fs::remove_dir_all(&path)?;
            report.removed_dirs += 1;
        } else {
            std::fs::remove_file(&path)?;
            report.removed_files += 1;
        }
    }
    Ok(())
}

/// Breadth-first removal of every directory whose name is listed.
fn purge_named_dirs(
    root: &Path,
    names: &[&str],
    report: &mut PruneReport,
) -> std::io::Result<()> {
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            if entry
                .file_name()
                .to_str()
                .map_or(false, |n| names.contains(&n))
            {
                std::fs::remove_dir_all(&path)?;
                report.removed_dirs += 1;
            } else {
                queue.push_back(path);
            }
        }
    }
    Ok(())
}

/// Returns whether the file changed. Running twice rewrites once.
fn apply_rewrite(path: &Path, rewrite: &SourceRewrite) -> std::io::Result<bool> {
    let text = std::fs::read_to_string(path)?;
    if rewrite.to.contains(rewrite.from) && text.contains(rewrite.to) {
        return Ok(false);
    }
    let rewritten = text.replace(rewrite.from, rewrite.to);
    if rewritten == text {
        return Ok(false);
    }
    std::fs::write(path, rewritten)?;
    Ok(true)
}
