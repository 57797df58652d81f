//! Run orchestration.
//!
//! Libraries are processed one at a time in dependency order. Each one is
//! acquired, configured and introspected, pruned, wrapped and given its
//! config headers. The first error aborts the run. In refresh mode the release
//! notes and the ledger are written last, once everything else, including the
//! validation build, has succeeded.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;
use vendorgen_native::{CommandRunner, Invocation};

use crate::acquire::SourceAcquirer;
use crate::codegen;
use crate::config::{GeneratorConfig, RunMode};
use crate::error::{Result, Stage, VendorError};
use crate::headers::{self, ConfigArtifact};
use crate::introspect::{CompilationUnit, DiscoveryContext, TreeFacts, VersionInfo};
use crate::ledger::{LedgerBuilder, VersionLedger};
use crate::library::{Library, LibrarySpec};
use crate::platform::PlatformGroup;
use crate::prune::{self, PruneReport};
use crate::template::{self, TemplateVars};

/// Checked-in Go sources copied into the output: (template, destination
/// relative to the root, destination inside the package directory).
const STATIC_SOURCES: &[(&str, &str, bool)] = &[
    ("libtor_preamble.go.in", "libtor_preamble.go", true),
    ("libtor_internal.go.in", "libtor.go", true),
    ("libtor_external.go.in", "libtor.go", false),
];

/// What processing one library produced.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryOutcome {
    pub library: Library,
    pub revision: String,
    pub version: VersionInfo,
    pub units: Vec<CompilationUnit>,
    /// Wrapper and preamble file names inside the package directory.
    pub wrappers: Vec<String>,
    pub headers: Vec<ConfigArtifact>,
    pub pruned: PruneReport,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub group: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub libraries: Vec<LibraryOutcome>,
    /// SHA-256 over every generated file, in path order.
    pub output_digest: String,
    pub validated: bool,
    pub ledger_written: bool,
}

impl RunReport {
    pub fn outcome(&self, library: Library) -> Option<&LibraryOutcome> {
        self.libraries.iter().find(|o| o.library == library)
    }

    pub fn wrapper_count(&self) -> usize {
        self.libraries.iter().map(|o| o.wrappers.len()).sum()
    }
}

/// Drives a full generator run.
pub struct Orchestrator<'a> {
    config: GeneratorConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: GeneratorConfig, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        let started_at = Utc::now();
        let group = match &self.config.platform {
            Some(group) => group.clone(),
            None => PlatformGroup::host()?,
        };

        let pins = match self.config.mode {
            RunMode::Replay => Some(VersionLedger::load(&self.config.ledger_path())?),
            RunMode::Refresh => None,
        };
        info!(mode = ?self.config.mode, group = group.name(), "Starting generator run");

        self.clean_outputs(&group)?;

        let mut generated = BTreeSet::new();
        let mut ledger = LedgerBuilder::new();
        let mut libraries = Vec::new();
        for library in Library::ALL {
            let spec = library.spec();
            let pin = pins.as_ref().map(|l| l.revision(library));
            let outcome = self.process_library(&spec, &group, pin).await?;

            ledger.record(library, &outcome.revision);
            generated.extend(
                outcome
                    .wrappers
                    .iter()
                    .map(|w| PathBuf::from(&self.config.package).join(w)),
            );
            generated.extend(outcome.headers.iter().map(|h| h.path.clone()));
            libraries.push(outcome);
        }

        generated.extend(self.copy_static_sources()?);

        let validated = if self.config.validate {
            self.validate().await?;
            true
        } else {
            info!(stage = %Stage::Validate, "Skipping validation build");
            false
        };

        // Everything fallible runs before the ledger is touched.
        let ledger = match self.config.mode {
            RunMode::Refresh => Some(ledger.build()?),
            RunMode::Replay => None,
        };
        let notes = match self.config.mode {
            RunMode::Refresh => self.render_release_notes(&libraries)?,
            RunMode::Replay => None,
        };
        let output_digest = output_digest(&self.config.root, &generated)?;

        if let Some((path, contents)) = notes {
            std::fs::write(&path, contents).map_err(|e| VendorError::write(&path, e))?;
            info!(path = %path.display(), "Rendered release notes");
        }
        let ledger_written = match ledger {
            Some(ledger) => {
                ledger.save(&self.config.ledger_path())?;
                true
            }
            None => false,
        };

        let report = RunReport {
            mode: self.config.mode,
            group: group.name().to_string(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            libraries,
            output_digest,
            validated,
            ledger_written,
        };
        info!(
            wrappers = report.wrapper_count(),
            digest = %report.output_digest,
            duration_ms = report.duration_ms,
            "Generator run complete"
        );
        Ok(report)
    }

    /// Run every stage for one library.
    pub async fn process_library(
        &self,
        spec: &LibrarySpec,
        group: &PlatformGroup,
        pin: Option<&str>,
    ) -> Result<LibraryOutcome> {
        let library = spec.name();
        let workdir = self.config.tree_dir(group, spec.library);

        info!(library, stage = %Stage::Acquire, pin = pin.unwrap_or("-"), "Entering stage");
        let acquired = SourceAcquirer::new(self.runner)
            .acquire(spec, &workdir, pin)
            .await?;

        info!(library, stage = %Stage::Introspect, "Entering stage");
        let ctx = DiscoveryContext {
            library,
            workdir: &workdir,
            runner: self.runner,
            dependency_prefixes: &self.config.dependency_prefixes,
        };
        let units = spec.discovery.strategy().discover(&ctx).await?;
        let facts = TreeFacts {
            stable_branch: acquired.stable_branch.as_deref(),
            commit_date: acquired.commit_date.as_deref(),
        };
        let version = spec.version.resolve(library, &workdir, &facts)?;

        info!(library, stage = %Stage::Prune, "Entering stage");
        let pruned = prune::prune(library, &workdir, &spec.prune)?;
        ensure_sources_present(library, &workdir, &units)?;

        info!(library, stage = %Stage::Generate, units = units.len(), "Entering stage");
        let files = codegen::generate_library(spec, group, &self.config.package, &units)?;
        codegen::write_all(&self.config.package_dir(), &files)?;
        let headers = if spec.headers.is_empty() {
            Vec::new()
        } else {
            headers::materialize(
                library,
                &spec.headers,
                &self.config.header_source_dir(spec.library),
                &self.config.root,
                &version,
            )?
        };

        info!(
            library,
            version = %version.version,
            revision = %acquired.revision,
            wrappers = files.len(),
            headers = headers.len(),
            "Library done"
        );
        Ok(LibraryOutcome {
            library: spec.library,
            revision: acquired.revision,
            version,
            units,
            wrappers: files.into_iter().map(|f| f.file_name).collect(),
            headers,
            pruned,
        })
    }

    /// Refresh clears the whole package; replay only this group's wrappers.
    /// The group's source trees are always rebuilt from scratch.
    fn clean_outputs(&self, group: &PlatformGroup) -> Result<()> {
        let package_dir = self.config.package_dir();
        if package_dir.exists() {
            match self.config.mode {
                RunMode::Refresh => std::fs::remove_dir_all(&package_dir)
                    .map_err(|e| VendorError::write(&package_dir, e))?,
                RunMode::Replay => remove_group_files(&package_dir, group)?,
            }
        }
        let group_dir = self.config.group_dir(group);
        if group_dir.exists() {
            std::fs::remove_dir_all(&group_dir).map_err(|e| VendorError::write(&group_dir, e))?;
        }
        std::fs::create_dir_all(&package_dir).map_err(|e| VendorError::write(&package_dir, e))
    }

    fn copy_static_sources(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (template, name, in_package) in STATIC_SOURCES {
            let source = self.config.template_path(template);
            if !source.is_file() {
                return Err(VendorError::Template {
                    name: source.display().to_string(),
                    detail: "static source is missing".to_string(),
                });
            }
            let rel = if *in_package {
                PathBuf::from(&self.config.package).join(name)
            } else {
                PathBuf::from(name)
            };
            let dest = self.config.root.join(&rel);
            std::fs::copy(&source, &dest).map_err(|e| VendorError::write(&dest, e))?;
            written.push(rel);
        }
        Ok(written)
    }

    async fn validate(&self) -> Result<()> {
        let inv = Invocation::new("go")
            .args(["build", "."])
            .current_dir(&self.config.root);
        info!(stage = %Stage::Validate, command = %inv, "Entering stage");
        match self.runner.run(&inv).await {
            Ok(out) if out.success() => Ok(()),
            Ok(out) => Err(VendorError::ValidationBuild {
                output: out.combined(),
            }),
            Err(e) => Err(VendorError::ValidationBuild {
                output: e.to_string(),
            }),
        }
    }

    /// Release notes rendered from the ledger revisions, with their output
    /// path. Nothing is written here.
    fn render_release_notes(
        &self,
        libraries: &[LibraryOutcome],
    ) -> Result<Option<(PathBuf, String)>> {
        let Some((template_path, output_path)) = self.config.release_notes_paths() else {
            return Ok(None);
        };
        let name = template_path.display().to_string();
        let source = std::fs::read_to_string(&template_path).map_err(|e| VendorError::Template {
            name: name.clone(),
            detail: format!("cannot read: {e}"),
        })?;

        let mut vars = TemplateVars::new();
        for outcome in libraries {
            let name = outcome.library.name();
            vars.set(format!("{name}Ver"), &outcome.version.version);
            vars.set(format!("{name}Hash"), &outcome.revision);
        }
        let rendered = template::render(&name, &source, &vars)?;
        Ok(Some((output_path, rendered)))
    }
}

fn remove_group_files(package_dir: &Path, group: &PlatformGroup) -> Result<()> {
    let prefix = format!("{}_", group.name());
    let read = std::fs::read_dir(package_dir).map_err(|e| VendorError::write(package_dir, e))?;
    for entry in read {
        let path = entry.map_err(|e| VendorError::write(package_dir, e))?.path();
        let owned = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with(&prefix) && n.ends_with(".go"));
        if owned {
            std::fs::remove_file(&path).map_err(|e| VendorError::write(&path, e))?;
        }
    }
    Ok(())
}

/// Every unit must resolve to a source that survived pruning.
fn ensure_sources_present(library: &str, workdir: &Path, units: &[CompilationUnit]) -> Result<()> {
    for unit in units {
        for source in unit.sources() {
            let file = workdir.join(format!("{}.c", source.path));
            if !file.is_file() {
                return Err(VendorError::introspection(
                    library,
                    format!("unit {} has no source after pruning ({})", unit.path, file.display()),
                ));
            }
        }
    }
    Ok(())
}

/// Hash of the relative paths and contents of `files` under `root`.
pub fn output_digest(root: &Path, files: &BTreeSet<PathBuf>) -> Result<String> {
    let mut hasher = Sha256::new();
    for rel in files {
        let path = root.join(rel);
        let contents = std::fs::read(&path).map_err(|e| VendorError::write(&path, e))?;
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendorgen_native::fakes::ScriptedRunner;

    #[test]
    fn test_digest_depends_on_contents_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.go"), "package a\n").unwrap();
        std::fs::write(dir.path().join("b.go"), "package b\n").unwrap();
        let files: BTreeSet<PathBuf> = ["a.go", "b.go"].into_iter().map(PathBuf::from).collect();

        let first = output_digest(dir.path(), &files).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, output_digest(dir.path(), &files).unwrap());

        std::fs::write(dir.path().join("b.go"), "package c\n").unwrap();
        assert_ne!(first, output_digest(dir.path(), &files).unwrap());
    }

    #[test]
    fn test_remove_group_files_keeps_other_groups() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["linux_zlib_adler32.go", "darwin_zlib_adler32.go", "libtor.go"] {
            std::fs::write(dir.path().join(f), "").unwrap();
        }
        remove_group_files(dir.path(), &PlatformGroup::linux()).unwrap();
        let mut left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["darwin_zlib_adler32.go", "libtor.go"]);
    }

    #[test]
    fn test_static_sources_copied_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let build = dir.path().join("build");
        std::fs::create_dir_all(&build).unwrap();
        std::fs::create_dir_all(dir.path().join("libtor")).unwrap();
        for (template, _, _) in STATIC_SOURCES {
            std::fs::write(build.join(template), b"package libtor // \xff\n").unwrap();
        }

        let runner = ScriptedRunner::new();
        let orchestrator = Orchestrator::new(GeneratorConfig::new(dir.path()), &runner);
        let written = orchestrator.copy_static_sources().unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(
            std::fs::read(dir.path().join("libtor/libtor.go")).unwrap(),
            b"package libtor // \xff\n"
        );
    }

    #[test]
    fn test_missing_source_after_pruning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.c"), "").unwrap();
        let units = vec![CompilationUnit::new("a"), CompilationUnit::new("gone")];
        let err = ensure_sources_present("lib", dir.path(), &units).unwrap_err();
        assert!(err.to_string().contains("unit gone has no source"));
    }
}
