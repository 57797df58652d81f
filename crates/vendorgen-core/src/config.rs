//! Generator configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::library::Library;
use crate::platform::PlatformGroup;

/// Whether revisions come from the ledger or from upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Check out exactly the revisions in the ledger.
    #[default]
    Replay,
    /// Follow each library's revision policy and rewrite the ledger.
    Refresh,
}

/// Where a Homebrew installation lives on Apple silicon.
pub const HOMEBREW_PREFIX: &str = "/opt/homebrew";

/// Immutable settings of one generator run. Relative paths are resolved
/// against `root`.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub root: PathBuf,
    /// Go package directory receiving the wrappers.
    pub package: String,
    /// Checked-in templates (`*.go.in`, release notes).
    pub templates_dir: PathBuf,
    /// Checked-in config header sources, one directory per library.
    pub headers_dir: PathBuf,
    pub ledger_file: PathBuf,
    /// Release notes template and output.
    pub release_notes: Option<(PathBuf, PathBuf)>,
    pub mode: RunMode,
    /// Run `go build` over the result.
    pub validate: bool,
    /// Install prefixes handed to dependent configure steps.
    pub dependency_prefixes: BTreeMap<Library, PathBuf>,
    /// Platform group to generate for; the host's when unset.
    pub platform: Option<PlatformGroup>,
    /// Kill native tools running longer than this.
    pub timeout_secs: Option<u64>,
}

impl GeneratorConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            package: "libtor".to_string(),
            templates_dir: PathBuf::from("build"),
            headers_dir: PathBuf::from("config"),
            ledger_file: PathBuf::from("lock.json"),
            release_notes: Some((PathBuf::from("build/README.md"), PathBuf::from("README.md"))),
            mode: RunMode::Replay,
            validate: true,
            dependency_prefixes: BTreeMap::new(),
            platform: None,
            timeout_secs: None,
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_platform(mut self, group: PlatformGroup) -> Self {
        self.platform = Some(group);
        self
    }

    pub fn with_ledger_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_file = path.into();
        self
    }

    pub fn with_dependency_prefix(mut self, library: Library, prefix: impl Into<PathBuf>) -> Self {
        self.dependency_prefixes.insert(library, prefix.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Fill in dependency prefixes from a Homebrew installation at `base`,
    /// keeping any prefix that was set explicitly.
    pub fn with_homebrew_prefixes(mut self, base: &Path) -> Self {
        for (library, prefix) in homebrew_prefixes(base) {
            self.dependency_prefixes.entry(library).or_insert(prefix);
        }
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn package_dir(&self) -> PathBuf {
        self.root.join(&self.package)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(&self.ledger_file)
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.resolve(&self.templates_dir).join(name)
    }

    pub fn header_source_dir(&self, library: Library) -> PathBuf {
        self.resolve(&self.headers_dir).join(library.name())
    }

    /// Directory holding a group's pruned source trees.
    pub fn group_dir(&self, group: &PlatformGroup) -> PathBuf {
        self.root.join(group.name())
    }

    pub fn tree_dir(&self, group: &PlatformGroup, library: Library) -> PathBuf {
        self.group_dir(group).join(library.name())
    }

    pub fn release_notes_paths(&self) -> Option<(PathBuf, PathBuf)> {
        self.release_notes
            .as_ref()
            .map(|(template, output)| (self.resolve(template), self.resolve(output)))
    }
}

/// Prefixes of a Homebrew installation at `base`, if there is one.
pub fn homebrew_prefixes(base: &Path) -> BTreeMap<Library, PathBuf> {
    let mut prefixes = BTreeMap::new();
    if base.is_dir() {
        prefixes.insert(Library::Libevent, base.join(""));
        prefixes.insert(Library::Openssl, base.join("opt").join("openssl@1.1").join(""));
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = GeneratorConfig::new("/work");
        assert_eq!(config.mode, RunMode::Replay);
        assert!(config.validate);
        assert_eq!(config.package_dir(), PathBuf::from("/work/libtor"));
        assert_eq!(config.ledger_path(), PathBuf::from("/work/lock.json"));
        assert_eq!(
            config.template_path("libtor_external.go.in"),
            PathBuf::from("/work/build/libtor_external.go.in")
        );
        assert_eq!(
            config.header_source_dir(Library::Libevent),
            PathBuf::from("/work/config/libevent")
        );
        assert_eq!(
            config.tree_dir(&PlatformGroup::linux(), Library::Tor),
            PathBuf::from("/work/linux/tor")
        );
        assert_eq!(
            config.release_notes_paths(),
            Some((
                PathBuf::from("/work/build/README.md"),
                PathBuf::from("/work/README.md")
            ))
        );
    }

    #[test]
    fn test_absolute_ledger_path_wins() {
        let config = GeneratorConfig::new("/work").with_ledger_file("/etc/vendorgen/lock.json");
        assert_eq!(config.ledger_path(), PathBuf::from("/etc/vendorgen/lock.json"));
    }

    #[test]
    fn test_homebrew_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        let prefixes = homebrew_prefixes(dir.path());
        assert_eq!(
            prefixes[&Library::Openssl],
            dir.path().join("opt/openssl@1.1/")
        );
        assert!(prefixes[&Library::Libevent]
            .to_string_lossy()
            .ends_with('/'));
        assert!(homebrew_prefixes(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn test_explicit_prefix_survives_detection() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::new("/work")
            .with_dependency_prefix(Library::Openssl, "/usr/local/ssl")
            .with_homebrew_prefixes(dir.path());
        assert_eq!(
            config.dependency_prefixes[&Library::Openssl],
            PathBuf::from("/usr/local/ssl")
        );
        assert!(config.dependency_prefixes.contains_key(&Library::Libevent));
    }
}
