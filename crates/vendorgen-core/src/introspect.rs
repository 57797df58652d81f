//! Build introspection: which native sources make up a library's default
//! build, and which version the checked out tree carries.
//!
//! Two discovery strategies exist. [`StaticEnumeration`] lists source files
//! on disk and suits libraries whose build compiles everything at the top of
//! the tree. [`DryRunScrape`] configures the library with its own tooling,
//! asks `make` what it would run, and scrapes compile targets out of that log
//! with a per-library pattern.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};
use vendorgen_native::{CommandRunner, Invocation};

use crate::error::{Result, VendorError};
use crate::library::Library;
use crate::platform::ArchVariant;

/// Path segments that never belong to the library proper.
const NON_LIBRARY_SEGMENTS: &[&str] = &[
    "test", "tests", "tool", "tools", "fuzz", "apps", "sample", "samples", "example", "examples",
];

/// One native source file, relative to the library root, without extension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CompilationUnit {
    /// Path as discovered, e.g. `src/core/or/relay`.
    pub path: String,

    /// Marker suffix when the unit has separate 64-bit and 32-bit sources.
    pub split_marker: Option<&'static str>,
}

/// A concrete source to compile for a unit, optionally pinned to a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSource {
    pub variant: Option<ArchVariant>,
    /// Path of the source to include, without extension.
    pub path: String,
}

impl CompilationUnit {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            split_marker: None,
        }
    }

    /// The sources this unit compiles from. Split units yield the discovered
    /// path for [`ArchVariant::Wide`] and the marker-stripped path for
    /// [`ArchVariant::Narrow`].
    pub fn sources(&self) -> Vec<UnitSource> {
        match self.split_marker {
            None => vec![UnitSource {
                variant: None,
                path: self.path.clone(),
            }],
            Some(marker) => ArchVariant::ALL
                .iter()
                .map(|&variant| UnitSource {
                    variant: Some(variant),
                    path: match variant {
                        ArchVariant::Wide => self.path.clone(),
                        ArchVariant::Narrow => self.path.replace(marker, ""),
                    },
                })
                .collect(),
        }
    }
}

/// How compile targets are pulled out of a dry-run log.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    /// Regex whose first capture group is the unit path without extension.
    pub pattern: &'static str,

    /// Units starting with any of these are dropped.
    pub exclude_prefixes: &'static [&'static str],

    /// Units ending with any of these are dropped (entry points).
    pub exclude_suffixes: &'static [&'static str],

    /// Units ending with this marker get a 64/32-bit split.
    pub split_marker: Option<&'static str>,
}

/// Scrape `log` for compilation units.
///
/// Duplicates collapse into one unit and the result is sorted, so the same
/// log always yields the same list. Finding nothing is an error: a library
/// without sources would only surface much later as a link failure.
pub fn extract_units(
    library: &str,
    log: &str,
    rules: &ExtractionRules,
) -> Result<Vec<CompilationUnit>> {
    let re = Regex::new(rules.pattern).map_err(|e| {
        VendorError::introspection(library, format!("invalid unit pattern: {e}"))
    })?;

    let mut matched = 0usize;
    let mut paths = BTreeSet::new();
    for caps in re.captures_iter(log) {
        let Some(path) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        matched += 1;
        if is_excluded(path, rules) {
            continue;
        }
        paths.insert(path.to_string());
    }
    debug!(library, matched, kept = paths.len(), "Scraped dry-run log");

    if paths.is_empty() {
        return Err(VendorError::introspection(
            library,
            format!(
                "pattern `{}` matched {matched} target(s) in the dry-run log but none belong to the library",
                rules.pattern
            ),
        ));
    }

    Ok(paths
        .into_iter()
        .map(|path| CompilationUnit {
            split_marker: rules.split_marker.filter(|m| path.ends_with(m)),
            path,
        })
        .collect())
}

fn is_excluded(path: &str, rules: &ExtractionRules) -> bool {
    path.split('/').any(|seg| NON_LIBRARY_SEGMENTS.contains(&seg))
        || rules.exclude_prefixes.iter().any(|p| path.starts_with(p))
        || rules.exclude_suffixes.iter().any(|s| path.ends_with(s))
}

/// Inputs shared by every discovery strategy.
pub struct DiscoveryContext<'a> {
    pub library: &'a str,
    pub workdir: &'a Path,
    pub runner: &'a dyn CommandRunner,
    /// Install prefixes of already handled libraries, for configure flags.
    pub dependency_prefixes: &'a BTreeMap<Library, PathBuf>,
}

/// A way of discovering a library's compilation units.
#[async_trait]
pub trait UnitDiscovery: Send + Sync {
    /// Bring the tree into an introspectable state and list its units.
    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<Vec<CompilationUnit>>;
}

/// Every top-level file with the source extension is a unit.
#[derive(Debug, Clone)]
pub struct StaticEnumeration {
    pub extension: &'static str,
    /// Stems of top-level programs shipped next to the library sources.
    pub exclude_stems: &'static [&'static str],
}

#[async_trait]
impl UnitDiscovery for StaticEnumeration {
    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<Vec<CompilationUnit>> {
        let read_err = |e: std::io::Error| {
            VendorError::introspection(
                ctx.library,
                format!("cannot list {}: {e}", ctx.workdir.display()),
            )
        };

        let mut stems = BTreeSet::new();
        for entry in std::fs::read_dir(ctx.workdir).map_err(read_err)? {
            let path = entry.map_err(read_err)?.path();
            if !path.is_file() || path.extension().map_or(true, |e| e != self.extension) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !self.exclude_stems.contains(&stem) {
                    stems.insert(stem.to_string());
                }
            }
        }

        if stems.is_empty() {
            return Err(VendorError::introspection(
                ctx.library,
                format!("no .{} sources in {}", self.extension, ctx.workdir.display()),
            ));
        }
        info!(library = ctx.library, units = stems.len(), "Enumerated sources");
        Ok(stems.into_iter().map(CompilationUnit::new).collect())
    }
}

/// A fixed command line run inside the library tree.
#[derive(Debug, Clone)]
pub struct Step {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl Step {
    pub const fn new(program: &'static str, args: &'static [&'static str]) -> Self {
        Self { program, args }
    }

    fn invocation(&self, workdir: &Path) -> Invocation {
        Invocation::new(self.program)
            .args(self.args.iter().copied())
            .current_dir(workdir)
    }
}

/// Configure with the library's own tooling, then scrape `make --dry-run`.
#[derive(Debug, Clone)]
pub struct DryRunScrape {
    /// Steps producing a configure script (e.g. `./autogen.sh`).
    pub bootstrap: Vec<Step>,

    /// The configure step, with portability-preserving flags.
    pub configure: Step,

    /// `--with-<dep>-dir` style flags appended when a prefix is known.
    pub dependency_flags: &'static [(Library, &'static str)],

    /// Non-executing build driver invocation.
    pub dry_run: Step,

    pub rules: ExtractionRules,
}

impl DryRunScrape {
    /// The configure invocation including dependency prefix flags.
    pub fn configure_invocation(&self, ctx: &DiscoveryContext<'_>) -> Invocation {
        let mut inv = self.configure.invocation(ctx.workdir);
        for (dep, flag) in self.dependency_flags {
            if let Some(prefix) = ctx.dependency_prefixes.get(dep) {
                inv = inv.arg(format!("{flag}={}", prefix.display()));
            }
        }
        inv
    }

    async fn configure_step(&self, ctx: &DiscoveryContext<'_>, inv: &Invocation) -> Result<()> {
        info!(library = ctx.library, command = %inv, "Configuring");
        ctx.runner
            .run_checked(inv)
            .await
            .map_err(|e| VendorError::configuration(ctx.library, e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl UnitDiscovery for DryRunScrape {
    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<Vec<CompilationUnit>> {
        for step in &self.bootstrap {
            self.configure_step(ctx, &step.invocation(ctx.workdir)).await?;
        }
        self.configure_step(ctx, &self.configure_invocation(ctx)).await?;

        let dry_run = self.dry_run.invocation(ctx.workdir);
        info!(library = ctx.library, command = %dry_run, "Collecting build plan");
        let out = ctx
            .runner
            .run_checked(&dry_run)
            .await
            .map_err(|e| VendorError::introspection(ctx.library, e.to_string()))?;

        let units = extract_units(ctx.library, &out.combined(), &self.rules)?;
        info!(library = ctx.library, units = units.len(), "Scraped compilation units");
        Ok(units)
    }
}

/// Version metadata exposed by a configured tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// Human readable version, e.g. `2.1.12-stable`.
    pub version: String,

    /// Numeric encoding, e.g. `0x02010c00`, when the library defines one.
    pub numeric: Option<String>,

    /// Build date stamped into generated headers.
    pub date: Option<String>,
}

/// Where a library's version comes from.
#[derive(Debug, Clone)]
pub enum VersionSource {
    /// Pattern matches against a file in the tree; capture group 1 is used.
    File {
        path: &'static str,
        version: &'static str,
        numeric: Option<&'static str>,
    },

    /// Derived from the stable branch name, e.g. `OpenSSL_1_1_1-stable`
    /// becomes `1.1.1-stable`.
    StableBranch { prefix: &'static str },
}

/// What acquisition learned about the checked out tree.
#[derive(Debug, Clone, Default)]
pub struct TreeFacts<'a> {
    pub stable_branch: Option<&'a str>,
    pub commit_date: Option<&'a str>,
}

impl VersionSource {
    /// Resolve the version of the tree at `workdir`. No match is fatal.
    /// The commit date, when acquisition recorded one, is carried along.
    pub fn resolve(
        &self,
        library: &str,
        workdir: &Path,
        facts: &TreeFacts<'_>,
    ) -> Result<VersionInfo> {
        match self {
            VersionSource::File {
                path,
                version,
                numeric,
            } => {
                let file = workdir.join(path);
                let text = std::fs::read_to_string(&file).map_err(|e| {
                    VendorError::configuration(library, format!("cannot read {path}: {e}"))
                })?;
                let version = capture(library, path, version, &text)?;
                let numeric = numeric
                    .map(|pattern| capture(library, path, pattern, &text))
                    .transpose()?;
                Ok(VersionInfo {
                    version,
                    numeric,
                    date: facts.commit_date.map(str::to_string),
                })
            }
            VersionSource::StableBranch { prefix } => {
                let branch = facts.stable_branch.ok_or_else(|| VendorError::NoStableChannel {
                    library: library.to_string(),
                })?;
                let dotted = branch.replace('_', ".");
                let dotted_prefix = prefix.replace('_', ".");
                let version = dotted
                    .strip_prefix(&dotted_prefix)
                    .unwrap_or(&dotted)
                    .to_string();
                Ok(VersionInfo {
                    version,
                    numeric: None,
                    date: facts.commit_date.map(str::to_string),
                })
            }
        }
    }
}

fn capture(library: &str, file: &str, pattern: &str, text: &str) -> Result<String> {
    let re = Regex::new(pattern).map_err(|e| {
        VendorError::configuration(library, format!("invalid version pattern: {e}"))
    })?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            VendorError::configuration(
                library,
                format!("version pattern `{pattern}` found no match in {file}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::LibrarySpec;
    use vendorgen_native::fakes::ScriptedRunner;
    use vendorgen_native::CommandOutput;

    fn tor_rules() -> ExtractionRules {
        match LibrarySpec::for_library(Library::Tor).discovery_rules() {
            Some(rules) => rules.clone(),
            None => panic!("tor scrapes a dry-run log"),
        }
    }

    const OPENSSL_LOG: &str = "\
gcc  -I. -Iinclude -fPIC -pthread -m64 -Wa,--noexecstack -Wall -O3 -DOPENSSL_USE_NODELETE -DL_ENDIAN -MMD -MF apps/app_rand.d.tmp -MT apps/app_rand.o -c -o apps/app_rand.o apps/app_rand.c
gcc  -I. -Iinclude -fPIC -pthread -m64 -Wall -O3 -MMD -MF crypto/aes/aes_core.d.tmp -MT crypto/aes/aes_core.o -c -o crypto/aes/aes_core.o crypto/aes/aes_core.c
gcc  -I. -Iinclude -fPIC -pthread -m64 -Wall -O3 -MMD -MF crypto/aes/aes_cbc.d.tmp -MT crypto/aes/aes_cbc.o -c -o crypto/aes/aes_cbc.o crypto/aes/aes_cbc.c
gcc  -I. -Iinclude -fPIC -pthread -m64 -Wall -O3 -MMD -MF ssl/ssl_lib.d.tmp -MT ssl/ssl_lib.o -c -o ssl/ssl_lib.o ssl/ssl_lib.c
gcc  -I. -Iinclude -Wall -O3 -MMD -MF fuzz/asn1.d.tmp -MT fuzz/asn1.o -c -o fuzz/asn1.o fuzz/asn1.c
gcc  -I. -Iinclude -Wall -O3 -MMD -MF test/bntest.d.tmp -MT test/bntest.o -c -o test/bntest.o test/bntest.c
gcc  -I. -Iinclude -Wall -O3 -MMD -MF ssl/ssl_lib.d.tmp -MT ssl/ssl_lib.o -c -o ssl/ssl_lib.o ssl/ssl_lib.c
";

    #[test]
    fn test_openssl_extraction_excludes_apps_fuzz_test() {
        let rules = LibrarySpec::for_library(Library::Openssl)
            .discovery_rules()
            .cloned()
            .unwrap();
        let units = extract_units("openssl", OPENSSL_LOG, &rules).unwrap();
        let paths: Vec<_> = units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["crypto/aes/aes_cbc", "crypto/aes/aes_core", "ssl/ssl_lib"]
        );
    }

    #[test]
    fn test_libevent_extraction_reads_lo_targets() {
        let rules = LibrarySpec::for_library(Library::Libevent)
            .discovery_rules()
            .cloned()
            .unwrap();
        let log = "\
make  all-am
make[1]: Entering directory '/work/linux/libevent'
echo ' buffer.lo; bufferevent.lo; event.lo; evthread.lo; test/regress.lo; epoll.lo;' > /dev/null
/bin/bash ./libtool  --tag=CC   --mode=compile gcc -c -o buffer.lo buffer.c
";
        let units = extract_units("libevent", log, &rules).unwrap();
        let paths: Vec<_> = units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["buffer", "bufferevent", "epoll", "event", "evthread"]
        );
    }

    #[test]
    fn test_tor_extraction_drops_tests_tools_and_main() {
        let log = "\
gcc -DHAVE_CONFIG_H -I. -c -o src/app/main/tor_main.o src/app/main/tor_main.c
gcc -DHAVE_CONFIG_H -I. -c -o src/core/or/relay.o src/core/or/relay.c
gcc -DHAVE_CONFIG_H -I. -c -o src/lib/log/log.o src/lib/log/log.c
gcc -DHAVE_CONFIG_H -I. -c -o src/test/test_util.o src/test/test_util.c
gcc -DHAVE_CONFIG_H -I. -c -o src/tools/tor-gencert.o src/tools/tor-gencert.c
gcc -DHAVE_CONFIG_H -I. -c -o src/ext/tinytest.o src/ext/tinytest.c
";
        let units = extract_units("tor", log, &tor_rules()).unwrap();
        let paths: Vec<_> = units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["src/core/or/relay", "src/lib/log/log"]);
    }

    #[test]
    fn test_extraction_counts_distinct_tokens() {
        let mut log = String::new();
        for i in 0..25 {
            log.push_str(&format!("cc -c src/lib/m{i}/u{i}.c\n"));
            log.push_str(&format!("cc -c src/lib/m{i}/u{i}.c\n"));
        }
        log.push_str("cc -c src/test/t.c\ncc -c src/tools/x.c\ncc -c src/app/main/tor_main.c\n");
        let units = extract_units("tor", &log, &tor_rules()).unwrap();
        assert_eq!(units.len(), 25);
    }

    #[test]
    fn test_zero_matches_is_introspection_error() {
        let err = extract_units("tor", "make: Nothing to be done for 'all'.", &tor_rules())
            .unwrap_err();
        assert!(matches!(err, VendorError::Introspection { ref library, .. } if library == "tor"));
    }

    #[test]
    fn test_only_excluded_matches_is_introspection_error() {
        let err = extract_units("tor", "cc -c src/test/test.c\n", &tor_rules()).unwrap_err();
        assert!(err.to_string().contains("matched 1 target(s)"));
    }

    #[test]
    fn test_split_unit_sources() {
        let log = "cc -c src/ext/curve25519_donna/curve25519-donna-c64.c\n";
        let units = extract_units("tor", log, &tor_rules()).unwrap();
        assert_eq!(units.len(), 1);
        let sources = units[0].sources();
        assert_eq!(
            sources,
            vec![
                UnitSource {
                    variant: Some(ArchVariant::Wide),
                    path: "src/ext/curve25519_donna/curve25519-donna-c64".to_string(),
                },
                UnitSource {
                    variant: Some(ArchVariant::Narrow),
                    path: "src/ext/curve25519_donna/curve25519-donna".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_plain_unit_has_one_source() {
        let sources = CompilationUnit::new("adler32").sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].variant, None);
    }

    #[tokio::test]
    async fn test_static_enumeration_lists_top_level_sources() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["adler32.c", "crc32.c", "zlib.h", "example.c"] {
            std::fs::write(dir.path().join(f), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("test")).unwrap();
        std::fs::write(dir.path().join("test/minigzip.c"), "").unwrap();

        let runner = ScriptedRunner::new().strict();
        let prefixes = BTreeMap::new();
        let ctx = DiscoveryContext {
            library: "zlib",
            workdir: dir.path(),
            runner: &runner,
            dependency_prefixes: &prefixes,
        };
        let strategy = StaticEnumeration {
            extension: "c",
            exclude_stems: &["example"],
        };
        let units = strategy.discover(&ctx).await.unwrap();
        let paths: Vec<_> = units.iter().map(|u| u.path.as_str()).collect();
        assert_eq!(paths, vec!["adler32", "crc32"]);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_static_enumeration_empty_tree_fails() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new();
        let prefixes = BTreeMap::new();
        let ctx = DiscoveryContext {
            library: "zlib",
            workdir: dir.path(),
            runner: &runner,
            dependency_prefixes: &prefixes,
        };
        let strategy = StaticEnumeration {
            extension: "c",
            exclude_stems: &[],
        };
        assert!(matches!(
            strategy.discover(&ctx).await,
            Err(VendorError::Introspection { .. })
        ));
    }

    fn scrape() -> DryRunScrape {
        DryRunScrape {
            bootstrap: vec![Step::new("./autogen.sh", &[])],
            configure: Step::new("./configure", &["--disable-asciidoc"]),
            dependency_flags: &[
                (Library::Libevent, "--with-libevent-dir"),
                (Library::Openssl, "--with-openssl-dir"),
            ],
            dry_run: Step::new("make", &["--dry-run"]),
            rules: tor_rules(),
        }
    }

    #[tokio::test]
    async fn test_dry_run_scrape_runs_steps_in_order() {
        let runner = ScriptedRunner::new().respond(
            "make",
            &["--dry-run"],
            CommandOutput::ok("cc -c src/core/or/relay.c\ncc -c src/lib/log/log.c\n"),
        );
        let mut prefixes = BTreeMap::new();
        prefixes.insert(Library::Openssl, PathBuf::from("/opt/homebrew/opt/openssl@1.1/"));
        let ctx = DiscoveryContext {
            library: "tor",
            workdir: Path::new("/work/linux/tor"),
            runner: &runner,
            dependency_prefixes: &prefixes,
        };

        let units = scrape().discover(&ctx).await.unwrap();
        assert_eq!(units.len(), 2);

        let calls = runner.calls();
        let programs: Vec<_> = calls.iter().map(|c| c.program.as_str()).collect();
        assert_eq!(programs, vec!["./autogen.sh", "./configure", "make"]);
        assert_eq!(
            calls[1].args,
            vec![
                "--disable-asciidoc",
                "--with-openssl-dir=/opt/homebrew/opt/openssl@1.1/"
            ]
        );
        assert!(calls
            .iter()
            .all(|c| c.cwd.as_deref() == Some(Path::new("/work/linux/tor"))));
    }

    #[tokio::test]
    async fn test_configure_failure_is_configuration_error_with_output() {
        let runner = ScriptedRunner::new().respond(
            "./configure",
            &[],
            CommandOutput::failed(1, "configure: error: libevent not found"),
        );
        let prefixes = BTreeMap::new();
        let ctx = DiscoveryContext {
            library: "tor",
            workdir: Path::new("/work/linux/tor"),
            runner: &runner,
            dependency_prefixes: &prefixes,
        };
        let err = scrape().discover(&ctx).await.unwrap_err();
        assert!(matches!(err, VendorError::Configuration { .. }));
        assert!(err.to_string().contains("configure: error: libevent not found"));
        assert_eq!(runner.count("make", &[]), 0);
    }

    #[tokio::test]
    async fn test_dry_run_failure_is_introspection_error() {
        let runner = ScriptedRunner::new().respond(
            "make",
            &["--dry-run"],
            CommandOutput::failed(2, "make: *** No targets specified"),
        );
        let prefixes = BTreeMap::new();
        let ctx = DiscoveryContext {
            library: "tor",
            workdir: Path::new("/work/linux/tor"),
            runner: &runner,
            dependency_prefixes: &prefixes,
        };
        let err = scrape().discover(&ctx).await.unwrap_err();
        assert!(matches!(err, VendorError::Introspection { .. }));
        assert!(err.to_string().contains("No targets specified"));
    }

    #[test]
    fn test_version_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("configure.ac"),
            "AC_INIT(libevent,2.1.12-stable)\nAC_DEFINE(NUMERIC_VERSION, 0x02010c00, [Numeric representation of the version])\n",
        )
        .unwrap();
        let source = VersionSource::File {
            path: "configure.ac",
            version: r"AC_INIT\(libevent,(.+)\)",
            numeric: Some(r"AC_DEFINE\(NUMERIC_VERSION, (0x[0-9a-f]{8}),"),
        };
        let info = source
            .resolve("libevent", dir.path(), &TreeFacts::default())
            .unwrap();
        assert_eq!(info.version, "2.1.12-stable");
        assert_eq!(info.numeric.as_deref(), Some("0x02010c00"));
    }

    #[test]
    fn test_version_no_match_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zlib.h"), "/* nothing here */\n").unwrap();
        let source = VersionSource::File {
            path: "zlib.h",
            version: r#"define ZLIB_VERSION "(.+)""#,
            numeric: None,
        };
        let err = source
            .resolve("zlib", dir.path(), &TreeFacts::default())
            .unwrap_err();
        assert!(matches!(err, VendorError::Configuration { .. }));
        assert!(err.to_string().contains("found no match in zlib.h"));
    }

    #[test]
    fn test_version_from_stable_branch() {
        let source = VersionSource::StableBranch { prefix: "OpenSSL_" };
        let facts = TreeFacts {
            stable_branch: Some("OpenSSL_1_1_1-stable"),
            commit_date: None,
        };
        let info = source
            .resolve("openssl", Path::new("."), &facts)
            .unwrap();
        assert_eq!(info.version, "1.1.1-stable");

        let err = source
            .resolve("openssl", Path::new("."), &TreeFacts::default())
            .unwrap_err();
        assert!(matches!(err, VendorError::NoStableChannel { .. }));
    }

    #[test]
    fn test_version_carries_commit_date() {
        let source = VersionSource::StableBranch { prefix: "OpenSSL_" };
        let facts = TreeFacts {
            stable_branch: Some("OpenSSL_1_1_1-stable"),
            commit_date: Some("Tue Sep 11 14:48:05 2018 +0100"),
        };
        let info = source.resolve("openssl", Path::new("."), &facts).unwrap();
        assert_eq!(info.date.as_deref(), Some("Tue Sep 11 14:48:05 2018 +0100"));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zlib.h"), "#define ZLIB_VERSION \"1.2.11\"\n").unwrap();
        let source = VersionSource::File {
            path: "zlib.h",
            version: r#"define ZLIB_VERSION "(.+)""#,
            numeric: None,
        };
        let info = source
            .resolve("zlib", dir.path(), &TreeFacts::default())
            .unwrap();
        assert_eq!(info.version, "1.2.11");
        assert!(info.date.is_none());
    }
}
