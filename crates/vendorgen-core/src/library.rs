//! The four vendored libraries and their constant configuration.
//!
//! Every stage of the pipeline is driven by a [`LibrarySpec`]; there is no
//! per-library code path anywhere else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::headers::{HeaderEntry, HeaderMode};
use crate::introspect::{
    DryRunScrape, ExtractionRules, StaticEnumeration, Step, UnitDiscovery, VersionSource,
};
use crate::prune::{LevelRules, PruneRules, SourceRewrite};

/// A vendored library. Declaration order is dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Library {
    Zlib,
    Libevent,
    Openssl,
    Tor,
}

impl Library {
    /// All libraries in the order they are processed.
    pub const ALL: [Library; 4] = [
        Library::Zlib,
        Library::Libevent,
        Library::Openssl,
        Library::Tor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Library::Zlib => "zlib",
            Library::Libevent => "libevent",
            Library::Openssl => "openssl",
            Library::Tor => "tor",
        }
    }

    pub fn spec(&self) -> LibrarySpec {
        LibrarySpec::for_library(*self)
    }
}

impl fmt::Display for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Library {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Library::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown library '{s}' (expected zlib, libevent, openssl or tor)")
            })
    }
}

/// Which revision to check out when the ledger has no pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionPolicy {
    /// Whatever the clone checked out.
    DefaultBranch,

    /// A named maintenance branch.
    Branch(&'static str),

    /// The last remote branch matching `pattern` (capture group 1 is the
    /// branch name).
    LatestStable { pattern: &'static str },
}

/// How a library's compilation units are discovered.
#[derive(Debug, Clone)]
pub enum Discovery {
    Static(StaticEnumeration),
    DryRun(DryRunScrape),
}

impl Discovery {
    pub fn strategy(&self) -> &dyn UnitDiscovery {
        match self {
            Discovery::Static(s) => s,
            Discovery::DryRun(s) => s,
        }
    }
}

/// Templates for the generated Go sources of one library.
///
/// Both see `Constraint`, `LegacyConstraint`, `Package` and `Target`; unit
/// templates additionally see `File`.
#[derive(Debug, Clone, Copy)]
pub struct WrapperTemplates {
    pub preamble: &'static str,
    pub unit: &'static str,
}

/// Constant configuration of one library.
#[derive(Debug, Clone)]
pub struct LibrarySpec {
    pub library: Library,
    pub upstream: &'static str,
    pub revision_policy: RevisionPolicy,
    pub discovery: Discovery,
    pub version: VersionSource,
    /// Whether the commit date is stamped into generated headers.
    pub needs_build_date: bool,
    pub prune: PruneRules,
    pub wrapper: WrapperTemplates,
    pub headers: Vec<HeaderEntry>,
}

macro_rules! go_source {
    ($body:literal) => {
        concat!(
            "// Code generated by vendorgen. DO NOT EDIT.\n",
            "\n",
            "//go:build {{.Constraint}}\n",
            "// +build {{.LegacyConstraint}}\n",
            "\n",
            "package {{.Package}}\n",
            "\n",
            "/*\n",
            $body,
            "*/\n",
            "import \"C\"\n"
        )
    };
}

const SOURCE_EXTENSIONS: &[&str] = &["h", "c"];

const LIBEVENT_HEADER_ARCHES: &[&str] = &[
    "", "linux64", "linux32", "android64", "android32", "macos64", "ios64",
];
const OPENSSL_HEADER_ARCHES: &[&str] = &["", "x64", "x86", "macos64", "ios64"];

impl LibrarySpec {
    pub fn name(&self) -> &'static str {
        self.library.name()
    }

    /// Extraction rules, for libraries discovered by scraping a build log.
    pub fn discovery_rules(&self) -> Option<&ExtractionRules> {
        match &self.discovery {
            Discovery::DryRun(scrape) => Some(&scrape.rules),
            Discovery::Static(_) => None,
        }
    }

    pub fn for_library(library: Library) -> Self {
        match library {
            Library::Zlib => Self::zlib(),
            Library::Libevent => Self::libevent(),
            Library::Openssl => Self::openssl(),
            Library::Tor => Self::tor(),
        }
    }

    fn zlib() -> Self {
        Self {
            library: Library::Zlib,
            upstream: "https://github.com/madler/zlib",
            revision_policy: RevisionPolicy::DefaultBranch,
            discovery: Discovery::Static(StaticEnumeration {
                extension: "c",
                exclude_stems: &["example", "minigzip"],
            }),
            version: VersionSource::File {
                path: "zlib.h",
                version: r#"define ZLIB_VERSION "(.+)""#,
                numeric: None,
            },
            needs_build_date: false,
            prune: PruneRules::top_level(LevelRules {
                keep_dirs: &[],
                keep_files: &["LICENSE"],
                keep_extensions: SOURCE_EXTENSIONS,
            }),
            wrapper: WrapperTemplates {
                preamble: go_source!(
                    "#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/zlib\n#cgo CFLAGS: -DHAVE_UNISTD_H -DHAVE_STDARG_H\n"
                ),
                unit: go_source!("#include <../zlib/{{.File}}.c>\n"),
            },
            headers: Vec::new(),
        }
    }

    fn libevent() -> Self {
        Self {
            library: Library::Libevent,
            upstream: "https://github.com/libevent/libevent",
            revision_policy: RevisionPolicy::DefaultBranch,
            discovery: Discovery::DryRun(DryRunScrape {
                bootstrap: vec![Step::new("./autogen.sh", &[])],
                configure: Step::new("./configure", &["--disable-shared", "--enable-static"]),
                dependency_flags: &[],
                dry_run: Step::new("make", &["--dry-run", "libevent.la"]),
                rules: ExtractionRules {
                    pattern: r" ([a-z_]+)\.lo;",
                    exclude_prefixes: &[],
                    exclude_suffixes: &[],
                    split_marker: None,
                },
            }),
            version: VersionSource::File {
                path: "configure.ac",
                version: r"AC_INIT\(libevent,(.+)\)",
                numeric: Some(r"AC_DEFINE\(NUMERIC_VERSION, (0x[0-9a-fA-F]{8}),"),
            },
            needs_build_date: false,
            prune: PruneRules::top_level(LevelRules {
                keep_dirs: &["include", "compat"],
                keep_files: &["LICENSE"],
                keep_extensions: SOURCE_EXTENSIONS,
            }),
            wrapper: WrapperTemplates {
                preamble: go_source!(
                    "#cgo CFLAGS: -I${SRCDIR}/../libevent_config\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/libevent\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/libevent/compat\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/libevent/include\n"
                ),
                unit: go_source!("#include <compat/sys/queue.h>\n#include <../{{.File}}.c>\n"),
            },
            headers: vec![HeaderEntry::new(
                "event-config",
                "h",
                LIBEVENT_HEADER_ARCHES,
                HeaderMode::Render,
                "libevent_config/event2",
            )],
        }
    }

    fn openssl() -> Self {
        Self {
            library: Library::Openssl,
            upstream: "https://github.com/openssl/openssl",
            revision_policy: RevisionPolicy::LatestStable {
                pattern: r"remotes/origin/(OpenSSL_[0-9]_[0-9]_[0-9]-stable)",
            },
            discovery: Discovery::DryRun(DryRunScrape {
                bootstrap: Vec::new(),
                configure: Step::new(
                    "./config",
                    &["no-shared", "no-zlib", "no-asm", "no-async", "no-sctp"],
                ),
                dependency_flags: &[],
                dry_run: Step::new("make", &["--dry-run"]),
                rules: ExtractionRules {
                    pattern: r"(?m)([a-z0-9_/-]+)\.c$",
                    exclude_prefixes: &["apps/", "fuzz/", "test/"],
                    exclude_suffixes: &[],
                    split_marker: None,
                },
            }),
            version: VersionSource::StableBranch { prefix: "OpenSSL_" },
            needs_build_date: true,
            prune: PruneRules::top_level(LevelRules {
                keep_dirs: &["crypto", "engines", "include", "ssl"],
                keep_files: &["LICENSE"],
                keep_extensions: SOURCE_EXTENSIONS,
            }),
            wrapper: WrapperTemplates {
                preamble: go_source!(
                    "#cgo CFLAGS: -I${SRCDIR}/../openssl_config\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/openssl\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/openssl/include\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/openssl/crypto/ec/curve448\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/openssl/crypto/ec/curve448/arch_32\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/openssl/crypto/modes\n"
                ),
                unit: go_source!(
                    "#define DSO_NONE\n#define OPENSSLDIR \"/usr/local/ssl\"\n#define ENGINESDIR \"/usr/local/lib/engines\"\n\n#include <../{{.File}}.c>\n"
                ),
            },
            headers: vec![
                HeaderEntry::new(
                    "dso_conf",
                    "h",
                    &["", "linux", "darwin"],
                    HeaderMode::Copy,
                    "openssl_config/crypto",
                ),
                HeaderEntry::new(
                    "bn_conf",
                    "h",
                    &["", "x64", "x86"],
                    HeaderMode::Copy,
                    "openssl_config/crypto",
                ),
                HeaderEntry::new(
                    "buildinf",
                    "h",
                    OPENSSL_HEADER_ARCHES,
                    HeaderMode::Render,
                    "openssl_config",
                ),
                HeaderEntry::new(
                    "opensslconf",
                    "h",
                    OPENSSL_HEADER_ARCHES,
                    HeaderMode::Copy,
                    "openssl_config/openssl",
                ),
            ],
        }
    }

    fn tor() -> Self {
        Self {
            library: Library::Tor,
            upstream: "https://git.torproject.org/tor.git",
            revision_policy: RevisionPolicy::Branch("maint-0.4.7"),
            discovery: Discovery::DryRun(DryRunScrape {
                bootstrap: vec![Step::new("./autogen.sh", &[])],
                configure: Step::new("./configure", &["--disable-asciidoc"]),
                dependency_flags: &[
                    (Library::Libevent, "--with-libevent-dir"),
                    (Library::Openssl, "--with-openssl-dir"),
                    (Library::Zlib, "--with-zlib-dir"),
                ],
                dry_run: Step::new("make", &["--dry-run"]),
                rules: ExtractionRules {
                    pattern: r"([a-z0-9_/-]+)\.c",
                    exclude_prefixes: &["src/ext/tinytest", "src/test/", "src/tools/"],
                    exclude_suffixes: &["tor_main"],
                    split_marker: Some("-c64"),
                },
            }),
            version: VersionSource::File {
                path: "src/win32/orconfig.h",
                version: r#"define VERSION "(.+)""#,
                numeric: None,
            },
            needs_build_date: false,
            prune: PruneRules {
                root: LevelRules {
                    keep_dirs: &["src"],
                    keep_files: &["LICENSE"],
                    keep_extensions: &[],
                },
                nested: vec![(
                    "src",
                    LevelRules {
                        keep_dirs: &["app", "core", "ext", "feature", "lib", "trunnel", "win32"],
                        keep_files: &[],
                        keep_extensions: &[],
                    },
                )],
                purge_dir_names: &[".deps"],
                rewrites: vec![SourceRewrite {
                    file: "src/lib/string/compat_string.c",
                    from: "\"strlcpy.c\"",
                    to: "\"ext/strlcpy.c\"",
                }],
            },
            wrapper: WrapperTemplates {
                preamble: go_source!(
                    "#cgo CFLAGS: -I${SRCDIR}/../tor_config\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/tor\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/tor/src\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/tor/src/core/or\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/tor/src/ext\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/tor/src/ext/trunnel\n#cgo CFLAGS: -I${SRCDIR}/../{{.Target}}/tor/src/feature/api\n\n#cgo CFLAGS: -DED25519_CUSTOMRANDOM -DED25519_CUSTOMHASH -DED25519_SUFFIX=_donna\n\n#cgo LDFLAGS: -lm\n"
                ),
                unit: go_source!("#define BUILDDIR \"\"\n\n#include <../{{.File}}.c>\n"),
            },
            headers: vec![
                HeaderEntry::new(
                    "orconfig",
                    "h",
                    LIBEVENT_HEADER_ARCHES,
                    HeaderMode::Render,
                    "tor_config",
                ),
                HeaderEntry::new("micro-revision", "i", &[""], HeaderMode::Copy, "tor_config"),
            ],
        }
    }
}
