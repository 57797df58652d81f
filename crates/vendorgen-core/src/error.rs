//! Error taxonomy for the generator pipeline.
//!
//! Every variant is fatal to a run. Variants raised while processing a
//! library carry its name so the operator can tell which library and which
//! stage failed; native tool output is embedded verbatim.

use std::path::PathBuf;

use serde::Serialize;
use vendorgen_native::NativeError;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Acquire,
    Configure,
    Introspect,
    Prune,
    Generate,
    Ledger,
    Validate,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Acquire => "acquire",
            Stage::Configure => "configure",
            Stage::Introspect => "introspect",
            Stage::Prune => "prune",
            Stage::Generate => "generate",
            Stage::Ledger => "ledger",
            Stage::Validate => "validate",
        };
        f.write_str(name)
    }
}

/// Generator errors.
#[derive(Debug, thiserror::Error)]
pub enum VendorError {
    #[error("{library}: failed to acquire upstream source: {source}")]
    Acquisition {
        library: String,
        #[source]
        source: NativeError,
    },

    #[error("{library}: revision {revision} not found upstream")]
    RevisionNotFound { library: String, revision: String },

    #[error("{library}: no stable branch found upstream")]
    NoStableChannel { library: String },

    #[error("{library}: configuration failed: {detail}")]
    Configuration { library: String, detail: String },

    #[error("{library}: build introspection failed: {detail}")]
    Introspection { library: String, detail: String },

    #[error("{library}: pruning {} failed: {source}", .path.display())]
    Pruning {
        library: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template {name}: {detail}")]
    Template { name: String, detail: String },

    #[error("version ledger not found at {} (run with --refresh to create one)", .0.display())]
    LedgerMissing(PathBuf),

    #[error("version ledger at {} is corrupt: {detail}", .path.display())]
    LedgerCorrupt { path: PathBuf, detail: String },

    #[error("version ledger is missing revisions for: {}", .missing.join(", "))]
    LedgerIncomplete { missing: Vec<String> },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("validation build failed:\n{output}")]
    ValidationBuild { output: String },

    #[error("unsupported host operating system: {0}")]
    UnsupportedHost(String),

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VendorError {
    /// Stage the error was raised in.
    pub fn stage(&self) -> Stage {
        match self {
            VendorError::Acquisition { .. }
            | VendorError::RevisionNotFound { .. }
            | VendorError::NoStableChannel { .. } => Stage::Acquire,
            VendorError::Configuration { .. } => Stage::Configure,
            VendorError::Introspection { .. } => Stage::Introspect,
            VendorError::Pruning { .. } => Stage::Prune,
            VendorError::Template { .. } | VendorError::Write { .. } => Stage::Generate,
            VendorError::LedgerMissing(_)
            | VendorError::LedgerCorrupt { .. }
            | VendorError::LedgerIncomplete { .. }
            | VendorError::Serialization(_) => Stage::Ledger,
            VendorError::ValidationBuild { .. } => Stage::Validate,
            VendorError::UnsupportedHost(_) => Stage::Configure,
        }
    }

    /// Library the error belongs to, when it is library specific.
    pub fn library(&self) -> Option<&str> {
        match self {
            VendorError::Acquisition { library, .. }
            | VendorError::RevisionNotFound { library, .. }
            | VendorError::NoStableChannel { library }
            | VendorError::Configuration { library, .. }
            | VendorError::Introspection { library, .. }
            | VendorError::Pruning { library, .. } => Some(library),
            _ => None,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VendorError::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn configuration(library: &str, detail: impl Into<String>) -> Self {
        VendorError::Configuration {
            library: library.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn introspection(library: &str, detail: impl Into<String>) -> Self {
        VendorError::Introspection {
            library: library.to_string(),
            detail: detail.into(),
        }
    }
}

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, VendorError>;
