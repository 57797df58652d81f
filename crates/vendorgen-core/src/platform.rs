//! Platform groups and CPU architecture variants.

use serde::Serialize;

use crate::error::{Result, VendorError};

/// A named set of Go build targets sharing one build constraint.
///
/// Each clause is a conjunction of build tags; the group matches when any
/// clause does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformGroup {
    name: String,
    clauses: Vec<Vec<String>>,
}

impl PlatformGroup {
    /// Create a group from explicit tag clauses.
    pub fn new(name: impl Into<String>, clauses: &[&[&str]]) -> Self {
        Self {
            name: name.into(),
            clauses: clauses
                .iter()
                .map(|clause| clause.iter().map(|t| t.to_string()).collect())
                .collect(),
        }
    }

    /// Linux and Android.
    pub fn linux() -> Self {
        Self::new("linux", &[&["linux"], &["android"]])
    }

    /// macOS and iOS on 64-bit Intel and ARM.
    pub fn darwin() -> Self {
        Self::new(
            "darwin",
            &[
                &["darwin", "amd64"],
                &["darwin", "arm64"],
                &["ios", "amd64"],
                &["ios", "arm64"],
            ],
        )
    }

    /// Group for an operating system name as reported by Rust or Go.
    pub fn for_os(os: &str) -> Result<Self> {
        match os {
            "linux" | "android" => Ok(Self::linux()),
            "macos" | "darwin" | "ios" => Ok(Self::darwin()),
            other => Err(VendorError::UnsupportedHost(other.to_string())),
        }
    }

    /// Group for the machine the generator runs on.
    pub fn host() -> Result<Self> {
        Self::for_os(std::env::consts::OS)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constraint in `//go:build` syntax, e.g. `linux || android`.
    pub fn go_build_expr(&self) -> String {
        let multi = self.clauses.len() > 1;
        self.clauses
            .iter()
            .map(|clause| {
                let joined = clause.join(" && ");
                if multi && clause.len() > 1 {
                    format!("({joined})")
                } else {
                    joined
                }
            })
            .collect::<Vec<_>>()
            .join(" || ")
    }

    /// Constraint in legacy `// +build` syntax, e.g. `linux android`.
    pub fn legacy_build_expr(&self) -> String {
        self.clauses
            .iter()
            .map(|clause| clause.join(","))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Word-size specific implementation of a unit that ships separate 64-bit
/// and 32-bit sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArchVariant {
    /// 64-bit integer arithmetic; compiled from the discovered path.
    Wide,
    /// 32-bit and embedded targets; compiled from the path with the marker
    /// suffix stripped.
    Narrow,
}

impl ArchVariant {
    pub const ALL: [ArchVariant; 2] = [ArchVariant::Wide, ArchVariant::Narrow];

    /// Go architectures this variant is compiled for.
    pub fn arches(&self) -> &'static [&'static str] {
        match self {
            ArchVariant::Wide => &["amd64", "arm64"],
            ArchVariant::Narrow => &["386", "arm"],
        }
    }
}
