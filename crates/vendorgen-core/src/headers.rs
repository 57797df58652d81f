//! Per-architecture configuration headers.
//!
//! Each library ships a fixed catalog of headers that its configure step
//! would normally produce. They are checked in under
//! `<headers_dir>/<library>/` and either copied verbatim or rendered with the
//! version metadata of the current run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, VendorError};
use crate::introspect::VersionInfo;
use crate::template::{self, TemplateVars};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    Copy,
    Render,
}

/// One catalog entry: a header stem and the architectures it exists for.
#[derive(Debug, Clone)]
pub struct HeaderEntry {
    pub stem: &'static str,
    pub extension: &'static str,
    /// Architecture suffixes; the empty suffix is the generic dispatcher.
    pub arches: &'static [&'static str],
    pub mode: HeaderMode,
    /// Destination relative to the output root.
    pub dest_dir: &'static str,
}

impl HeaderEntry {
    pub const fn new(
        stem: &'static str,
        extension: &'static str,
        arches: &'static [&'static str],
        mode: HeaderMode,
        dest_dir: &'static str,
    ) -> Self {
        Self {
            stem,
            extension,
            arches,
            mode,
            dest_dir,
        }
    }

    /// File name for one architecture, e.g. `event-config.linux64.h`.
    pub fn file_name(&self, arch: &str) -> String {
        if arch.is_empty() {
            format!("{}.{}", self.stem, self.extension)
        } else {
            format!("{}.{}.{}", self.stem, arch, self.extension)
        }
    }
}

/// A header written by [`materialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigArtifact {
    pub library: String,
    pub arch: String,
    pub mode: HeaderMode,
    /// Path relative to the output root.
    pub path: PathBuf,
}

/// Variables available to rendered headers.
pub fn header_vars(version: &VersionInfo) -> TemplateVars {
    let mut vars = TemplateVars::new().with("StrVer", &version.version);
    if let Some(numeric) = &version.numeric {
        vars.set("NumVer", numeric);
    }
    if let Some(date) = &version.date {
        vars.set("Date", date);
    }
    vars
}

/// Write every catalog entry for every architecture under `root`.
pub fn materialize(
    library: &str,
    catalog: &[HeaderEntry],
    source_dir: &Path,
    root: &Path,
    version: &VersionInfo,
) -> Result<Vec<ConfigArtifact>> {
    let vars = header_vars(version);
    let mut artifacts = Vec::new();

    for entry in catalog {
        let dest_dir = root.join(entry.dest_dir);
        std::fs::create_dir_all(&dest_dir).map_err(|e| VendorError::write(&dest_dir, e))?;

        for arch in entry.arches {
            let name = entry.file_name(arch);
            let source = source_dir.join(&name);
            let bytes = std::fs::read(&source).map_err(|e| VendorError::Template {
                name: source.display().to_string(),
                detail: format!("cannot read header source: {e}"),
            })?;
            let contents = match entry.mode {
                HeaderMode::Copy => bytes,
                HeaderMode::Render => {
                    let text = String::from_utf8(bytes).map_err(|e| VendorError::Template {
                        name: name.clone(),
                        detail: format!("not valid UTF-8: {e}"),
                    })?;
                    template::render(&name, &text, &vars)?.into_bytes()
                }
            };

            let dest = dest_dir.join(&name);
            std::fs::write(&dest, contents).map_err(|e| VendorError::write(&dest, e))?;
            debug!(library, header = %name, mode = ?entry.mode, "Materialized config header");

            artifacts.push(ConfigArtifact {
                library: library.to_string(),
                arch: arch.to_string(),
                mode: entry.mode,
                path: Path::new(entry.dest_dir).join(&name),
            });
        }
    }
    Ok(artifacts)
}
