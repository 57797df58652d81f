//! The version ledger (`lock.json`): one pinned git revision per library.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Result, VendorError};
use crate::library::Library;

/// Pinned revisions of all four libraries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionLedger {
    pub zlib: String,
    pub libevent: String,
    pub openssl: String,
    pub tor: String,
}

impl VersionLedger {
    pub fn revision(&self, library: Library) -> &str {
        match library {
            Library::Zlib => &self.zlib,
            Library::Libevent => &self.libevent,
            Library::Openssl => &self.openssl,
            Library::Tor => &self.tor,
        }
    }

    /// Parse ledger JSON. `path` is only used for error messages.
    pub fn parse(path: &Path, json: &str) -> Result<Self> {
        let corrupt = |detail: String| VendorError::LedgerCorrupt {
            path: path.to_path_buf(),
            detail,
        };
        let ledger: VersionLedger = serde_json::from_str(json).map_err(|e| corrupt(e.to_string()))?;
        if let Some(lib) = Library::ALL
            .into_iter()
            .find(|&lib| ledger.revision(lib).trim().is_empty())
        {
            return Err(corrupt(format!("empty revision for {lib}")));
        }
        Ok(ledger)
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VendorError::LedgerMissing(path.to_path_buf())
            } else {
                VendorError::LedgerCorrupt {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                }
            }
        })?;
        Self::parse(path, &json)
    }

    /// Replace the ledger at `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let write = |e: std::io::Error| VendorError::write(path, e);

        let mut tmp = NamedTempFile::new_in(dir).map_err(write)?;
        tmp.write_all(self.to_json()?.as_bytes()).map_err(write)?;
        tmp.persist(path).map_err(|e| write(e.error))?;

        info!(path = %path.display(), "Wrote version ledger");
        Ok(())
    }
}

/// Collects revisions as libraries complete.
#[derive(Debug, Clone, Default)]
pub struct LedgerBuilder {
    revisions: BTreeMap<Library, String>,
}

impl LedgerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, library: Library, revision: impl Into<String>) {
        self.revisions.insert(library, revision.into());
    }

    /// The ledger, once every library has a revision.
    pub fn build(&self) -> Result<VersionLedger> {
        let missing: Vec<String> = Library::ALL
            .iter()
            .filter(|lib| !self.revisions.contains_key(*lib))
            .map(|lib| lib.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(VendorError::LedgerIncomplete { missing });
        }
        let get = |lib| self.revisions.get(&lib).cloned().unwrap_or_default();
        Ok(VersionLedger {
            zlib: get(Library::Zlib),
            libevent: get(Library::Libevent),
            openssl: get(Library::Openssl),
            tor: get(Library::Tor),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    fn sample() -> VersionLedger {
        VersionLedger {
            zlib: "04f42ceca40f73e2978b50e93806c2a18c1281fc".to_string(),
            libevent: "5df3037d10556bfcb675bc73e516978b75fc7bc7".to_string(),
            openssl: "70c2912f635aac8ab28629a2b5ea0c09740d2bda".to_string(),
            tor: "b0b2f85a1fc4a1e5b8a83a41a2dfdd1c5d5b6e27".to_string(),
        }
    }

    #[test]
    fn test_json_format() {
        let json = sample().to_json().unwrap();
        assert!(json.starts_with("{\n  \"zlib\": \"04f42ce"));
        assert!(json.ends_with("}\n"));
        let keys: Vec<_> = json
            .lines()
            .filter_map(|l| l.trim().split('"').nth(1))
            .collect();
        assert_eq!(keys, vec!["zlib", "libevent", "openssl", "tor"]);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lock.json");
        sample().save(&path).unwrap();
        assert_eq!(VersionLedger::load(&path).unwrap(), sample());
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file left behind");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = VersionLedger::load(&dir.path().join("lock.json")).unwrap_err();
        assert!(matches!(err, VendorError::LedgerMissing(_)));
    }

    #[test]
    fn test_missing_field_is_corrupt() {
        let err = VersionLedger::parse(
            Path::new("lock.json"),
            r#"{"zlib": "a", "libevent": "b", "openssl": "c"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, VendorError::LedgerCorrupt { .. }));
        assert!(err.to_string().contains("missing field `tor`"));
    }

    #[test]
    fn test_unknown_field_and_empty_revision_are_corrupt() {
        let path = Path::new("lock.json");
        assert!(VersionLedger::parse(
            path,
            r#"{"zlib": "a", "libevent": "b", "openssl": "c", "tor": "d", "nss": "e"}"#
        )
        .is_err());
        let err = VersionLedger::parse(
            path,
            r#"{"zlib": "a", "libevent": " ", "openssl": "c", "tor": "d"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty revision for libevent"));
    }

    #[test]
    fn test_builder_needs_all_libraries() {
        let mut builder = LedgerBuilder::new();
        for lib in [Library::Tor, Library::Zlib, Library::Openssl] {
            builder.record(lib, sample().revision(lib));
        }
        let err = builder.build().unwrap_err();
        assert!(matches!(
            &err,
            VendorError::LedgerIncomplete { missing } if missing == &["libevent".to_string()]
        ));
        assert_eq!(err.stage(), Stage::Ledger);
        builder.record(Library::Libevent, sample().libevent);
        assert_eq!(builder.build().unwrap(), sample());
    }
}
