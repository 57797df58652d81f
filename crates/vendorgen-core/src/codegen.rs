//! Go wrapper generation.
//!
//! Every compilation unit becomes one cgo file that includes exactly that
//! unit's source, restricted to a platform group by a build constraint. Each
//! library also gets one preamble file carrying its include paths and
//! defines. Rendering is pure: the same inputs always give the same bytes.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, VendorError};
use crate::introspect::CompilationUnit;
use crate::library::LibrarySpec;
use crate::platform::PlatformGroup;
use crate::template::{self, TemplateVars};

/// A generated Go source file, named relative to the package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedWrapper {
    pub file_name: String,
    pub contents: String,
}

/// `{group}_{library}_{unit path with / replaced by _}[_{arch}].go`
pub fn wrapper_file_name(group: &str, library: &str, unit: &str, arch: Option<&str>) -> String {
    let flat = unit.replace('/', "_");
    match arch {
        Some(arch) => format!("{group}_{library}_{flat}_{arch}.go"),
        None => format!("{group}_{library}_{flat}.go"),
    }
}

pub fn preamble_file_name(group: &str, library: &str) -> String {
    format!("{group}_{library}_preamble.go")
}

fn base_vars(group: &PlatformGroup, package: &str) -> TemplateVars {
    TemplateVars::new()
        .with("Constraint", group.go_build_expr())
        .with("LegacyConstraint", group.legacy_build_expr())
        .with("Package", package)
        .with("Target", group.name())
}

/// Wrappers for one unit: one file, or one per architecture for split units.
pub fn render_unit_wrappers(
    spec: &LibrarySpec,
    group: &PlatformGroup,
    package: &str,
    unit: &CompilationUnit,
) -> Result<Vec<GeneratedWrapper>> {
    let vars = base_vars(group, package);
    let mut out = Vec::new();
    for source in unit.sources() {
        let vars = vars.clone().with("File", &source.path);
        let arches: Vec<Option<&str>> = match source.variant {
            Some(variant) => variant.arches().iter().copied().map(Some).collect(),
            None => vec![None],
        };
        for arch in arches {
            let file_name = wrapper_file_name(group.name(), spec.name(), &unit.path, arch);
            let contents = template::render(&file_name, spec.wrapper.unit, &vars)?;
            out.push(GeneratedWrapper {
                file_name,
                contents,
            });
        }
    }
    Ok(out)
}

pub fn render_preamble(
    spec: &LibrarySpec,
    group: &PlatformGroup,
    package: &str,
) -> Result<GeneratedWrapper> {
    let file_name = preamble_file_name(group.name(), spec.name());
    let contents = template::render(&file_name, spec.wrapper.preamble, &base_vars(group, package))?;
    Ok(GeneratedWrapper {
        file_name,
        contents,
    })
}

/// All Go files of one library, sorted by file name.
///
/// Two units flattening to the same file name would silently overwrite each
/// other, so that is an error.
pub fn generate_library(
    spec: &LibrarySpec,
    group: &PlatformGroup,
    package: &str,
    units: &[CompilationUnit],
) -> Result<Vec<GeneratedWrapper>> {
    let mut files = BTreeMap::new();
    let preamble = render_preamble(spec, group, package)?;
    files.insert(preamble.file_name.clone(), preamble);

    for unit in units {
        for wrapper in render_unit_wrappers(spec, group, package, unit)? {
            if files.contains_key(&wrapper.file_name) {
                return Err(VendorError::Template {
                    name: wrapper.file_name,
                    detail: format!("unit {} collides with another generated file", unit.path),
                });
            }
            files.insert(wrapper.file_name.clone(), wrapper);
        }
    }
    Ok(files.into_values().collect())
}

/// Write `files` into `dir`, creating it if needed.
pub fn write_all(dir: &Path, files: &[GeneratedWrapper]) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| VendorError::write(dir, e))?;
    for file in files {
        let path = dir.join(&file.file_name);
        std::fs::write(&path, &file.contents).map_err(|e| VendorError::write(&path, e))?;
        debug!(file = %file.file_name, "Wrote wrapper");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Library;
    use crate::platform::ArchVariant;

    #[test]
    fn test_file_names() {
        assert_eq!(
            wrapper_file_name("linux", "tor", "src/core/or/relay", None),
            "linux_tor_src_core_or_relay.go"
        );
        assert_eq!(
            wrapper_file_name("darwin", "tor", "src/ext/x-c64", Some("arm64")),
            "darwin_tor_src_ext_x-c64_arm64.go"
        );
        assert_eq!(preamble_file_name("linux", "zlib"), "linux_zlib_preamble.go");
    }

    #[test]
    fn test_zlib_wrapper_contents() {
        let spec = Library::Zlib.spec();
        let wrappers = render_unit_wrappers(
            &spec,
            &PlatformGroup::linux(),
            "libtor",
            &CompilationUnit::new("adler32"),
        )
        .unwrap();
        assert_eq!(wrappers.len(), 1);
        assert_eq!(wrappers[0].file_name, "linux_zlib_adler32.go");
        assert_eq!(
            wrappers[0].contents,
            "// Code generated by vendorgen. DO NOT EDIT.\n\
             \n\
             //go:build linux || android\n\
             // +build linux android\n\
             \n\
             package libtor\n\
             \n\
             /*\n\
             #include <../zlib/adler32.c>\n\
             */\n\
             import \"C\"\n"
        );
    }

    #[test]
    fn test_donna_unit_fans_out_to_four_wrappers() {
        let spec = Library::Tor.spec();
        let unit = CompilationUnit {
            path: "src/ext/ed25519/donna/ed25519-donna-c64".to_string(),
            split_marker: Some("-c64"),
        };
        let wrappers =
            render_unit_wrappers(&spec, &PlatformGroup::linux(), "libtor", &unit).unwrap();
        let names: Vec<_> = wrappers.iter().map(|w| w.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "linux_tor_src_ext_ed25519_donna_ed25519-donna-c64_amd64.go",
                "linux_tor_src_ext_ed25519_donna_ed25519-donna-c64_arm64.go",
                "linux_tor_src_ext_ed25519_donna_ed25519-donna-c64_386.go",
                "linux_tor_src_ext_ed25519_donna_ed25519-donna-c64_arm.go",
            ]
        );
        for (wrapper, variant) in wrappers.iter().zip([
            ArchVariant::Wide,
            ArchVariant::Wide,
            ArchVariant::Narrow,
            ArchVariant::Narrow,
        ]) {
            let include = match variant {
                ArchVariant::Wide => "#include <../src/ext/ed25519/donna/ed25519-donna-c64.c>\n",
                ArchVariant::Narrow => "#include <../src/ext/ed25519/donna/ed25519-donna.c>\n",
            };
            assert!(wrapper.contents.contains(include), "{}", wrapper.file_name);
            assert!(wrapper.contents.contains("#define BUILDDIR \"\"\n"));
        }
    }

    #[test]
    fn test_preamble_substitutes_target() {
        let preamble =
            render_preamble(&Library::Libevent.spec(), &PlatformGroup::darwin(), "libtor").unwrap();
        assert_eq!(preamble.file_name, "darwin_libevent_preamble.go");
        assert!(preamble
            .contents
            .contains("#cgo CFLAGS: -I${SRCDIR}/../darwin/libevent/compat\n"));
        assert!(preamble
            .contents
            .contains("// +build darwin,amd64 darwin,arm64 ios,amd64 ios,arm64\n"));
    }

    #[test]
    fn test_generate_library_is_sorted_and_deterministic() {
        let spec = Library::Zlib.spec();
        let units = vec![CompilationUnit::new("zutil"), CompilationUnit::new("adler32")];
        let group = PlatformGroup::new("G", &[&["linux"]]);
        let first = generate_library(&spec, &group, "libtor", &units).unwrap();
        let names: Vec<_> = first.iter().map(|w| w.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["G_zlib_adler32.go", "G_zlib_preamble.go", "G_zlib_zutil.go"]
        );
        assert_eq!(first, generate_library(&spec, &group, "libtor", &units).unwrap());
    }

    #[test]
    fn test_flattening_collision_is_error() {
        let spec = Library::Tor.spec();
        let units = vec![
            CompilationUnit::new("src/lib/a_b"),
            CompilationUnit::new("src/lib_a/b"),
        ];
        let err = generate_library(&spec, &PlatformGroup::linux(), "libtor", &units).unwrap_err();
        assert!(err.to_string().contains("collides"));
    }

    #[test]
    fn test_write_all_creates_package_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("libtor");
        let files = vec![GeneratedWrapper {
            file_name: "G_lib_a.go".to_string(),
            contents: "package libtor\n".to_string(),
        }];
        write_all(&pkg, &files).unwrap();
        assert_eq!(
            std::fs::read_to_string(pkg.join("G_lib_a.go")).unwrap(),
            "package libtor\n"
        );
    }
}
