//! Module discovery and loading
//!
//! A module is one source file within a package. Discovery enumerates the
//! package's configured source directories recursively, keeps the files whose
//! name passes `filter_filename`, and loads each into a `Module`. The
//! manifest's `main` file is also loaded when it lives outside every source
//! directory, so packages whose entry sits next to `package.json` still
//! bundle correctly.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use log::{trace, warn};

use crate::{config::Config, error::BundleError, manifest::Manifest};

/// One source file belonging to a package. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Module {
    /// Identifier-safe name derived from the filename.
    pub name: String,
    /// Path relative to the source directory it was discovered under
    /// (or the path as given, for standalone loads).
    pub filename: String,
    /// Raw file text.
    pub content: String,
}

/// Result of discovering a package's modules.
#[derive(Debug, Default)]
pub struct Discovery {
    pub modules: Vec<Module>,
    /// Index into `modules` of the entry module, when one was found.
    pub main: Option<usize>,
}

/// Derive a module name from a filename.
///
/// Returns the final path segment with the extension stripped, but only when
/// that segment ends in exactly `.{ext}` with nothing after it. A trailing
/// dot or separator, a missing extension, or a near-miss extension all yield
/// `None`.
pub fn fixname(filename: &str, ext: &str) -> Option<String> {
    let segment = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let stem = segment.strip_suffix(ext)?;
    let stem = stem.strip_suffix('.')?;
    if stem.is_empty() { None } else { Some(stem.to_owned()) }
}

/// Decide whether a candidate path is an eligible module source file.
/// Must be called on every candidate before loading.
pub fn filter_filename(path: &str, ext: &str) -> bool {
    fixname(path, ext).is_some()
}

/// Read a file into a `Module`, deriving its name from the path.
pub fn load(path: &Path, ext: &str) -> Result<Module> {
    let filename = path.to_string_lossy().into_owned();
    load_as(path, filename, ext)
}

/// Read a file into a `Module` with an explicit recorded filename.
fn load_as(path: &Path, filename: String, ext: &str) -> Result<Module> {
    let name = fixname(&filename, ext).ok_or_else(|| BundleError::InvalidModuleName {
        path: path.to_path_buf(),
    })?;
    let content = fs::read_to_string(path).map_err(|source| BundleError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Module {
        name,
        filename,
        content,
    })
}

/// Discover all modules of a package rooted at `working_dir`.
pub fn discover(manifest: &Manifest, working_dir: &Path, config: &Config) -> Result<Discovery> {
    let ext = config.module_extension.as_str();
    let source_dir = manifest
        .directories
        .lib
        .as_deref()
        .unwrap_or(&config.default_source_dir);
    let source_root = working_dir.join(normalize_relative(source_dir));

    let mut discovery = Discovery::default();
    let mut loaded_paths: Vec<PathBuf> = Vec::new();

    if source_root.is_dir() {
        let mut candidates = Vec::new();
        walk(&source_root, &config.dependency_dir, &mut candidates)?;
        for path in candidates {
            let filename = relative_filename(&path, &source_root);
            if !filter_filename(&filename, ext) {
                trace!("skipping non-module file {filename}");
                continue;
            }
            discovery.modules.push(load_as(&path, filename, ext)?);
            loaded_paths.push(path);
        }
    }

    // Locate the entry module; load it separately when it lives outside the
    // source directory (e.g. a manifest with `main` but no lib/).
    let main_rel = main_filename(manifest, config);
    let main_path = working_dir.join(&main_rel);
    discovery.main = loaded_paths.iter().position(|p| *p == main_path);
    if discovery.main.is_none() {
        if main_path.is_file() {
            discovery
                .modules
                .push(load_as(&main_path, main_rel, ext)?);
            discovery.main = Some(discovery.modules.len() - 1);
        } else {
            warn!(
                "package `{}` has no entry module at {}",
                manifest.name,
                main_path.display()
            );
        }
    }

    trace!(
        "discovered {} modules for `{}`",
        discovery.modules.len(),
        manifest.name
    );
    Ok(discovery)
}

/// Entry module path relative to the working directory, extension appended
/// when the manifest omits it.
fn main_filename(manifest: &Manifest, config: &Config) -> String {
    let raw = manifest.main.as_deref().unwrap_or(&config.default_main);
    let raw = normalize_relative(raw);
    let suffix = format!(".{}", config.module_extension);
    if raw.ends_with(&suffix) {
        raw.to_owned()
    } else {
        format!("{raw}{suffix}")
    }
}

fn normalize_relative(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path).trim_end_matches('/')
}

/// Recursively collect files under `dir` in sorted traversal order, skipping
/// hidden entries and nested dependency directories.
fn walk(dir: &Path, dependency_dir: &str, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|source| BundleError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut entries: Vec<_> = entries
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|source| BundleError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name == dependency_dir {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            walk(&path, dependency_dir, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn relative_filename(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::error::BundleError;

    fn write_file(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn module_filenames(modules: &[Module]) -> Vec<&str> {
        let mut names: Vec<&str> = modules.iter().map(|m| m.filename.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn fixname_reference_cases() {
        assert_eq!(fixname("foo.js", "js").as_deref(), Some("foo"));
        assert_eq!(fixname("foo/bar/qux.js", "js").as_deref(), Some("qux"));
        assert_eq!(fixname("foo", "js"), None);
        assert_eq!(fixname("foo/bar/qux", "js"), None);
        assert_eq!(fixname("foo.js/bar.js/qux", "js"), None);
        assert_eq!(fixname("foo.js/bar.js/qux.js.", "js"), None);
        assert_eq!(fixname("qux/quux/c-orge.js", "js").as_deref(), Some("c-orge"));
    }

    #[test]
    fn fixname_rejects_bare_extension() {
        assert_eq!(fixname(".js", "js"), None);
        assert_eq!(fixname("lib/.js", "js"), None);
    }

    #[test]
    fn filter_accepts_and_rejects() {
        for legal in [
            "foo.js",
            "lib/bar/qux.js",
            "lib/qux/quux.js",
            "node_modules/foo/lib/bar.js",
        ] {
            assert!(filter_filename(legal, "js"), "{legal} should pass");
        }
        for illegal in ["lib/foo", "lib/qux.j"] {
            assert!(!filter_filename(illegal, "js"), "{illegal} should fail");
        }
    }

    #[test]
    fn load_reads_content_and_derives_name() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("a.js");
        write_file(&path, "console.log('a');")?;

        let module = load(&path, "js")?;
        assert_eq!(module.name, "a");
        assert!(module.content.starts_with("console"));
        Ok(())
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = load(Path::new("/nonexistent/a.js"), "js").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BundleError>(),
            Some(BundleError::Read { .. })
        ));
    }

    #[test]
    fn load_unnameable_file_is_name_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("notes.txt");
        write_file(&path, "not a module")?;

        let err = load(&path, "js").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BundleError>(),
            Some(BundleError::InvalidModuleName { .. })
        ));
        Ok(())
    }

    #[test]
    fn discover_source_directory() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let wd = temp_dir.path();
        write_file(&wd.join("lib/a.js"), "// a")?;
        write_file(&wd.join("lib/b.js"), "// b")?;
        write_file(&wd.join("lib/web.js"), "// web")?;
        write_file(&wd.join("lib/foo"), "// no extension")?;
        write_file(&wd.join("lib/qux.j"), "// truncated extension")?;

        let manifest = Manifest {
            name: "example-project".into(),
            main: Some("./lib/a".into()),
            ..Default::default()
        };
        let discovery = discover(&manifest, wd, &Config::default())?;

        assert_eq!(
            module_filenames(&discovery.modules),
            ["a.js", "b.js", "web.js"]
        );
        let main = discovery.main.expect("main module should be found");
        assert_eq!(discovery.modules[main].filename, "a.js");
        Ok(())
    }

    #[test]
    fn discover_nested_directories() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let wd = temp_dir.path();
        write_file(&wd.join("p/index.js"), "// p index")?;
        write_file(&wd.join("p/r.js"), "// r")?;
        write_file(&wd.join("s/t.js"), "// t")?;
        write_file(&wd.join("n.js"), "// n")?;
        // Nested dependencies are not modules of this package
        write_file(&wd.join("node_modules/x/y.js"), "// not ours")?;

        let manifest = Manifest {
            name: "sibling".into(),
            main: Some("./n".into()),
            directories: crate::manifest::Directories { lib: Some(".".into()) },
            ..Default::default()
        };
        let discovery = discover(&manifest, wd, &Config::default())?;

        assert_eq!(
            module_filenames(&discovery.modules),
            ["n.js", "p/index.js", "p/r.js", "s/t.js"]
        );
        Ok(())
    }

    #[test]
    fn discover_main_outside_source_directory() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let wd = temp_dir.path();
        write_file(&wd.join("i.js"), "// i")?;

        let manifest = Manifest {
            name: "subdependency".into(),
            main: Some("i".into()),
            ..Default::default()
        };
        let discovery = discover(&manifest, wd, &Config::default())?;

        assert_eq!(module_filenames(&discovery.modules), ["i.js"]);
        let main = discovery.main.expect("main module should be found");
        assert_eq!(discovery.modules[main].name, "i");
        Ok(())
    }

    #[test]
    fn discover_without_entry_module_yields_no_main() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let wd = temp_dir.path();
        write_file(&wd.join("lib/helper.js"), "// helper")?;

        let manifest = Manifest {
            name: "headless".into(),
            ..Default::default()
        };
        let discovery = discover(&manifest, wd, &Config::default())?;
        assert_eq!(discovery.main, None);
        assert_eq!(module_filenames(&discovery.modules), ["helper.js"]);
        Ok(())
    }
}
