//! Recursive package resolution
//!
//! Resolves a package's full dependency graph: declared dependencies from the
//! manifest plus names discovered by scanning module text. The graph is a
//! tree of shared identities — a package required by two parents is resolved
//! once and referenced by id from both. All state lives in a
//! `ResolutionContext` owned by one build invocation; there are no
//! process-wide singletons.

use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace, warn};
use rustc_hash::FxHashSet;

use crate::{
    config::Config,
    error::BundleError,
    ident::IdGenerator,
    manifest::{self, MANIFEST_FILE_NAME, Manifest},
    modules::{self, Module},
    require_scan,
};

/// Unique identifier for a resolved package within one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageId(u32);

impl PackageId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// One resolvable unit: the root package or a dependency.
///
/// Created when its name is first encountered, mutated while its own modules
/// and dependencies are discovered, immutable once resolution completes.
/// Dependency edges are ids into the context's arena, never owned copies, so
/// a diamond in the graph is two edges to one `Package`.
#[derive(Debug)]
pub struct Package {
    pub id: PackageId,
    /// Dedup key within the build.
    pub name: String,
    pub manifest: Manifest,
    /// Base path for module and dependency lookups.
    pub working_dir: PathBuf,
    pub modules: Vec<Module>,
    /// Index into `modules` of the entry module.
    pub main: Option<usize>,
    /// Direct dependencies in declaration-then-discovery order.
    pub dependencies: Vec<PackageId>,
    /// The package that first resolved this one. Diagnostics only; the
    /// relation is an id, so it never keeps anything alive.
    pub parent: Option<PackageId>,
    /// True for names discovered by scanning that have no package directory
    /// on disk (host-provided modules such as Node built-ins).
    pub placeholder: bool,
}

/// Shared state for one build's resolution, discarded when the build ends.
#[derive(Debug)]
pub struct ResolutionContext {
    /// Arena of resolved packages, keyed by id in resolution order.
    pub packages: IndexMap<PackageId, Package>,
    /// Name -> package registry; the single source of truth for "have we
    /// already resolved a package with this name".
    pub pkg_dict: IndexMap<String, PackageId>,
    /// Build-wide id source, shared with the renderer.
    pub ids: IdGenerator,
    config: Config,
}

impl ResolutionContext {
    pub fn new(config: Config) -> Self {
        Self {
            packages: IndexMap::new(),
            pkg_dict: IndexMap::new(),
            ids: IdGenerator::new(),
            config,
        }
    }

    /// Look up a package by id. Ids handed out by this context are always
    /// present in the arena.
    pub fn package(&self, id: PackageId) -> &Package {
        self.packages
            .get(&id)
            .expect("package id issued by this context")
    }

    /// Resolve the root package and, transitively, everything it depends on.
    pub fn resolve_root(&mut self, manifest_path: &Path) -> Result<PackageId> {
        let working_dir = manifest_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        debug!("resolving root package from {}", manifest_path.display());
        self.resolve_from_manifest(manifest_path, working_dir, None, None)
    }

    /// Resolve a package from its manifest. `reuse` carries the id of an
    /// already-registered placeholder being upgraded in place; otherwise a
    /// fresh id is assigned.
    fn resolve_from_manifest(
        &mut self,
        manifest_path: &Path,
        working_dir: PathBuf,
        parent: Option<PackageId>,
        reuse: Option<PackageId>,
    ) -> Result<PackageId> {
        let manifest = manifest::load_manifest(manifest_path)?;
        let name = if manifest.name.is_empty() {
            let fallback = working_dir
                .file_name()
                .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
            warn!(
                "manifest {} has no name, using directory name `{fallback}`",
                manifest_path.display()
            );
            fallback
        } else {
            manifest.name.clone()
        };

        let id = reuse.unwrap_or_else(|| PackageId::new(self.ids.next()));
        let discovery = modules::discover(&manifest, &working_dir, &self.config)?;
        let package = Package {
            id,
            name: name.clone(),
            manifest,
            working_dir: working_dir.clone(),
            modules: discovery.modules,
            main: discovery.main,
            dependencies: Vec::new(),
            parent,
            placeholder: false,
        };

        // Register before recursing so cycles and diamonds short-circuit on
        // the pkg_dict lookup instead of re-resolving.
        self.pkg_dict.insert(name.clone(), id);
        self.packages.insert(id, package);

        let names = self.dependency_names(id);
        trace!("`{name}` depends on {names:?}");

        let mut dependencies = Vec::with_capacity(names.len());
        for (dep_name, declared) in names {
            let child = self.resolve_dependency(&dep_name, &working_dir, id, declared)?;
            dependencies.push(child);
        }
        self.packages
            .get_mut(&id)
            .expect("package registered above")
            .dependencies = dependencies;

        Ok(id)
    }

    /// The union of declared dependency names and required names scanned
    /// from module text, with a flag marking which were declared. Declared
    /// names come first, in manifest order; scanned names follow in
    /// first-occurrence order. A scanned name matching the package itself or
    /// one of its own modules is an intra-package require (the emitted shim
    /// checks own modules first), not a dependency.
    fn dependency_names(&self, id: PackageId) -> Vec<(String, bool)> {
        let package = self.package(id);
        let own_modules: FxHashSet<&str> =
            package.modules.iter().map(|m| m.name.as_str()).collect();
        let mut seen: IndexSet<String> =
            package.manifest.dependencies.keys().cloned().collect();
        let mut names: Vec<(String, bool)> =
            seen.iter().map(|n| (n.clone(), true)).collect();

        for module in &package.modules {
            for required in require_scan::scan_requires(&module.content) {
                if required == package.name || own_modules.contains(required.as_str()) {
                    continue;
                }
                if seen.insert(required.clone()) {
                    names.push((required, false));
                }
            }
        }
        names
    }

    /// Resolve one dependency of `parent`, deduplicating through `pkg_dict`.
    ///
    /// A name without a package directory aborts the build when it was
    /// declared, and becomes a placeholder package when it was merely
    /// discovered in module text.
    fn resolve_dependency(
        &mut self,
        name: &str,
        parent_working_dir: &Path,
        parent: PackageId,
        declared: bool,
    ) -> Result<PackageId> {
        if let Some(&existing) = self.pkg_dict.get(name) {
            // A placeholder only stands in for a scanned name. A declaration
            // of the same name must still resolve from disk (keeping the id
            // every earlier parent already references) or abort.
            if declared && self.package(existing).placeholder {
                let package_dir = parent_working_dir
                    .join(&self.config.dependency_dir)
                    .join(name);
                let manifest_path = package_dir.join(MANIFEST_FILE_NAME);
                if !manifest_path.is_file() {
                    return Err(BundleError::ManifestNotFound {
                        path: manifest_path,
                    }
                    .into());
                }
                debug!(
                    "upgrading placeholder `{name}` from {}",
                    package_dir.display()
                );
                return self.resolve_from_manifest(
                    &manifest_path,
                    package_dir,
                    Some(parent),
                    Some(existing),
                );
            }
            trace!("`{name}` already resolved as package {}", existing.as_u32());
            return Ok(existing);
        }

        let package_dir = parent_working_dir
            .join(&self.config.dependency_dir)
            .join(name);
        let manifest_path = package_dir.join(MANIFEST_FILE_NAME);

        if manifest_path.is_file() {
            debug!("resolving `{name}` from {}", package_dir.display());
            return self.resolve_from_manifest(&manifest_path, package_dir, Some(parent), None);
        }

        if declared {
            return Err(BundleError::ManifestNotFound {
                path: manifest_path,
            }
            .into());
        }

        debug!("treating required `{name}` as a host-provided placeholder");
        let id = PackageId::new(self.ids.next());
        let package = Package {
            id,
            name: name.to_owned(),
            manifest: Manifest {
                name: name.to_owned(),
                ..Default::default()
            },
            working_dir: package_dir,
            modules: Vec::new(),
            main: None,
            dependencies: Vec::new(),
            parent: Some(parent),
            placeholder: true,
        };
        self.pkg_dict.insert(name.to_owned(), id);
        self.packages.insert(id, package);
        Ok(id)
    }
}
