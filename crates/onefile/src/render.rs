//! Bundle text emission
//!
//! Turns the flattened package sequence into one self-contained script. The
//! emitted bundle carries a small require shim: package and module records
//! register themselves, and `require` resolves a name against the requiring
//! package's own modules first, then its dependency list, then injected
//! ties, then the host's own require when one exists. Module evaluation is
//! lazy and at-most-once; a re-entrant require observes partial exports.

use std::fmt::Write as _;

use anyhow::{Result, anyhow};
use log::debug;
use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::{
    error::BundleError,
    ident::{IdGenerator, make_variable_name},
    resolver::{PackageId, ResolutionContext},
};

/// A host-supplied named value injected into the bundle's top-level scope,
/// embedding a constant without a require edge.
#[derive(Debug, Clone)]
pub struct Tie {
    pub name: String,
    pub value: Value,
}

/// The require shim embedded in every bundle. `DEBUG` is declared right
/// before this block.
const RUNTIME: &str = r#"  var nativeRequire = typeof require === "function" ? require : undefined;

  var ties = {};
  var packages = {};

  function definePackage(name, id, main, deps, placeholder) {
    var pkg = {
      name: name,
      id: id,
      main: main,
      deps: deps,
      placeholder: placeholder,
      modules: {}
    };
    packages[id] = pkg;
    return pkg;
  }

  function defineModule(pkg, name, filename, factory) {
    pkg.modules[name] = {
      name: name,
      filename: filename,
      factory: factory,
      exports: undefined,
      loaded: false,
      loading: false
    };
  }

  function requireFrom(pkg) {
    return function require(name) {
      if (Object.prototype.hasOwnProperty.call(pkg.modules, name)) {
        return loadModule(pkg, pkg.modules[name]);
      }
      for (var i = 0; i < pkg.deps.length; i++) {
        var dep = packages[pkg.deps[i]];
        if (dep.name === name) {
          return loadPackage(dep);
        }
      }
      if (Object.prototype.hasOwnProperty.call(ties, name)) {
        return ties[name];
      }
      if (nativeRequire) {
        return nativeRequire(name);
      }
      throw new Error("cannot find module: " + name);
    };
  }

  function loadPackage(pkg) {
    if (pkg.placeholder) {
      if (Object.prototype.hasOwnProperty.call(ties, pkg.name)) {
        return ties[pkg.name];
      }
      if (nativeRequire) {
        return nativeRequire(pkg.name);
      }
      throw new Error("module is provided by the host and was not bundled: " + pkg.name);
    }
    if (pkg.main === undefined) {
      throw new Error("package has no entry module: " + pkg.name);
    }
    return loadModule(pkg, pkg.modules[pkg.main]);
  }

  function loadModule(pkg, mod) {
    if (mod.loaded || mod.loading) {
      return mod.exports;
    }
    mod.loading = true;
    mod.exports = {};
    var module = { exports: mod.exports, id: mod.filename };
    mod.factory.call(global, module, mod.exports, requireFrom(pkg));
    mod.exports = module.exports;
    mod.loading = false;
    mod.loaded = true;
    return mod.exports;
  }

  function evaluateFresh(pkg, mod) {
    var module = { exports: {}, id: mod.filename };
    mod.factory.call(global, module, module.exports, requireFrom(pkg));
    return module.exports;
  }
"#;

/// Render the bundle for the packages in `order` (a flattened tree rooted at
/// `root`).
pub fn render_bundle(
    ctx: &ResolutionContext,
    root: PackageId,
    order: &[PackageId],
    debug_mode: bool,
    ties: &[Tie],
) -> Result<String> {
    let root_pkg = ctx.package(root);
    let mut used = reserved_names();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "// {} bundled with onefile v{}",
        root_pkg.name,
        env!("CARGO_PKG_VERSION")
    );
    out.push_str("(function (global, undefined) {\n");
    out.push_str("  \"use strict\";\n\n");
    let _ = writeln!(out, "  var DEBUG = {debug_mode};");
    out.push_str(RUNTIME);
    out.push('\n');

    render_ties(&mut out, ties, &ctx.ids, &mut used)?;

    // One package record per flattened entry, each followed by its modules.
    let mut package_names = Vec::with_capacity(order.len());
    for &id in order {
        let package = ctx.package(id);
        let base = make_variable_name(&package.name);
        let base = if base.is_empty() { "pkg" } else { &base };
        package_names.push(unique_name(base, &ctx.ids, &mut used));
    }

    for (&id, package_name) in order.iter().zip(&package_names) {
        let package = ctx.package(id);
        let main_name = package
            .main
            .map_or_else(|| "undefined".to_owned(), |i| js_string(&package.modules[i].name));
        let deps: Vec<String> = package
            .dependencies
            .iter()
            .map(|d| d.as_u32().to_string())
            .collect();

        let _ = writeln!(
            out,
            "  var {package_name} = definePackage({}, {}, {main_name}, [{}], {});",
            js_string(&package.name),
            package.id.as_u32(),
            deps.join(", "),
            package.placeholder
        );

        for module in &package.modules {
            let factory_base = make_variable_name(&module.name);
            let factory_base = if factory_base.is_empty() { "module" } else { &factory_base };
            let factory_name = unique_name(factory_base, &ctx.ids, &mut used);
            let _ = writeln!(
                out,
                "  defineModule({package_name}, {}, {}, function {factory_name}(module, exports, require) {{",
                js_string(&module.name),
                js_string(&module.filename)
            );
            out.push_str(&module.content);
            if !module.content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("  });\n");
        }
        out.push('\n');
    }

    let root_name = &package_names[0];
    let _ = writeln!(out, "  var rootPackage = {root_name};");
    out.push_str(
        "\n  function main() {\n    if (DEBUG && rootPackage.main !== undefined) {\n      return \
         evaluateFresh(rootPackage, rootPackage.modules[rootPackage.main]);\n    }\n    return \
         loadPackage(rootPackage);\n  }\n\n",
    );
    out.push_str(
        "  var api = {\n    name: rootPackage.name,\n    main: main,\n    require: \
         requireFrom(rootPackage),\n    debug: DEBUG\n  };\n  if (DEBUG) {\n    api.packages = \
         packages;\n  }\n\n",
    );
    let _ = writeln!(
        out,
        "  if (typeof module !== \"undefined\" && module.exports) {{\n    module.exports = api;\n  \
         }} else {{\n    global[{}] = api;\n  }}",
        js_string(root_name)
    );
    out.push_str("})(this);\n");

    debug!(
        "rendered bundle for `{}`: {} packages, {} bytes",
        root_pkg.name,
        order.len(),
        out.len()
    );
    Ok(out)
}

/// Emit tie declarations into the top-level bundle scope.
fn render_ties(
    out: &mut String,
    ties: &[Tie],
    ids: &IdGenerator,
    used: &mut FxHashSet<String>,
) -> Result<()> {
    for tie in ties {
        let base = make_variable_name(&tie.name);
        if base.is_empty() {
            return Err(anyhow!(
                "tie name `{}` yields no usable identifier",
                tie.name
            ));
        }
        let variable = unique_name(&base, ids, used);
        let serialized =
            serde_json::to_string(&tie.value).map_err(|source| BundleError::Serialization {
                tie: tie.name.clone(),
                source,
            })?;
        let _ = writeln!(out, "  var {variable} = {serialized};");
        let _ = writeln!(out, "  ties[{}] = {variable};", js_string(&tie.name));
    }
    if !ties.is_empty() {
        out.push('\n');
    }
    Ok(())
}

/// Make `base` unique among the bundle's generated identifiers, drawing
/// fresh ids from the build's generator on collision.
fn unique_name(base: &str, ids: &IdGenerator, used: &mut FxHashSet<String>) -> String {
    let mut name = base.to_owned();
    while used.contains(&name) {
        name = format!("{base}{}", ids.next());
    }
    used.insert(name.clone());
    name
}

/// Identifiers the require shim itself declares; generated names must not
/// shadow them.
fn reserved_names() -> FxHashSet<String> {
    [
        "global",
        "undefined",
        "require",
        "module",
        "exports",
        "DEBUG",
        "nativeRequire",
        "ties",
        "packages",
        "definePackage",
        "defineModule",
        "requireFrom",
        "loadPackage",
        "loadModule",
        "evaluateFresh",
        "rootPackage",
        "main",
        "api",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

/// A JS string literal; JSON string escaping is valid JS.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).expect("string serialization cannot fail")
}
