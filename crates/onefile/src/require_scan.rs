//! Textual require scanning
//!
//! Extracts the names a module requires beyond what its manifest declares.
//! This is a narrowly-scoped pattern match over raw source text, not a
//! JavaScript parser: it recognizes `require('<name>')` with a single string
//! literal argument and tolerates arbitrary surrounding code. Dynamically
//! constructed requires are missed by design.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

static REQUIRE_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"require\s*\(\s*(?:'([^']*)'|"([^"]*)")\s*\)"#)
        .expect("require pattern is a valid regex")
});

/// Scan source text for required package names.
///
/// Returns distinct bare names in first-occurrence order. Relative and
/// absolute path arguments refer to modules within the requiring package and
/// are not dependency names, so they are skipped.
pub fn scan_requires(source: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut names = Vec::new();

    for captures in REQUIRE_CALL.captures_iter(source) {
        let Some(arg) = captures.get(1).or_else(|| captures.get(2)) else {
            continue;
        };
        let arg = arg.as_str();
        if arg.is_empty() || arg.starts_with('.') || arg.contains('/') {
            continue;
        }
        if seen.insert(arg) {
            names.push(arg.to_owned());
        }
    }

    names
}
