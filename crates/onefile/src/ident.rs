//! Identifier generation for the emitted bundle
//!
//! Two concerns live here: the build-wide numeric id counter, and the
//! deterministic string-to-identifier transform used to name package and
//! module records in the generated source. The transform alone is not
//! injective; the renderer suffixes the numeric id whenever two entities
//! would otherwise share a name.

use std::cell::Cell;

/// Build-wide monotonically increasing id source.
///
/// One generator is shared by reference across a single build so that no two
/// entities ever receive the same id. Interior mutability keeps call sites
/// ergonomic; the type is deliberately not `Sync` — concurrent resolution
/// must serialize calls to it.
#[derive(Debug)]
pub struct IdGenerator {
    next: Cell<u32>,
}

impl IdGenerator {
    /// A generator whose first id is 1, the value the root package observes.
    pub fn new() -> Self {
        Self::with_seed(1)
    }

    pub fn with_seed(seed: u32) -> Self {
        Self {
            next: Cell::new(seed),
        }
    }

    /// Return the next unused id. Strictly increasing by 1 per call.
    pub fn next(&self) -> u32 {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn an arbitrary package or module name into a camel-cased identifier.
///
/// Splits at every non-alphanumeric character, strips leading digits from
/// each token, lowercases everything, and joins camel-case. Internal
/// capitalization carries no word-boundary meaning (`fooBar` -> `foobar`).
/// Returns an empty string when no token survives; callers must fall back to
/// an id-based name in that case.
pub fn make_variable_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for token in raw.split(|c: char| !c.is_ascii_alphanumeric()) {
        let token = token.trim_start_matches(|c: char| c.is_ascii_digit());
        if token.is_empty() {
            continue;
        }
        let mut chars = token.chars();
        let first = chars.next().expect("token is non-empty");
        if out.is_empty() {
            out.push(first.to_ascii_lowercase());
        } else {
            out.push(first.to_ascii_uppercase());
        }
        out.extend(chars.map(|c| c.to_ascii_lowercase()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let ids = IdGenerator::new();
        let first = ids.next();
        assert_eq!(first, 1);
        assert_eq!(ids.next(), first + 1);
        assert_eq!(ids.next(), first + 2);
    }

    #[test]
    fn seed_is_configurable() {
        let ids = IdGenerator::with_seed(0);
        assert_eq!(ids.next(), 0);
        assert_eq!(ids.next(), 1);
    }

    #[test]
    fn variable_names() {
        assert_eq!(make_variable_name("fooBar"), "foobar");
        assert_eq!(make_variable_name("foo bar"), "fooBar");
        assert_eq!(make_variable_name("foo BAR"), "fooBar");
        assert_eq!(make_variable_name("foo$bar-qux"), "fooBarQux");
        assert_eq!(make_variable_name("foo bar-=-qux"), "fooBarQux");
        assert_eq!(make_variable_name("foo_bar"), "fooBar");
        assert_eq!(make_variable_name("3.14foo15Bar9"), "foo15bar9");
    }

    #[test]
    fn all_delimiter_input_yields_empty_name() {
        assert_eq!(make_variable_name("3.14"), "");
        assert_eq!(make_variable_name("-=-"), "");
        assert_eq!(make_variable_name(""), "");
    }

    #[test]
    fn idempotent_on_lowercase_single_token() {
        let once = make_variable_name("example");
        assert_eq!(make_variable_name(&once), once);
    }
}
