//! Dependency tree flattening
//!
//! Converts the resolved tree into the single deduplicated sequence that
//! drives code emission: a pre-order depth-first traversal, children in
//! declaration order, where a package already emitted is skipped on later
//! occurrences. A dependency's own dependencies therefore appear before the
//! dependency's siblings, keeping generated declarations well-ordered.

use rustc_hash::FxHashSet;

use crate::resolver::{PackageId, ResolutionContext};

/// Flatten the tree rooted at `root` into emission order.
///
/// The output length equals the number of distinct ids reachable from the
/// root; no id repeats.
pub fn flatten(ctx: &ResolutionContext, root: PackageId) -> Vec<PackageId> {
    let mut seen = FxHashSet::default();
    let mut order = Vec::new();
    visit(ctx, root, &mut seen, &mut order);
    order
}

fn visit(
    ctx: &ResolutionContext,
    id: PackageId,
    seen: &mut FxHashSet<PackageId>,
    order: &mut Vec<PackageId>,
) {
    if !seen.insert(id) {
        return;
    }
    order.push(id);
    for &dependency in &ctx.package(id).dependencies {
        visit(ctx, dependency, seen, order);
    }
}
