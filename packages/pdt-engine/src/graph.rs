use std::collections::{BTreeMap, HashSet};

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::template;

/// Compute the execution order for persisted derived tables: a depth-first
/// topological sort placing every view after all views it transitively
/// depends on. Edges are recomputed from the SQL templates on every call.
///
/// Fails with `Config` when a template references a view that was never
/// loaded, and with `CyclicDependency` when a back edge is found. Both fire
/// before any SQL executes.
pub fn execution_order(ctx: &RunContext) -> Result<Vec<String>> {
    let edges = build_edges(ctx)?;

    let mut order = Vec::with_capacity(edges.len());
    let mut visited = HashSet::new();
    let mut on_path = HashSet::new();

    // BTreeMap iteration keeps the order deterministic for a given input set.
    for name in edges.keys() {
        visit(name, &edges, &mut visited, &mut on_path, &mut order)?;
    }
    Ok(order)
}

/// Adjacency lists among persisted derived tables. Base tables and
/// non-persisted derived tables are never regenerated, so they contribute no
/// nodes and no edges; references to them only matter for rendering.
fn build_edges(ctx: &RunContext) -> Result<BTreeMap<String, Vec<String>>> {
    let mut edges = BTreeMap::new();

    for view in ctx.views().filter(|v| v.is_persisted()) {
        let sql = view
            .sql_template()
            .ok_or_else(|| Error::Config(format!("view '{}' has no SQL template", view.name())))?;

        let mut deps = Vec::new();
        for reference in template::extract_references(sql) {
            let dep = ctx.view(&reference).ok_or_else(|| {
                Error::Config(format!(
                    "view '{}' references unknown view '{}'",
                    view.name(),
                    reference
                ))
            })?;
            if dep.is_persisted() {
                deps.push(reference);
            }
        }
        edges.insert(view.name().to_string(), deps);
    }
    Ok(edges)
}

fn visit(
    name: &str,
    edges: &BTreeMap<String, Vec<String>>,
    visited: &mut HashSet<String>,
    on_path: &mut HashSet<String>,
    order: &mut Vec<String>,
) -> Result<()> {
    if visited.contains(name) {
        return Ok(());
    }
    if on_path.contains(name) {
        // Back edge: this node is still on the current recursion path.
        return Err(Error::CyclicDependency(name.to_string()));
    }

    on_path.insert(name.to_string());
    if let Some(deps) = edges.get(name) {
        for dep in deps {
            visit(dep, edges, visited, on_path, order)?;
        }
    }
    on_path.remove(name);

    visited.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}
