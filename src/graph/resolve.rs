// src/graph/resolve.rs

//! Dependency resolution for exec nodes.
//!
//! The static pass runs once at graph-build time; the dynamic pass runs every
//! time the upstream directory listings change, and always rebuilds the
//! dynamic list from scratch so no entry from a previous pass survives.

use tracing::debug;

use crate::errors::{ExecdagError, Result};
use crate::graph::node::{ExecNode, ExecSpec, NodeGraph, NodeId};

/// Register an exec node in the graph, claiming its output path.
///
/// Static dependencies are not resolved yet; run [`resolve_static_deps`]
/// after every exec node has been created, so inputs may reference outputs of
/// nodes declared later in the config.
pub fn create_exec_node(graph: &mut NodeGraph, spec: ExecSpec) -> Result<NodeId> {
    graph.add_exec(ExecNode::new(spec))
}

/// Static pass: resolve executable, explicit inputs and directory scans to
/// nodes, in that order.
pub fn resolve_static_deps(graph: &mut NodeGraph, exec_id: NodeId) -> Result<()> {
    let (executable, inputs, scans) = {
        let exec = graph.exec(exec_id).ok_or_else(|| {
            ExecdagError::NodeNotFound(graph.name(exec_id).to_string())
        })?;
        (
            exec.spec.executable.clone(),
            exec.spec.inputs.clone(),
            exec.spec.scans.clone(),
        )
    };

    // The executable must resolve to exactly one file-like node.
    let exe_id = graph.find_or_create_file(&executable)?;

    let mut input_ids = Vec::with_capacity(inputs.len());
    for input in &inputs {
        input_ids.push(graph.find_or_create_file(input)?);
    }

    let mut listing_ids = Vec::with_capacity(scans.len());
    for scan in scans {
        listing_ids.push(graph.find_or_create_listing(scan)?);
    }

    let num_input_files = input_ids.len();
    let num_listings = listing_ids.len();
    let mut static_deps = Vec::with_capacity(1 + num_input_files + num_listings);
    static_deps.push(exe_id);
    static_deps.extend(input_ids);
    static_deps.extend(listing_ids);

    let Some(exec) = graph.exec_mut(exec_id) else {
        return Err(ExecdagError::NodeNotFound(format!("{exec_id:?}")));
    };
    exec.static_deps = static_deps;
    exec.num_input_files = num_input_files;
    exec.num_listings = num_listings;
    Ok(())
}

/// Dynamic pass: expand the resolved directory listings into file
/// dependencies.
///
/// A fresh list is built and swapped into the node whole; entries follow
/// listing order, then file order within each listing. Running the pass twice
/// over identical listing contents yields an identical list.
pub fn resolve_dynamic_deps(graph: &mut NodeGraph, exec_id: NodeId) -> Result<()> {
    let node_name = graph.name(exec_id).to_string();

    let discovered: Vec<String> = {
        let exec = graph
            .exec(exec_id)
            .ok_or_else(|| ExecdagError::NodeNotFound(node_name.clone()))?;

        let mut discovered = Vec::new();
        for &dep in exec.listing_deps() {
            let Some(listing) = graph.listing(dep) else {
                return Err(ExecdagError::ConfigError(format!(
                    "static dependency '{}' of '{}' is not a directory listing",
                    graph.name(dep),
                    node_name
                )));
            };
            discovered.extend(listing.files().iter().cloned());
        }
        discovered
    };

    let mut fresh = Vec::with_capacity(discovered.len());
    for file in &discovered {
        let id = graph.find_or_create_file(file).map_err(|_| {
            ExecdagError::ConfigError(format!(
                "discovered input '{file}' for '{node_name}' collides with a non-file node"
            ))
        })?;
        fresh.push(id);
    }

    debug!(
        node = %node_name,
        discovered = fresh.len(),
        "resolved dynamic dependencies"
    );

    let Some(exec) = graph.exec_mut(exec_id) else {
        return Err(ExecdagError::NodeNotFound(node_name));
    };
    exec.dynamic_deps = fresh;
    Ok(())
}
