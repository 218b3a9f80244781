// src/runner.rs

//! Sequential build runner: the stand-in for an external graph scheduler.
//!
//! The runner owns the node graph. It resolves directory listings, expands
//! dynamic dependencies, orders exec nodes topologically, applies the
//! staleness decision, and awaits one driver invocation at a time. It is
//! deliberately not a job pool; per-node execution semantics live in
//! `exec::driver`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info, warn};

use crate::config::model::ConfigFile;
use crate::errors::{ExecdagError, Result};
use crate::exec::driver::{self, BuildResult, OutputSink};
use crate::graph::stamp::{self, FileStampStore, StampStore};
use crate::graph::{NodeGraph, NodeId, create_exec_node, resolve_dynamic_deps, resolve_static_deps};
use crate::process::{AbortSignal, AbortToken};
use crate::types::BuildOptions;

/// Counts for one full build pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub built: usize,
    pub up_to_date: usize,
    pub failed: usize,
}

pub struct BuildRunner {
    graph: NodeGraph,
    /// Exec nodes in config order, keyed by their section name.
    execs: Vec<(String, NodeId)>,
    options: BuildOptions,
    main_abort: AbortToken,
    store: Box<dyn StampStore>,
}

impl BuildRunner {
    /// Build the node graph from a validated config.
    ///
    /// Output paths are claimed for every section first, then static
    /// dependencies are resolved, so inputs may reference outputs of nodes
    /// declared later in the file.
    pub fn from_config(
        cfg: &ConfigFile,
        root: &Path,
        options: BuildOptions,
        main_abort: AbortToken,
    ) -> Result<Self> {
        let mut graph = NodeGraph::new();
        let mut execs = Vec::with_capacity(cfg.exec.len());

        for (name, section) in cfg.exec.iter() {
            let spec = section.to_exec_spec(name)?;
            let id = create_exec_node(&mut graph, spec)?;
            execs.push((name.clone(), id));
        }
        for (_, id) in &execs {
            resolve_static_deps(&mut graph, *id)?;
        }

        let store: Box<dyn StampStore> = Box::new(FileStampStore::new(root.to_path_buf()));
        Ok(Self {
            graph,
            execs,
            options,
            main_abort,
            store,
        })
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    /// Run every stale node once, in dependency order.
    pub async fn run(&mut self, sink: &mut dyn OutputSink) -> Result<BuildSummary> {
        self.resolve_listings()?;

        let exec_ids: Vec<NodeId> = self.execs.iter().map(|(_, id)| *id).collect();
        for id in &exec_ids {
            resolve_dynamic_deps(&mut self.graph, *id)?;
        }

        let order = self.topo_order()?;

        let mut summary = BuildSummary::default();
        let mut failed: HashSet<NodeId> = HashSet::new();

        for id in order {
            if self.main_abort.is_set() {
                warn!("build aborted; stopping");
                break;
            }

            let name = self.graph.name(id).to_string();

            if self.exec_dep_ids(id).iter().any(|d| failed.contains(d)) {
                warn!(node = %name, "skipping node because a dependency failed");
                failed.insert(id);
                summary.failed += 1;
                continue;
            }

            if !self.is_stale(id)? {
                debug!(node = %name, "up to date");
                summary.up_to_date += 1;
                continue;
            }

            let abort = AbortSignal::new(Some(self.main_abort.clone()), None);
            match driver::execute(&mut self.graph, id, &self.options, abort, sink).await {
                BuildResult::Success => {
                    summary.built += 1;
                    if self.options.use_hash_stamps {
                        if let Err(e) = self.save_hash_stamp(id) {
                            warn!(node = %name, error = %e, "failed to store input hash stamp");
                        }
                    }
                }
                BuildResult::Failed => {
                    failed.insert(id);
                    summary.failed += 1;
                }
            }
        }

        if self.options.use_hash_stamps {
            let names: Vec<String> = self
                .execs
                .iter()
                .map(|(_, id)| self.graph.name(*id).to_string())
                .collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            if let Err(e) = self.store.prune(&refs) {
                warn!(error = %e, "failed to prune stamp store");
            }
        }

        info!(
            built = summary.built,
            up_to_date = summary.up_to_date,
            failed = summary.failed,
            "build pass finished"
        );
        Ok(summary)
    }

    /// Resolve every directory listing in the graph against the filesystem.
    fn resolve_listings(&mut self) -> Result<()> {
        let ids: Vec<NodeId> = self.graph.node_ids().collect();
        for id in ids {
            if let Some(listing) = self.graph.listing_mut(id) {
                listing.resolve()?;
            }
        }
        Ok(())
    }

    /// Exec-node dependencies of `id`: other exec nodes reachable through its
    /// static/dynamic deps (produced inputs) plus its `after` references.
    fn exec_dep_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut deps = Vec::new();
        let Some(exec) = self.graph.exec(id) else {
            return deps;
        };
        for &dep in exec.static_deps.iter().chain(exec.dynamic_deps.iter()) {
            if self.graph.exec(dep).is_some() {
                deps.push(dep);
            }
        }
        let name_to_id: HashMap<&str, NodeId> = self
            .execs
            .iter()
            .map(|(n, nid)| (n.as_str(), *nid))
            .collect();
        for dep_name in &exec.spec.after {
            if let Some(dep_id) = name_to_id.get(dep_name.as_str()) {
                deps.push(*dep_id);
            }
        }
        deps
    }

    /// Dependency order over exec nodes, derived from produced inputs and
    /// `after` references.
    fn topo_order(&self) -> Result<Vec<NodeId>> {
        let mut g: DiGraphMap<usize, ()> = DiGraphMap::new();
        for (_, id) in &self.execs {
            g.add_node(id.0);
        }
        for (_, id) in &self.execs {
            for dep in self.exec_dep_ids(*id) {
                g.add_edge(dep.0, id.0, ());
            }
        }

        match toposort(&g, None) {
            Ok(order) => Ok(order.into_iter().map(NodeId).collect()),
            Err(cycle) => Err(ExecdagError::GraphCycle(format!(
                "cycle detected involving node '{}'",
                self.graph.name(NodeId(cycle.node_id()))
            ))),
        }
    }

    /// Whether `id` needs to build.
    ///
    /// `always_run` wins unconditionally; otherwise the output must exist and
    /// be no older than any input, and — with hash stamps enabled — the
    /// aggregate input hash must match the stored one.
    fn is_stale(&self, id: NodeId) -> Result<bool> {
        let Some(exec) = self.graph.exec(id) else {
            return Ok(false);
        };
        let output = self.graph.name(id);

        if exec.spec.always_run {
            debug!(node = %output, "needs build (always_run = true)");
            return Ok(true);
        }

        let Ok(output_mtime) = stamp::file_mtime_millis(output) else {
            debug!(node = %output, "needs build (output missing)");
            return Ok(true);
        };

        let input_names = self.input_file_names(exec);
        for name in &input_names {
            match stamp::file_mtime_millis(name) {
                Ok(m) if m > output_mtime => {
                    debug!(node = %output, input = %name, "needs build (input newer than output)");
                    return Ok(true);
                }
                Ok(_) => {}
                Err(_) => {
                    debug!(node = %output, input = %name, "needs build (input missing)");
                    return Ok(true);
                }
            }
        }

        if self.options.use_hash_stamps {
            let current = stamp::compute_hash_for_paths(&input_names)?;
            match self.store.load(output)? {
                Some(stored) if stored == current => {}
                _ => {
                    debug!(node = %output, "needs build (input hash changed)");
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn save_hash_stamp(&mut self, id: NodeId) -> Result<()> {
        let (name, inputs) = {
            let Some(exec) = self.graph.exec(id) else {
                return Ok(());
            };
            (self.graph.name(id).to_string(), self.input_file_names(exec))
        };
        let hash = stamp::compute_hash_for_paths(&inputs)?;
        self.store.save(&name, &hash)?;
        Ok(())
    }

    /// Names of all file-like dependencies (executable, explicit inputs,
    /// discovered files).
    fn input_file_names(&self, exec: &crate::graph::ExecNode) -> Vec<String> {
        exec.static_deps
            .iter()
            .chain(exec.dynamic_deps.iter())
            .filter(|&&d| self.graph.node(d).is_file_like())
            .map(|&d| self.graph.name(d).to_string())
            .collect()
    }
}
