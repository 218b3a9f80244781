// src/graph/node.rs

//! The build node arena: named nodes with find-or-create semantics.
//!
//! Node identity is the output artifact path for exec nodes, the file path
//! for file nodes, and the scan signature for directory listings. File and
//! exec nodes are both "file-like": either may stand in wherever a file
//! dependency is expected, since an exec node's name *is* a file path.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::{ExecdagError, Result};
use crate::graph::listing::{DirScanSpec, ListingNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug)]
pub enum NodeKind {
    /// A plain file on disk.
    File,
    /// The enumerated contents of a directory.
    Listing(ListingNode),
    /// An external-tool invocation producing this node's output path.
    Exec(Box<ExecNode>),
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_file_like(&self) -> bool {
        matches!(self.kind, NodeKind::File | NodeKind::Exec(_))
    }
}

/// Declarative configuration of one exec node, as consumed from the config
/// loader.
#[derive(Debug, Clone)]
pub struct ExecSpec {
    /// Output artifact path; the node's identity.
    pub output: String,
    pub executable: String,
    pub inputs: Vec<String>,
    pub scans: Vec<DirScanSpec>,
    /// Argument template; `%1` expands to the inputs, `%2` to the output.
    pub arguments: String,
    pub working_dir: Option<PathBuf>,
    pub expected_return_code: i32,
    pub always_show_output: bool,
    pub use_stdout_as_output: bool,
    pub always_run: bool,
    pub environment: Vec<(String, String)>,
    /// Names of exec sections that must build before this one.
    pub after: Vec<String>,
}

impl ExecSpec {
    pub fn new(output: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            executable: executable.into(),
            inputs: Vec::new(),
            scans: Vec::new(),
            arguments: String::new(),
            working_dir: None,
            expected_return_code: 0,
            always_show_output: false,
            use_stdout_as_output: false,
            always_run: false,
            environment: Vec::new(),
            after: Vec::new(),
        }
    }
}

/// A build-graph node that runs an external tool.
///
/// Static dependency order is fixed: executable, then explicit input files,
/// then directory listings. `num_input_files` / `num_listings` record where
/// each group ends so dynamic expansion knows which deps are listings.
#[derive(Debug)]
pub struct ExecNode {
    pub spec: ExecSpec,
    pub static_deps: Vec<NodeId>,
    pub num_input_files: usize,
    pub num_listings: usize,
    /// Files discovered inside the listings; rebuilt from scratch on every
    /// resolution pass.
    pub dynamic_deps: Vec<NodeId>,
    /// Millisecond mtime of the output recorded after the last verified
    /// successful build.
    pub stamp_ms: Option<u64>,
}

impl ExecNode {
    pub fn new(spec: ExecSpec) -> Self {
        Self {
            spec,
            static_deps: Vec::new(),
            num_input_files: 0,
            num_listings: 0,
            dynamic_deps: Vec::new(),
            stamp_ms: None,
        }
    }

    /// The listing portion of the static dependencies. Empty while the
    /// static pass has not run.
    pub fn listing_deps(&self) -> &[NodeId] {
        let start = 1 + self.num_input_files;
        self.static_deps
            .get(start..start + self.num_listings)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Default)]
pub struct NodeGraph {
    index: HashMap<String, NodeId>,
    nodes: Vec<Node>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    fn insert(&mut self, name: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.insert(name.clone(), id);
        self.nodes.push(Node { name, kind });
        id
    }

    /// Find the node at `name`, or create a plain file node there.
    ///
    /// Fails if the name is taken by a node that is not file-like (a
    /// directory listing can never satisfy a file dependency).
    pub fn find_or_create_file(&mut self, name: &str) -> Result<NodeId> {
        if let Some(id) = self.find(name) {
            if self.node(id).is_file_like() {
                return Ok(id);
            }
            return Err(ExecdagError::ConfigError(format!(
                "node '{name}' exists but is not a file node"
            )));
        }
        Ok(self.insert(name.to_string(), NodeKind::File))
    }

    /// Find the listing node for `spec`, or create it unresolved.
    pub fn find_or_create_listing(&mut self, spec: DirScanSpec) -> Result<NodeId> {
        let name = spec.listing_name();
        if let Some(id) = self.find(&name) {
            if matches!(self.node(id).kind, NodeKind::Listing(_)) {
                return Ok(id);
            }
            return Err(ExecdagError::ConfigError(format!(
                "node '{name}' exists but is not a directory listing"
            )));
        }
        Ok(self.insert(name, NodeKind::Listing(ListingNode::new(spec))))
    }

    /// Register an exec node; its output path must not be claimed yet.
    pub fn add_exec(&mut self, node: ExecNode) -> Result<NodeId> {
        let output = node.spec.output.clone();
        if self.find(&output).is_some() {
            return Err(ExecdagError::ConfigError(format!(
                "duplicate node for output '{output}'"
            )));
        }
        Ok(self.insert(output, NodeKind::Exec(Box::new(node))))
    }

    pub fn exec(&self, id: NodeId) -> Option<&ExecNode> {
        match &self.node(id).kind {
            NodeKind::Exec(e) => Some(e),
            _ => None,
        }
    }

    pub fn exec_mut(&mut self, id: NodeId) -> Option<&mut ExecNode> {
        match &mut self.node_mut(id).kind {
            NodeKind::Exec(e) => Some(e),
            _ => None,
        }
    }

    pub fn listing(&self, id: NodeId) -> Option<&ListingNode> {
        match &self.node(id).kind {
            NodeKind::Listing(l) => Some(l),
            _ => None,
        }
    }

    pub fn listing_mut(&mut self, id: NodeId) -> Option<&mut ListingNode> {
        match &mut self.node_mut(id).kind {
            NodeKind::Listing(l) => Some(l),
            _ => None,
        }
    }
}
