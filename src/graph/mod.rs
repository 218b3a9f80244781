// src/graph/mod.rs

//! Build-graph nodes and dependency resolution.
//!
//! Responsibilities:
//! - Node arena with find-or-create semantics (`node.rs`).
//! - Directory-listing nodes and filesystem enumeration (`listing.rs`).
//! - Static/dynamic dependency resolution for exec nodes (`resolve.rs`).
//! - Build stamps and the hash stamp store (`stamp.rs`).

pub mod listing;
pub mod node;
pub mod resolve;
pub mod stamp;

pub use listing::{DirScanSpec, ListingNode, scan_directory};
pub use node::{ExecNode, ExecSpec, Node, NodeGraph, NodeId, NodeKind};
pub use resolve::{create_exec_node, resolve_dynamic_deps, resolve_static_deps};
pub use stamp::{FileStampStore, MemoryStampStore, StampStore, file_mtime_millis};
