// src/graph/stamp.rs

//! Build stamps: mtime of built artifacts, plus an optional blake3
//! input-content stamp store for hash-based staleness.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::{debug, info};

use crate::types::NodeName;

/// Relative path (from the build root) to the stamps file.
pub const STAMP_FILE_PATH: &str = ".execdag/stamps";

fn stamp_file_path(root: &Path) -> PathBuf {
    root.join(STAMP_FILE_PATH)
}

/// Modification time of `path` in milliseconds since the Unix epoch.
pub fn file_mtime_millis(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let meta = fs::metadata(path).with_context(|| format!("stat'ing {:?}", path))?;
    let mtime = meta
        .modified()
        .with_context(|| format!("reading mtime of {:?}", path))?;
    let since_epoch = mtime
        .duration_since(UNIX_EPOCH)
        .with_context(|| format!("mtime of {:?} predates the epoch", path))?;
    Ok(since_epoch.as_millis() as u64)
}

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file =
        File::open(path).with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute a deterministic hash over the contents of the given files.
///
/// Order of `paths` does not matter; we sort them before hashing to keep the
/// hash stable. Missing files are skipped (they contribute nothing).
pub fn compute_hash_for_paths<I, P>(paths: I) -> Result<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut hasher = Hasher::new();

    let mut paths_vec: Vec<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    paths_vec.sort();

    for path in paths_vec {
        if path.is_file() {
            debug!("hashing file {:?}", path);
            let file_hash = compute_file_hash(&path)?;
            hasher.update(file_hash.as_bytes());
        }
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, "computed aggregate input hash");
    Ok(hash)
}

/// Abstract storage for per-node input stamps.
pub trait StampStore: Send + Sync {
    fn load(&self, node: &str) -> Result<Option<String>>;
    fn save(&mut self, node: &str, hash: &str) -> Result<()>;
    /// Remove stamps for nodes that are not in the `active_nodes` list.
    fn prune(&mut self, active_nodes: &[&str]) -> Result<()>;
}

/// Stores stamps in a file (`.execdag/stamps`).
pub struct FileStampStore {
    root: PathBuf,
}

impl FileStampStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl StampStore for FileStampStore {
    fn load(&self, node: &str) -> Result<Option<String>> {
        let map = load_all_stamps(&self.root)?;
        Ok(map.get(node).cloned())
    }

    fn save(&mut self, node: &str, hash: &str) -> Result<()> {
        let mut map = load_all_stamps(&self.root)?;
        map.insert(node.to_string(), hash.to_string());
        save_all_stamps(&self.root, &map)?;
        info!(node = %node, hash = %hash, "stored node stamp (file)");
        Ok(())
    }

    fn prune(&mut self, active_nodes: &[&str]) -> Result<()> {
        let mut map = load_all_stamps(&self.root)?;
        let initial_len = map.len();
        map.retain(|k, _| active_nodes.contains(&k.as_str()));

        if map.len() < initial_len {
            save_all_stamps(&self.root, &map)?;
            info!(
                removed = initial_len - map.len(),
                "pruned stale node stamps (file)"
            );
        }
        Ok(())
    }
}

/// Stores stamps in memory only.
pub struct MemoryStampStore {
    map: HashMap<String, String>,
}

impl MemoryStampStore {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl Default for MemoryStampStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StampStore for MemoryStampStore {
    fn load(&self, node: &str) -> Result<Option<String>> {
        Ok(self.map.get(node).cloned())
    }

    fn save(&mut self, node: &str, hash: &str) -> Result<()> {
        self.map.insert(node.to_string(), hash.to_string());
        Ok(())
    }

    fn prune(&mut self, active_nodes: &[&str]) -> Result<()> {
        self.map.retain(|k, _| active_nodes.contains(&k.as_str()));
        Ok(())
    }
}

/// Load all stored node stamps from `<root>/.execdag/stamps`.
fn load_all_stamps(root: &Path) -> Result<HashMap<NodeName, String>> {
    let path = stamp_file_path(root);

    if !path.exists() {
        return Ok(HashMap::new());
    }

    let file = File::open(&path).with_context(|| format!("opening stamp file at {:?}", path))?;
    let reader = BufReader::new(file);

    let mut map = HashMap::new();

    for line_res in reader.lines() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((name, hash)) = trimmed.rsplit_once(char::is_whitespace) {
            map.insert(name.to_string(), hash.trim().to_string());
        }
    }

    Ok(map)
}

/// Persist all node stamps to `<root>/.execdag/stamps`.
fn save_all_stamps(root: &Path, map: &HashMap<NodeName, String>) -> Result<()> {
    let path = stamp_file_path(root);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating stamp directory at {:?}", parent))?;
    }

    let file = File::create(&path).with_context(|| format!("creating stamp file at {:?}", path))?;
    let mut writer = BufWriter::new(file);

    for (name, hash) in map.iter() {
        writeln!(writer, "{} {}", name, hash)?;
    }

    writer.flush()?;
    Ok(())
}
