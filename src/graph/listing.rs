// src/graph/listing.rs

//! Directory-listing nodes: a named, deterministic enumeration of the files
//! under a scan root, filtered by include/exclude configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Configuration for one directory scan.
///
/// Include `patterns` match file names (e.g. `*.def`); `exclude_patterns`
/// match full paths; `exclude_paths` prune whole subtrees; `exclude_files`
/// match a file name or a full path.
#[derive(Debug, Clone)]
pub struct DirScanSpec {
    pub path: PathBuf,
    pub recurse: bool,
    pub patterns: Vec<String>,
    pub exclude_paths: Vec<PathBuf>,
    pub exclude_files: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl DirScanSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recurse: true,
            patterns: vec!["*".to_string()],
            exclude_paths: Vec::new(),
            exclude_files: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Node identity for this scan. Two nodes with the same root but
    /// different filters are distinct listings.
    pub fn listing_name(&self) -> String {
        format!(
            "{}|recurse={}|{}",
            self.path.display(),
            self.recurse,
            self.patterns.join(",")
        )
    }
}

/// A directory-listing node: the scan spec plus, once resolved, the file set.
#[derive(Debug, Clone)]
pub struct ListingNode {
    pub spec: DirScanSpec,
    files: Option<Vec<String>>,
}

impl ListingNode {
    pub fn new(spec: DirScanSpec) -> Self {
        Self { spec, files: None }
    }

    pub fn is_resolved(&self) -> bool {
        self.files.is_some()
    }

    /// Files discovered by the scan, in listing order. Empty until resolved.
    pub fn files(&self) -> &[String] {
        self.files.as_deref().unwrap_or(&[])
    }

    /// Enumerate the filesystem and record the file set. Re-resolving
    /// replaces the previous set.
    pub fn resolve(&mut self) -> Result<()> {
        self.files = Some(scan_directory(&self.spec)?);
        Ok(())
    }

    /// Inject a file set directly, bypassing the filesystem.
    pub fn set_files(&mut self, files: Vec<String>) {
        self.files = Some(files);
    }
}

/// Enumerate files under `spec.path` according to the scan configuration.
///
/// Entries are visited in sorted order per directory, depth-first, so the
/// listing is deterministic. A missing scan root yields an empty listing.
pub fn scan_directory(spec: &DirScanSpec) -> Result<Vec<String>> {
    let include = build_globset(&spec.patterns)
        .with_context(|| format!("building include globset for scan of {:?}", spec.path))?;
    let exclude = if spec.exclude_patterns.is_empty() {
        None
    } else {
        Some(
            build_globset(&spec.exclude_patterns)
                .with_context(|| format!("building exclude globset for scan of {:?}", spec.path))?,
        )
    };

    let mut files = Vec::new();
    walk(&spec.path, spec, &include, exclude.as_ref(), &mut files)?;
    Ok(files)
}

fn walk(
    dir: &Path,
    spec: &DirScanSpec,
    include: &GlobSet,
    exclude: Option<&GlobSet>,
    out: &mut Vec<String>,
) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("reading directory {:?}", dir));
        }
    };

    let mut entries: Vec<_> = entries
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("reading directory entries of {:?}", dir))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let ftype = entry
            .file_type()
            .with_context(|| format!("inspecting {:?}", path))?;

        if ftype.is_dir() {
            if spec.recurse && !is_excluded_path(&path, &spec.exclude_paths) {
                walk(&path, spec, include, exclude, out)?;
            }
            continue;
        }
        if !ftype.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !include.is_match(name.as_ref()) {
            continue;
        }
        if is_excluded_file(&path, &name, &spec.exclude_files) {
            continue;
        }
        if let Some(ex) = exclude {
            if ex.is_match(&path) {
                continue;
            }
        }
        out.push(path.to_string_lossy().into_owned());
    }
    Ok(())
}

fn is_excluded_path(path: &Path, exclude_paths: &[PathBuf]) -> bool {
    exclude_paths.iter().any(|p| path.starts_with(p))
}

fn is_excluded_file(path: &Path, name: &str, exclude_files: &[String]) -> bool {
    exclude_files
        .iter()
        .any(|ex| name == ex || path == Path::new(ex) || path.ends_with(ex))
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
