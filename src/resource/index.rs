// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Multi-root resource index.
//!
//! [`ResourceIndex`] fans out over one [`PipelineFileStore`] per configured
//! root. Construction eagerly loads every pipeline file of every root; after
//! that, the stores' caches are the authority and the global entry list is
//! always derived from them, so a save is visible to the next search or
//! graph walk without a reload.
//!
//! Node ids are not unique across the index. The same id in two files, or
//! in two roots, shows up as two entries.

use crate::errors::{ResourceError, ResourceResult};
use crate::observability::messages::resource::IndexLoaded;
use crate::observability::messages::StructuredLog;
use crate::resource::node::NodeMap;
use crate::resource::store::PipelineFileStore;
use crate::utils::{normalize_path, root_label};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One node of one file of one root.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub root: PathBuf,
    pub filename: String,
    pub node_id: String,
    pub body: Value,
}

/// Borrowed view of one entry, handed out by [`ResourceIndex::for_each_entry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryRef<'a> {
    pub root: &'a Path,
    pub filename: &'a str,
    pub node_id: &'a str,
    pub body: &'a Value,
}

impl EntryRef<'_> {
    pub fn to_entry(&self) -> IndexEntry {
        IndexEntry {
            root: self.root.to_path_buf(),
            filename: self.filename.to_string(),
            node_id: self.node_id.to_string(),
            body: self.body.clone(),
        }
    }
}

/// A row of the file picker produced by [`ResourceIndex::list_all_files`].
///
/// Placeholder rows (missing or empty `pipeline/`) carry `value: None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileListing {
    pub label: String,
    pub value: Option<String>,
    pub source: PathBuf,
    pub path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ResourceIndex {
    stores: Vec<PipelineFileStore>,
}

impl ResourceIndex {
    /// Build an index over `roots` and load all of their pipeline files.
    ///
    /// Roots are normalized and deduplicated, keeping first-seen order.
    /// A root without `pipeline/` contributes nothing and is not an error.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut stores: Vec<PipelineFileStore> = Vec::new();
        for root in roots {
            let normalized = normalize_path(root.as_ref());
            if stores.iter().any(|s| s.root() == normalized) {
                continue;
            }
            stores.push(PipelineFileStore::new(normalized));
        }

        let index = Self { stores };
        index.load_everything();
        index
    }

    fn load_everything(&self) {
        let started = Instant::now();
        let file_count: usize = self.stores.iter().map(PipelineFileStore::reload).sum();
        IndexLoaded {
            root_count: self.stores.len(),
            file_count,
            node_count: self.node_count(),
            duration: started.elapsed(),
        }
        .log();
    }

    /// Repeat the eager load, swapping each store's cache for what is on
    /// disk now. Stores are refreshed one at a time and never appear empty
    /// in between.
    pub fn reload(&self) {
        self.load_everything();
    }

    pub fn roots(&self) -> Vec<&Path> {
        self.stores.iter().map(PipelineFileStore::root).collect()
    }

    pub fn stores(&self) -> &[PipelineFileStore] {
        &self.stores
    }

    /// The store owning `root`, matched after normalization.
    pub fn store(&self, root: &Path) -> ResourceResult<&PipelineFileStore> {
        let normalized = normalize_path(root);
        self.stores
            .iter()
            .find(|s| s.root() == normalized)
            .ok_or(ResourceError::UnknownRoot(normalized))
    }

    /// Visit every loaded node in index order without copying it.
    ///
    /// Each store's lock is held while its entries are visited, so `f`
    /// must not call back into the index.
    pub fn for_each_entry(&self, mut f: impl FnMut(EntryRef<'_>)) {
        for store in &self.stores {
            store.with_cache(|cache| {
                for (filename, nodes) in cache {
                    for (node_id, body) in nodes {
                        f(EntryRef {
                            root: store.root(),
                            filename,
                            node_id,
                            body,
                        });
                    }
                }
            });
        }
    }

    /// Every loaded node, ordered by root, then filename, then file order.
    pub fn entries(&self) -> Vec<IndexEntry> {
        let mut entries = Vec::new();
        self.for_each_entry(|entry| entries.push(entry.to_entry()));
        entries
    }

    pub fn node_count(&self) -> usize {
        self.stores
            .iter()
            .map(|s| s.with_cache(|cache| cache.values().map(NodeMap::len).sum::<usize>()))
            .sum()
    }

    /// File picker rows for every root.
    ///
    /// A root without `pipeline/` yields one "missing" placeholder, a root
    /// whose `pipeline/` holds no JSON yields one "empty" placeholder, and
    /// otherwise there is one row per file labelled `"<file> (<root name>)"`.
    pub fn list_all_files(&self) -> Vec<FileListing> {
        let mut listings = Vec::new();
        for store in &self.stores {
            let label = root_label(store.root());
            let source = store.root().to_path_buf();

            if !store.has_pipeline_dir() {
                listings.push(FileListing {
                    label: format!("{label} (no pipeline directory)"),
                    value: None,
                    source,
                    path: None,
                });
                continue;
            }

            let files = store.list_files();
            if files.is_empty() {
                listings.push(FileListing {
                    label: format!("{label} (empty)"),
                    value: None,
                    source,
                    path: None,
                });
                continue;
            }

            listings.extend(files.into_iter().map(|filename| FileListing {
                label: format!("{filename} ({label})"),
                path: Some(store.file_path(&filename)),
                value: Some(filename),
                source: source.clone(),
            }));
        }
        listings
    }

    /// Nodes of one file, loading it on a cache miss.
    ///
    /// `Ok(None)` means the file does not exist under that root.
    pub fn get_nodes(&self, root: &Path, filename: &str) -> ResourceResult<Option<NodeMap>> {
        self.store(root)?.get(filename)
    }

    /// Save a file in either accepted shape; returns the node count written.
    pub fn save_nodes(&self, root: &Path, filename: &str, content: &Value) -> ResourceResult<usize> {
        self.store(root)?.save(filename, content)
    }

    /// Edit one file in place; see [`PipelineFileStore::update`].
    pub fn update_nodes<R>(
        &self,
        root: &Path,
        filename: &str,
        f: impl FnOnce(&mut NodeMap) -> ResourceResult<R>,
    ) -> ResourceResult<Option<R>> {
        self.store(root)?.update(filename, f)
    }

    /// Create an empty file. `Ok(false)` if it already exists.
    pub fn create_file(&self, root: &Path, filename: &str) -> ResourceResult<bool> {
        match self.store(root)?.create(filename) {
            Ok(_) => Ok(true),
            Err(ResourceError::FileExists { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}
