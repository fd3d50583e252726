// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Reference graph walks over node forward references.
//!
//! Nodes link to each other through `next`, `interrupt` and `on_error`.
//! The walks here follow those links depth-first:
//!
//! * [`chain_in_file`] stays inside one file's node map
//! * [`ResourceIndex::node_chain`] resolves targets against the whole index
//!   and may hop between files and roots
//!
//! Both visit children in field order (`next`, `interrupt`, `on_error`) and
//! list order within a field, and both keep a visited set, so cycles and
//! self-loops terminate. The output is first-visit order, which matches a
//! recursive pre-order walk; an explicit stack keeps long chains off the
//! call stack.
//!
//! The same reference fields drive [`ResourceIndex::find_references_to`]
//! and the optional reference rewrite in [`ResourceIndex::rename_node`].

use crate::errors::{ResourceError, ResourceResult};
use crate::observability::messages::resource::NodeRenamed;
use crate::observability::messages::StructuredLog;
use crate::resource::index::ResourceIndex;
use crate::resource::node::{replace_reference, NodeBody, NodeMap, ReferenceField};
use crate::resource::store::PipelineFileStore;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One step of a cross-file chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainLink {
    pub node_id: String,
    pub filename: String,
    pub root: PathBuf,
}

/// A node field that points at some target id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReference {
    pub root: PathBuf,
    pub filename: String,
    pub node_id: String,
    pub field: ReferenceField,
}

/// Outcome of a rename.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameReport {
    pub old_id: String,
    pub new_id: String,
    /// References rewritten to the new id; empty when rewriting was not requested.
    pub updated_references: Vec<NodeReference>,
}

/// Depth-first walk from `start`, returning first-visit order.
///
/// `lookup` resolves an id to its outgoing reference ids and the item to
/// record for it.
fn walk<N>(start: &str, lookup: impl Fn(&str) -> Option<(Vec<String>, N)>) -> Vec<N> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![start.to_string()];

    while let Some(node_id) = stack.pop() {
        if visited.contains(&node_id) {
            continue;
        }
        let Some((children, item)) = lookup(&node_id) else {
            continue;
        };
        visited.insert(node_id);
        order.push(item);
        stack.extend(children.into_iter().rev());
    }

    order
}

fn child_ids(body: &Value) -> Vec<String> {
    NodeBody::new(body).all_references().map(str::to_string).collect()
}

/// Node ids reachable from `start` without leaving `nodes`.
///
/// Targets missing from the map are skipped. A `start` that is not in the
/// map gives an empty chain.
pub fn chain_in_file(nodes: &NodeMap, start: &str) -> Vec<String> {
    walk(start, |id| nodes.get_key_value(id).map(|(key, body)| (child_ids(body), key.clone())))
}

impl ResourceIndex {
    /// [`chain_in_file`] over one file of one root.
    ///
    /// `Ok(None)` when the file does not exist.
    pub fn node_chain_in_file(
        &self,
        root: &Path,
        filename: &str,
        start: &str,
    ) -> ResourceResult<Option<Vec<String>>> {
        Ok(self
            .get_nodes(root, filename)?
            .map(|nodes| chain_in_file(&nodes, start)))
    }

    /// Chain from `start` across every loaded file.
    ///
    /// Each id resolves to its first entry in index order, so when an id is
    /// defined in several files the earliest root and filename win.
    pub fn node_chain(&self, start: &str) -> Vec<ChainLink> {
        let mut first_by_id: HashMap<String, (&PipelineFileStore, String)> = HashMap::new();
        for store in self.stores() {
            store.with_cache(|cache| {
                for (filename, nodes) in cache {
                    for node_id in nodes.keys() {
                        first_by_id
                            .entry(node_id.clone())
                            .or_insert_with(|| (store, filename.clone()));
                    }
                }
            });
        }

        walk(start, |id| {
            let (store, filename) = first_by_id.get(id)?;
            let children = store.with_cache(|cache| cache.get(filename)?.get(id).map(child_ids))?;
            Some((
                children,
                ChainLink {
                    node_id: id.to_string(),
                    filename: filename.clone(),
                    root: store.root().to_path_buf(),
                },
            ))
        })
    }

    /// Every (file, node, field) in the index that references `target`.
    pub fn find_references_to(&self, target: &str) -> Vec<NodeReference> {
        let mut references = Vec::new();
        self.for_each_entry(|entry| {
            let body = NodeBody::new(entry.body);
            for field in ReferenceField::ALL {
                if body.references_target(field, target) {
                    references.push(NodeReference {
                        root: entry.root.to_path_buf(),
                        filename: entry.filename.to_string(),
                        node_id: entry.node_id.to_string(),
                        field,
                    });
                }
            }
        });
        references
    }

    /// Rename a node within its file, optionally rewriting references to it.
    ///
    /// The node keeps its position in the file. With `update_references`,
    /// every field anywhere in the index naming `old_id` is rewritten to
    /// `new_id`, preserving string vs. list shape, and each touched file is
    /// saved once. Every file is edited under its store's lock, so saves
    /// made concurrently to the same file are not lost.
    pub fn rename_node(
        &self,
        root: &Path,
        filename: &str,
        old_id: &str,
        new_id: &str,
        update_references: bool,
    ) -> ResourceResult<RenameReport> {
        if old_id.is_empty() || new_id.is_empty() {
            return Err(ResourceError::EmptyNodeId);
        }

        let store = self.store(root)?;
        let file_not_found = || ResourceError::FileNotFound {
            root: store.root().to_path_buf(),
            filename: filename.to_string(),
        };
        let node_not_found = || ResourceError::NodeNotFound {
            filename: filename.to_string(),
            node_id: old_id.to_string(),
        };

        let mut updated_references = Vec::new();
        if old_id == new_id {
            let nodes = store.get(filename)?.ok_or_else(file_not_found)?;
            if !nodes.contains_key(old_id) {
                return Err(node_not_found());
            }
        } else {
            store
                .update(filename, |nodes| {
                    if !nodes.contains_key(old_id) {
                        return Err(node_not_found());
                    }
                    if nodes.contains_key(new_id) {
                        return Err(ResourceError::NodeIdConflict {
                            filename: filename.to_string(),
                            node_id: new_id.to_string(),
                        });
                    }
                    *nodes = std::mem::take(nodes)
                        .into_iter()
                        .map(|(key, body)| if key == old_id { (new_id.to_string(), body) } else { (key, body) })
                        .collect();
                    Ok(())
                })?
                .ok_or_else(file_not_found)?;

            if update_references {
                updated_references = self.rewrite_references(old_id, new_id)?;
            }
        }

        NodeRenamed {
            filename,
            old_id,
            new_id,
            references_updated: updated_references.len(),
        }
        .log();

        Ok(RenameReport {
            old_id: old_id.to_string(),
            new_id: new_id.to_string(),
            updated_references,
        })
    }

    /// Rewrite `old_id` to `new_id` in every file that references it.
    ///
    /// The scan only picks candidate files; each one is re-checked and
    /// rewritten inside its own locked update.
    fn rewrite_references(&self, old_id: &str, new_id: &str) -> ResourceResult<Vec<NodeReference>> {
        let mut files: Vec<(PathBuf, String)> = self
            .find_references_to(old_id)
            .into_iter()
            .map(|reference| (reference.root, reference.filename))
            .collect();
        // References arrive in index order, so one file's are adjacent.
        files.dedup();

        let mut rewritten = Vec::new();
        for (root, filename) in files {
            let store = self.store(&root)?;
            let file_references = store.update(&filename, |nodes| {
                let mut found = Vec::new();
                for (node_id, body) in nodes.iter_mut() {
                    for field in ReferenceField::ALL {
                        if replace_reference(body, field, old_id, new_id) {
                            found.push(NodeReference {
                                root: root.clone(),
                                filename: filename.clone(),
                                node_id: node_id.clone(),
                                field,
                            });
                        }
                    }
                }
                Ok(found)
            })?;
            rewritten.extend(file_references.unwrap_or_default());
        }

        Ok(rewritten)
    }
}
