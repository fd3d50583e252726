// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-root pipeline file store.
//!
//! A [`PipelineFileStore`] owns the on-disk truth for the `pipeline/`
//! directory of one resource root, plus an in-memory cache of every file it
//! has loaded. Once a file is cached, the cache answers all queries until
//! the file is saved again or the store is reloaded.
//!
//! All cache access goes through one mutex per store. A load-on-miss holds
//! that lock across the read so two callers never race to populate the
//! same entry, and a save holds it across the write so the file on disk
//! and the cache entry change together. [`PipelineFileStore::update`]
//! extends that to a whole read-modify-write.

use crate::config::consts::{IMAGE_DIR, PIPELINE_DIR};
use crate::errors::{ResourceError, ResourceResult};
use crate::observability::messages::resource::{
    PipelineDirectoryMissing, PipelineFileCreated, PipelineFileLoadFailed, PipelineFileSaved,
};
use crate::observability::messages::StructuredLog;
use crate::resource::node::{normalize_nodes, NodeMap};
use crate::utils::{has_json_extension, normalize_path};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Cached pipeline files of one root, keyed by filename.
pub type FileCache = BTreeMap<String, NodeMap>;

#[derive(Debug)]
pub struct PipelineFileStore {
    root: PathBuf,
    cache: Mutex<FileCache>,
}

impl PipelineFileStore {
    /// Create a store for `root`. The path is normalized; nothing is read yet.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize_path(root.as_ref()),
            cache: Mutex::new(FileCache::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pipeline_dir(&self) -> PathBuf {
        self.root.join(PIPELINE_DIR)
    }

    pub fn image_dir(&self) -> PathBuf {
        self.root.join(IMAGE_DIR)
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.pipeline_dir().join(filename)
    }

    pub fn has_pipeline_dir(&self) -> bool {
        self.pipeline_dir().is_dir()
    }

    fn lock(&self) -> MutexGuard<'_, FileCache> {
        // A panic while holding the lock cannot leave a half-written entry:
        // entries are only ever replaced whole.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `*.json` files directly under `pipeline/`, sorted by name.
    ///
    /// A missing or unreadable directory yields an empty list.
    pub fn list_files(&self) -> Vec<String> {
        let dir = self.pipeline_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                if err.kind() == io::ErrorKind::NotFound {
                    PipelineDirectoryMissing { root: &self.root }.log();
                } else {
                    PipelineFileLoadFailed {
                        path: &dir,
                        error: &err,
                    }
                    .log();
                }
                return Vec::new();
            }
        };

        let mut files: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| has_json_extension(name))
            .collect();
        files.sort();
        files
    }

    /// Read, parse and normalize one file, replacing its cache entry.
    ///
    /// Returns `Ok(None)` when the file does not exist, which is distinct
    /// from an existing file holding an empty mapping.
    pub fn load(&self, filename: &str) -> ResourceResult<Option<NodeMap>> {
        let mut cache = self.lock();
        self.load_locked(&mut cache, filename)
    }

    fn load_locked(&self, cache: &mut FileCache, filename: &str) -> ResourceResult<Option<NodeMap>> {
        let path = self.file_path(filename);
        let Some(nodes) = read_node_file(&path)? else {
            return Ok(None);
        };
        cache.insert(filename.to_string(), nodes.clone());
        Ok(Some(nodes))
    }

    /// Cache-first lookup, loading the file on a miss.
    pub fn get(&self, filename: &str) -> ResourceResult<Option<NodeMap>> {
        let mut cache = self.lock();
        if let Some(nodes) = cache.get(filename) {
            return Ok(Some(nodes.clone()));
        }
        self.load_locked(&mut cache, filename)
    }

    /// Cached content only; never touches the disk.
    pub fn cached(&self, filename: &str) -> Option<NodeMap> {
        self.lock().get(filename).cloned()
    }

    /// Run `f` against the whole cache without cloning it.
    pub fn with_cache<R>(&self, f: impl FnOnce(&FileCache) -> R) -> R {
        f(&self.lock())
    }

    /// Normalize `content` (either accepted shape) and write it.
    ///
    /// Creates `pipeline/` if needed, writes pretty-printed JSON with
    /// non-ASCII text kept as-is, refreshes the cache, and returns the
    /// number of nodes written.
    pub fn save(&self, filename: &str, content: &Value) -> ResourceResult<usize> {
        self.save_nodes(filename, normalize_nodes(content))
    }

    /// Write an already-canonical node map.
    pub fn save_nodes(&self, filename: &str, nodes: NodeMap) -> ResourceResult<usize> {
        let mut cache = self.lock();
        self.write_locked(&mut cache, filename, nodes)
    }

    /// Read-modify-write one file under the store lock.
    ///
    /// `f` edits a copy of the current nodes, loaded from disk on a cache
    /// miss. When it returns `Ok`, the copy is written and cached before the
    /// lock is released, so a save from another caller cannot land in
    /// between and be overwritten. An error from `f` leaves disk and cache
    /// untouched. `Ok(None)` when the file does not exist.
    pub fn update<R>(
        &self,
        filename: &str,
        f: impl FnOnce(&mut NodeMap) -> ResourceResult<R>,
    ) -> ResourceResult<Option<R>> {
        let mut cache = self.lock();
        let mut nodes = match cache.get(filename) {
            Some(nodes) => nodes.clone(),
            None => match self.load_locked(&mut cache, filename)? {
                Some(nodes) => nodes,
                None => return Ok(None),
            },
        };

        let outcome = f(&mut nodes)?;
        self.write_locked(&mut cache, filename, nodes)?;
        Ok(Some(outcome))
    }

    fn write_locked(&self, cache: &mut FileCache, filename: &str, nodes: NodeMap) -> ResourceResult<usize> {
        let dir = self.pipeline_dir();
        let path = dir.join(filename);
        fs::create_dir_all(&dir).map_err(|e| ResourceError::io("create pipeline directory", &dir, e))?;

        let bytes = to_pretty_json(&nodes).map_err(|e| ResourceError::io("serialize pipeline file", &path, e.into()))?;
        write_replacing(&path, &bytes)?;

        let count = nodes.len();
        cache.insert(filename.to_string(), nodes);
        PipelineFileSaved {
            path: &path,
            node_count: count,
        }
        .log();
        Ok(count)
    }

    /// Create an empty pipeline file and seed the cache with it.
    ///
    /// A `.json` suffix is appended when missing. Returns the final
    /// filename, or [`ResourceError::FileExists`] if it is already there.
    pub fn create(&self, filename: &str) -> ResourceResult<String> {
        let filename = if has_json_extension(filename) {
            filename.to_string()
        } else {
            format!("{filename}.json")
        };
        let dir = self.pipeline_dir();
        let path = dir.join(&filename);

        let mut cache = self.lock();
        fs::create_dir_all(&dir).map_err(|e| ResourceError::io("create pipeline directory", &dir, e))?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ResourceError::FileExists {
                    root: self.root.clone(),
                    filename,
                });
            }
            Err(err) => return Err(ResourceError::io("create pipeline file", &path, err)),
        };
        file.write_all(b"{}")
            .map_err(|e| ResourceError::io("create pipeline file", &path, e))?;

        cache.insert(filename.clone(), NodeMap::new());
        PipelineFileCreated { path: &path }.log();
        Ok(filename)
    }

    /// Replace the cache with every listed file as it is on disk.
    ///
    /// The new cache is built while holding the lock and swapped in whole,
    /// so readers see either the old contents or the new ones, never a
    /// partly loaded store. A file that fails to read or parse is logged
    /// and left out; the rest still load. Returns how many files were
    /// loaded.
    pub fn reload(&self) -> usize {
        let mut cache = self.lock();
        let mut fresh = FileCache::new();
        for filename in self.list_files() {
            let path = self.file_path(&filename);
            match read_node_file(&path) {
                Ok(Some(nodes)) => {
                    fresh.insert(filename, nodes);
                }
                Ok(None) => {}
                Err(err) => PipelineFileLoadFailed {
                    path: &path,
                    error: &err,
                }
                .log(),
            }
        }

        let loaded = fresh.len();
        *cache = fresh;
        loaded
    }
}

fn read_node_file(path: &Path) -> ResourceResult<Option<NodeMap>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(ResourceError::io("read pipeline file", path, err)),
    };

    let value: Value = serde_json::from_str(&content).map_err(|source| ResourceError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(normalize_nodes(&value)))
}

fn to_pretty_json(nodes: &NodeMap) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    nodes.serialize(&mut serializer)?;
    Ok(out)
}

/// Write through a sibling temp file and rename it over the target.
fn write_replacing(path: &Path, bytes: &[u8]) -> ResourceResult<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&temp, bytes).map_err(|e| ResourceError::io("write pipeline file", &temp, e))?;
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(ResourceError::io("replace pipeline file", path, err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with_files(files: &[(&str, &str)]) -> (TempDir, PipelineFileStore) {
        let dir = TempDir::new().unwrap();
        let pipeline = dir.path().join("pipeline");
        fs::create_dir_all(&pipeline).unwrap();
        for (name, content) in files {
            fs::write(pipeline.join(name), content).unwrap();
        }
        let store = PipelineFileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_list_files_filters_json_case_insensitively() {
        let (dir, store) = store_with_files(&[
            ("b.json", "{}"),
            ("A.JSON", "{}"),
            ("notes.txt", ""),
        ]);
        fs::create_dir(dir.path().join("pipeline").join("nested.json")).unwrap();

        assert_eq!(store.list_files(), vec!["A.JSON", "b.json"]);
    }

    #[test]
    fn test_list_files_without_pipeline_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = PipelineFileStore::new(dir.path());

        assert!(!store.has_pipeline_dir());
        assert!(store.list_files().is_empty());
    }

    #[test]
    fn test_load_distinguishes_missing_from_empty() {
        let (_dir, store) = store_with_files(&[("empty.json", "{}")]);

        assert_eq!(store.load("empty.json").unwrap(), Some(NodeMap::new()));
        assert_eq!(store.load("absent.json").unwrap(), None);
    }

    #[test]
    fn test_load_normalizes_list_shape() {
        let (_dir, store) = store_with_files(&[(
            "legacy.json",
            r#"[{"id": "A", "data": {"data": {"next": "B"}}}, {"id": "B", "data": {}}]"#,
        )]);

        let nodes = store.load("legacy.json").unwrap().unwrap();
        assert_eq!(Value::Object(nodes), json!({"A": {"next": "B"}, "B": {}}));
    }

    #[test]
    fn test_load_malformed_json_is_error() {
        let (_dir, store) = store_with_files(&[("bad.json", "{not json")]);

        let result = store.load("bad.json");
        assert!(matches!(result, Err(ResourceError::Malformed { .. })));
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let (_dir, store) = store_with_files(&[]);
        let content = json!([{"id": "Start", "data": {"next": ["Mid"], "text": "开始"}}]);

        let count = store.save("flow.json", &content).unwrap();
        assert_eq!(count, 1);

        let loaded = store.load("flow.json").unwrap().unwrap();
        assert_eq!(loaded, normalize_nodes(&content));
    }

    #[test]
    fn test_save_writes_indented_unescaped_json() {
        let (dir, store) = store_with_files(&[]);
        store.save("flow.json", &json!({"A": {"text": "开始"}})).unwrap();

        let written = fs::read_to_string(dir.path().join("pipeline").join("flow.json")).unwrap();
        assert_eq!(written, "{\n    \"A\": {\n        \"text\": \"开始\"\n    }\n}");
    }

    #[test]
    fn test_save_creates_pipeline_dir_and_updates_cache() {
        let dir = TempDir::new().unwrap();
        let store = PipelineFileStore::new(dir.path());

        store.save("new.json", &json!({"N": {}})).unwrap();

        assert!(store.has_pipeline_dir());
        assert_eq!(store.cached("new.json").unwrap().len(), 1);
        assert!(!dir.path().join("pipeline").join(".new.json.tmp").exists());
    }

    #[test]
    fn test_get_prefers_cache_over_disk() {
        let (dir, store) = store_with_files(&[("a.json", r#"{"A": {}}"#)]);
        store.load("a.json").unwrap();
        fs::write(dir.path().join("pipeline").join("a.json"), r#"{"Changed": {}}"#).unwrap();

        let nodes = store.get("a.json").unwrap().unwrap();
        assert!(nodes.contains_key("A"));

        let reloaded = store.load("a.json").unwrap().unwrap();
        assert!(reloaded.contains_key("Changed"));
    }

    #[test]
    fn test_get_loads_on_miss() {
        let (_dir, store) = store_with_files(&[("late.json", r#"{"L": {}}"#)]);

        assert!(store.cached("late.json").is_none());
        assert!(store.get("late.json").unwrap().is_some());
        assert!(store.cached("late.json").is_some());
    }

    #[test]
    fn test_create_appends_suffix_and_rejects_existing() {
        let (dir, store) = store_with_files(&[("taken.json", "{}")]);

        assert_eq!(store.create("fresh").unwrap(), "fresh.json");
        assert_eq!(
            fs::read_to_string(dir.path().join("pipeline").join("fresh.json")).unwrap(),
            "{}"
        );
        assert_eq!(store.cached("fresh.json"), Some(NodeMap::new()));

        let result = store.create("taken.json");
        assert!(matches!(result, Err(ResourceError::FileExists { .. })));
    }

    #[test]
    fn test_reload_skips_corrupt_files() {
        let (_dir, store) = store_with_files(&[
            ("good.json", r#"{"G": {}}"#),
            ("bad.json", "[oops"),
        ]);

        assert_eq!(store.reload(), 1);
        assert!(store.cached("good.json").is_some());
        assert!(store.cached("bad.json").is_none());
    }

    #[test]
    fn test_reload_replaces_cache_with_disk_state() {
        let (dir, store) = store_with_files(&[("keep.json", r#"{"K": {}}"#), ("gone.json", r#"{"G": {}}"#)]);
        store.reload();
        store.save("keep.json", &json!({"K": {}, "K2": {}})).unwrap();

        fs::remove_file(dir.path().join("pipeline").join("gone.json")).unwrap();
        fs::write(dir.path().join("pipeline").join("new.json"), r#"{"N": {}}"#).unwrap();

        assert_eq!(store.reload(), 2);
        assert!(store.cached("gone.json").is_none());
        assert_eq!(store.cached("keep.json").unwrap().len(), 2);
        assert!(store.cached("new.json").is_some());
    }

    #[test]
    fn test_update_edits_and_persists() {
        let (_dir, store) = store_with_files(&[("flow.json", r#"{"A": {}}"#)]);

        let outcome = store
            .update("flow.json", |nodes| {
                nodes.insert("B".to_string(), json!({"next": "A"}));
                Ok(nodes.len())
            })
            .unwrap();
        assert_eq!(outcome, Some(2));
        assert_eq!(store.cached("flow.json").unwrap().len(), 2);

        let on_disk = store.load("flow.json").unwrap().unwrap();
        assert_eq!(on_disk["B"], json!({"next": "A"}));
    }

    #[test]
    fn test_update_missing_file_is_none() {
        let (dir, store) = store_with_files(&[]);

        let outcome = store.update("absent.json", |_| Ok(())).unwrap();
        assert_eq!(outcome, None);
        assert!(!dir.path().join("pipeline").join("absent.json").exists());
    }

    #[test]
    fn test_update_error_leaves_file_untouched() {
        let (dir, store) = store_with_files(&[("flow.json", r#"{"A": {}}"#)]);

        let result = store.update("flow.json", |nodes| {
            nodes.clear();
            Err::<(), _>(ResourceError::EmptyNodeId)
        });

        assert!(matches!(result, Err(ResourceError::EmptyNodeId)));
        assert!(store.cached("flow.json").unwrap().contains_key("A"));
        assert_eq!(
            fs::read_to_string(dir.path().join("pipeline").join("flow.json")).unwrap(),
            r#"{"A": {}}"#
        );
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let (_dir, store) = store_with_files(&[("flow.json", "{}")]);
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for round in 0..25 {
                        store
                            .update("flow.json", |nodes| {
                                nodes.insert(format!("W{worker}-{round}"), json!({}));
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.cached("flow.json").unwrap().len(), 100);
        assert_eq!(store.load("flow.json").unwrap().unwrap().len(), 100);
    }

    #[test]
    fn test_root_is_normalized() {
        let store = PipelineFileStore::new("res/./base/");
        assert_eq!(store.root(), Path::new("res/base"));
        assert_eq!(store.pipeline_dir(), PathBuf::from("res/base/pipeline"));
    }
}
