// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Template image assets under `<root>/image/`.
//!
//! Node bodies name their template images by a path relative to the image
//! directory. The operations here resolve those paths, report which
//! candidates are still referenced, write uploaded images and remove
//! deleted ones.
//!
//! Relative paths are joined onto the image directory and normalized
//! lexically; `..` segments are not rejected.

use crate::errors::{ResourceError, ResourceResult};
use crate::observability::messages::resource::{ImageDeleted, ImageSaved};
use crate::observability::messages::StructuredLog;
use crate::resource::index::ResourceIndex;
use crate::resource::node::NodeBody;
use crate::resource::store::PipelineFileStore;
use crate::utils::normalize_path;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reason recorded when a delete target does not exist.
pub const MISSING_IMAGE_REASON: &str = "File not found";

/// Which candidate images are referenced, in candidate order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageUsage {
    pub unused_images: Vec<String>,
    pub used_images: Vec<ImageUse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUse {
    pub path: String,
    /// `"<filename>:<node id>"` for every referencing node.
    pub used_by: Vec<String>,
}

/// An image to write, as sent by an editor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageUpload {
    pub path: String,
    /// Base64 payload, optionally behind a `data:<mime>;base64,` header.
    #[serde(alias = "base64")]
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of [`ResourceIndex::process_images`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageBatchReport {
    pub deleted: Vec<String>,
    pub delete_failed: Vec<ImageFailure>,
    pub saved: Vec<String>,
    pub save_failed: Vec<ImageFailure>,
}

/// One template of one node, with its image inlined when present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateImage {
    pub path: String,
    pub found: bool,
    /// `data:<mime>;base64,<payload>`; `None` when the image is missing.
    pub data_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeTemplates {
    pub node_id: String,
    pub images: Vec<TemplateImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileTemplates {
    pub base_image_path: PathBuf,
    pub results: Vec<NodeTemplates>,
}

fn resolve(store: &PipelineFileStore, relative: &str) -> PathBuf {
    normalize_path(&store.image_dir().join(relative))
}

fn strip_data_uri(payload: &str) -> &str {
    if payload.starts_with("data:") {
        payload.split_once(',').map_or(payload, |(_, data)| data)
    } else {
        payload
    }
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Read an image file as a data URI. Unreadable files count as missing.
fn encode_data_uri(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    Some(format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes)))
}

fn save_into(store: &PipelineFileStore, relative: &str, payload: &str) -> ResourceResult<PathBuf> {
    let path = resolve(store, relative);
    let bytes = STANDARD
        .decode(strip_data_uri(payload).trim())
        .map_err(|source| ResourceError::InvalidPayload {
            path: relative.to_string(),
            source,
        })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ResourceError::io("create image directory", parent, e))?;
    }
    fs::write(&path, &bytes).map_err(|e| ResourceError::io("write image", &path, e))?;

    ImageSaved {
        path: &path,
        bytes: bytes.len(),
    }
    .log();
    Ok(path)
}

fn delete_from(store: &PipelineFileStore, relative: &str) -> ResourceResult<bool> {
    let path = resolve(store, relative);
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(ResourceError::io("delete image", &path, err)),
    }

    let image_root = normalize_path(&store.image_dir());
    let mut removed_parent = false;
    if let Some(parent) = path.parent().filter(|p| *p != image_root.as_path()) {
        let is_empty = fs::read_dir(parent)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            fs::remove_dir(parent).map_err(|e| ResourceError::io("remove empty image directory", parent, e))?;
            removed_parent = true;
        }
    }

    ImageDeleted {
        path: &path,
        removed_parent,
    }
    .log();
    Ok(true)
}

impl ResourceIndex {
    /// `<root>/image/<relative>`, normalized.
    pub fn image_path(&self, root: &Path, relative: &str) -> ResourceResult<PathBuf> {
        Ok(resolve(self.store(root)?, relative))
    }

    /// Map each referenced candidate to the nodes that use it.
    ///
    /// Scans the cached files of `root` except `exclude_filename`, reading
    /// each node's `template`. Candidates absent from the result are unused.
    pub fn check_image_references(
        &self,
        root: &Path,
        candidates: &[String],
        exclude_filename: Option<&str>,
    ) -> ResourceResult<BTreeMap<String, Vec<String>>> {
        let store = self.store(root)?;
        let wanted: HashSet<&str> = candidates.iter().map(String::as_str).collect();
        let mut used: BTreeMap<String, Vec<String>> = BTreeMap::new();

        store.with_cache(|cache| {
            for (filename, nodes) in cache {
                if exclude_filename == Some(filename.as_str()) {
                    continue;
                }
                for (node_id, body) in nodes {
                    for template in NodeBody::new(body).templates() {
                        if wanted.contains(template) {
                            used.entry(template.to_string())
                                .or_default()
                                .push(format!("{filename}:{node_id}"));
                        }
                    }
                }
            }
        });

        Ok(used)
    }

    /// [`check_image_references`](Self::check_image_references) split into
    /// unused and used candidates. Blank and repeated candidates are ignored.
    pub fn check_images(
        &self,
        root: &Path,
        candidates: &[String],
        exclude_filename: Option<&str>,
    ) -> ResourceResult<ImageUsage> {
        let mut used = self.check_image_references(root, candidates, exclude_filename)?;
        let mut usage = ImageUsage::default();
        let mut seen = HashSet::new();

        for candidate in candidates {
            if candidate.is_empty() || !seen.insert(candidate.as_str()) {
                continue;
            }
            match used.remove(candidate) {
                Some(used_by) => usage.used_images.push(ImageUse {
                    path: candidate.clone(),
                    used_by,
                }),
                None => usage.unused_images.push(candidate.clone()),
            }
        }
        Ok(usage)
    }

    /// Decode `payload` and write it to `<root>/image/<relative>`.
    ///
    /// Intermediate directories are created and an existing file is
    /// overwritten. Returns the written path.
    pub fn save_image(&self, root: &Path, relative: &str, payload: &str) -> ResourceResult<PathBuf> {
        save_into(self.store(root)?, relative, payload)
    }

    /// Remove `<root>/image/<relative>`.
    ///
    /// `Ok(false)` when the file is not there. When the removal leaves its
    /// parent directory empty, and that parent is not the image directory
    /// itself, the parent goes too. Only one level is cleaned up.
    pub fn delete_image(&self, root: &Path, relative: &str) -> ResourceResult<bool> {
        delete_from(self.store(root)?, relative)
    }

    /// Delete then save a batch of images, collecting per-item outcomes.
    ///
    /// Blank paths and blank payloads are skipped. A failing item is
    /// recorded with its reason and the batch carries on.
    pub fn process_images(
        &self,
        root: &Path,
        delete_paths: &[String],
        uploads: &[ImageUpload],
    ) -> ResourceResult<ImageBatchReport> {
        let store = self.store(root)?;
        let mut report = ImageBatchReport::default();

        for path in delete_paths.iter().filter(|p| !p.is_empty()) {
            match delete_from(store, path) {
                Ok(true) => report.deleted.push(path.clone()),
                Ok(false) => report.delete_failed.push(ImageFailure {
                    path: path.clone(),
                    reason: MISSING_IMAGE_REASON.to_string(),
                }),
                Err(err) => report.delete_failed.push(ImageFailure {
                    path: path.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        for upload in uploads
            .iter()
            .filter(|u| !u.path.is_empty() && !u.payload.is_empty())
        {
            match save_into(store, &upload.path, &upload.payload) {
                Ok(_) => report.saved.push(upload.path.clone()),
                Err(err) => report.save_failed.push(ImageFailure {
                    path: upload.path.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        Ok(report)
    }

    /// Templates of every node in one file, with images inlined.
    ///
    /// Nodes without templates are left out. `Ok(None)` when the file does
    /// not exist.
    pub fn file_templates(&self, root: &Path, filename: &str) -> ResourceResult<Option<FileTemplates>> {
        let store = self.store(root)?;
        let Some(nodes) = store.get(filename)? else {
            return Ok(None);
        };

        let results = nodes
            .iter()
            .filter_map(|(node_id, body)| {
                let images: Vec<TemplateImage> = NodeBody::new(body)
                    .templates()
                    .into_iter()
                    .map(|template| {
                        let data_uri = encode_data_uri(&resolve(store, template));
                        TemplateImage {
                            path: template.to_string(),
                            found: data_uri.is_some(),
                            data_uri,
                        }
                    })
                    .collect();
                (!images.is_empty()).then(|| NodeTemplates {
                    node_id: node_id.clone(),
                    images,
                })
            })
            .collect();

        Ok(Some(FileTemplates {
            base_image_path: store.image_dir(),
            results,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PIXEL: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    fn write_pipeline(root: &Path, name: &str, content: &str) {
        let dir = root.join("pipeline");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    fn write_image(root: &Path, relative: &str) {
        let path = root.join("image").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, PIXEL).unwrap();
    }

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_image_path_joins_image_dir() {
        let root = TempDir::new().unwrap();
        let index = ResourceIndex::new([root.path()]);

        let path = index.image_path(root.path(), "ui/./ok.png").unwrap();
        assert_eq!(path, normalize_path(root.path()).join("image").join("ui").join("ok.png"));
    }

    #[test]
    fn test_check_references_used_and_unused() {
        let root = TempDir::new().unwrap();
        write_pipeline(root.path(), "a.json", r#"{"A": {"template": "x.png"}}"#);
        let index = ResourceIndex::new([root.path()]);

        let used = index
            .check_image_references(root.path(), &paths(&["x.png"]), None)
            .unwrap();
        assert_eq!(used.get("x.png"), Some(&vec!["a.json:A".to_string()]));

        let usage = index.check_images(root.path(), &paths(&["y.png"]), None).unwrap();
        assert_eq!(usage.unused_images, vec!["y.png"]);
        assert!(usage.used_images.is_empty());
    }

    #[test]
    fn test_check_images_partitions_in_candidate_order_and_excludes_file() {
        let root = TempDir::new().unwrap();
        write_pipeline(
            root.path(),
            "a.json",
            r#"{"A": {"template": ["b.png", "a.png"]}, "B": {"template": "b.png"}}"#,
        );
        write_pipeline(root.path(), "editing.json", r#"{"E": {"template": "c.png"}}"#);
        let index = ResourceIndex::new([root.path()]);

        let usage = index
            .check_images(root.path(), &paths(&["c.png", "b.png", "a.png", "b.png", ""]), Some("editing.json"))
            .unwrap();

        assert_eq!(usage.unused_images, vec!["c.png"]);
        let used: Vec<(&str, usize)> = usage
            .used_images
            .iter()
            .map(|u| (u.path.as_str(), u.used_by.len()))
            .collect();
        assert_eq!(used, vec![("b.png", 2), ("a.png", 1)]);
    }

    #[test]
    fn test_save_image_strips_data_uri_and_creates_dirs() {
        let root = TempDir::new().unwrap();
        let index = ResourceIndex::new([root.path()]);
        let payload = format!("data:image/png;base64,{}", STANDARD.encode(PIXEL));

        let path = index.save_image(root.path(), "deep/dir/p.png", &payload).unwrap();

        assert_eq!(fs::read(&path).unwrap(), PIXEL);
        index.save_image(root.path(), "deep/dir/p.png", &STANDARD.encode(b"second")).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_save_image_rejects_bad_payload() {
        let root = TempDir::new().unwrap();
        let index = ResourceIndex::new([root.path()]);

        let result = index.save_image(root.path(), "bad.png", "%%% not base64 %%%");
        assert!(matches!(result, Err(ResourceError::InvalidPayload { .. })));
    }

    #[test]
    fn test_delete_image_cleans_one_empty_parent() {
        let root = TempDir::new().unwrap();
        write_image(root.path(), "outer/inner/a.png");
        let index = ResourceIndex::new([root.path()]);

        assert!(index.delete_image(root.path(), "outer/inner/a.png").unwrap());

        let image_dir = root.path().join("image");
        assert!(!image_dir.join("outer/inner").exists());
        assert!(image_dir.join("outer").is_dir());
    }

    #[test]
    fn test_delete_image_keeps_non_empty_parent_and_image_root() {
        let root = TempDir::new().unwrap();
        write_image(root.path(), "top.png");
        write_image(root.path(), "dir/a.png");
        write_image(root.path(), "dir/b.png");
        let index = ResourceIndex::new([root.path()]);

        assert!(index.delete_image(root.path(), "top.png").unwrap());
        assert!(index.delete_image(root.path(), "dir/a.png").unwrap());

        assert!(root.path().join("image").is_dir());
        assert!(root.path().join("image/dir/b.png").exists());
        assert!(!index.delete_image(root.path(), "top.png").unwrap());
    }

    #[test]
    fn test_process_images_collects_outcomes() {
        let root = TempDir::new().unwrap();
        write_image(root.path(), "old.png");
        let index = ResourceIndex::new([root.path()]);

        let uploads = vec![
            ImageUpload {
                path: "new.png".to_string(),
                payload: STANDARD.encode(PIXEL),
            },
            ImageUpload {
                path: "broken.png".to_string(),
                payload: "***".to_string(),
            },
            ImageUpload {
                path: "skipped.png".to_string(),
                payload: String::new(),
            },
        ];
        let report = index
            .process_images(root.path(), &paths(&["old.png", "ghost.png", ""]), &uploads)
            .unwrap();

        assert_eq!(report.deleted, vec!["old.png"]);
        assert_eq!(
            report.delete_failed,
            vec![ImageFailure {
                path: "ghost.png".to_string(),
                reason: MISSING_IMAGE_REASON.to_string(),
            }]
        );
        assert_eq!(report.saved, vec!["new.png"]);
        assert_eq!(report.save_failed.len(), 1);
        assert_eq!(report.save_failed[0].path, "broken.png");
        assert!(!root.path().join("image/skipped.png").exists());
    }

    #[test]
    fn test_upload_accepts_base64_field_name() {
        let upload: ImageUpload = serde_json::from_str(r#"{"path": "a.png", "base64": "AAAA"}"#).unwrap();
        assert_eq!(upload.payload, "AAAA");
    }

    #[test]
    fn test_file_templates_inline_found_images() {
        let root = TempDir::new().unwrap();
        write_image(root.path(), "here.png");
        write_pipeline(
            root.path(),
            "a.json",
            r#"{"A": {"template": ["here.png", "gone.jpg"]}, "Plain": {}, "B": {"template": "here.png"}}"#,
        );
        let index = ResourceIndex::new([root.path()]);

        let templates = index.file_templates(root.path(), "a.json").unwrap().unwrap();

        assert_eq!(templates.base_image_path, normalize_path(root.path()).join("image"));
        let nodes: Vec<&str> = templates.results.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(nodes, vec!["A", "B"]);

        let first = &templates.results[0].images;
        assert!(first[0].found);
        assert_eq!(
            first[0].data_uri.as_deref(),
            Some(format!("data:image/png;base64,{}", STANDARD.encode(PIXEL)).as_str())
        );
        assert!(!first[1].found);
        assert!(first[1].data_uri.is_none());

        assert!(index.file_templates(root.path(), "none.json").unwrap().is_none());
    }

    #[test]
    fn test_mime_guessing() {
        assert_eq!(mime_for(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.bin")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
    }
}
