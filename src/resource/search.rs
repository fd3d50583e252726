// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Node search over the resource index.
//!
//! A query is matched against two fields of every index entry: the storage
//! key and the display id (the body's own `id`, falling back to the key).
//! Substring mode compares lower-cased text; regex mode compiles the query
//! case-insensitively. Results are sorted by display id, ignoring case,
//! and then capped.

use crate::config::consts::DEFAULT_MAX_RESULTS;
use crate::observability::messages::resource::InvalidSearchPattern;
use crate::observability::messages::StructuredLog;
use crate::resource::index::ResourceIndex;
use crate::resource::node::NodeBody;
use crate::utils::normalize_path;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Parameters of one search.
///
/// # Example
/// ```
/// use pipeline_atlas::resource::SearchQuery;
///
/// let query = SearchQuery::new("battle")
///     .regex(false)
///     .excluding("main.json", None)
///     .limit(10);
/// assert_eq!(query.max_results, 10);
/// ```
#[derive(Debug, Clone)]
pub struct SearchQuery<'a> {
    pub query: &'a str,
    pub use_regex: bool,
    pub exclude_filename: Option<&'a str>,
    pub exclude_root: Option<&'a Path>,
    pub max_results: usize,
}

impl<'a> SearchQuery<'a> {
    pub fn new(query: &'a str) -> Self {
        Self {
            query,
            use_regex: false,
            exclude_filename: None,
            exclude_root: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn regex(mut self, use_regex: bool) -> Self {
        self.use_regex = use_regex;
        self
    }

    /// Skip `filename`, either in every root (`root == None`) or only in `root`.
    pub fn excluding(mut self, filename: &'a str, root: Option<&'a Path>) -> Self {
        self.exclude_filename = Some(filename);
        self.exclude_root = root;
        self
    }

    pub fn limit(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// One matching node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub filename: String,
    pub source: PathBuf,
    pub node_id: String,
    pub display_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

enum Matcher {
    Pattern(Regex),
    Substring(String),
}

impl Matcher {
    fn build(query: &str, use_regex: bool) -> Option<Self> {
        if !use_regex {
            return Some(Matcher::Substring(query.to_lowercase()));
        }
        match RegexBuilder::new(query).case_insensitive(true).build() {
            Ok(pattern) => Some(Matcher::Pattern(pattern)),
            Err(error) => {
                InvalidSearchPattern {
                    pattern: query,
                    error: &error,
                }
                .log();
                None
            }
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Matcher::Pattern(pattern) => pattern.is_match(candidate),
            Matcher::Substring(needle) => candidate.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Exclusion applies when the filename matches and either no root was
/// given or the root matches too.
struct Exclusion {
    filename: String,
    root: Option<PathBuf>,
}

impl Exclusion {
    fn from_query(query: &SearchQuery<'_>) -> Option<Self> {
        let filename = query.exclude_filename.filter(|f| !f.is_empty())?;
        let root = query
            .exclude_root
            .filter(|r| !r.as_os_str().is_empty())
            .map(normalize_path);
        Some(Self {
            filename: filename.to_string(),
            root,
        })
    }

    fn skips(&self, filename: &str, root: &Path) -> bool {
        filename == self.filename && self.root.as_deref().map_or(true, |r| r == root)
    }
}

impl ResourceIndex {
    /// Search node ids and display ids across every loaded file.
    ///
    /// An empty query, or a regex that fails to compile, yields no results.
    /// Output is sorted by display id (case-insensitive) and holds at most
    /// `max_results` hits; ties keep index order.
    pub fn search(&self, query: &SearchQuery<'_>) -> Vec<SearchHit> {
        if query.query.is_empty() {
            return Vec::new();
        }
        let Some(matcher) = Matcher::build(query.query, query.use_regex) else {
            return Vec::new();
        };
        let exclusion = Exclusion::from_query(query);

        let mut hits: Vec<SearchHit> = Vec::new();
        self.for_each_entry(|entry| {
            if exclusion
                .as_ref()
                .is_some_and(|ex| ex.skips(entry.filename, entry.root))
            {
                return;
            }
            let body = NodeBody::new(entry.body);
            let display_id = body.display_id(entry.node_id);
            if !(matcher.matches(entry.node_id) || matcher.matches(&display_id)) {
                return;
            }
            hits.push(SearchHit {
                kind: body.recognition(),
                filename: entry.filename.to_string(),
                source: entry.root.to_path_buf(),
                node_id: entry.node_id.to_string(),
                display_id,
            });
        });

        hits.sort_by_cached_key(|hit| hit.display_id.to_lowercase());
        hits.truncate(query.max_results);
        hits
    }
}
