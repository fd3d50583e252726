// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline resources: node files, the multi-root index over them, and the
//! search, graph and asset operations built on that index.
//!
//! A resource root is a directory holding `pipeline/*.json` node files and
//! an `image/` tree of template assets. [`ResourceIndex`] owns one
//! [`PipelineFileStore`] per root; everything else is an `impl` block on
//! the index, split by concern into [`search`], [`graph`] and [`assets`].

pub mod assets;
pub mod graph;
pub mod index;
pub mod node;
pub mod search;
pub mod store;


pub use assets::{
    FileTemplates, ImageBatchReport, ImageFailure, ImageUpload, ImageUsage, ImageUse, NodeTemplates,
    TemplateImage,
};
pub use graph::{chain_in_file, ChainLink, NodeReference, RenameReport};
pub use index::{EntryRef, FileListing, IndexEntry, ResourceIndex};
pub use node::{normalize_nodes, replace_reference, NodeBody, NodeMap, ReferenceField};
pub use search::{SearchHit, SearchQuery};
pub use store::PipelineFileStore;
