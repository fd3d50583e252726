// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod paths;

pub use paths::{has_json_extension, normalize_path, root_label};
