/// Subdirectory of a resource root holding pipeline JSON files
pub const PIPELINE_DIR: &str = "pipeline";
/// Subdirectory of a resource root holding template images
pub const IMAGE_DIR: &str = "image";
/// Default cap on search results
pub const DEFAULT_MAX_RESULTS: usize = 50;
/// Idle seconds before a debug stream emits a keep-alive frame
pub const DEFAULT_HEARTBEAT_SECS: u64 = 15;
/// Recognition tag reported for nodes that do not declare one
pub const UNKNOWN_RECOGNITION: &str = "Unknown";
/// Name of the profile synthesized when a config lists none
pub const DEFAULT_PROFILE_NAME: &str = "Default Profile";
