//! Crate-wide constants.

/// Directory under the output root holding cairn's own bookkeeping.
pub const STATE_DIR: &str = ".cairn";

/// Argument cache file name within the state directory.
pub const ARGS_CACHE_FILENAME: &str = "args.json";

/// Current argument cache format version.
pub const ARGS_CACHE_VERSION: u32 = 1;

/// Directory under the output root holding intermediate objects.
pub const OBJECTS_DIR: &str = ".objs";

/// Environment variable that overrides the output root.
pub const OUTPUT_ROOT_ENV: &str = "CAIRN_OUTPUT";
