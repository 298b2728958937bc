//! cairn-lib: build-configuration layer over a host build engine
//!
//! This crate turns declarative per-project settings into a concrete,
//! dependency-ordered build graph:
//! - `args`: precedence-based argument resolution with a persistent cache
//! - `locate`: include/lib directory resolution for external libraries
//! - `external`: configure/build/clean driver for CMake and Autotools sub-builds
//! - `target`: target descriptors lowered into graph nodes per platform
//!
//! Every component takes an explicit `BuildContext` instead of touching
//! process-wide state.

pub mod args;
pub mod consts;
pub mod context;
pub mod external;
pub mod graph;
pub mod locate;
pub mod platform;
pub mod target;
pub mod util;

pub use context::{BuildContext, BuildMode, Diagnostics, EnvSnapshot};
