//! End-to-end tests of cairn-lib through its public API.

mod common;

mod args_tests;
#[cfg(unix)]
mod external_tests;
mod locate_tests;
mod target_tests;
