//! End-to-end tests of the cairn binary.

mod common;

mod clean_tests;
mod declare_tests;
#[cfg(unix)]
mod external_tests;
