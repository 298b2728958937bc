//! Shared utilities.
//!
//! Path arithmetic and idempotent filesystem removal, plus test helpers.

pub mod fs;

#[cfg(test)]
pub mod testutil;
