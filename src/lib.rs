//! Nightly Deploy - publishes CI build artifacts to a GitHub prerelease.
//!
//! On a qualifying CI build, the release tagged `nightly` is replaced: any
//! existing one is deleted, a fresh prerelease is created with the same name
//! and body, and the installer packages from the output directory are
//! uploaded to it one at a time.

pub mod assets;
pub mod config;
pub mod deploy;
pub mod dry_run;
pub mod effects;
pub mod github;
pub mod types;

#[cfg(test)]
mod test_utils;
