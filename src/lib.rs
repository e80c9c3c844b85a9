#![doc = "release-helper: build-automation helpers for research repositories."]

//! Provides a bounded-depth file lister, an externals descriptor parser,
//! repository state checks and a release workflow that creates a GitHub
//! release, stages files for a shared drive and uploads a manifest asset.

pub mod cli;
pub mod config;
pub mod contract;
pub mod drive;
pub mod error;
pub mod externals;
pub mod github;
pub mod load_config;
pub mod logging;
pub mod origin;
pub mod release;
pub mod state;
pub mod walk;

pub use cli::{run, Cli, Commands};
pub use error::{ReleaseError, Result};
