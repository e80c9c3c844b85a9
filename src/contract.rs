//! # contract: release hosting interface
//!
//! The orchestrator in [`crate::release`] talks to the hosting platform only
//! through [`ReleaseApi`], so the real HTTP client ([`crate::github::GithubClient`])
//! and test mocks are interchangeable.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; with the default
//!   `test-export-mocks` feature, `MockReleaseApi` is available to integration tests.

use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;

use crate::error::Result;

/// Numeric id the hosting platform assigns to a release.
pub type ReleaseId = u64;

/// JSON body of a release-creation request.
///
/// `draft` and `prerelease` serialize as JSON booleans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub target_commitish: String,
    pub name: String,
    pub body: String,
    pub draft: bool,
    pub prerelease: bool,
}

impl NewRelease {
    /// A published (non-draft, non-prerelease) release named after its tag.
    pub fn published(tag: &str, target_commitish: &str) -> Self {
        Self {
            tag_name: tag.to_string(),
            target_commitish: target_commitish.to_string(),
            name: tag.to_string(),
            body: String::new(),
            draft: false,
            prerelease: false,
        }
    }
}

/// A local file to attach to an existing release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// Name the asset is published under.
    pub name: String,
    pub path: PathBuf,
    pub content_type: String,
}

/// Operations the release workflow needs from the hosting platform.
///
/// Implementations must not retry: neither call is idempotent.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ReleaseApi: Send + Sync {
    /// Create a release and return its id.
    async fn create_release(&self, release: &NewRelease) -> Result<ReleaseId>;

    /// Upload `asset` to release `release_id`, returning the raw response body.
    async fn upload_asset(&self, release_id: ReleaseId, asset: &ReleaseAsset) -> Result<String>;
}
