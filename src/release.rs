//! Coordinating module for the create-stage-upload release workflow.
//!
//! Stages run strictly in order:
//! `Unreleased -> RemoteReleaseCreated -> [DriveAssetsStaged] -> AssetUploaded -> Done`.
//! The first failure aborts the run. A release that was already created
//! stays on the remote even when staging or the upload fails afterwards.
//!
//! Callers are expected to confirm [`crate::state::StateChecker::build_up_to_date`]
//! and [`crate::state::StateChecker::version_control_clean`] before calling in.

use std::fmt;
use std::io;
use std::path::PathBuf;

use tracing::{error, info};

use crate::config::Settings;
use crate::contract::{NewRelease, ReleaseApi, ReleaseId};
use crate::drive::{release_relative, stage_drive_release};
use crate::error::{ReleaseError, Result};
use crate::github::GithubClient;

/// Everything one release run needs. Not persisted.
#[derive(Clone, Default)]
pub struct ReleaseDescriptor {
    pub version: String,
    pub target_commitish: String,
    pub org: String,
    pub repo: String,
    /// Files to copy (or archive) into `local_release`.
    pub drive_files: Vec<PathBuf>,
    pub local_release: Option<PathBuf>,
    pub zip: bool,
    pub token: String,
}

impl fmt::Debug for ReleaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseDescriptor")
            .field("version", &self.version)
            .field("target_commitish", &self.target_commitish)
            .field("org", &self.org)
            .field("repo", &self.repo)
            .field("drive_files", &self.drive_files)
            .field("local_release", &self.local_release)
            .field("zip", &self.zip)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ReleaseDescriptor {
    /// Reject descriptors that would fail after the remote release exists.
    pub fn validate(&self) -> Result<()> {
        if !self.drive_files.is_empty() && self.local_release.is_none() {
            return Err(ReleaseError::fs(
                PathBuf::new(),
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "drive release files were given without a local release directory",
                ),
            ));
        }
        if let Some(missing) = self.drive_files.iter().find(|f| !f.is_file()) {
            return Err(ReleaseError::fs(
                missing,
                io::Error::new(io::ErrorKind::NotFound, "drive release file not found"),
            ));
        }
        for file in &self.drive_files {
            release_relative(file)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStage {
    Unreleased,
    RemoteReleaseCreated,
    DriveAssetsStaged,
    AssetUploaded,
    Done,
}

impl fmt::Display for ReleaseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseStage::Unreleased => "unreleased",
            ReleaseStage::RemoteReleaseCreated => "remote release created",
            ReleaseStage::DriveAssetsStaged => "drive assets staged",
            ReleaseStage::AssetUploaded => "asset uploaded",
            ReleaseStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct ReleaseReport {
    pub release_id: ReleaseId,
    /// Stages passed through, in order, ending with `Done`.
    pub stages: Vec<ReleaseStage>,
    /// Drive manifest lines, empty when nothing was released to drive.
    pub drive_manifest: Vec<String>,
    pub upload_response: Option<String>,
}

struct StageLog {
    stages: Vec<ReleaseStage>,
}

impl StageLog {
    fn new() -> Self {
        Self {
            stages: vec![ReleaseStage::Unreleased],
        }
    }

    fn advance(&mut self, stage: ReleaseStage) {
        info!(stage = %stage, "[RELEASE] Stage reached");
        self.stages.push(stage);
    }
}

/// Run the release workflow against `api`.
pub async fn publish_release<A>(
    api: &A,
    descriptor: &ReleaseDescriptor,
    asset_content_type: &str,
) -> Result<ReleaseReport>
where
    A: ReleaseApi + ?Sized,
{
    descriptor.validate()?;
    let mut log = StageLog::new();
    info!(
        version = %descriptor.version,
        org = %descriptor.org,
        repo = %descriptor.repo,
        drive_files = descriptor.drive_files.len(),
        "[RELEASE] Starting release"
    );

    let payload = NewRelease::published(&descriptor.version, &descriptor.target_commitish);
    let release_id = api.create_release(&payload).await.map_err(|e| {
        error!(error = %e, "[RELEASE][ERROR] Release creation failed");
        e
    })?;
    log.advance(ReleaseStage::RemoteReleaseCreated);

    let mut drive_manifest = Vec::new();
    let mut upload_response = None;

    let drive_target = descriptor
        .local_release
        .as_ref()
        .filter(|_| !descriptor.drive_files.is_empty());
    if let Some(local_release) = drive_target {
        let staged = stage_drive_release(
            &descriptor.drive_files,
            local_release,
            &descriptor.version,
            descriptor.zip,
        )
        .map_err(|e| {
            error!(error = %e, release_id, "[RELEASE][ERROR] Drive staging failed; remote release left in place");
            e
        })?;
        log.advance(ReleaseStage::DriveAssetsStaged);

        let asset = staged.asset(asset_content_type);
        let response = api.upload_asset(release_id, &asset).await.map_err(|e| {
            error!(error = %e, release_id, "[RELEASE][ERROR] Asset upload failed; remote release left in place");
            e
        })?;
        log.advance(ReleaseStage::AssetUploaded);

        drive_manifest = staged.lines().to_vec();
        staged.close()?;
        upload_response = Some(response);
    }

    log.advance(ReleaseStage::Done);
    Ok(ReleaseReport {
        release_id,
        stages: log.stages,
        drive_manifest,
        upload_response,
    })
}

/// Publish to GitHub using `settings`.
pub async fn release(settings: &Settings, descriptor: &ReleaseDescriptor) -> Result<ReleaseReport> {
    let client = GithubClient::new(
        &settings.github,
        &descriptor.org,
        &descriptor.repo,
        &descriptor.token,
    )?;
    publish_release(&client, descriptor, &settings.github.asset_content_type).await
}
