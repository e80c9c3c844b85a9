#![doc = "GitHub implementation of the release interface: creates releases over the REST API and uploads assets to the uploads host."]
//!
//! - Construct [`GithubClient`] with the API settings, the repository
//!   coordinates and a token.
//! - Every request carries `Authorization: token {token}`.
//! - Calls are made once; any non-success response becomes
//!   [`ReleaseError::ReleaseApi`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::GithubSettings;
use crate::contract::{NewRelease, ReleaseApi, ReleaseAsset, ReleaseId};
use crate::error::{ReleaseError, Result};

/// Release as returned by the list endpoint; only the fields used here.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseSummary {
    pub id: ReleaseId,
    pub tag_name: String,
}

pub struct GithubClient {
    http: Client,
    api_base: String,
    uploads_base: String,
    org: String,
    repo: String,
    token: String,
    settle_delay: Duration,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base)
            .field("uploads_base", &self.uploads_base)
            .field("org", &self.org)
            .field("repo", &self.repo)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GithubClient {
    pub fn new(settings: &GithubSettings, org: &str, repo: &str, token: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| ReleaseError::api(format!("failed to build HTTP client: {e}")))?;
        tracing::info!(
            api_base = %settings.api_base,
            org,
            repo,
            token_set = !token.is_empty(),
            "Initialized GithubClient"
        );
        Ok(Self {
            http,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            uploads_base: settings.uploads_base.trim_end_matches('/').to_string(),
            org: org.to_string(),
            repo: repo.to_string(),
            token: token.to_string(),
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
        })
    }

    /// `{api_base}/repos/{org}/{repo}/releases`
    pub fn releases_url(&self) -> String {
        format!("{}/repos/{}/{}/releases", self.api_base, self.org, self.repo)
    }

    /// `{uploads_base}/repos/{org}/{repo}/releases/{id}/assets`
    pub fn assets_url(&self, release_id: ReleaseId) -> String {
        format!(
            "{}/repos/{}/{}/releases/{}/assets",
            self.uploads_base, self.org, self.repo, release_id
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        request.send().await.map_err(|e| {
            tracing::error!(error = ?e, what, "Release API request failed");
            ReleaseError::api(format!("{what}: request failed: {e}"))
        })
    }

    /// All releases of the repository, newest first as the API returns them.
    pub async fn list_releases(&self) -> Result<Vec<ReleaseSummary>> {
        let url = self.releases_url();
        tracing::info!(url = %url, "Listing releases");
        let response = self
            .send(self.authorized(self.http.get(&url)), "list releases")
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, url = %url, "Listing releases failed: {text}");
            return Err(ReleaseError::api(format!(
                "listing releases returned {status}: {text}"
            )));
        }
        response
            .json::<Vec<ReleaseSummary>>()
            .await
            .map_err(|e| ReleaseError::api(format!("could not decode release list: {e}")))
    }

    /// Id of the release tagged `tag`.
    pub async fn find_release_id(&self, tag: &str) -> Result<ReleaseId> {
        let releases = self.list_releases().await?;
        tracing::debug!(count = releases.len(), tag, "Fetched releases");
        releases
            .into_iter()
            .find(|release| release.tag_name == tag)
            .map(|release| release.id)
            .ok_or_else(|| ReleaseError::api(format!("no release tagged `{tag}` was found")))
    }

    fn report_failed_creation(&self, release: &NewRelease, status: &str, text: &str) -> ReleaseError {
        let payload = serde_json::to_string_pretty(release).unwrap_or_default();
        eprintln!(
            "We could not post the following json to the releases path\n{}\nThe json looks like this:",
            self.releases_url()
        );
        eprintln!(" 'tag_name' : '{}'", release.tag_name);
        eprintln!(" 'target_commitish' : '{}'", release.target_commitish);
        eprintln!(" 'name' : '{}'", release.name);
        eprintln!(" 'body' : '{}'", release.body);
        eprintln!(" 'draft' : '{}'", release.draft);
        eprintln!(" 'prerelease' : '{}'", release.prerelease);
        tracing::error!(status, url = %self.releases_url(), "Release creation failed: {text}");
        ReleaseError::api(format!(
            "release creation returned {status}: {text}\nattempted payload:\n{payload}"
        ))
    }
}

#[async_trait]
impl ReleaseApi for GithubClient {
    async fn create_release(&self, release: &NewRelease) -> Result<ReleaseId> {
        let url = self.releases_url();
        tracing::info!(url = %url, tag = %release.tag_name, "Creating release");

        let request = self.authorized(self.http.post(&url)).json(release);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.report_failed_creation(release, "no response", &e.to_string())),
        };
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.report_failed_creation(release, status.as_str(), &text));
        }
        tracing::info!(tag = %release.tag_name, status = %status, "Release created");

        tokio::time::sleep(self.settle_delay).await;
        let id = self.find_release_id(&release.tag_name).await?;
        tracing::info!(release_id = id, "Resolved release id");
        Ok(id)
    }

    async fn upload_asset(&self, release_id: ReleaseId, asset: &ReleaseAsset) -> Result<String> {
        if !asset.path.is_file() {
            tracing::error!(path = %asset.path.display(), "Asset file not found");
            return Err(ReleaseError::api(format!(
                "upload_asset cannot find {}",
                asset.path.display()
            )));
        }
        let content = tokio::fs::read(&asset.path)
            .await
            .map_err(|e| ReleaseError::fs(&asset.path, e))?;

        let url = self.assets_url(release_id);
        tracing::info!(
            url = %url,
            name = %asset.name,
            content_type = %asset.content_type,
            size = content.len(),
            "Uploading release asset"
        );
        let request = self
            .authorized(self.http.post(&url))
            .query(&[("name", asset.name.as_str())])
            .header(CONTENT_TYPE, asset.content_type.as_str())
            .body(content);
        let response = self.send(request, "upload asset").await?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReleaseError::api(format!("could not read upload response: {e}")))?;
        if !status.is_success() {
            tracing::error!(status = %status, name = %asset.name, "Asset upload failed: {text}");
            return Err(ReleaseError::api(format!(
                "asset upload returned {status}: {text}"
            )));
        }
        tracing::info!(name = %asset.name, "Asset uploaded");
        Ok(text)
    }
}
