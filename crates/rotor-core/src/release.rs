//! GitHub release publication.
//!
//! A published release carries the deployment details in its body and the
//! verification standard-input file as an attached asset, so downstream
//! consumers can verify the contract without access to the deployer host.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::domain::{DeploymentRecord, Result, RotorError};
use crate::verification::{VerificationBundle, VerificationGenerator};

/// GitHub API configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API token with `contents: write` on the target repository.
    pub token: String,

    /// Target repository as `owner/repo`.
    pub repository: String,

    /// API base URL.
    pub api_url: String,
}

impl GitHubConfig {
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com";

    pub fn new(token: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            repository: repository.into(),
            api_url: Self::DEFAULT_API_URL.to_string(),
        }
    }

    /// Read `GITHUB_TOKEN` and `GITHUB_REPOSITORY` from the environment.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN").map_err(|_| {
            RotorError::Config("GITHUB_TOKEN env variable is required".to_string())
        })?;
        let repository = std::env::var("GITHUB_REPOSITORY").map_err(|_| {
            RotorError::Config("GITHUB_REPOSITORY env variable is required".to_string())
        })?;
        Ok(Self::new(token, repository))
    }

    fn owner_repo(&self) -> Result<(&str, &str)> {
        self.repository.split_once('/').ok_or_else(|| {
            RotorError::Config(format!(
                "GITHUB_REPOSITORY must be owner/repo, got '{}'",
                self.repository
            ))
        })
    }
}

/// Release object returned by the create call.
#[derive(Debug, Deserialize)]
struct CreatedRelease {
    upload_url: String,
    html_url: Option<String>,
}

/// Result of a successful publication.
#[derive(Debug, Clone)]
pub struct PublishedRelease {
    /// Release tag, `{logName}-{YYYYMMDD}-{blockNumber}`.
    pub tag: String,

    /// Web URL of the created release, when the API returned one.
    pub html_url: Option<String>,
}

/// Collaborator contract for the release-publication step.
#[async_trait]
pub trait ReleasePublisher: Send + Sync {
    /// Publish a release for a freshly produced deployment record.
    async fn publish(&self, record: &DeploymentRecord) -> Result<PublishedRelease>;
}

/// Publishes GitHub releases with the verification bundle attached.
pub struct GitHubReleasePublisher {
    config: GitHubConfig,
    generator: VerificationGenerator,
    http_client: reqwest::Client,
}

impl GitHubReleasePublisher {
    pub fn new(config: GitHubConfig, generator: VerificationGenerator) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("rotor-release/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            generator,
            http_client,
        }
    }

    async fn create_release(
        &self,
        tag: &str,
        name: &str,
        body: &str,
    ) -> Result<CreatedRelease> {
        let (owner, repo) = self.config.owner_repo()?;
        let url = format!("{}/repos/{}/{}/releases", self.config.api_url, owner, repo);

        info!(tag, name, "creating release");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("token {}", self.config.token))
            .header("Accept", "application/vnd.github.v3+json")
            .json(&serde_json::json!({
                "tag_name": tag,
                "name": name,
                "body": body,
                "draft": false,
                "prerelease": false,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RotorError::Publish(format!(
                "create release returned {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    async fn upload_asset(&self, release: &CreatedRelease, bundle: &VerificationBundle) -> Result<()> {
        let asset_name = bundle
            .standard_input_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                RotorError::Publish(format!(
                    "asset path {} has no file name",
                    bundle.standard_input_path.display()
                ))
            })?;
        let asset_bytes = std::fs::read(&bundle.standard_input_path)?;

        // upload_url is an RFC 6570 template ("...{?name,label}")
        let base = release
            .upload_url
            .split('{')
            .next()
            .unwrap_or(&release.upload_url);
        let url = format!("{base}?name={asset_name}");

        info!(asset = asset_name, "uploading release asset");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("token {}", self.config.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("Content-Type", "application/octet-stream")
            .body(asset_bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RotorError::Publish(format!(
                "asset upload returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ReleasePublisher for GitHubReleasePublisher {
    async fn publish(&self, record: &DeploymentRecord) -> Result<PublishedRelease> {
        let bundle = self.generator.generate(record)?;

        let tag = release_tag(record);
        let name = format!("Deployment: {}", record.key);
        let body = render_release_body(record, &bundle);

        let release = self.create_release(&tag, &name, &body).await?;
        self.upload_asset(&release, &bundle).await?;

        info!(tag = %tag, "release published");
        Ok(PublishedRelease {
            tag,
            html_url: release.html_url,
        })
    }
}

/// Tag for a deployment release: `{logName}-{YYYYMMDD}-{blockNumber}`.
pub fn release_tag(record: &DeploymentRecord) -> String {
    format!(
        "{}-{}-{}",
        record.log_name,
        Utc::now().format("%Y%m%d"),
        record.block_number
    )
}

/// Markdown body for a deployment release.
pub fn render_release_body(record: &DeploymentRecord, bundle: &VerificationBundle) -> String {
    let mut out = String::new();
    out.push_str(&format!("## Automated Deployment: {}\n\n", record.key));
    out.push_str("A new contract has been automatically deployed.\n\n");

    out.push_str("### Deployment Details\n");
    out.push_str(&format!("- **Contract Name**: `{}`\n", record.key));
    out.push_str(&format!("- **Address**: `{}`\n", record.address));
    out.push_str(&format!(
        "- **Transaction Hash**: `{}`\n",
        record.transaction_hash
    ));
    out.push_str(&format!("- **Block Number**: `{}`\n", record.block_number));
    match record.timestamp {
        Some(ts) => out.push_str(&format!("- **Timestamp**: `{}`\n", ts.to_rfc3339())),
        None => out.push_str("- **Timestamp**: `unknown`\n"),
    }
    if let Some(explorer) = &record.explorer {
        out.push_str(&format!("- **Explorer Link**: [View transaction]({explorer})\n"));
    }

    out.push_str("\n### Verification Files\n");
    if let Some(file_name) = bundle.standard_input_path.file_name().and_then(|n| n.to_str()) {
        out.push_str(&format!(
            "The attached `{file_name}` can be used for contract verification \
             via the \"Standard-JSON-Input\" method.\n"
        ));
    }
    out.push_str(&format!("SHA-256: `{}`\n", bundle.input_digest));
    out
}
