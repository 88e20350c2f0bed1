use crate::config::HostingConfig;
use crate::domain::{NewRelease, PublishedAsset, ReleaseRecord};
use crate::error::{ReleaseError, Result};
use crate::hosting::ReleaseHost;
use regex::Regex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

static SLUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[:/]([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$").expect("valid regex")
});

/// Derive `owner/name` from a remote URL (https, ssh or scp-like)
pub fn parse_repository_slug(url: &str) -> Option<String> {
    let caps = SLUG.captures(url.trim())?;
    Some(format!("{}/{}", &caps[1], &caps[2]))
}

/// Release host backed by the GitHub REST API
pub struct GitHubHost {
    client: Client,
    api_url: String,
    slug: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GhAsset {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhRelease {
    id: u64,
    tag_name: String,
    name: Option<String>,
    body: Option<String>,
    upload_url: String,
    #[serde(default)]
    assets: Vec<GhAsset>,
}

#[derive(Debug, Serialize)]
struct CreateRelease<'a> {
    tag_name: &'a str,
    name: &'a str,
    body: &'a str,
    make_latest: &'a str,
}

impl GhRelease {
    fn into_record(self, latest: bool) -> ReleaseRecord {
        ReleaseRecord {
            id: self.id,
            tag_name: self.tag_name,
            title: self.name.unwrap_or_default(),
            notes: self.body.unwrap_or_default(),
            assets: self.assets.into_iter().map(|a| a.name).collect(),
            latest,
        }
    }

    /// `upload_url` comes back as a URI template, e.g. `.../assets{?name,label}`
    fn upload_endpoint(&self) -> &str {
        match self.upload_url.find('{') {
            Some(idx) => &self.upload_url[..idx],
            None => &self.upload_url,
        }
    }
}

impl GitHubHost {
    pub fn new(config: &HostingConfig, slug: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("git-release/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GitHubHost {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            slug: slug.into(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}{}", self.api_url, self.slug, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn fail(action: &str, response: Response) -> ReleaseError {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        ReleaseError::hosting(format!("{} failed with {}: {}", action, status, body.trim()))
    }

    fn fetch_release_by_id(&self, id: u64) -> Result<GhRelease> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/releases/{}", id))))
            .send()?;
        if !response.status().is_success() {
            return Err(Self::fail("Fetching release", response));
        }
        Ok(response.json()?)
    }

    fn delete_asset(&self, asset_id: u64) -> Result<()> {
        let response = self
            .authorized(
                self.client
                    .delete(self.url(&format!("/releases/assets/{}", asset_id))),
            )
            .send()?;
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(Self::fail("Deleting asset", response));
        }
        Ok(())
    }
}

impl ReleaseHost for GitHubHost {
    fn find_release(&self, tag_name: &str) -> Result<Option<ReleaseRecord>> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/releases/tags/{}", tag_name))))
            .send()?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(tag = tag_name, "no release for tag");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::fail("Looking up release", response));
        }

        let release: GhRelease = response.json()?;
        Ok(Some(release.into_record(false)))
    }

    fn create_release(&self, release: &NewRelease) -> Result<ReleaseRecord> {
        let payload = CreateRelease {
            tag_name: &release.tag_name,
            name: &release.title,
            body: &release.notes,
            make_latest: if release.latest { "true" } else { "false" },
        };

        let response = self
            .authorized(self.client.post(self.url("/releases")))
            .json(&payload)
            .send()?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let body = response.text().unwrap_or_default();
            if body.contains("already_exists") {
                info!(tag = %release.tag_name, "release already exists, reusing it");
                return self.find_release(&release.tag_name)?.ok_or_else(|| {
                    ReleaseError::hosting(format!(
                        "Release for '{}' reported as existing but not found",
                        release.tag_name
                    ))
                });
            }
            return Err(ReleaseError::hosting(format!(
                "Creating release rejected: {}",
                body.trim()
            )));
        }
        if !response.status().is_success() {
            return Err(Self::fail("Creating release", response));
        }

        let created: GhRelease = response.json()?;
        info!(tag = %created.tag_name, id = created.id, "release created");
        Ok(created.into_record(release.latest))
    }

    fn upload_asset(&self, release: &ReleaseRecord, asset: &PublishedAsset) -> Result<()> {
        let current = self.fetch_release_by_id(release.id)?;
        for existing in current.assets.iter().filter(|a| a.name == asset.name) {
            debug!(asset = %existing.name, id = existing.id, "replacing existing asset");
            self.delete_asset(existing.id)?;
        }

        let bytes = std::fs::read(&asset.path)?;
        let response = self
            .authorized(self.client.post(current.upload_endpoint()))
            .query(&[("name", asset.name.as_str())])
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()?;

        if !response.status().is_success() {
            return Err(Self::fail("Uploading asset", response));
        }
        info!(asset = %asset.name, release = release.id, "asset uploaded");
        Ok(())
    }
}
