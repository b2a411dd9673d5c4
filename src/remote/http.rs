// src/remote/http.rs

//! HTTP implementation of [`RemoteFetcher`]
//!
//! Endpoints, relative to the remote URL:
//!
//! ```text
//! GET v1/packages/{name}/{version}/{user}/{channel}/{recipe_rev}/{package_id}/manifest
//! GET v1/packages/{name}/{version}/{user}/{channel}/{recipe_rev}/{package_id}/info
//! ```
//!
//! `user`/`channel` are `_` when absent and `recipe_rev` is `latest` when the
//! recipe revision is unknown.

use super::{FetchOutcome, Remote, RemoteFetcher};
use crate::error::{Error, Result};
use crate::manifest::{Manifest, PackageInfo};
use crate::reference::ResolvedPackageRef;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts per request
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct ManifestResponse {
    manifest: Manifest,
    package_revision: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    info: PackageInfo,
    package_revision: Option<String>,
}

/// How a response status should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    NotFound,
    /// Worth retrying; becomes "remote unavailable" when retries run out
    Transient,
    Fatal,
}

fn classify(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::NOT_FOUND {
        StatusClass::NotFound
    } else if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        StatusClass::Transient
    } else {
        StatusClass::Fatal
    }
}

/// Build the endpoint URL for a package resource
fn package_url(remote: &Remote, pref: &ResolvedPackageRef, leaf: &str) -> String {
    let recipe = &pref.identity.recipe;
    format!(
        "{}/v1/packages/{}/{}/{}/{}/{}/{}/{}",
        remote.url.trim_end_matches('/'),
        recipe.name,
        recipe.version,
        recipe.user.as_deref().unwrap_or("_"),
        recipe.channel.as_deref().unwrap_or("_"),
        recipe.revision.as_deref().unwrap_or("latest"),
        pref.identity.package_id,
        leaf
    )
}

/// Blocking HTTP fetcher with bounded retries
pub struct HttpFetcher {
    client: Client,
    /// Client used for remotes configured with `verify_ssl = false`
    insecure_client: Client,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;
        let insecure_client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            insecure_client,
            max_retries: MAX_RETRIES,
        })
    }

    fn client_for(&self, remote: &Remote) -> &Client {
        if remote.verify_ssl {
            &self.client
        } else {
            &self.insecure_client
        }
    }

    fn get_json<T: DeserializeOwned>(&self, remote: &Remote, url: &str) -> Result<FetchOutcome<T>> {
        let client = self.client_for(remote);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("GET {} (attempt {})", url, attempt);

            let failure = match client.get(url).send() {
                Ok(response) => match classify(response.status()) {
                    StatusClass::Success => {
                        let body: T = response.json().map_err(|e| {
                            Error::DownloadError(format!("Invalid response from {}: {e}", url))
                        })?;
                        return Ok(FetchOutcome::Found(body));
                    }
                    StatusClass::NotFound => return Ok(FetchOutcome::NotFound),
                    StatusClass::Fatal => {
                        return Err(Error::DownloadError(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }
                    StatusClass::Transient => format!("HTTP {}", response.status()),
                },
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_retries {
                warn!(
                    "Remote '{}' unavailable after {} attempts: {}",
                    remote.name, attempt, failure
                );
                return Ok(FetchOutcome::RemoteUnavailable);
            }
            warn!("Request to {} failed: {}, retrying...", url, failure);
            std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
        }
    }
}

fn refine(pref: &ResolvedPackageRef, revision: Option<String>) -> ResolvedPackageRef {
    match revision {
        Some(rev) => pref.clone().with_revision(rev),
        None => pref.clone(),
    }
}

impl RemoteFetcher for HttpFetcher {
    fn get_package_manifest(
        &self,
        pref: &ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<FetchOutcome<(Manifest, ResolvedPackageRef)>> {
        let url = package_url(remote, pref, "manifest");
        Ok(match self.get_json::<ManifestResponse>(remote, &url)? {
            FetchOutcome::Found(resp) => {
                FetchOutcome::Found((resp.manifest, refine(pref, resp.package_revision)))
            }
            FetchOutcome::NotFound => FetchOutcome::NotFound,
            FetchOutcome::RemoteUnavailable => FetchOutcome::RemoteUnavailable,
        })
    }

    fn get_package_info(
        &self,
        pref: &ResolvedPackageRef,
        remote: &Remote,
    ) -> Result<FetchOutcome<(PackageInfo, ResolvedPackageRef)>> {
        let url = package_url(remote, pref, "info");
        Ok(match self.get_json::<InfoResponse>(remote, &url)? {
            FetchOutcome::Found(resp) => {
                FetchOutcome::Found((resp.info, refine(pref, resp.package_revision)))
            }
            FetchOutcome::NotFound => FetchOutcome::NotFound,
            FetchOutcome::RemoteUnavailable => FetchOutcome::RemoteUnavailable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{PackageIdentity, RecipeRef};

    fn pref(recipe: &str) -> ResolvedPackageRef {
        let recipe: RecipeRef = recipe.parse().unwrap();
        ResolvedPackageRef::new(PackageIdentity::new(recipe, "abc123"))
    }

    #[test]
    fn test_package_url_defaults() {
        let remote = Remote::new("central", "https://central.example.com/");
        assert_eq!(
            package_url(&remote, &pref("zlib/1.2.13"), "info"),
            "https://central.example.com/v1/packages/zlib/1.2.13/_/_/latest/abc123/info"
        );
    }

    #[test]
    fn test_package_url_full_reference() {
        let remote = Remote::new("central", "https://central.example.com");
        assert_eq!(
            package_url(&remote, &pref("zlib/1.2.13@acme/stable#r1"), "manifest"),
            "https://central.example.com/v1/packages/zlib/1.2.13/acme/stable/r1/abc123/manifest"
        );
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify(StatusCode::OK), StatusClass::Success);
        assert_eq!(classify(StatusCode::NOT_FOUND), StatusClass::NotFound);
        assert_eq!(classify(StatusCode::BAD_GATEWAY), StatusClass::Transient);
        assert_eq!(classify(StatusCode::TOO_MANY_REQUESTS), StatusClass::Transient);
        assert_eq!(classify(StatusCode::UNAUTHORIZED), StatusClass::Fatal);
    }

    #[test]
    fn test_refine_revision() {
        let p = pref("zlib/1.2.13");
        assert_eq!(refine(&p, None), p);
        assert_eq!(refine(&p, Some("p2".into())).revision.as_deref(), Some("p2"));
    }

    #[test]
    fn test_manifest_response_shape() {
        let json = r#"{
            "manifest": {"time": "2024-01-02T03:04:05Z", "files": {"lib/libz.a": "aa"}},
            "package_revision": "p7"
        }"#;
        let resp: ManifestResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.package_revision.as_deref(), Some("p7"));
        assert_eq!(resp.manifest.files.len(), 1);
    }
}
