use std::{env, path::Path};

use serde::Deserialize;
use tracing::debug;
use ureq::{
    http::header::{ACCEPT, AUTHORIZATION},
    typestate::WithoutBody,
    RequestBuilder,
};
use url::Url;

use crate::{
    error::DownloadError,
    http::Http,
    http_client::SHARED_AGENT,
    traits::{Asset, Release, ReleaseLocator},
};

pub const API_UPSTREAM: &str = "https://api.github.com";
pub const TOKEN_ENV: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];
pub const PER_PAGE: usize = 100;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const BINARY_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubAsset {
    pub name: String,
    pub url: String,
    pub browser_download_url: String,
}

/// Document served at an asset's API URL.
///
/// Only the fields the pipeline relies on are declared, and none of them carry a
/// default: a payload lacking `browser_download_url` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetMetadata {
    pub name: String,
    pub browser_download_url: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

/// GitHub releases client.
#[derive(Debug, Clone)]
pub struct Github {
    api_base: String,
    token_env: Vec<String>,
}

impl Default for Github {
    fn default() -> Self {
        Self {
            api_base: API_UPSTREAM.to_string(),
            token_env: TOKEN_ENV.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Github {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Environment variables consulted, in order, for a bearer token.
    pub fn token_env<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.token_env = vars.into_iter().map(Into::into).collect();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> Result<Url, DownloadError> {
        let url = format!("{}{}", self.api_base, path);
        Url::parse(&url).map_err(|source| {
            DownloadError::InvalidUrl {
                url,
                source,
            }
        })
    }

    fn token(&self) -> Option<String> {
        self.token_env
            .iter()
            .find_map(|var| env::var(var).ok().filter(|token| !token.is_empty()))
    }

    fn request(&self, url: &str, accept: &str) -> RequestBuilder<WithoutBody> {
        let mut req = SHARED_AGENT.get(url).header(ACCEPT, accept);
        if let Some(token) = self.token() {
            req = req.header(AUTHORIZATION, &format!("Bearer {token}"));
        }
        req
    }

    fn fetch_page(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Vec<GithubRelease>, DownloadError> {
        let mut url = self.endpoint(&format!("/repos/{owner}/{repo}/releases"))?;
        url.query_pairs_mut()
            .append_pair("per_page", &PER_PAGE.to_string())
            .append_pair("page", &page.to_string());

        debug!("fetching page {page} of {owner}/{repo} releases");
        let resp = Http::send(self.request(url.as_str(), JSON_MEDIA_TYPE), url.as_str())?;
        Http::read_json(resp, url.as_str())
    }

    fn release_by_tag(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<GithubRelease, DownloadError> {
        let mut url = self.endpoint(&format!("/repos/{owner}/{repo}/releases/tags/"))?;
        url.path_segments_mut()
            .map_err(|_| {
                DownloadError::InvalidUrl {
                    url: self.api_base.clone(),
                    source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
                }
            })?
            .pop_if_empty()
            .push(tag);

        match Http::send(self.request(url.as_str(), JSON_MEDIA_TYPE), url.as_str()) {
            Ok(resp) => Http::read_json(resp, url.as_str()),
            Err(DownloadError::HttpError { status: 404, .. }) => {
                Err(DownloadError::ReleaseNotFound {
                    project: format!("{owner}/{repo}"),
                    tag: tag.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }
}

/// Collects every page of a paginated listing.
///
/// Pages are requested from 1 upward until one comes back with fewer than `per_page`
/// entries. The first failing page aborts the whole collection, so a caller never sees a
/// truncated listing.
pub fn collect_pages<T, F>(per_page: usize, mut fetch_page: F) -> Result<Vec<T>, DownloadError>
where
    F: FnMut(u32) -> Result<Vec<T>, DownloadError>,
{
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        let batch = fetch_page(page)?;
        let len = batch.len();
        items.extend(batch);

        if len < per_page {
            break;
        }
        page += 1;
    }

    Ok(items)
}

impl ReleaseLocator for Github {
    type Release = GithubRelease;

    fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Self::Release>, DownloadError> {
        let releases = collect_pages(PER_PAGE, |page| self.fetch_page(owner, repo, page))?;
        debug!("listed {} releases of {owner}/{repo}", releases.len());
        Ok(releases)
    }

    fn release(&self, owner: &str, repo: &str, tag: &str) -> Result<GithubRelease, DownloadError> {
        self.release_by_tag(owner, repo, tag)
    }

    fn fetch_bytes(&self, asset: &GithubAsset) -> Result<Vec<u8>, DownloadError> {
        debug!("fetching {} from {}", asset.name, asset.url);
        let resp = Http::send(self.request(&asset.url, BINARY_MEDIA_TYPE), &asset.url)?;
        Http::read_bytes(resp)
    }

    fn download(&self, asset: &GithubAsset, dest: &Path) -> Result<u64, DownloadError> {
        debug!("downloading {} to {}", asset.name, dest.display());
        let resp = Http::send(self.request(&asset.url, BINARY_MEDIA_TYPE), &asset.url)?;
        let written = Http::write_to(resp, dest)?;
        debug!("downloaded {} ({written} bytes)", asset.name);
        Ok(written)
    }

    fn fetch_asset_metadata(&self, asset_url: &str) -> Result<AssetMetadata, DownloadError> {
        let resp = Http::send(self.request(asset_url, JSON_MEDIA_TYPE), asset_url)?;
        Http::read_json(resp, asset_url)
    }
}

impl Release for GithubRelease {
    type Asset = GithubAsset;

    fn tag(&self) -> &str {
        &self.tag_name
    }

    fn assets(&self) -> &[Self::Asset] {
        &self.assets
    }
}

impl Asset for GithubAsset {
    fn name(&self) -> &str {
        &self.name
    }

    fn api_url(&self) -> &str {
        &self.url
    }
}
