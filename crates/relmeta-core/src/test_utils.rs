use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use relmeta_dl::{AssetMetadata, DownloadError, GithubAsset, GithubRelease, ReleaseLocator};

use crate::keys::KeySource;

pub const PUBLISHER_KEY: &str = include_str!("../tests/fixtures/publisher.asc");
pub const UNTRUSTED_KEY: &str = include_str!("../tests/fixtures/untrusted.asc");
pub const ARCHIVE: &[u8] = include_bytes!("../tests/fixtures/yarn-v1.22.19.tar.gz");
pub const ARCHIVE_SIGNATURE: &str = include_str!("../tests/fixtures/yarn-v1.22.19.tar.gz.asc");
pub const UNTRUSTED_SIGNATURE: &str =
    include_str!("../tests/fixtures/yarn-v1.22.19.tar.gz.untrusted.asc");
pub const ARCHIVE_SHA256: &str = "2a533d626793a4892416ba17996e99756d5c5c9ead91e57d371d37a006c87eb9";

pub fn api_url(tag: &str, name: &str) -> String {
    format!("https://api.github.com/repos/yarnpkg/yarn/releases/assets/{tag}/{name}")
}

pub fn browser_url(tag: &str, name: &str) -> String {
    format!("https://github.com/yarnpkg/yarn/releases/download/{tag}/{name}")
}

pub fn release(tag: &str, assets: &[&str]) -> GithubRelease {
    GithubRelease {
        tag_name: tag.to_string(),
        assets: assets
            .iter()
            .map(|name| {
                GithubAsset {
                    name: name.to_string(),
                    url: api_url(tag, name),
                    browser_download_url: browser_url(tag, name),
                }
            })
            .collect(),
    }
}

/// In-memory release listing that serves asset bytes by file name.
pub struct FakeLocator {
    releases: Vec<GithubRelease>,
    listing_error: RefCell<Option<DownloadError>>,
    files: HashMap<String, Vec<u8>>,
    metadata_json: Option<String>,
    tag_lookup: bool,
    pub downloads: RefCell<Vec<PathBuf>>,
}

impl FakeLocator {
    pub fn new(releases: Vec<GithubRelease>) -> Self {
        Self {
            releases,
            listing_error: RefCell::new(None),
            files: HashMap::new(),
            metadata_json: None,
            tag_lookup: true,
            downloads: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_listing(err: DownloadError) -> Self {
        let locator = Self::new(Vec::new());
        locator.listing_error.replace(Some(err));
        locator
    }

    pub fn with_file(mut self, name: &str, bytes: &[u8]) -> Self {
        self.files.insert(name.to_string(), bytes.to_vec());
        self
    }

    /// Serves `json` for every asset metadata request instead of the derived document.
    pub fn with_metadata_json(mut self, json: &str) -> Self {
        self.metadata_json = Some(json.to_string());
        self
    }

    /// Lists releases that the tag endpoint does not serve, like drafts.
    pub fn without_tag_lookup(mut self) -> Self {
        self.tag_lookup = false;
        self
    }

    /// Release `v1.22.19` with the fixture archive and its publisher signature.
    pub fn yarn_1_22_19() -> Self {
        Self::new(vec![
            release("0.5.0", &[]),
            release(
                "v1.22.19",
                &["yarn-v1.22.19.tar.gz", "yarn-v1.22.19.tar.gz.asc"],
            ),
        ])
        .with_file("yarn-v1.22.19.tar.gz", ARCHIVE)
        .with_file("yarn-v1.22.19.tar.gz.asc", ARCHIVE_SIGNATURE.as_bytes())
    }

    pub fn last_download(&self) -> Option<PathBuf> {
        self.downloads.borrow().last().cloned()
    }

    /// Listed release tagged `tag`.
    pub fn listed(&self, tag: &str) -> GithubRelease {
        self.releases
            .iter()
            .find(|release| release.tag_name == tag)
            .cloned()
            .unwrap_or_else(|| panic!("no release tagged {tag}"))
    }
}

impl ReleaseLocator for FakeLocator {
    type Release = GithubRelease;

    fn list_releases(
        &self,
        _owner: &str,
        _repo: &str,
    ) -> Result<Vec<GithubRelease>, DownloadError> {
        if let Some(err) = self.listing_error.borrow_mut().take() {
            return Err(err);
        }
        Ok(self.releases.clone())
    }

    fn release(
        &self,
        _owner: &str,
        _repo: &str,
        tag: &str,
    ) -> Result<GithubRelease, DownloadError> {
        self.releases
            .iter()
            .find(|release| self.tag_lookup && release.tag_name == tag)
            .cloned()
            .ok_or_else(|| {
                DownloadError::ReleaseNotFound {
                    project: "yarnpkg/yarn".to_string(),
                    tag: tag.to_string(),
                }
            })
    }

    fn fetch_bytes(&self, asset: &GithubAsset) -> Result<Vec<u8>, DownloadError> {
        self.files.get(&asset.name).cloned().ok_or_else(|| {
            DownloadError::HttpError {
                status: 404,
                url: asset.url.clone(),
            }
        })
    }

    fn download(&self, asset: &GithubAsset, dest: &Path) -> Result<u64, DownloadError> {
        let bytes = self.fetch_bytes(asset)?;
        fs::write(dest, &bytes)?;
        self.downloads.borrow_mut().push(dest.to_path_buf());
        Ok(bytes.len() as u64)
    }

    fn fetch_asset_metadata(&self, asset_url: &str) -> Result<AssetMetadata, DownloadError> {
        if let Some(json) = &self.metadata_json {
            return serde_json::from_str(json).map_err(|source| {
                DownloadError::InvalidJson {
                    url: asset_url.to_string(),
                    source,
                }
            });
        }

        self.releases
            .iter()
            .flat_map(|release| release.assets.iter())
            .find(|asset| asset.url == asset_url)
            .map(|asset| {
                AssetMetadata {
                    name: asset.name.clone(),
                    browser_download_url: asset.browser_download_url.clone(),
                    size: None,
                    content_type: Some("application/gzip".to_string()),
                }
            })
            .ok_or_else(|| {
                DownloadError::HttpError {
                    status: 404,
                    url: asset_url.to_string(),
                }
            })
    }
}

/// Key source whose endpoint is unreachable.
pub struct UnreachableKeys;

impl KeySource for UnreachableKeys {
    fn fetch_keys(&self) -> Result<Vec<String>, DownloadError> {
        Err(DownloadError::HttpError {
            status: 503,
            url: "https://dl.yarnpkg.com/debian/pubkey.gpg".to_string(),
        })
    }
}
