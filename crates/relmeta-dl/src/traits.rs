use std::path::Path;

use crate::{error::DownloadError, github::AssetMetadata};

pub trait Asset: Clone {
    fn name(&self) -> &str;
    /// API URL describing the asset.
    fn api_url(&self) -> &str;
}

pub trait Release {
    type Asset: Asset;

    fn tag(&self) -> &str;
    fn assets(&self) -> &[Self::Asset];

    /// Looks up an asset by exact file name.
    fn find_asset(&self, name: &str) -> Option<&Self::Asset> {
        self.assets().iter().find(|asset| asset.name() == name)
    }
}

pub type AssetOf<L> = <<L as ReleaseLocator>::Release as Release>::Asset;

/// Read-only access to the published releases of an upstream project.
///
/// Every call goes to the network; implementations keep no state between calls.
/// Callers that already hold a [`Release`] from the listing should pass its assets to
/// [`fetch_bytes`](Self::fetch_bytes) and [`download`](Self::download) directly; the
/// tag-addressed methods look the release up again.
pub trait ReleaseLocator {
    type Release: Release;

    /// Lists every release of `owner/repo`, across all pages of the listing.
    fn list_releases(&self, owner: &str, repo: &str) -> Result<Vec<Self::Release>, DownloadError>;

    /// Fetches the release tagged `tag`.
    ///
    /// Fails with [`DownloadError::ReleaseNotFound`] when no such release exists.
    fn release(&self, owner: &str, repo: &str, tag: &str) -> Result<Self::Release, DownloadError>;

    /// Downloads the raw bytes of `asset`.
    fn fetch_bytes(&self, asset: &AssetOf<Self>) -> Result<Vec<u8>, DownloadError>;

    /// Streams `asset` into `dest` and returns the number of bytes written.
    fn download(&self, asset: &AssetOf<Self>, dest: &Path) -> Result<u64, DownloadError>;

    /// Fetches the JSON document describing an asset from its API URL.
    fn fetch_asset_metadata(&self, asset_url: &str) -> Result<AssetMetadata, DownloadError>;

    /// Finds `asset_name` in the release tagged `tag`.
    ///
    /// A release that exists but lacks the file yields [`DownloadError::AssetNotFound`],
    /// never a transport error.
    fn find_asset(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        asset_name: &str,
    ) -> Result<AssetOf<Self>, DownloadError> {
        let release = self.release(owner, repo, tag)?;
        release.find_asset(asset_name).cloned().ok_or_else(|| {
            DownloadError::AssetNotFound {
                project: format!("{owner}/{repo}"),
                tag: tag.to_string(),
                asset: asset_name.to_string(),
            }
        })
    }

    /// Resolves the API URL of `asset_name` in the release tagged `tag`.
    fn resolve_asset_download_url(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        asset_name: &str,
    ) -> Result<String, DownloadError> {
        let asset = self.find_asset(owner, repo, tag, asset_name)?;
        Ok(asset.api_url().to_string())
    }

    /// Downloads the raw bytes of `asset_name` from the release tagged `tag`.
    fn fetch_asset_bytes(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        asset_name: &str,
    ) -> Result<Vec<u8>, DownloadError> {
        self.fetch_bytes(&self.find_asset(owner, repo, tag, asset_name)?)
    }

    /// Streams `asset_name` from the release tagged `tag` into `dest`.
    fn download_asset(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
        asset_name: &str,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        self.download(&self.find_asset(owner, repo, tag, asset_name)?, dest)
    }
}
