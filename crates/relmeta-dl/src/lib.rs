//! Upstream release access for relmeta.
//!
//! This crate lists published releases of a GitHub project (following every
//! page of the listing), resolves release assets by exact name, and downloads
//! asset bytes through a shared, configurable HTTP agent.

pub mod error;
pub mod github;
pub mod http;
pub mod http_client;
pub mod traits;

pub use error::DownloadError;
pub use github::{AssetMetadata, Github, GithubAsset, GithubRelease};
pub use traits::{Asset, Release, ReleaseLocator};
