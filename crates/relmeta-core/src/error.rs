//! Error types for relmeta-core.

use std::fmt;

use miette::Diagnostic;
use relmeta_config::error::ConfigError;
use relmeta_dl::DownloadError;
use relmeta_utils::error::{FileSystemError, HashError};
use semver::Version;
use thiserror::Error;

use crate::signature::VerificationError;

/// Network call a [`RelmetaError::Fetch`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ListReleases,
    TrustedKeys,
    SourceArchive,
    AssetMetadata,
    Signature,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Stage::ListReleases => "listing releases",
            Stage::TrustedKeys => "fetching trusted keys",
            Stage::SourceArchive => "downloading source archive",
            Stage::AssetMetadata => "fetching asset metadata",
            Stage::Signature => "fetching release signature",
        };
        f.write_str(action)
    }
}

/// Error type for the metadata pipeline.
#[derive(Error, Diagnostic, Debug)]
pub enum RelmetaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Network failure while {stage}")]
    #[diagnostic(
        code(relmeta::network),
        help("Check your internet connection and try again")
    )]
    Fetch {
        stage: Stage,
        #[source]
        #[diagnostic_source]
        source: DownloadError,
    },

    #[error("Invalid version `{input}`")]
    #[diagnostic(
        code(relmeta::invalid_version),
        help("Versions use the form MAJOR.MINOR.PATCH, e.g. 1.22.19")
    )]
    InvalidVersion {
        input: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid asset metadata from {url}: {reason}")]
    #[diagnostic(code(relmeta::asset_metadata))]
    AssetMetadata { url: String, reason: String },

    #[error("Could not find version {version}: no release tagged `{tag}`")]
    #[diagnostic(
        code(relmeta::version_not_found),
        help("Run `relmeta versions` to list the versions that can be resolved")
    )]
    VersionNotFound { version: Version, tag: String },

    #[error("No source code published for version {version}")]
    #[diagnostic(
        code(relmeta::no_source_code),
        help("The release exists but does not ship a source archive")
    )]
    NoSourceCode { version: Version },

    #[error("Signature verification failed for {asset} (version {version})")]
    #[diagnostic(code(relmeta::verification))]
    Verification {
        version: Version,
        asset: String,
        #[source]
        #[diagnostic_source]
        source: VerificationError,
    },

    #[error(transparent)]
    #[diagnostic(code(relmeta::hash))]
    Hash(#[from] HashError),

    #[error(transparent)]
    #[diagnostic(code(relmeta::filesystem))]
    FileSystem(#[from] FileSystemError),

    #[error("Error while {action}")]
    #[diagnostic(code(relmeta::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(relmeta::serialize))]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(relmeta::custom))]
    Custom(String),
}

impl RelmetaError {
    /// `true` when the release exists but ships no source archive; batch callers may skip it.
    pub fn is_no_source_code(&self) -> bool {
        matches!(self, Self::NoSourceCode { .. })
    }

    /// `true` for transport or HTTP failures reaching an upstream endpoint.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Fetch { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, RelmetaError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, RelmetaError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RelmetaError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
