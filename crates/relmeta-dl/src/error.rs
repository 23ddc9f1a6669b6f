use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error("Invalid URL: {url}")]
    #[diagnostic(code(relmeta_dl::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    #[diagnostic(
        code(relmeta_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(relmeta_dl::http_error))]
    HttpError { status: u16, url: String },

    #[error("Release '{tag}' not found in {project}")]
    #[diagnostic(code(relmeta_dl::release_not_found))]
    ReleaseNotFound { project: String, tag: String },

    #[error("Asset '{asset}' not found in release '{tag}' of {project}")]
    #[diagnostic(
        code(relmeta_dl::asset_not_found),
        help("The release exists but does not publish this file")
    )]
    AssetNotFound {
        project: String,
        tag: String,
        asset: String,
    },

    #[error("Invalid JSON response from {url}")]
    #[diagnostic(code(relmeta_dl::invalid_json))]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    #[diagnostic(code(relmeta_dl::io))]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Returns `true` when the release exists but lacks the requested asset.
    pub fn is_asset_not_found(&self) -> bool {
        matches!(self, Self::AssetNotFound { .. })
    }
}

impl From<ureq::Error> for DownloadError {
    /// Converts a `ureq::Error` into a `DownloadError::Network` variant.
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_invalid_url() {
        let err = DownloadError::InvalidUrl {
            url: "invalid".to_string(),
            source: url::ParseError::RelativeUrlWithoutBase,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid URL"));
        assert!(msg.contains("invalid"));
    }

    #[test]
    fn test_download_error_http_error() {
        let err = DownloadError::HttpError {
            status: 404,
            url: "https://example.com/notfound".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("HTTP 404"));
        assert!(msg.contains("https://example.com/notfound"));
    }

    #[test]
    fn test_asset_not_found_is_distinguished() {
        let err = DownloadError::AssetNotFound {
            project: "yarnpkg/yarn".to_string(),
            tag: "v0.9.0".to_string(),
            asset: "yarn-v0.9.0.tar.gz".to_string(),
        };
        assert!(err.is_asset_not_found());
        assert_eq!(
            err.to_string(),
            "Asset 'yarn-v0.9.0.tar.gz' not found in release 'v0.9.0' of yarnpkg/yarn"
        );

        let err = DownloadError::ReleaseNotFound {
            project: "yarnpkg/yarn".to_string(),
            tag: "v0.9.0".to_string(),
        };
        assert!(!err.is_asset_not_found());
    }

    #[test]
    fn test_download_error_invalid_json() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DownloadError::InvalidJson {
            url: "https://api.github.com/x".to_string(),
            source,
        };
        assert_eq!(
            err.to_string(),
            "Invalid JSON response from https://api.github.com/x"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_ureq_error() {
        let ureq_err = ureq::Error::ConnectionFailed;
        let download_err: DownloadError = ureq_err.into();

        match download_err {
            DownloadError::Network(_) => (),
            _ => panic!("Expected Network error variant"),
        }
    }

    #[test]
    fn test_error_source_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = DownloadError::Io(io_err);

        assert!(err.to_string().contains("I/O error"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
