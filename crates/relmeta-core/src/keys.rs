use relmeta_dl::{http::Http, DownloadError};
use tracing::debug;

/// Supplies the armored public keys a release signature is checked against.
pub trait KeySource {
    fn fetch_keys(&self) -> Result<Vec<String>, DownloadError>;
}

/// Keys downloaded fresh from a fixed list of URLs on every call.
#[derive(Debug, Clone)]
pub struct RemoteKeys {
    urls: Vec<String>,
}

impl RemoteKeys {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
        }
    }
}

impl KeySource for RemoteKeys {
    fn fetch_keys(&self) -> Result<Vec<String>, DownloadError> {
        self.urls
            .iter()
            .map(|url| {
                debug!("fetching trusted key from {url}");
                let bytes = Http::bytes(url)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            })
            .collect()
    }
}

/// Keys held in memory, used when keys are provided out of band.
#[derive(Debug, Clone, Default)]
pub struct StaticKeys(pub Vec<String>);

impl KeySource for StaticKeys {
    fn fetch_keys(&self) -> Result<Vec<String>, DownloadError> {
        Ok(self.0.clone())
    }
}
