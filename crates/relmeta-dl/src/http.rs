use std::{
    fs::File,
    io::{self, BufWriter, Write as _},
    path::Path,
};

use serde::de::DeserializeOwned;
use tracing::trace;
use ureq::{http::Response, typestate::WithoutBody, Body, RequestBuilder};

use crate::{error::DownloadError, http_client::SHARED_AGENT};

/// Ceiling for bodies buffered in memory (listings, keys, signatures).
pub const MAX_BUFFERED_BODY: u64 = 64 * 1024 * 1024;

pub struct Http;

impl Http {
    /// Sends a prepared GET request and rejects any non-2xx status.
    pub fn send(
        req: RequestBuilder<WithoutBody>,
        url: &str,
    ) -> Result<Response<Body>, DownloadError> {
        trace!("GET {url}");
        let resp = req.call()?;
        let status = resp.status();

        if !status.is_success() {
            return Err(DownloadError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(resp)
    }

    /// Fetches `url` with the shared agent and returns the whole body.
    pub fn bytes(url: &str) -> Result<Vec<u8>, DownloadError> {
        let resp = Self::send(SHARED_AGENT.get(url), url)?;
        Self::read_bytes(resp)
    }

    pub fn read_bytes(mut resp: Response<Body>) -> Result<Vec<u8>, DownloadError> {
        Ok(resp
            .body_mut()
            .with_config()
            .limit(MAX_BUFFERED_BODY)
            .read_to_vec()?)
    }

    /// Decodes a response body into a strongly typed value.
    ///
    /// Missing required fields surface as [`DownloadError::InvalidJson`] instead of being
    /// defaulted.
    pub fn read_json<T: DeserializeOwned>(
        resp: Response<Body>,
        url: &str,
    ) -> Result<T, DownloadError> {
        let bytes = Self::read_bytes(resp)?;
        serde_json::from_slice(&bytes).map_err(|source| {
            DownloadError::InvalidJson {
                url: url.to_string(),
                source,
            }
        })
    }

    /// Streams a response body into `dest`, returning the number of bytes written.
    pub fn write_to(mut resp: Response<Body>, dest: &Path) -> Result<u64, DownloadError> {
        let mut reader = resp.body_mut().as_reader();
        let mut writer = BufWriter::new(File::create(dest)?);
        let written = io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(written)
    }
}
