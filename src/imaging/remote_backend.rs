//! Passthrough backend that forwards requests to an upstream IIIF server.
//!
//! The request is compiled locally first, so malformed or unsupported
//! requests never leave the process. Only the raw segments are forwarded:
//!
//! ```text
//! GET {base_url}/{identifier}/info.json
//! GET {base_url}/{identifier}/{region}/{size}/{rotation}/{quality}.{format}
//! ```

use super::backend::{BackendError, ImageBackend};
use crate::geometry::Size;
use crate::pipeline::{CompiledRequest, Rendered};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// The slice of an upstream info.json this backend reads.
#[derive(Debug, Deserialize)]
struct InfoDimensions {
    width: u32,
    height: u32,
}

#[derive(Debug, Clone)]
pub struct RemoteBackend {
    base_url: Url,
    client: Client,
}

impl RemoteBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;
        Self::with_client(base_url, client)
    }

    /// Use a preconfigured client (proxies, TLS roots, headers).
    pub fn with_client(base_url: &str, client: Client) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| BackendError::Http(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Http(format!(
                "'{base_url}' cannot be used as a base URL"
            )));
        }
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base_url}/{identifier}/{tail...}`.
    ///
    /// The identifier is a single path segment, so any `/` inside it is
    /// percent-encoded.
    pub fn url_for(&self, identifier: &str, tail: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(identifier).extend(tail);
        }
        url
    }

    fn get(&self, url: Url) -> Result<reqwest::blocking::Response, BackendError> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| BackendError::Http(format!("{url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(BackendError::Http(format!("{url}: upstream answered {status}")));
        }
        Ok(response)
    }
}

impl ImageBackend for RemoteBackend {
    fn identify(&self, identifier: &str) -> Result<Size, BackendError> {
        let url = self.url_for(identifier, &["info.json"]);
        let info: InfoDimensions = self
            .get(url)?
            .json()
            .map_err(|e| BackendError::Decode(format!("info.json for '{identifier}': {e}")))?;
        Ok(Size::new(info.width, info.height))
    }

    fn render(
        &self,
        identifier: &str,
        request: &CompiledRequest,
    ) -> Result<Rendered, BackendError> {
        let segments = &request.segments;
        let last = format!("{}.{}", segments.quality, segments.format);
        let url = self.url_for(
            identifier,
            &[
                segments.region.as_str(),
                segments.size.as_str(),
                segments.rotation.as_str(),
                last.as_str(),
            ],
        );

        let response = self.get(url)?;
        if let Some(upstream) = response.headers().get(reqwest::header::CONTENT_TYPE)
            && upstream.as_bytes() != request.content_type().as_bytes()
        {
            log::debug!(
                "upstream content type {:?} differs from {}",
                upstream,
                request.content_type()
            );
        }
        let bytes = response
            .bytes()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        Ok(Rendered {
            bytes: bytes.to_vec(),
            content_type: request.content_type(),
        })
    }
}
