//! Allow-list fetchers.
//!
//! Production deployments point the relay at an HTTP(S) URL serving a plain
//! text file; development and tests can point it at a local path instead.
//! [`source_from_location`] picks the right one from the configured string.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::application::allow_list::{AllowListSource, SourceError};

/// Fetches the allow-list with an HTTP GET.  Any non-2xx status is an error.
#[derive(Debug, Clone)]
pub struct HttpAllowListSource {
    http: Client,
    url: String,
}

impl HttpAllowListSource {
    /// Builds a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`SourceError::Request`] if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let url = url.into();
        let http = Client::builder()
            .user_agent(concat!("share-relay/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl AllowListSource for HttpAllowListSource {
    async fn fetch(&self) -> Result<String, SourceError> {
        debug!(url = %self.url, "fetching allow-list");
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SourceError::Request {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|e| SourceError::Request {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Reads the allow-list from a local file on every fetch.
#[derive(Debug, Clone)]
pub struct FileAllowListSource {
    path: PathBuf,
}

impl FileAllowListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AllowListSource for FileAllowListSource {
    async fn fetch(&self) -> Result<String, SourceError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Chooses a source for `location`: `http://` and `https://` URLs are
/// fetched over HTTP, anything else is treated as a file path.
///
/// # Errors
///
/// [`SourceError::Request`] if the HTTP client cannot be constructed.
pub fn source_from_location(
    location: &str,
    timeout: Duration,
) -> Result<Arc<dyn AllowListSource>, SourceError> {
    let location = location.trim();
    if location.starts_with("http://") || location.starts_with("https://") {
        Ok(Arc::new(HttpAllowListSource::new(location, timeout)?))
    } else {
        Ok(Arc::new(FileAllowListSource::new(location)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
