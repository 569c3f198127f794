//! Source video retrieval into memory.

use std::path::PathBuf;

use tracing::debug;
use url::Url;

use crate::error::{MediaError, MediaResult};

/// Where a source locator points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    Remote(Url),
    Local(PathBuf),
}

impl SourceLocator {
    /// Classify `http(s)://`, `file://` and plain filesystem paths.
    pub fn parse(locator: &str) -> MediaResult<Self> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(MediaError::download_failed("Empty source locator"));
        }

        match Url::parse(locator) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(SourceLocator::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(SourceLocator::Local)
                    .map_err(|_| MediaError::download_failed(format!("Invalid file URL: {}", locator))),
                // Windows drive letters parse as a one-letter scheme
                scheme if scheme.len() == 1 => Ok(SourceLocator::Local(PathBuf::from(locator))),
                scheme => Err(MediaError::download_failed(format!(
                    "Unsupported locator scheme: {}",
                    scheme
                ))),
            },
            Err(_) => Ok(SourceLocator::Local(PathBuf::from(locator))),
        }
    }
}

/// Fetch the whole source into a buffer. An empty body is an error.
pub async fn fetch_source(http: &reqwest::Client, locator: &str) -> MediaResult<Vec<u8>> {
    let bytes = match SourceLocator::parse(locator)? {
        SourceLocator::Remote(url) => {
            debug!(url = %url, "Fetching remote source");
            let response = http
                .get(url.clone())
                .send()
                .await
                .map_err(|e| MediaError::download_failed(format!("Request to {} failed: {}", url, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(MediaError::download_failed(format!(
                    "Source returned HTTP {} for {}",
                    status.as_u16(),
                    url
                )));
            }

            response
                .bytes()
                .await
                .map_err(|e| MediaError::download_failed(format!("Reading body of {} failed: {}", url, e)))?
                .to_vec()
        }
        SourceLocator::Local(path) => {
            debug!(path = %path.display(), "Reading local source");
            match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(MediaError::FileNotFound(path));
                }
                Err(e) => return Err(MediaError::Io(e)),
            }
        }
    };

    if bytes.is_empty() {
        return Err(MediaError::download_failed(format!("Source {} is empty", locator)));
    }

    Ok(bytes)
}
