//! Retrieval of source images that do not live in storage.
//!
//! A source path is usually a public URL of the storage provider, but
//! profiles can also be applied to absolute URLs (another host, a CDN) and to
//! app-relative paths (`~/Media/a.jpg`) which are resolved against the
//! configured site base URL.

use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Sources larger than this are refused rather than buffered.
const MAX_SOURCE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Source exceeds the 64 MiB limit: {0}")]
    TooLarge(String),
    #[error("Remote sources are disabled: {0}")]
    Disabled(String),
}

pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP(S) fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }
        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut bytes = Vec::new();
        response
            .take(MAX_SOURCE_BYTES + 1)
            .read_to_end(&mut bytes)?;
        if bytes.len() as u64 > MAX_SOURCE_BYTES {
            return Err(FetchError::TooLarge(url.to_string()));
        }
        Ok(bytes)
    }
}

/// Fetcher for deployments that only serve images from storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

impl SourceFetcher for OfflineFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Disabled(url.to_string()))
    }
}

/// Interpret a source path as a remote location.
///
/// - absolute `http`/`https` URLs are used as-is
/// - app-relative `~/` paths are joined onto `base_url`
/// - anything else is not remote
pub fn remote_url(path: &str, base_url: Option<&Url>) -> Option<Url> {
    if let Some(relative) = path.strip_prefix("~/") {
        return base_url.and_then(|base| base.join(relative).ok());
    }
    Url::parse(path)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_http_urls_are_remote() {
        let url = remote_url("https://cdn.example.com/img/a.jpg", None).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn non_http_schemes_are_not_remote() {
        assert!(remote_url("file:///etc/passwd", None).is_none());
        assert!(remote_url("data:image/png;base64,AAAA", None).is_none());
    }

    #[test]
    fn app_relative_paths_join_base_url() {
        let base = Url::parse("http://localhost:8080/site/").unwrap();
        let url = remote_url("~/Media/Default/a.jpg", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/site/Media/Default/a.jpg");
    }

    #[test]
    fn app_relative_without_base_is_not_remote() {
        assert!(remote_url("~/Media/a.jpg", None).is_none());
    }

    #[test]
    fn storage_paths_are_not_remote() {
        assert!(remote_url("/media/img/a.jpg", None).is_none());
        assert!(remote_url("img/a.jpg", None).is_none());
    }

    #[test]
    fn offline_fetcher_refuses() {
        let url = Url::parse("https://example.com/a.jpg").unwrap();
        assert!(matches!(OfflineFetcher.fetch(&url), Err(FetchError::Disabled(_))));
    }
}
