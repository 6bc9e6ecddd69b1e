//! Cached source fetcher
//!
//! Retrieves the raw text of a source URL. With a cache directory configured,
//! a file named after the URL's last path segment short-circuits the network
//! entirely (no expiry, no checksum); every live fetch is written back to it.
//!
//! Redirects are followed by hand: the `Location` path and query are applied
//! to the original scheme and host, at most [`MAX_REDIRECTS`] times.

use crate::sources::SourceSpec;
use futures::future::try_join_all;
use reqwest::{header::LOCATION, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound on redirect hops for one fetch
pub const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = concat!("epi-ingest/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Fetch errors; any of them aborts the run
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Redirect from {url} has no usable Location header")]
    MissingLocation { url: String },

    #[error("Gave up on {url} after {limit} redirects")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Cache error at {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// HTTP fetcher with an optional write-through file cache
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    http_client: reqwest::Client,
    cache_dir: Option<PathBuf>,
}

impl SourceFetcher {
    pub fn new(cache_dir: Option<PathBuf>) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            http_client,
            cache_dir,
        })
    }

    /// Cache file for a URL, if caching is enabled
    pub fn cache_path(&self, url: &str) -> Result<Option<PathBuf>, FetchError> {
        match &self.cache_dir {
            Some(dir) => Ok(Some(dir.join(cache_file_name(url)?))),
            None => Ok(None),
        }
    }

    /// Fetch one URL through the cache
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let cache_path = self.cache_path(url)?;

        if let Some(path) = &cache_path {
            match tokio::fs::read_to_string(path).await {
                Ok(text) => {
                    debug!(url = %url, path = %path.display(), "Cache hit");
                    return Ok(text);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(url = %url, path = %path.display(), "Cache miss");
                }
                Err(e) => {
                    return Err(FetchError::Cache {
                        path: path.clone(),
                        source: e,
                    })
                }
            }
        }

        let body = self.fetch_following_redirects(url).await?;

        if let Some(path) = &cache_path {
            write_cache_file(path, &body).await?;
        }

        Ok(body)
    }

    /// Fetch every source concurrently, failing on the first error
    ///
    /// Payloads are returned in the order of `sources`.
    pub async fn fetch_all(&self, sources: &[SourceSpec]) -> Result<Vec<String>, FetchError> {
        let payloads = try_join_all(sources.iter().map(|source| async move {
            let body = self.fetch(&source.url).await?;
            info!(
                source = %source.name,
                bytes = body.len(),
                "Fetched source"
            );
            Ok::<_, FetchError>(body)
        }))
        .await?;

        Ok(payloads)
    }

    async fn fetch_following_redirects(&self, url: &str) -> Result<String, FetchError> {
        let mut current = parse_url(url)?;

        for _ in 0..=MAX_REDIRECTS {
            debug!(url = %current, "Requesting source");

            let response = self
                .http_client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| FetchError::Network {
                    url: current.to_string(),
                    source: e,
                })?;

            let status = response.status();

            if is_followed_redirect(status) {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| FetchError::MissingLocation {
                        url: current.to_string(),
                    })?;
                let next = redirect_target(&current, location)?;
                debug!(from = %current, to = %next, status = status.as_u16(), "Following redirect");
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Status {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            return response.text().await.map_err(|e| FetchError::Network {
                url: current.to_string(),
                source: e,
            });
        }

        Err(FetchError::TooManyRedirects {
            url: url.to_string(),
            limit: MAX_REDIRECTS,
        })
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Apply a redirect's path and query to the current scheme and host
fn redirect_target(current: &Url, location: &str) -> Result<Url, FetchError> {
    let resolved = current.join(location).map_err(|e| FetchError::InvalidUrl {
        url: location.to_string(),
        reason: e.to_string(),
    })?;

    let mut target = current.clone();
    target.set_path(resolved.path());
    target.set_query(resolved.query());
    Ok(target)
}

/// Final non-empty path segment of a URL
pub fn cache_file_name(url: &str) -> Result<String, FetchError> {
    let parsed = parse_url(url)?;
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "no path segment to name the cache file".to_string(),
        })
}

async fn write_cache_file(path: &Path, body: &str) -> Result<(), FetchError> {
    let cache_err = |source: std::io::Error| FetchError::Cache {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(cache_err)?;
    }
    tokio::fs::write(path, body).await.map_err(cache_err)?;

    debug!(path = %path.display(), bytes = body.len(), "Cached source payload");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_name_uses_last_segment() {
        assert_eq!(
            cache_file_name("https://example.org/api/v1/states/daily.json").unwrap(),
            "daily.json"
        );
    }

    #[test]
    fn test_cache_file_name_ignores_trailing_slash() {
        assert_eq!(
            cache_file_name("https://example.org/covid19/casedistribution/json/").unwrap(),
            "json"
        );
    }

    #[test]
    fn test_cache_file_name_requires_segment() {
        assert!(matches!(
            cache_file_name("https://example.org/"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_redirect_target_keeps_scheme_and_host() {
        let current = Url::parse("http://127.0.0.1:8080/old/data.csv").unwrap();
        let next = redirect_target(&current, "https://cdn.example.org/new/data.csv?v=2").unwrap();
        assert_eq!(next.as_str(), "http://127.0.0.1:8080/new/data.csv?v=2");
    }

    #[test]
    fn test_redirect_target_resolves_relative_location() {
        let current = Url::parse("http://127.0.0.1:8080/a/b/data.csv").unwrap();
        let next = redirect_target(&current, "../moved.csv").unwrap();
        assert_eq!(next.as_str(), "http://127.0.0.1:8080/a/moved.csv");
    }

    #[test]
    fn test_fetcher_without_cache_has_no_cache_path() {
        let fetcher = SourceFetcher::new(None).unwrap();
        assert!(fetcher.cache_path("https://example.org/x.json").unwrap().is_none());
    }
}
