//! Pluggable fetching of static resources.
//!
//! Resources are read once at startup (and again on an explicit reload).
//! Implement [`DataFetcher`] to source them from somewhere else.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::models::types::{NetworkError, Result};

/// Where a static resource lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceLocation {
    File(PathBuf),
    Url(String),
}

impl ResourceLocation {
    /// `http://` and `https://` locations are URLs, anything else is a path.
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            Self::Url(s.to_owned())
        } else {
            Self::File(PathBuf::from(s))
        }
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// Fetch raw bytes for a resource
pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        location: &'a ResourceLocation,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;
}

/// Reads files with tokio and URLs with reqwest.
#[derive(Clone, Default)]
pub struct DefaultFetcher {
    client: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_file(path: &Path, location: &ResourceLocation) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| NetworkError::Fetch {
            location: location.to_string(),
            message: e.to_string(),
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let failed = |e: reqwest::Error| NetworkError::Fetch {
            location: url.to_owned(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(failed)?;
        let bytes = response.bytes().await.map_err(failed)?;

        Ok(bytes.to_vec())
    }
}

impl DataFetcher for DefaultFetcher {
    fn fetch<'a>(
        &'a self,
        location: &'a ResourceLocation,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            match location {
                ResourceLocation::File(path) => Self::read_file(path, location).await,
                ResourceLocation::Url(url) => self.get(url).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        assert_eq!(
            ResourceLocation::parse("https://example.org/stations.json"),
            ResourceLocation::Url("https://example.org/stations.json".into())
        );
        assert_eq!(
            ResourceLocation::parse("assets/stations.json"),
            ResourceLocation::File(PathBuf::from("assets/stations.json"))
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let fetcher = DefaultFetcher::new();
        let location = ResourceLocation::parse("/definitely/not/here.json");

        let result = fetcher.fetch(&location).await;
        assert!(matches!(result, Err(NetworkError::Fetch { .. })));
    }
}
