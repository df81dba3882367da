//! Static resources loaded once at startup.
//!
//! Loading never fails outward: a missing or malformed resource is logged
//! and treated as an empty list, so the affected layer simply renders
//! nothing until the next reload.

pub mod fetch;
pub mod locations;

use serde::de::DeserializeOwned;

pub use fetch::{DataFetcher, DefaultFetcher, ResourceLocation};
pub use locations::{SegmentLocation, StationLocation};

use crate::models::types::{NetworkError, Result};

async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn DataFetcher,
    location: &ResourceLocation,
) -> Result<T> {
    let bytes = fetcher.fetch(location).await?;
    serde_json::from_slice(&bytes).map_err(|source| NetworkError::InvalidResource {
        location: location.to_string(),
        source,
    })
}

async fn load_list<T: DeserializeOwned>(
    fetcher: &dyn DataFetcher,
    location: &ResourceLocation,
    what: &'static str,
) -> Vec<T> {
    match fetch_json::<Vec<T>>(fetcher, location).await {
        Ok(items) => {
            tracing::info!(%location, count = items.len(), "loaded {what}");
            items
        }
        Err(error) => {
            tracing::warn!(%location, %error, "failed to load {what}, continuing with none");
            Vec::new()
        }
    }
}

pub async fn load_station_locations(
    fetcher: &dyn DataFetcher,
    location: &ResourceLocation,
) -> Vec<StationLocation> {
    load_list(fetcher, location, "station locations").await
}

pub async fn load_segment_locations(
    fetcher: &dyn DataFetcher,
    location: &ResourceLocation,
) -> Vec<SegmentLocation> {
    load_list(fetcher, location, "segment locations").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;

    struct StaticFetcher(&'static str);

    impl DataFetcher for StaticFetcher {
        fn fetch<'a>(
            &'a self,
            _location: &'a ResourceLocation,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
            Box::pin(async move { Ok(self.0.as_bytes().to_vec()) })
        }
    }

    struct FailingFetcher;

    impl DataFetcher for FailingFetcher {
        fn fetch<'a>(
            &'a self,
            location: &'a ResourceLocation,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
            Box::pin(async move {
                Err(NetworkError::Fetch {
                    location: location.to_string(),
                    message: "connection refused".into(),
                })
            })
        }
    }

    #[tokio::test]
    async fn test_load_stations() {
        let fetcher = StaticFetcher(r#"[{ "id": "A", "coordinates": [0.0, 0.0] }]"#);
        let stations =
            load_station_locations(&fetcher, &ResourceLocation::parse("stations.json")).await;
        assert_eq!(stations.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let location = ResourceLocation::parse("https://example.org/segments.json");
        let segments = load_segment_locations(&FailingFetcher, &location).await;
        assert!(segments.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_resource_degrades_to_empty() {
        let fetcher = StaticFetcher("{ not json");
        let stations =
            load_station_locations(&fetcher, &ResourceLocation::parse("stations.json")).await;
        assert!(stations.is_empty());
    }
}
