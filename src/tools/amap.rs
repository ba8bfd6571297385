//! HTTP client for the weather/place/map collaborator.
//!
//! The three travel tools share one client holding the API key and base
//! URL from [`ToolsConfig`]. The wire format follows the AMap v3 REST
//! endpoints: envelope with string `status` ("1" means success) and an
//! `info` field carrying the provider's diagnostic.

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use crate::config::ToolsConfig;
use crate::error::ProviderError;
use crate::types::{Landmark, Location};

pub struct MapClient {
    http: reqwest::Client,
    key: String,
    base_url: String,
}

// --- Weather wire types ---

#[derive(Debug, Deserialize)]
pub struct WeatherEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub info: String,
    pub forecasts: Option<Vec<Forecast>>,
}

#[derive(Debug, Deserialize)]
pub struct Forecast {
    pub city: String,
    #[serde(rename = "reporttime", default)]
    pub report_time: String,
    #[serde(default)]
    pub casts: Vec<DailyCast>,
}

/// One forecast day. The provider sends every field as a string.
#[derive(Debug, Deserialize)]
pub struct DailyCast {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub week: String,
    #[serde(rename = "dayweather", default)]
    pub day_weather: String,
    #[serde(rename = "nightweather", default)]
    pub night_weather: String,
    #[serde(rename = "daytemp", default)]
    pub day_temp: String,
    #[serde(rename = "nighttemp", default)]
    pub night_temp: String,
    #[serde(rename = "daywind", default)]
    pub day_wind: String,
}

// --- Place search wire types ---

#[derive(Debug, Deserialize)]
struct PlaceEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    pois: Vec<Poi>,
}

#[derive(Debug, Deserialize)]
struct Poi {
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: serde_json::Value,
    #[serde(default)]
    location: Option<String>,
}

impl MapClient {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            key: config.api_key()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Multi-day forecast for a city. The caller decides how to render
    /// a non-"1" status or missing forecasts; this only fails on
    /// transport or an unparseable body.
    pub async fn weather(&self, city: &str) -> Result<WeatherEnvelope, ProviderError> {
        let url = format!("{}/weather/weatherInfo", self.base_url);
        debug!(city, "weather lookup");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.key.as_str()),
                ("city", city),
                ("extensions", "all"),
                ("output", "JSON"),
            ])
            .send()
            .await?;

        response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    /// Search POIs in a city, keeping only entries that carry a
    /// parseable location.
    pub async fn search_places(
        &self,
        city: &str,
        keyword: &str,
    ) -> Result<Vec<Landmark>, ProviderError> {
        let url = format!("{}/place/text", self.base_url);
        debug!(city, keyword, "place search");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.key.as_str()),
                ("keywords", keyword),
                ("city", city),
                ("citylimit", "true"),
                ("extensions", "all"),
                ("offset", "10"),
                ("page", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: PlaceEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        if envelope.status != "1" || envelope.info != "OK" {
            return Err(ProviderError::Api(envelope.info));
        }

        let landmarks = envelope
            .pois
            .into_iter()
            .filter_map(|poi| {
                let location = Location::parse(poi.location.as_deref()?)?;
                Some(Landmark {
                    name: poi.name,
                    // the provider sends [] instead of "" for missing addresses
                    address: poi.address.as_str().unwrap_or_default().to_string(),
                    location,
                })
            })
            .collect();

        Ok(landmarks)
    }

    /// Fetch a rendered static map. Success is HTTP 200 with the image
    /// bytes as the body.
    pub async fn static_map(
        &self,
        center: &str,
        markers: &str,
        labels: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/staticmap", self.base_url);
        debug!(center, "static map render");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("location", center),
                ("zoom", "12"),
                ("size", "1024*768"),
                ("markers", markers),
                ("labels", labels),
                ("key", self.key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: &str) -> MapClient {
        let config = ToolsConfig {
            api_key: Some("test-key".to_string()),
            api_key_env: "UNUSED".to_string(),
            base_url: base_url.to_string(),
            cache_dir: None,
            map_file: "landmarks_map.png".into(),
            default_keyword: "famous sights".to_string(),
        };
        MapClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_search_places_filters_missing_locations() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/place/text".to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "status": "1",
                    "info": "OK",
                    "pois": [
                        {"name": "Palace Museum", "address": "Jingshan Front St", "location": "116.397128,39.916527"},
                        {"name": "No Location", "address": []},
                        {"name": "Bad Location", "address": "x", "location": "garbage"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let landmarks = client(&server.url())
            .search_places("Beijing", "famous sights")
            .await
            .unwrap();
        assert_eq!(landmarks.len(), 1);
        assert_eq!(landmarks[0].name, "Palace Museum");
    }

    #[tokio::test]
    async fn test_search_places_provider_failure_is_typed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/place/text".to_string()))
            .with_status(200)
            .with_body(json!({"status": "0", "info": "INVALID_USER_KEY"}).to_string())
            .create_async()
            .await;

        let err = client(&server.url())
            .search_places("Beijing", "famous sights")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Api(info) if info == "INVALID_USER_KEY"));
    }

    #[tokio::test]
    async fn test_search_places_http_error_is_typed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/place/text".to_string()))
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client(&server.url())
            .search_places("Beijing", "famous sights")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Http { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_static_map_non_200_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/staticmap".to_string()))
            .with_status(403)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let err = client(&server.url())
            .static_map("116,39", "", "")
            .await
            .unwrap_err();
        match err {
            ProviderError::Http { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_weather_returns_envelope_even_on_failure_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/weather/weatherInfo".to_string()),
            )
            .with_status(200)
            .with_body(json!({"status": "0", "info": "INVALID_PARAMS"}).to_string())
            .create_async()
            .await;

        let envelope = client(&server.url()).weather("Nowhere").await.unwrap();
        assert_eq!(envelope.status, "0");
        assert_eq!(envelope.info, "INVALID_PARAMS");
        assert!(envelope.forecasts.is_none());
    }
}
