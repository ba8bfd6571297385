//! Landmark search tool and the per-query cache.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::amap::MapClient;
use super::Tool;
use crate::error::ProviderError;
use crate::types::Landmark;

/// Best-effort landmark cache, one JSON file per (city, keyword) query
/// so distinct queries never clobber each other's results. Written only
/// on a successful fetch; readers treat it as a fallback, never as
/// authoritative.
#[derive(Clone)]
pub struct LandmarkCache {
    dir: PathBuf,
}

impl LandmarkCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, city: &str, keyword: &str) -> PathBuf {
        self.dir
            .join(format!("landmarks-{}-{}.json", slug(city), slug(keyword)))
    }

    pub fn store(&self, city: &str, keyword: &str, landmarks: &[Landmark]) -> Result<PathBuf> {
        let path = self.path_for(city, keyword);
        let json = serde_json::to_string_pretty(landmarks)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write cache file: {}", path.display()))?;
        Ok(path)
    }

    pub fn load(&self, city: &str, keyword: &str) -> Option<Vec<Landmark>> {
        let content = std::fs::read_to_string(self.path_for(city, keyword)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

fn slug(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}

/// Fetch landmarks for a city and persist them to the cache.
///
/// Typed errors let programmatic callers tell "network unreachable"
/// from "malformed response" from "no results"; an empty list with `Ok`
/// means the provider answered and found nothing with a location.
pub async fn fetch_landmarks(
    client: &MapClient,
    cache: &LandmarkCache,
    city: &str,
    keyword: &str,
) -> Result<Vec<Landmark>, ProviderError> {
    let landmarks = client.search_places(city, keyword).await?;
    debug!(city, keyword, count = landmarks.len(), "landmark fetch succeeded");

    // Cache only on success; a failed fetch leaves earlier entries intact.
    if let Err(e) = cache.store(city, keyword, &landmarks) {
        warn!(city, keyword, error = %e, "landmark cache write failed");
    }

    Ok(landmarks)
}

/// Landmark search tool. The model receives the landmark list as JSON;
/// an empty array is the only failure signal it sees.
pub struct FetchLandmarksTool {
    client: Arc<MapClient>,
    cache: LandmarkCache,
    default_keyword: String,
}

impl FetchLandmarksTool {
    pub fn new(client: Arc<MapClient>, cache: LandmarkCache, default_keyword: String) -> Self {
        Self {
            client,
            cache,
            default_keyword,
        }
    }
}

#[async_trait]
impl Tool for FetchLandmarksTool {
    fn name(&self) -> &str {
        "fetch_landmarks"
    }

    fn description(&self) -> &str {
        "Search for points of interest in a city. Returns a JSON array of \
         landmarks with name, address and \"lon,lat\" location. An empty \
         array means nothing was found."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. \"Beijing\""
                },
                "keyword": {
                    "type": "string",
                    "description": "Search keyword, e.g. \"famous sights\" or \"museum\""
                }
            },
            "required": ["city"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<String> {
        let city = params
            .get("city")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let keyword = params
            .get("keyword")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.default_keyword);

        if city.is_empty() {
            return Ok("[]".to_string());
        }

        match fetch_landmarks(&self.client, &self.cache, city, keyword).await {
            Ok(landmarks) => Ok(serde_json::to_string(&landmarks)?),
            Err(e) => {
                warn!(city, keyword, error = %e, "landmark fetch failed");
                Ok("[]".to_string())
            }
        }
    }
}
