//! Static map generation tool.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::amap::MapClient;
use super::landmarks::{fetch_landmarks, LandmarkCache};
use super::Tool;
use crate::error::ProviderError;
use crate::types::{Landmark, Location};

/// The overlay can label at most this many points.
const MAX_MARKERS: usize = 10;

/// What the model gets back, as JSON.
#[derive(Debug, Serialize)]
struct MapOutcome {
    landmarks: Vec<Landmark>,
    map_path: Option<String>,
    message: String,
}

/// Searches a city's landmarks and renders them onto a static map image.
pub struct GenerateStaticMapTool {
    client: Arc<MapClient>,
    cache: LandmarkCache,
    map_file: PathBuf,
    default_keyword: String,
}

impl GenerateStaticMapTool {
    pub fn new(
        client: Arc<MapClient>,
        cache: LandmarkCache,
        map_file: PathBuf,
        default_keyword: String,
    ) -> Self {
        Self {
            client,
            cache,
            map_file,
            default_keyword,
        }
    }
}

#[async_trait]
impl Tool for GenerateStaticMapTool {
    fn name(&self) -> &str {
        "generate_static_map"
    }

    fn description(&self) -> &str {
        "Search a city's landmarks and render them as labeled markers on \
         a static map image saved to disk. Returns the landmarks used, \
         the image path, and a status message."
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
                    "description": "Search keyword, e.g. \"famous sights\""
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

        let mut landmarks = match fetch_landmarks(&self.client, &self.cache, city, keyword).await {
            Ok(landmarks) => landmarks,
            Err(e) => {
                // Best-effort fallback to the last successful fetch for
                // this exact query; the cache is never authoritative.
                warn!(city, keyword, error = %e, "landmark fetch failed, trying cache");
                self.cache.load(city, keyword).unwrap_or_default()
            }
        };

        landmarks.truncate(MAX_MARKERS);
        let Some(center) = center_of(&landmarks) else {
            let outcome = MapOutcome {
                landmarks: vec![],
                map_path: None,
                message: format!("no landmarks found for {}, map not generated", city),
            };
            return Ok(serde_json::to_string(&outcome)?);
        };
        let center_str = format!("{:.6},{:.6}", center.lon, center.lat);
        let markers = marker_overlay(&landmarks);
        let labels = label_overlay(&landmarks);

        let outcome = match self.client.static_map(&center_str, &markers, &labels).await {
            Ok(bytes) => {
                tokio::fs::write(&self.map_file, &bytes).await.with_context(|| {
                    format!("Failed to write map image: {}", self.map_file.display())
                })?;
                info!(path = %self.map_file.display(), count = landmarks.len(), "map image written");
                MapOutcome {
                    map_path: Some(self.map_file.display().to_string()),
                    message: format!(
                        "map generated at {} with {} landmarks in {}",
                        self.map_file.display(),
                        landmarks.len(),
                        city
                    ),
                    landmarks,
                }
            }
            Err(ProviderError::Http { status, body }) => MapOutcome {
                landmarks: vec![],
                map_path: None,
                message: format!("map request failed with status {}: {}", status, body),
            },
            Err(e) => MapOutcome {
                landmarks: vec![],
                map_path: None,
                message: format!("map request failed: {}", e),
            },
        };

        Ok(serde_json::to_string(&outcome)?)
    }
}

/// Arithmetic mean of the longitudes and of the latitudes, independently.
/// `None` for an empty slice, which has no meaningful center.
fn center_of(landmarks: &[Landmark]) -> Option<Location> {
    if landmarks.is_empty() {
        return None;
    }
    let n = landmarks.len() as f64;
    Some(Location {
        lon: landmarks.iter().map(|lm| lm.location.lon).sum::<f64>() / n,
        lat: landmarks.iter().map(|lm| lm.location.lat).sum::<f64>() / n,
    })
}

/// One marker per landmark with a sequential letter id: `mid,,A:lon,lat|...`
fn marker_overlay(landmarks: &[Landmark]) -> String {
    landmarks
        .iter()
        .enumerate()
        .map(|(i, lm)| format!("mid,,{}:{}", (b'A' + i as u8) as char, lm.location))
        .collect::<Vec<_>>()
        .join("|")
}

fn label_overlay(landmarks: &[Landmark]) -> String {
    landmarks
        .iter()
        .map(|lm| format!("{},0,1,12,0xFF0000,0xFFFFFF:{}", lm.name, lm.location))
        .collect::<Vec<_>>()
        .join("|")
}
