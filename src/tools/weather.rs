//! Weather lookup tool.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::amap::{MapClient, WeatherEnvelope};
use super::Tool;

/// Multi-day forecast for a city, formatted for the model.
///
/// This tool never fails past its boundary: transport errors, a
/// non-success provider status, and a missing forecast list all come
/// back as diagnostic text the model can work with.
pub struct WeatherSearchTool {
    client: Arc<MapClient>,
}

impl WeatherSearchTool {
    pub fn new(client: Arc<MapClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WeatherSearchTool {
    fn name(&self) -> &str {
        "weather_search"
    }

    fn description(&self) -> &str {
        "Look up the multi-day weather forecast for a city. Returns a \
         formatted report with date, weekday, day/night conditions and \
         temperatures, and wind strength."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. \"Beijing\""
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
        if city.is_empty() {
            return Ok("weather lookup failed: missing city parameter".to_string());
        }

        match self.client.weather(city).await {
            Ok(envelope) => Ok(format_report(envelope)),
            Err(e) => {
                warn!(city, error = %e, "weather lookup failed");
                Ok(format!("weather lookup failed: {}", e))
            }
        }
    }
}

fn format_report(envelope: WeatherEnvelope) -> String {
    let forecast = match envelope.forecasts.and_then(|mut f| {
        if f.is_empty() {
            None
        } else {
            Some(f.remove(0))
        }
    }) {
        Some(forecast) if envelope.status == "1" => forecast,
        _ => {
            let info = if envelope.info.is_empty() {
                "unknown error".to_string()
            } else {
                envelope.info
            };
            return format!("weather lookup failed: {}", info);
        }
    };

    let mut report = format!(
        "{} weather forecast (reported {}):\n",
        forecast.city, forecast.report_time
    );
    for day in &forecast.casts {
        report.push_str(&format!(
            "{} {} day: {} ({}C) night: {} ({}C) wind: level {}\n",
            day.date,
            day.week,
            day.day_weather,
            day.day_temp,
            day.night_weather,
            day.night_temp,
            day.day_wind
        ));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(body: serde_json::Value) -> WeatherEnvelope {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_report_contains_each_day() {
        let report = format_report(envelope(json!({
            "status": "1",
            "info": "OK",
            "forecasts": [{
                "city": "Beijing",
                "reporttime": "2024-05-01 08:00:00",
                "casts": [
                    {"date": "2024-05-01", "week": "3", "dayweather": "Sunny",
                     "nightweather": "Clear", "daytemp": "25", "nighttemp": "14",
                     "daywind": "4"},
                    {"date": "2024-05-02", "week": "4", "dayweather": "Cloudy",
                     "nightweather": "Rain", "daytemp": "21", "nighttemp": "12",
                     "daywind": "5"}
                ]
            }]
        })));

        assert!(report.starts_with("Beijing weather forecast (reported 2024-05-01 08:00:00)"));
        assert!(report.contains("2024-05-01 3 day: Sunny (25C) night: Clear (14C) wind: level 4"));
        assert!(report.contains("2024-05-02"));
    }

    #[test]
    fn test_missing_forecasts_yields_diagnostic_with_info() {
        let report = format_report(envelope(json!({
            "status": "0",
            "info": "INVALID_USER_KEY"
        })));
        assert!(report.contains("INVALID_USER_KEY"));
        assert!(report.starts_with("weather lookup failed"));
    }

    #[test]
    fn test_success_status_but_empty_forecasts_is_diagnostic() {
        let report = format_report(envelope(json!({
            "status": "1",
            "info": "OK",
            "forecasts": []
        })));
        assert!(report.contains("OK"));
        assert!(report.starts_with("weather lookup failed"));
    }
}
