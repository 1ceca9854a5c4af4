use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::{ToolError, truncate_body},
    model::WeatherReport,
    tool::{HTTP_TIMEOUT, Tool, ToolId, required_str},
};

const SERVICE: &str = "WeatherAPI";
pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Current conditions from WeatherAPI.com.
#[derive(Debug, Clone)]
pub struct WeatherApiTool {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiTool {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Fetch current weather for `city`. The city is sent as given.
    pub async fn lookup(&self, city: &str) -> Result<WeatherReport, ToolError> {
        let url = format!("{}/current.json", self.base_url);
        tracing::debug!(%url, city, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", city), ("aqi", "no")])
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|source| ToolError::Transport { service: SERVICE, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ToolError::Transport { service: SERVICE, source })?;

        if !status.is_success() {
            return Err(ToolError::Status {
                service: SERVICE,
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: WaResponse = serde_json::from_str(&body)
            .map_err(|source| ToolError::Decode { service: SERVICE, source })?;

        Ok(WeatherReport {
            name: parsed.location.name,
            country: parsed.location.country,
            localtime: parsed.location.localtime,
            temp_c: parsed.current.temp_c,
            condition: parsed.current.condition.text,
            wind_kph: parsed.current.wind_kph,
            humidity: parsed.current.humidity,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
    localtime: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    humidity: u8,
    wind_kph: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[async_trait]
impl Tool for WeatherApiTool {
    fn id(&self) -> ToolId {
        ToolId::GetWeather
    }

    fn description(&self) -> &'static str {
        "Get the current weather for a city: temperature in Celsius, condition, \
         wind speed (kph), humidity (%) and local time. Pass the city name in English."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. \"Tokyo\" or \"London\""
                }
            },
            "required": ["city"]
        })
    }

    async fn call(&self, args: &Value) -> Result<Value, ToolError> {
        let city = required_str(self.id(), args, "city")?;
        let report = self.lookup(city).await?;
        serde_json::to_value(report).map_err(|source| ToolError::Decode { service: SERVICE, source })
    }
}
