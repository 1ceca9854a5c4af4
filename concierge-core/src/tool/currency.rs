use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    error::{ToolError, truncate_body},
    model::{ConversionResult, STATUS_SUCCESS},
    tool::{HTTP_TIMEOUT, Tool, ToolId, required_str},
};

const SERVICE: &str = "ExchangeRate-API";
pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Currency conversion through ExchangeRate-API v6.
///
/// Each conversion downloads the full rate table for the source currency and
/// looks the target up locally.
#[derive(Debug, Clone)]
pub struct ExchangeRateTool {
    api_key: String,
    base_url: String,
    http: Client,
}

impl ExchangeRateTool {
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

    async fn fetch_rates(&self, from: &str) -> Result<HashMap<String, f64>, ToolError> {
        let url = format!("{}/{}/latest/{}", self.base_url, self.api_key, from);
        tracing::debug!(base = %self.base_url, from, "requesting exchange rate table");

        let res = self
            .http
            .get(&url)
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

        let parsed: ErLatestResponse = serde_json::from_str(&body)
            .map_err(|source| ToolError::Decode { service: SERVICE, source })?;

        if parsed.result.as_deref() != Some(STATUS_SUCCESS) {
            return Err(ToolError::Api {
                service: SERVICE,
                payload: truncate_body(&body),
            });
        }

        Ok(parsed.conversion_rates)
    }

    /// Convert `amount` from one currency to another.
    ///
    /// The source code is upper-cased for the request. The target is looked
    /// up in the returned table exactly as given.
    pub async fn convert(
        &self,
        amount: f64,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<ConversionResult, ToolError> {
        let from = from_currency.trim().to_uppercase();
        let to = to_currency.trim();

        let rates = self.fetch_rates(&from).await?;
        let rate = *rates.get(to).ok_or_else(|| ToolError::UnknownCurrency(to.to_string()))?;

        Ok(ConversionResult::new(amount, rate))
    }
}

#[derive(Debug, Deserialize)]
struct ErLatestResponse {
    result: Option<String>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

#[async_trait]
impl Tool for ExchangeRateTool {
    fn id(&self) -> ToolId {
        ToolId::ConvertCurrency
    }

    fn description(&self) -> &'static str {
        "Convert an amount of money between currencies. Currencies are ISO 4217 \
         codes such as JPY, USD, GBP or PHP. Returns the converted amount and the rate used."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "amount": { "type": "number", "description": "Amount in the source currency" },
                "from_currency": { "type": "string", "description": "Source currency code, e.g. JPY" },
                "to_currency": { "type": "string", "description": "Target currency code, e.g. GBP" }
            },
            "required": ["amount", "from_currency", "to_currency"]
        })
    }

    async fn call(&self, args: &Value) -> Result<Value, ToolError> {
        let amount = args
            .get("amount")
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: self.id().as_str(),
                message: "missing numeric 'amount'".to_string(),
            })?;
        let from = required_str(self.id(), args, "from_currency")?;
        let to = required_str(self.id(), args, "to_currency")?;

        let result = self.convert(amount, from, to).await?;
        serde_json::to_value(result).map_err(|source| ToolError::Decode { service: SERVICE, source })
    }
}
