//! Client for exchangerate-api.com, used by the "Курс валют" button.

use crate::core::config;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Default API host; tests point the client at a local mock instead
pub const DEFAULT_API_BASE: &str = "https://v6.exchangerate-api.com";

/// Why rates could not be fetched
#[derive(Debug, Error)]
pub enum RatesError {
    #[error("exchange rate API key is not configured")]
    NotConfigured,
    #[error("exchange rate API returned an error: {0:?}")]
    Api(Option<String>),
    #[error("exchange rate service is unreachable: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected exchange rate payload: {0}")]
    Malformed(String),
}

/// Rates for 1 USD, plus the derived RUB price of 1 EUR
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsdRates {
    pub usd_to_rub: f64,
    pub eur_to_rub: f64,
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    conversion_rates: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

/// HTTP client for the exchange-rate API
pub struct RatesClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RatesClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE.to_string())
    }

    /// Client with a custom API host, used by tests
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config::network::request_timeout())
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Fetches the RUB and EUR conversion rates for 1 USD.
    ///
    /// The API reports EUR per USD, so the RUB price of one euro is
    /// derived as RUB-per-USD divided by EUR-per-USD.
    pub async fn fetch_usd_rates(&self) -> Result<UsdRates, RatesError> {
        if self.api_key.is_empty() {
            return Err(RatesError::NotConfigured);
        }

        let url = format!("{}/v6/{}/latest/USD", self.base_url, self.api_key);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error_type = serde_json::from_str::<ApiErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_type);
            log::error!(
                "Exchange rate API returned status {}: {:?}",
                status,
                error_type
            );
            return Err(RatesError::Api(error_type));
        }

        let parsed: LatestRatesResponse =
            serde_json::from_str(&body).map_err(|e| RatesError::Malformed(e.to_string()))?;

        let usd_to_rub = *parsed
            .conversion_rates
            .get("RUB")
            .ok_or_else(|| RatesError::Malformed("no RUB rate in response".to_string()))?;
        let eur_per_usd = *parsed
            .conversion_rates
            .get("EUR")
            .ok_or_else(|| RatesError::Malformed("no EUR rate in response".to_string()))?;

        if eur_per_usd <= 0.0 {
            return Err(RatesError::Malformed(format!(
                "non-positive EUR rate: {}",
                eur_per_usd
            )));
        }

        Ok(UsdRates {
            usd_to_rub,
            eur_to_rub: usd_to_rub / eur_per_usd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RatesClient {
        RatesClient::with_base_url("test_key".to_string(), server.uri())
    }

    #[tokio::test]
    async fn test_parses_rates_and_derives_eur() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/test_key/latest/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "success",
                "conversion_rates": { "RUB": 90.0, "EUR": 0.9, "USD": 1.0 }
            })))
            .mount(&server)
            .await;

        let rates = client_for(&server).fetch_usd_rates().await.unwrap();
        assert_eq!(rates.usd_to_rub, 90.0);
        assert_eq!(rates.eur_to_rub, 100.0);
    }

    #[tokio::test]
    async fn test_api_error_carries_error_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "result": "error",
                "error-type": "invalid-key"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_usd_rates().await.unwrap_err();
        match err {
            RatesError::Api(code) => assert_eq!(code.as_deref(), Some("invalid-key")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_usd_rates().await.unwrap_err();
        assert!(matches!(err, RatesError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_missing_rub_rate_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "success",
                "conversion_rates": { "EUR": 0.9 }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_usd_rates().await.unwrap_err();
        assert!(matches!(err, RatesError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_empty_key_is_not_configured() {
        let client = RatesClient::with_base_url(String::new(), "http://127.0.0.1:9".to_string());
        let err = client.fetch_usd_rates().await.unwrap_err();
        assert!(matches!(err, RatesError::NotConfigured));
    }
}
