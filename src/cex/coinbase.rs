/*
 * Coinbase spot price client
 */

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;
use crate::cex::CexClient;
use crate::models::{EthPrice, Result, SwapError};

pub const COINBASE_API_URL: &str = "https://api.coinbase.com";

#[derive(Debug, Deserialize)]
struct SpotPriceResponse {
    data: SpotPriceData,
}

#[derive(Debug, Deserialize)]
struct SpotPriceData {
    amount: String,
}

pub struct CoinbaseClient {
    client: Client,
    base_url: String,
}

impl Default for CoinbaseClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CoinbaseClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(COINBASE_API_URL)
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CexClient for CoinbaseClient {
    async fn get_spot_price(&self, base: &str, quote: &str) -> Result<EthPrice> {
        let (base, quote) = (base.to_uppercase(), quote.to_uppercase());
        let url = format!("{}/v2/prices/{base}-{quote}/spot", self.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SwapError::CexApi(format!(
                "Coinbase returned {} for {base}-{quote}",
                response.status()
            )));
        }

        let body: SpotPriceResponse = response
            .json()
            .await
            .map_err(|e| SwapError::CexApi(format!("Failed to parse Coinbase response: {e}")))?;

        let price = Decimal::from_str(&body.data.amount)
            .map_err(|e| SwapError::CexApi(format!("Failed to parse price: {e}")))?;
        debug!("Coinbase {base}/{quote} spot: {price}");

        Ok(EthPrice {
            exchange: "Coinbase".to_string(),
            pair: format!("{base}/{quote}"),
            price,
            timestamp: Utc::now(),
        })
    }
}
