//! CoinMarketCapSource - IMarketSource implementation
//!
//! Wraps the [`MarketClient`] and maps the two endpoints the synchronization
//! engine needs onto the [`IMarketSource`] port:
//!
//! | Port operation    | Endpoint                                  |
//! |-------------------|-------------------------------------------|
//! | `latest_listings` | `GET /v1/cryptocurrency/listings/latest`  |
//! | `quotes`          | `GET /v1/cryptocurrency/quotes/latest`    |

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use coinfolio_core::config::MarketConfig;
use coinfolio_core::domain::{Coin, CoinId, FiatCode};
use coinfolio_core::ports::{ApiResponse, IMarketSource};

use crate::client::MarketClient;
use crate::wire::{into_coins, QuotesData, WireCoin};
use crate::MarketError;

const LISTINGS_PATH: &str = "/v1/cryptocurrency/listings/latest";
const QUOTES_PATH: &str = "/v1/cryptocurrency/quotes/latest";

/// Market data provider backed by a CoinMarketCap-compatible API
pub struct CoinMarketCapSource {
    client: MarketClient,
}

impl CoinMarketCapSource {
    pub fn new(client: MarketClient) -> Self {
        Self { client }
    }

    /// Builds the provider from configuration
    pub fn from_config(config: &MarketConfig) -> Result<Self, MarketError> {
        Ok(Self::new(MarketClient::new(config)?))
    }

    pub fn client(&self) -> &MarketClient {
        &self.client
    }

    async fn fetch_listings(
        &self,
        fiat: &FiatCode,
        limit: u32,
    ) -> Result<Option<Vec<Coin>>, MarketError> {
        let query = [
            ("start", "1".to_string()),
            ("limit", limit.to_string()),
            ("convert", fiat.to_string()),
        ];
        let Some(payload) = self
            .client
            .get_data::<Vec<WireCoin>>(LISTINGS_PATH, &query)
            .await?
        else {
            return Ok(None);
        };

        let coins = into_coins(payload.data, fiat, payload.fetched_at)?;
        info!(count = coins.len(), fiat = %fiat, "Fetched latest listings");
        Ok(Some(coins))
    }

    async fn fetch_quotes(
        &self,
        fiat: &FiatCode,
        ids: &[CoinId],
    ) -> Result<Option<Vec<Coin>>, MarketError> {
        let id_list = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let query = [("id", id_list), ("convert", fiat.to_string())];
        let Some(payload) = self
            .client
            .get_data::<QuotesData>(QUOTES_PATH, &query)
            .await?
        else {
            return Ok(None);
        };

        let coins = into_coins(payload.data.into_coins(), fiat, payload.fetched_at)?;
        if coins.len() != ids.len() {
            warn!(
                requested = ids.len(),
                received = coins.len(),
                "Quote batch does not cover every requested id"
            );
        }
        info!(count = coins.len(), fiat = %fiat, "Fetched latest quotes");
        Ok(Some(coins))
    }
}

#[async_trait]
impl IMarketSource for CoinMarketCapSource {
    #[instrument(skip(self), fields(fiat = %fiat))]
    async fn latest_listings(&self, fiat: &FiatCode, limit: u32) -> ApiResponse<Vec<Coin>> {
        let result = self.fetch_listings(fiat, limit).await;
        if let Err(e) = &result {
            warn!(error = %e, "Listings request failed");
        }
        result.into()
    }

    #[instrument(skip(self, ids), fields(fiat = %fiat, ids = ids.len()))]
    async fn quotes(&self, fiat: &FiatCode, ids: &[CoinId]) -> ApiResponse<Vec<Coin>> {
        if ids.is_empty() {
            debug!("No ids requested");
            return ApiResponse::Empty;
        }
        let result = self.fetch_quotes(fiat, ids).await;
        if let Err(e) = &result {
            warn!(error = %e, "Quotes request failed");
        }
        result.into()
    }
}
