//! Shared test helpers for market API integration tests
//!
//! Each helper mounts mock endpoints on a wiremock server and returns a
//! provider pointing at it.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coinfolio_market::{CoinMarketCapSource, MarketClient};

pub const LISTINGS: &str = "/v1/cryptocurrency/listings/latest";
pub const QUOTES: &str = "/v1/cryptocurrency/quotes/latest";
pub const TIMESTAMP: &str = "2026-03-01T12:00:00.000Z";

/// Starts a mock server and returns a provider with retries disabled
pub async fn setup_market_mock() -> (MockServer, CoinMarketCapSource) {
    let server = MockServer::start().await;
    let client = MarketClient::with_base_url(server.uri())
        .with_api_key("test-key")
        .with_max_retries(0);
    (server, CoinMarketCapSource::new(client))
}

/// One coin as the API returns it, quoted in `fiat`
pub fn wire_coin(id: u32, symbol: &str, rank: u32, fiat: &str, price: f64) -> Value {
    let mut quote = serde_json::Map::new();
    quote.insert(
        fiat.to_string(),
        json!({
            "price": price,
            "percent_change_1h": 0.5,
            "percent_change_24h": -1.5,
            "percent_change_7d": 12
        }),
    );
    json!({
        "id": id,
        "name": format!("{symbol} coin"),
        "symbol": symbol,
        "cmc_rank": rank,
        "quote": quote
    })
}

pub fn envelope(data: Value) -> Value {
    json!({
        "status": {
            "timestamp": TIMESTAMP,
            "error_code": 0,
            "error_message": null
        },
        "data": data
    })
}

pub fn error_envelope(code: i64, message: &str) -> Value {
    json!({
        "status": {
            "timestamp": TIMESTAMP,
            "error_code": code,
            "error_message": message
        }
    })
}

/// Mounts a GET endpoint answering `status` with a JSON body
pub async fn mount_json(server: &MockServer, endpoint: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}
