//! Tests for the quotes endpoint

use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use coinfolio_core::domain::{CoinId, FiatCode};
use coinfolio_core::ports::{ApiResponse, IMarketSource};

use crate::common::*;

#[tokio::test]
async fn test_quotes_for_ids() {
    let (server, source) = setup_market_mock().await;

    Mock::given(method("GET"))
        .and(path(QUOTES))
        .and(query_param("id", "1,1027"))
        .and(query_param("convert", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "1": wire_coin(1, "BTC", 1, "USD", 65000.25),
            "1027": wire_coin(1027, "ETH", 2, "USD", 3100.0),
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let ids = [CoinId::new(1), CoinId::new(1027)];
    let ApiResponse::Success(coins) = source.quotes(&FiatCode::usd(), &ids).await else {
        panic!("expected success");
    };

    assert_eq!(coins.len(), 2);
    assert_eq!(coins[0].symbol, "BTC");
    assert_eq!(coins[0].price, Decimal::new(6500025, 2));
    assert_eq!(coins[0].fetched_at, coins[1].fetched_at);
}

#[tokio::test]
async fn test_quotes_without_ids_skips_request() {
    let (server, source) = setup_market_mock().await;

    Mock::given(method("GET"))
        .and(path(QUOTES))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = source.quotes(&FiatCode::usd(), &[]).await;
    assert_eq!(response, ApiResponse::Empty);
}

#[tokio::test]
async fn test_quotes_no_content() {
    let (server, source) = setup_market_mock().await;

    Mock::given(method("GET"))
        .and(path(QUOTES))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let response = source.quotes(&FiatCode::usd(), &[CoinId::new(1)]).await;
    assert_eq!(response, ApiResponse::Empty);
}
