//! Tests for the latest listings endpoint

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use coinfolio_core::domain::{CoinId, FiatCode, SyncFailure};
use coinfolio_core::ports::{ApiResponse, IMarketSource};

use crate::common::*;

#[tokio::test]
async fn test_listings_success() {
    let (server, source) = setup_market_mock().await;

    Mock::given(method("GET"))
        .and(path(LISTINGS))
        .and(query_param("convert", "EUR"))
        .and(query_param("limit", "2"))
        .and(header("X-CMC_PRO_API_KEY", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!([
            wire_coin(1027, "ETH", 2, "EUR", 2000.0),
            wire_coin(1, "BTC", 1, "EUR", 60000.0),
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let eur = FiatCode::new("EUR").unwrap();
    let ApiResponse::Success(coins) = source.latest_listings(&eur, 2).await else {
        panic!("expected success");
    };

    let expected_at: DateTime<Utc> = TIMESTAMP.parse().unwrap();
    assert_eq!(coins.len(), 2);
    assert_eq!(coins[0].id, CoinId::new(1));
    assert_eq!(coins[0].price, Decimal::from(60000));
    assert_eq!(coins[1].percent_change_24h, Decimal::new(-15, 1));
    assert!(coins.iter().all(|c| c.fetched_at == expected_at));
    assert!(coins.iter().all(|c| c.fiat_code == eur));
}

#[tokio::test]
async fn test_listings_no_content_is_empty() {
    let (server, source) = setup_market_mock().await;

    Mock::given(method("GET"))
        .and(path(LISTINGS))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let response = source.latest_listings(&FiatCode::usd(), 10).await;
    assert_eq!(response, ApiResponse::Empty);
}

#[tokio::test]
async fn test_listings_empty_list_is_success() {
    let (server, source) = setup_market_mock().await;
    mount_json(&server, LISTINGS, 200, envelope(json!([]))).await;

    let response = source.latest_listings(&FiatCode::usd(), 10).await;
    assert_eq!(response, ApiResponse::Success(vec![]));
}

#[tokio::test]
async fn test_listings_server_error_envelope() {
    let (server, source) = setup_market_mock().await;
    mount_json(
        &server,
        LISTINGS,
        400,
        error_envelope(400, "Invalid value for \"convert\": \"XYZ\""),
    )
    .await;

    let response = source
        .latest_listings(&FiatCode::new("XYZ").unwrap(), 10)
        .await;
    assert_eq!(
        response,
        ApiResponse::Error(SyncFailure::ServerError {
            status: 400,
            code: Some(400),
            message: "Invalid value for \"convert\": \"XYZ\"".into(),
        })
    );
}

#[tokio::test]
async fn test_listings_unauthorized() {
    let (server, source) = setup_market_mock().await;
    mount_json(&server, LISTINGS, 401, error_envelope(1002, "API key missing.")).await;

    let response = source.latest_listings(&FiatCode::usd(), 10).await;
    match response {
        ApiResponse::Error(SyncFailure::ServerError {
            status, message, ..
        }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "API key missing.");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_listings_malformed_body() {
    let (server, source) = setup_market_mock().await;

    Mock::given(method("GET"))
        .and(path(LISTINGS))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let response = source.latest_listings(&FiatCode::usd(), 10).await;
    assert!(matches!(
        response,
        ApiResponse::Error(SyncFailure::NetworkFailure(_))
    ));
}
