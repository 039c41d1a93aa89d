//! Tests for 429 handling and connection failures

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use coinfolio_core::domain::{FiatCode, SyncFailure};
use coinfolio_core::ports::{ApiResponse, IMarketSource};
use coinfolio_market::{CoinMarketCapSource, MarketClient};

use crate::common::*;

#[tokio::test]
async fn test_429_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTINGS))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTINGS))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!([wire_coin(1, "BTC", 1, "USD", 1.0)]))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = MarketClient::with_base_url(server.uri()).with_max_retries(2);
    let source = CoinMarketCapSource::new(client);

    let response = source.latest_listings(&FiatCode::usd(), 1).await;
    assert!(response.is_success());
}

#[tokio::test]
async fn test_429_exhausted() {
    let (server, source) = setup_market_mock().await;

    Mock::given(method("GET"))
        .and(path(LISTINGS))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .expect(1)
        .mount(&server)
        .await;

    let response = source.latest_listings(&FiatCode::usd(), 1).await;
    match response {
        ApiResponse::Error(SyncFailure::ServerError { status, message, .. }) => {
            assert_eq!(status, 429);
            assert!(message.contains("7s"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_network_failure() {
    // Bind then drop a server so the port is known to be closed
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let client = MarketClient::with_base_url(uri).with_max_retries(1);
    let source = CoinMarketCapSource::new(client);

    let response = source.latest_listings(&FiatCode::usd(), 1).await;
    assert!(matches!(
        response,
        ApiResponse::Error(SyncFailure::NetworkFailure(_))
    ));
}
