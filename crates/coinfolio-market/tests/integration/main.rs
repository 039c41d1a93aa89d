//! Integration tests for coinfolio-market
//!
//! Uses wiremock to simulate the market data API and verifies end-to-end
//! behavior of the client and the `IMarketSource` provider.

mod common;

mod test_listings;
mod test_quotes;
mod test_retry;
