//! Catalog and holdings bindings
//!
//! Both resources read the local store through its live queries and refresh
//! it from the market source:
//!
//! | Resource            | Refresh when                                     | Remote call         |
//! |---------------------|--------------------------------------------------|---------------------|
//! | [`CatalogResource`] | cache empty, other currency, or window elapsed   | latest listings     |
//! | [`HoldingsResource`]| batch incoherent or priced in another currency   | quotes for held ids |

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use coinfolio_core::config::Config;
use coinfolio_core::domain::{
    is_coherent, is_same_currency, Coin, FiatCode, Holding, SyncFailure,
};
use coinfolio_core::ports::{ApiResponse, IMarketSource, IMarketStore, LiveQuery};

use crate::engine::BoundResource;
use crate::throttle::FetchThrottle;

/// Per-run session state the resources are parameterized by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Currency the user currently displays prices in
    pub fiat_code: FiatCode,
}

impl Session {
    pub fn new(fiat_code: FiatCode) -> Self {
        Self { fiat_code }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.session.fiat_code.clone())
    }
}

// ============================================================================
// CatalogResource
// ============================================================================

/// The full coin catalog in the session currency
pub struct CatalogResource {
    store: Arc<dyn IMarketStore>,
    source: Arc<dyn IMarketSource>,
    session: Session,
    limit: u32,
    delay: Duration,
    throttle: Option<Arc<FetchThrottle>>,
}

impl CatalogResource {
    pub fn new(
        store: Arc<dyn IMarketStore>,
        source: Arc<dyn IMarketSource>,
        session: Session,
        limit: u32,
    ) -> Self {
        Self {
            store,
            source,
            session,
            limit,
            delay: Duration::ZERO,
            throttle: None,
        }
    }

    /// Builds the resource with the limits and delays from configuration
    pub fn from_config(
        store: Arc<dyn IMarketStore>,
        source: Arc<dyn IMarketSource>,
        session: Session,
        config: &Config,
    ) -> Self {
        let mut resource = Self::new(store, source, session, config.market.listing_limit)
            .with_fetch_delay(config.sync.fetch_delay());
        if let Some(window) = config.sync.catalog_refresh_window() {
            resource = resource.with_throttle(Arc::new(FetchThrottle::new(window)));
        }
        resource
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Refreshes a populated catalog at most once per throttle window
    pub fn with_throttle(mut self, throttle: Arc<FetchThrottle>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait::async_trait]
impl BoundResource for CatalogResource {
    type Cached = Vec<Coin>;
    type Body = Vec<Coin>;

    fn name(&self) -> &'static str {
        "catalog"
    }

    fn load_from_store(&self) -> LiveQuery<Vec<Coin>> {
        self.store.observe_catalog()
    }

    fn should_fetch(&self, cached: &Vec<Coin>) -> bool {
        let key = self.session.fiat_code.as_str();
        let due = self
            .throttle
            .as_ref()
            .map_or(false, |throttle| throttle.is_due(key));
        let other_currency = !is_same_currency(cached, &self.session.fiat_code);
        debug!(
            cached = cached.len(),
            other_currency, due, "Catalog fetch decision"
        );
        cached.is_empty() || other_currency || due
    }

    fn fetch_delay(&self) -> Duration {
        self.delay
    }

    async fn call_remote(&self) -> ApiResponse<Vec<Coin>> {
        self.source
            .latest_listings(&self.session.fiat_code, self.limit)
            .await
    }

    async fn save_result(&self, body: Vec<Coin>) -> anyhow::Result<()> {
        self.store.save_catalog(&body).await?;
        if let Some(throttle) = &self.throttle {
            throttle.mark_fetched(self.session.fiat_code.as_str());
        }
        Ok(())
    }

    fn on_fetch_failed(&self) {
        if let Some(throttle) = &self.throttle {
            throttle.reset(self.session.fiat_code.as_str());
        }
    }
}

// ============================================================================
// HoldingsResource
// ============================================================================

/// The user's holdings, priced in a target currency
///
/// Switching the display currency is a new `HoldingsResource` with another
/// target: a batch already coherent in that currency is served from cache,
/// anything else is re-quoted.
pub struct HoldingsResource {
    store: Arc<dyn IMarketStore>,
    source: Arc<dyn IMarketSource>,
    target: FiatCode,
    delay: Duration,
}

impl HoldingsResource {
    pub fn new(
        store: Arc<dyn IMarketStore>,
        source: Arc<dyn IMarketSource>,
        target: FiatCode,
    ) -> Self {
        Self {
            store,
            source,
            target,
            delay: Duration::ZERO,
        }
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn target(&self) -> &FiatCode {
        &self.target
    }
}

#[async_trait::async_trait]
impl BoundResource for HoldingsResource {
    type Cached = Vec<Holding>;
    type Body = Vec<Coin>;

    fn name(&self) -> &'static str {
        "holdings"
    }

    fn load_from_store(&self) -> LiveQuery<Vec<Holding>> {
        self.store.observe_holdings()
    }

    fn should_fetch(&self, cached: &Vec<Holding>) -> bool {
        let coherent = is_coherent(cached);
        let same_currency = is_same_currency(cached, &self.target);
        debug!(
            cached = cached.len(),
            coherent, same_currency, "Holdings fetch decision"
        );
        !(coherent && same_currency)
    }

    fn fetch_delay(&self) -> Duration {
        self.delay
    }

    async fn call_remote(&self) -> ApiResponse<Vec<Coin>> {
        let ids = match self.store.holding_ids().await {
            Ok(ids) => ids,
            Err(e) => return ApiResponse::Error(SyncFailure::PersistenceFailure(e.to_string())),
        };
        if ids.is_empty() {
            debug!("No holdings to quote");
            return ApiResponse::Empty;
        }
        self.source.quotes(&self.target, &ids).await
    }

    async fn save_result(&self, body: Vec<Coin>) -> anyhow::Result<()> {
        self.store.upsert_holdings(&body).await.map(|_| ())
    }
}
