//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::payments::PaymentClient;
use crate::spot::SpotClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like collaborator clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    spot: SpotClient,
    payments: PaymentClient,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let spot = SpotClient::new(&config.spot);
        let payments = PaymentClient::new(&config.payments);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                spot,
                payments,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the spot price feed client.
    #[must_use]
    pub fn spot(&self) -> &SpotClient {
        &self.inner.spot
    }

    /// Get a reference to the payment processor client.
    #[must_use]
    pub fn payments(&self) -> &PaymentClient {
        &self.inner.payments
    }
}
