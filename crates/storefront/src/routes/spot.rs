//! Spot price endpoint.
//!
//! Always answers 200 with a payload; an unusable or unreachable feed is
//! reported through `usdPerOz: 0` plus an `error` field rather than an HTTP
//! failure, so the ticker can render "unavailable" without special-casing
//! statuses. Responses are never cached.

use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// Wire payload for the spot endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPayload {
    pub usd_per_oz: f64,
    /// RFC 3339 timestamp of the price observation.
    pub updated_at: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serve the live spot price.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> impl IntoResponse {
    let provider = state.config().spot.provider.to_string();

    let payload = match state.spot().latest().await {
        Ok(price) => SpotPayload {
            usd_per_oz: price.usd_per_oz,
            updated_at: price.updated_at.to_rfc3339(),
            provider,
            error: None,
        },
        Err(e) => {
            tracing::warn!("Spot fetch failed: {e}");
            SpotPayload {
                usd_per_oz: 0.0,
                updated_at: Utc::now().to_rfc3339(),
                provider,
                error: Some("spot price unavailable".to_string()),
            }
        }
    };

    (
        AppendHeaders([(
            header::CACHE_CONTROL,
            "no-store, no-cache, must-revalidate, proxy-revalidate",
        )]),
        Json(payload),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_shape() {
        let payload = SpotPayload {
            usd_per_oz: 2012.35,
            updated_at: "2026-08-30T12:00:00+00:00".to_string(),
            provider: "metalsapi".to_string(),
            error: None,
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["usdPerOz"], 2012.35);
        assert_eq!(json["provider"], "metalsapi");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_unavailable_payload_keeps_zero_price() {
        let payload = SpotPayload {
            usd_per_oz: 0.0,
            updated_at: "2026-08-30T12:00:00+00:00".to_string(),
            provider: "goldapi".to_string(),
            error: Some("spot price unavailable".to_string()),
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["usdPerOz"], 0.0);
        assert_eq!(json["error"], "spot price unavailable");
    }
}
