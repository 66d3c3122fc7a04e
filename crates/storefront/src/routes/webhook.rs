//! Payment provider webhook sink.
//!
//! Deliveries are authenticated with the signed `stripe-signature` header
//! before the payload is decoded; an unverified body is never parsed as an
//! event. Unrecognized event types are acknowledged and ignored so the
//! provider does not retry them.

use axum::{Json, extract::State, http::HeaderMap};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::payments::{PaymentError, webhook::construct_event};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Map a verification failure to a client error; anything else stays a
/// provider error.
fn reject_unverified(err: PaymentError) -> AppError {
    match err {
        PaymentError::InvalidSignature(_) => {
            AppError::BadRequest("Invalid webhook signature".to_string())
        }
        other => AppError::Payment(other),
    }
}

/// Delivery acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Verify and process a webhook delivery.
#[instrument(skip(state, headers, payload))]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: String,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".to_string()))?;

    let secret = state.config().payments.webhook_secret.expose_secret();
    let event = construct_event(&payload, signature, secret).map_err(reject_unverified)?;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session_id = event.data.object.get("id").and_then(|v| v.as_str());
            let amount_total = event.data.object.get("amount_total").and_then(|v| v.as_i64());
            tracing::info!(session_id, amount_total, "Checkout session completed");
        }
        "identity.verification_session.verified" => {
            let session_id = event.data.object.get("id").and_then(|v| v.as_str());
            tracing::info!(session_id, "Identity verification completed");
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring webhook event");
        }
    }

    Ok(Json(WebhookAck { received: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_failure_maps_to_bad_request() {
        let mapped = reject_unverified(PaymentError::InvalidSignature(
            "no matching signature".to_string(),
        ));
        assert!(matches!(mapped, AppError::BadRequest(_)));
    }

    #[test]
    fn test_other_payment_errors_stay_provider_errors() {
        let mapped = reject_unverified(PaymentError::Parse("bad json".to_string()));
        assert!(matches!(mapped, AppError::Payment(_)));
    }
}
