//! Payment processor REST client.
//!
//! Speaks the Stripe-shaped API: form-encoded requests authenticated with the
//! secret key. Owns payment-method selection, 3-D Secure, and receipt
//! delivery upstream; this client only ever submits server-verified amounts
//! in integral cents. Taking [`VerifiedPrice`] in its parameter types (rather
//! than raw floats) makes it a compile error to charge a client-supplied
//! number.

pub mod webhook;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use dusk_bullion_core::VerifiedPrice;

use crate::config::PaymentConfig;

/// Errors that can occur when interacting with the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Webhook signature verification failed.
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
}

/// Audit metadata attached to every payable object.
///
/// Records the spot price and derived amounts the charge was computed from.
#[derive(Debug, Clone, Copy)]
pub struct OrderMetadata {
    pub spot_usd_per_oz: f64,
    pub subtotal: VerifiedPrice,
    pub shipping: VerifiedPrice,
}

/// One line item for a hosted checkout session, with its locked unit amount.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub weight_grams: f64,
    pub quantity: u32,
    pub unit_price: VerifiedPrice,
}

/// Parameters for creating a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub customer_email: Option<String>,
    pub line_items: Vec<SessionLineItem>,
    pub shipping: VerifiedPrice,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: OrderMetadata,
}

/// A created checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// A created payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

/// A created identity verification session.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySession {
    pub id: String,
    pub url: Option<String>,
}

/// Error body shape returned by the payment API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Client for the payment processor REST API.
#[derive(Clone)]
pub struct PaymentClient {
    inner: Arc<PaymentClientInner>,
}

struct PaymentClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
    enable_ach: bool,
}

impl PaymentClient {
    /// Create a new payment client.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            inner: Arc::new(PaymentClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base.clone(),
                secret_key: config.secret_key.clone(),
                enable_ach: config.enable_ach,
            }),
        }
    }

    /// POST a form-encoded request and decode the JSON response.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}{path}", self.inner.api_base);
        let response = self
            .inner
            .client
            .post(&url)
            .basic_auth(self.inner.secret_key.expose_secret(), None::<&str>)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::Parse(e.to_string()))
    }

    /// Create a hosted checkout session with locked per-unit amounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response has no redirect
    /// URL.
    #[instrument(skip(self, params), fields(lines = params.line_items.len()))]
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = checkout_session_form(params, self.inner.enable_ach);
        let session: CheckoutSession = self.post_form("/v1/checkout/sessions", &form).await?;
        if session.url.is_none() {
            return Err(PaymentError::Parse(
                "checkout session has no redirect url".to_string(),
            ));
        }
        Ok(session)
    }

    /// Create a payment intent for the given verified total.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no client secret is returned.
    #[instrument(skip(self, metadata))]
    pub async fn create_payment_intent(
        &self,
        total: VerifiedPrice,
        receipt_email: Option<&str>,
        metadata: &OrderMetadata,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut form = vec![
            ("amount".to_string(), total.as_cents().to_string()),
            ("currency".to_string(), "usd".to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        if let Some(email) = receipt_email {
            form.push(("receipt_email".to_string(), email.to_string()));
        }
        push_metadata(&mut form, metadata);

        let intent: PaymentIntent = self.post_form("/v1/payment_intents", &form).await?;
        if intent.client_secret.is_none() {
            return Err(PaymentError::Parse(
                "payment intent has no client secret".to_string(),
            ));
        }
        Ok(intent)
    }

    /// Create a to-document identity verification session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or no redirect URL is returned.
    #[instrument(skip(self))]
    pub async fn create_identity_session(
        &self,
        return_url: &str,
        user_email: Option<&str>,
    ) -> Result<IdentitySession, PaymentError> {
        let mut form = vec![
            ("type".to_string(), "document".to_string()),
            (
                "options[document][require_matching_selfie]".to_string(),
                "true".to_string(),
            ),
            ("return_url".to_string(), return_url.to_string()),
        ];
        form.push((
            "metadata[user_email]".to_string(),
            user_email.unwrap_or_default().to_string(),
        ));

        let session: IdentitySession = self
            .post_form("/v1/identity/verification_sessions", &form)
            .await?;
        if session.url.is_none() {
            return Err(PaymentError::Parse(
                "identity session has no redirect url".to_string(),
            ));
        }
        Ok(session)
    }
}

/// Build the form body for a checkout session.
///
/// Amounts come exclusively from the `VerifiedPrice` fields in `params`; the
/// unit amount is locked per line so the shopper pays exactly the server's
/// quote.
fn checkout_session_form(params: &CheckoutSessionParams, enable_ach: bool) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
    ];

    if enable_ach {
        form.push((
            "payment_method_types[1]".to_string(),
            "us_bank_account".to_string(),
        ));
        form.push((
            "payment_method_options[us_bank_account][financial_connections][permissions][0]"
                .to_string(),
            "payment_method".to_string(),
        ));
    }

    if let Some(email) = &params.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }

    for (i, item) in params.line_items.iter().enumerate() {
        form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        form.push((
            format!("line_items[{i}][price_data][currency]"),
            "usd".to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_price.as_cents().to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(image) = &item.image {
            form.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((
            format!("line_items[{i}][price_data][product_data][metadata][product_id]"),
            item.product_id.clone(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][metadata][brand]"),
            item.brand.clone().unwrap_or_default(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][metadata][weight_grams]"),
            item.weight_grams.to_string(),
        ));
    }

    form.push((
        "shipping_address_collection[allowed_countries][0]".to_string(),
        "US".to_string(),
    ));
    form.push((
        "shipping_address_collection[allowed_countries][1]".to_string(),
        "CA".to_string(),
    ));

    let shipping_cents = params.shipping.as_cents();
    let display_name = if shipping_cents == 0 {
        "Insured Shipping (FREE)"
    } else {
        "Insured Shipping"
    };
    form.push((
        "shipping_options[0][shipping_rate_data][type]".to_string(),
        "fixed_amount".to_string(),
    ));
    form.push((
        "shipping_options[0][shipping_rate_data][display_name]".to_string(),
        display_name.to_string(),
    ));
    form.push((
        "shipping_options[0][shipping_rate_data][fixed_amount][amount]".to_string(),
        shipping_cents.to_string(),
    ));
    form.push((
        "shipping_options[0][shipping_rate_data][fixed_amount][currency]".to_string(),
        "usd".to_string(),
    ));

    form.push(("success_url".to_string(), params.success_url.clone()));
    form.push(("cancel_url".to_string(), params.cancel_url.clone()));
    push_metadata(&mut form, &params.metadata);

    form
}

fn push_metadata(form: &mut Vec<(String, String)>, metadata: &OrderMetadata) {
    form.push((
        "metadata[spot_usd_per_oz]".to_string(),
        format!("{:.2}", metadata.spot_usd_per_oz),
    ));
    form.push((
        "metadata[subtotal_usd]".to_string(),
        format!("{:.2}", metadata.subtotal.as_usd()),
    ));
    form.push((
        "metadata[shipping_usd]".to_string(),
        format!("{:.2}", metadata.shipping.as_usd()),
    ));
}
