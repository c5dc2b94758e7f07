//! Inbound payment notification payloads.
//!
//! Verified payments reach this service over two routes: Razorpay webhooks
//! wrap the payment in `payload.payment.entity`, while the browser checkout
//! posts a flat body. Extraction prefers the webhook shape, and the
//! `x-razorpay-signature` header is the final fallback for the signature.

use axum::http::HeaderMap;
use serde::Deserialize;

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Either notification shape; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentNotice {
    #[serde(default)]
    payload: Option<WebhookPayload>,
    #[serde(default)]
    razorpay_order_id: Option<String>,
    #[serde(default)]
    razorpay_payment_id: Option<String>,
    #[serde(default)]
    razorpay_signature: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    payment: Option<WebhookPayment>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPayment {
    #[serde(default)]
    entity: Option<PaymentEntity>,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentEntity {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    razorpay_payment_id: Option<String>,
    #[serde(default)]
    razorpay_signature: Option<String>,
}

/// Identifiers for one verification attempt, whatever shape delivered them.
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    pub order_id: String,
    pub payment_id: String,
    /// None when neither body shape nor the header carried a signature.
    pub signature: Option<String>,
}

impl PaymentNotice {
    /// Resolve order id, payment id and signature from the notice.
    ///
    /// The nested webhook shape wins when it carries both ids; otherwise the
    /// flat client shape is used. The signature resolves independently:
    /// entity field, then flat field, then header. Returns None when no
    /// shape yields both ids.
    pub fn into_attempt(self, headers: &HeaderMap) -> Option<PaymentAttempt> {
        let entity = self
            .payload
            .and_then(|p| p.payment)
            .and_then(|p| p.entity)
            .unwrap_or_default();

        let signature = entity
            .razorpay_signature
            .or(self.razorpay_signature)
            .or_else(|| {
                headers
                    .get(SIGNATURE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            });

        if let (Some(order_id), Some(payment_id)) = (entity.order_id, entity.razorpay_payment_id) {
            return Some(PaymentAttempt {
                order_id,
                payment_id,
                signature,
            });
        }

        let order_id = self.razorpay_order_id?;
        let payment_id = self.razorpay_payment_id?;
        Some(PaymentAttempt {
            order_id,
            payment_id,
            signature,
        })
    }
}
