use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    /// Paise, passed through without conversion.
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Order as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(key_id: &str, key_secret: &str) -> Self {
        Self {
            client: Client::new(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        }
    }

    /// Open an order with the gateway. The returned order id is what client
    /// checkouts and webhooks later reference.
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RazorpayOrder> {
        let response = self
            .client
            .post(ORDERS_URL)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount,
                currency,
                receipt,
            })
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Razorpay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Razorpay API error: {}",
                error_text
            )));
        }

        let order: RazorpayOrder = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Razorpay response: {}", e)))?;

        Ok(order)
    }

    /// Check a payment signature: HMAC-SHA256 over `"{order_id}|{payment_id}"`
    /// keyed with the API secret, hex encoded.
    pub fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool> {
        let signed_payload = format!("{}|{}", order_id, payment_id);

        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|_| AppError::Internal("Invalid Razorpay key secret".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        let expected_bytes = expected.as_bytes();
        let provided_bytes = signature.as_bytes();

        // Length check is not constant-time, but that's fine - signature length
        // is not secret (it's always 64 hex chars for SHA-256)
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        // Constant-time comparison to prevent timing attacks on the digest.
        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}
