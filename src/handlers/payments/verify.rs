//! Payment verification endpoint.

use axum::extract::State;
use axum::http::HeaderMap;

use crate::db::AppState;
use crate::error::{AppError, Result, msg};
use crate::extractors::Json;

use super::notice::PaymentNotice;
use super::settlement;

/// Verify a payment notification and settle its order.
///
/// The signature is checked before any database work. A body that yields no
/// order/payment ids is a 400, a missing signature is a 401, a mismatching
/// one is a 401 with "Invalid signature" and leaves the order untouched.
pub async fn verify_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(notice): Json<PaymentNotice>,
) -> Result<Json<serde_json::Value>> {
    let attempt = notice
        .into_attempt(&headers)
        .ok_or_else(|| AppError::BadRequest(msg::MISSING_PAYMENT_FIELDS.into()))?;

    let Some(signature) = attempt.signature.clone() else {
        tracing::warn!("Payment notice for order {} without signature", attempt.order_id);
        return Err(AppError::Unauthorized);
    };

    let verified =
        state
            .razorpay
            .verify_payment_signature(&attempt.order_id, &attempt.payment_id, &signature)?;
    if !verified {
        tracing::warn!("Signature mismatch for order {}", attempt.order_id);
        return Err(AppError::InvalidSignature);
    }

    let mut conn = state.db.get()?;
    let settlement = settlement::settle(&mut conn, &attempt, &signature)?;

    tracing::info!(
        "payment settled: order={} payment={} user={} course={} amount={} agent_credited={} reward={} migrated={}",
        settlement.transaction.order_id,
        attempt.payment_id,
        settlement.transaction.user_id,
        settlement.transaction.course_id,
        settlement.transaction.amount,
        settlement.agent_credited,
        settlement.reward_credited,
        settlement.purchases_migrated,
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Payment successful, access granted"
    })))
}
