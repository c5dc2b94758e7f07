//! Order creation: opens a gateway order and its pending transaction.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::Json;
use crate::models::CreateTransaction;

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub user_id: String,
    pub course_id: String,
    #[serde(default)]
    pub agent_ref_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub transaction_id: String,
}

/// Open a Razorpay order for a course at its listed price and record the
/// matching pending transaction. The client completes checkout against the
/// returned order id; verification settles it later.
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<Json<OrderResponse>> {
    let conn = state.db.get()?;

    let user =
        queries::get_user_by_id(&conn, &request.user_id)?.or_not_found(msg::USER_NOT_FOUND)?;
    let course =
        queries::get_course_by_id(&conn, &request.course_id)?.or_not_found(msg::COURSE_NOT_FOUND)?;

    if queries::is_user_enrolled(&conn, &course.id, &user.id)? {
        return Err(AppError::Conflict(msg::ALREADY_ENROLLED.into()));
    }

    let receipt = Uuid::new_v4().to_string();
    let order = state
        .razorpay
        .create_order(course.price, "INR", &receipt)
        .await?;

    let transaction = queries::create_transaction(
        &conn,
        &CreateTransaction {
            order_id: order.id.clone(),
            user_id: user.id.clone(),
            course_id: course.id.clone(),
            amount: order.amount,
            agent_ref_code: request.agent_ref_code.clone(),
        },
    )?;

    tracing::info!(
        "order opened: order={} user={} course={} amount={}",
        order.id,
        user.id,
        course.id,
        order.amount
    );

    Ok(Json(OrderResponse {
        order_id: order.id,
        amount: order.amount,
        currency: order.currency,
        transaction_id: transaction.id,
    }))
}
