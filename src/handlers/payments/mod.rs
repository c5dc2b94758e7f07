pub mod notice;
pub mod orders;
pub mod settlement;
pub mod verify;

pub use notice::{PaymentAttempt, PaymentNotice};
pub use orders::create_order;
pub use settlement::{Settlement, settle};
pub use verify::verify_payment;

use axum::{Router, routing::post};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/payments/verify", post(verify_payment))
}
