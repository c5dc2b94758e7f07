//! Referral reward policy administration.

use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::{OptionExt, Result, msg};
use crate::extractors::Json;
use crate::models::{ReferralSettings, UpsertReferralSettings};

pub async fn get_referral_settings(
    State(state): State<AppState>,
) -> Result<Json<ReferralSettings>> {
    let conn = state.db.get()?;
    let settings =
        queries::get_referral_settings(&conn)?.or_not_found(msg::REFERRAL_SETTINGS_NOT_FOUND)?;
    Ok(Json(settings))
}

pub async fn update_referral_settings(
    State(state): State<AppState>,
    Json(input): Json<UpsertReferralSettings>,
) -> Result<Json<ReferralSettings>> {
    input.validate()?;

    let conn = state.db.get()?;
    let settings = queries::upsert_referral_settings(&conn, &input)?;

    tracing::info!(
        "referral settings updated: cashback={} max_referrals={}",
        settings.cashback_amount,
        settings.max_referrals
    );

    Ok(Json(settings))
}
