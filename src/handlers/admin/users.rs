//! User administration.

use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Path};
use crate::models::{CreateUser, User};

pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> Result<Json<User>> {
    input.validate()?;

    let conn = state.db.get()?;

    if queries::get_user_by_email(&conn, &input.email)?.is_some() {
        return Err(AppError::Conflict(msg::EMAIL_TAKEN.into()));
    }
    if let Some(referrer_id) = &input.referred_by
        && queries::get_user_by_id(&conn, referrer_id)?.is_none()
    {
        return Err(AppError::NotFound(msg::REFERRER_NOT_FOUND.into()));
    }

    let user = queries::create_user(&conn, &input)?;

    tracing::info!("user created: {} ({})", user.id, user.email);

    Ok(Json(user))
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    let conn = state.db.get()?;
    let users = queries::list_users(&conn)?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let conn = state.db.get()?;
    let user = queries::get_user_by_id(&conn, &id)?.or_not_found(msg::USER_NOT_FOUND)?;
    Ok(Json(user))
}
