//! Sales agent administration.

use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::{AppError, OptionExt, Result, msg};
use crate::extractors::{Json, Path};
use crate::models::{Agent, CreateAgent};

pub async fn create_agent(
    State(state): State<AppState>,
    Json(input): Json<CreateAgent>,
) -> Result<Json<Agent>> {
    input.validate()?;

    let conn = state.db.get()?;

    if queries::get_agent_by_code(&conn, &input.agent_code)?.is_some() {
        return Err(AppError::Conflict(msg::AGENT_CODE_TAKEN.into()));
    }

    let agent = queries::create_agent(&conn, &input)?;

    tracing::info!("agent created: {} ({})", agent.id, agent.agent_code);

    Ok(Json(agent))
}

pub async fn list_agents(State(state): State<AppState>) -> Result<Json<Vec<Agent>>> {
    let conn = state.db.get()?;
    let agents = queries::list_agents(&conn)?;
    Ok(Json(agents))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Agent>> {
    let conn = state.db.get()?;
    let agent = queries::get_agent_by_id(&conn, &id)?.or_not_found(msg::AGENT_NOT_FOUND)?;
    Ok(Json(agent))
}
