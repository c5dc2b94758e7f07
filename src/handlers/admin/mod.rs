//! Back-office endpoints: catalog, user, agent, and referral administration.

pub mod agents;
pub mod courses;
pub mod referral_settings;
pub mod users;

pub use agents::*;
pub use courses::*;
pub use referral_settings::*;
pub use users::*;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/referral-settings", get(get_referral_settings))
        .route("/admin/referral-settings", put(update_referral_settings))
        .route("/admin/courses", post(create_course))
        .route("/admin/courses", get(list_courses))
        .route("/admin/courses/{id}", get(get_course))
        .route("/admin/users", post(create_user))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", get(get_user))
        .route("/admin/agents", post(create_agent))
        .route("/admin/agents", get(list_agents))
        .route("/admin/agents/{id}", get(get_agent))
}
