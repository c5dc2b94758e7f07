//! Course administration.

use axum::extract::State;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{OptionExt, Result, msg};
use crate::extractors::{Json, Path};
use crate::models::{Course, CreateCourse};

/// Course plus its enrollment set.
#[derive(Debug, Serialize)]
pub struct CourseDetail {
    pub course: Course,
    pub enrolled_users: Vec<String>,
}

pub async fn create_course(
    State(state): State<AppState>,
    Json(input): Json<CreateCourse>,
) -> Result<Json<Course>> {
    input.validate()?;

    let conn = state.db.get()?;
    let course = queries::create_course(&conn, &input)?;

    tracing::info!("course created: {} ({})", course.id, course.title);

    Ok(Json(course))
}

pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>> {
    let conn = state.db.get()?;
    let courses = queries::list_courses(&conn)?;
    Ok(Json(courses))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>> {
    let conn = state.db.get()?;
    let course = queries::get_course_by_id(&conn, &id)?.or_not_found(msg::COURSE_NOT_FOUND)?;
    let enrolled_users = queries::list_enrolled_users(&conn, &course.id)?;

    Ok(Json(CourseDetail {
        course,
        enrolled_users,
    }))
}
