use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::Response,
};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    checklist::ChecklistItem,
    error::{AppError, AppResult},
    lifecycle::{self, PhotoUpload},
    models::{Address, Assignment, AssignmentStatus, Role},
    reporting,
    routes::{
        respond, unknown_action,
        views::{AddressResponse, AssignmentListItem, AssignmentResponse},
    },
    schema::{assignments, cleaning_addresses},
    state::AppState,
    utils::{
        json::parse_body,
        query::{optional_str, required_uuid, QueryParams},
    },
};

pub async fn dispatch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    method: Method,
    Query(params): Query<QueryParams>,
    body: Bytes,
) -> AppResult<Response> {
    user.require_role(&[Role::Maid])?;

    let action = optional_str(&params, "action").unwrap_or_default();
    match (action, method) {
        ("assignments", Method::GET) => list_assignments(&state, &user, &params),
        ("update-status", Method::POST) => update_status(&state, &user, &body),
        ("update-checklist", Method::POST) => update_checklist(&state, &user, &body),
        ("upload-photos", Method::POST) => upload_photos(&state, &user, &body),
        ("salary-history", Method::GET) => salary_history(&state, &user, &params),
        _ => Err(unknown_action(action)),
    }
}

/// Loads an assignment the caller is allowed to work on.
fn load_own_assignment(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    assignment_id: Uuid,
) -> AppResult<Assignment> {
    let assignment = lifecycle::load_assignment(conn, assignment_id)?;
    if !user.is_admin() && assignment.maid_id != user.user_id {
        tracing::warn!(
            user_id = %user.user_id,
            assignment_id = %assignment_id,
            "maid tried to act on another maid's assignment"
        );
        return Err(AppError::forbidden());
    }
    Ok(assignment)
}

fn list_assignments(
    state: &AppState,
    user: &AuthenticatedUser,
    params: &QueryParams,
) -> AppResult<Response> {
    let maid_id = required_uuid(params, "maid_id")?;
    user.require_self_or_admin(maid_id)?;

    let mut conn = state.db()?;
    let rows: Vec<(Assignment, Address)> = assignments::table
        .inner_join(cleaning_addresses::table)
        .filter(assignments::maid_id.eq(maid_id))
        .order((
            cleaning_addresses::scheduled_date.desc(),
            cleaning_addresses::scheduled_time.desc(),
        ))
        .load(&mut conn)?;
    let names = reporting::worker_names(&mut conn, &[maid_id])?;

    let items: Vec<AssignmentListItem> = rows
        .iter()
        .map(|(assignment, address)| AssignmentListItem {
            assignment: AssignmentResponse::from(assignment),
            address: AddressResponse::from(address),
            maid_name: names.get(&assignment.maid_id).cloned(),
        })
        .collect();

    respond(StatusCode::OK, json!({ "assignments": items }))
}

#[derive(Deserialize)]
struct UpdateStatusRequest {
    assignment_id: Uuid,
    status: String,
}

fn update_status(state: &AppState, user: &AuthenticatedUser, body: &[u8]) -> AppResult<Response> {
    let payload: UpdateStatusRequest = parse_body(body)?;
    let next: AssignmentStatus = payload.status.parse().map_err(AppError::bad_request)?;
    lifecycle::validate_maid_status(next)?;

    let mut conn = state.db()?;
    load_own_assignment(&mut conn, user, payload.assignment_id)?;
    let assignment = lifecycle::update_status(&mut conn, payload.assignment_id, next)?;

    respond(
        StatusCode::OK,
        json!({ "assignment": AssignmentResponse::from(assignment) }),
    )
}

#[derive(Deserialize)]
struct UpdateChecklistRequest {
    assignment_id: Uuid,
    checklist_data: Vec<ChecklistItem>,
}

fn update_checklist(
    state: &AppState,
    user: &AuthenticatedUser,
    body: &[u8],
) -> AppResult<Response> {
    let payload: UpdateChecklistRequest = parse_body(body)?;

    let mut conn = state.db()?;
    load_own_assignment(&mut conn, user, payload.assignment_id)?;
    let assignment =
        lifecycle::update_checklist(&mut conn, payload.assignment_id, &payload.checklist_data)?;

    respond(
        StatusCode::OK,
        json!({ "assignment": AssignmentResponse::from(assignment) }),
    )
}

#[derive(Deserialize)]
struct UploadPhotosRequest {
    assignment_id: Uuid,
    photo_before: Option<String>,
    photo_after: Option<String>,
}

fn upload_photos(state: &AppState, user: &AuthenticatedUser, body: &[u8]) -> AppResult<Response> {
    let payload: UploadPhotosRequest = parse_body(body)?;
    let upload = PhotoUpload {
        photo_before: payload.photo_before,
        photo_after: payload.photo_after,
    };

    let mut conn = state.db()?;
    load_own_assignment(&mut conn, user, payload.assignment_id)?;
    let assignment = lifecycle::upload_photos(&mut conn, payload.assignment_id, &upload)?;

    respond(
        StatusCode::OK,
        json!({ "assignment": AssignmentResponse::from(assignment) }),
    )
}

fn salary_history(
    state: &AppState,
    user: &AuthenticatedUser,
    params: &QueryParams,
) -> AppResult<Response> {
    let maid_id = required_uuid(params, "maid_id")?;
    user.require_self_or_admin(maid_id)?;

    let mut conn = state.db()?;
    let history = reporting::maid_salary_history(&mut conn, maid_id)?;
    respond(StatusCode::OK, history)
}
