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
    lifecycle,
    models::{Address, Assignment, Role},
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
    user.require_role(&[Role::SeniorCleaner])?;

    let action = optional_str(&params, "action").unwrap_or_default();
    match (action, method) {
        ("inspections", Method::GET) => list_inspections(&state, &user, &params),
        ("start-inspection", Method::POST) => start_inspection(&state, &user, &body),
        ("update-inspection-checklist", Method::POST) => {
            update_inspection_checklist(&state, &user, &body)
        }
        ("complete-inspection", Method::POST) => complete_inspection(&state, &user, &body),
        ("salary-history", Method::GET) => salary_history(&state, &user, &params),
        _ => Err(unknown_action(action)),
    }
}

fn load_inspected_assignment(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    assignment_id: Uuid,
) -> AppResult<Assignment> {
    let assignment = lifecycle::load_assignment(conn, assignment_id)?;
    if !user.is_admin() && assignment.senior_cleaner_id != Some(user.user_id) {
        tracing::warn!(
            user_id = %user.user_id,
            assignment_id = %assignment_id,
            "senior cleaner is not assigned to inspect this job"
        );
        return Err(AppError::forbidden());
    }
    Ok(assignment)
}

fn list_inspections(
    state: &AppState,
    user: &AuthenticatedUser,
    params: &QueryParams,
) -> AppResult<Response> {
    let senior_cleaner_id = required_uuid(params, "senior_cleaner_id")?;
    user.require_self_or_admin(senior_cleaner_id)?;

    let mut conn = state.db()?;
    let rows: Vec<(Assignment, Address)> = assignments::table
        .inner_join(cleaning_addresses::table)
        .filter(assignments::senior_cleaner_id.eq(senior_cleaner_id))
        .order((
            cleaning_addresses::scheduled_date.desc(),
            cleaning_addresses::scheduled_time.desc(),
        ))
        .load(&mut conn)?;

    let mut maid_ids: Vec<Uuid> = rows.iter().map(|(assignment, _)| assignment.maid_id).collect();
    maid_ids.sort_unstable();
    maid_ids.dedup();
    let names = reporting::worker_names(&mut conn, &maid_ids)?;

    let items: Vec<AssignmentListItem> = rows
        .iter()
        .map(|(assignment, address)| AssignmentListItem {
            assignment: AssignmentResponse::from(assignment),
            address: AddressResponse::from(address),
            maid_name: names.get(&assignment.maid_id).cloned(),
        })
        .collect();

    respond(StatusCode::OK, json!({ "inspections": items }))
}

#[derive(Deserialize)]
struct AssignmentIdPayload {
    assignment_id: Uuid,
}

fn start_inspection(
    state: &AppState,
    user: &AuthenticatedUser,
    body: &[u8],
) -> AppResult<Response> {
    let payload: AssignmentIdPayload = parse_body(body)?;

    let mut conn = state.db()?;
    load_inspected_assignment(&mut conn, user, payload.assignment_id)?;
    let assignment = lifecycle::start_inspection(&mut conn, payload.assignment_id)?;

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

fn update_inspection_checklist(
    state: &AppState,
    user: &AuthenticatedUser,
    body: &[u8],
) -> AppResult<Response> {
    let payload: UpdateChecklistRequest = parse_body(body)?;

    let mut conn = state.db()?;
    load_inspected_assignment(&mut conn, user, payload.assignment_id)?;
    let assignment = lifecycle::update_inspection_checklist(
        &mut conn,
        payload.assignment_id,
        &payload.checklist_data,
    )?;

    respond(
        StatusCode::OK,
        json!({ "assignment": AssignmentResponse::from(assignment) }),
    )
}

fn complete_inspection(
    state: &AppState,
    user: &AuthenticatedUser,
    body: &[u8],
) -> AppResult<Response> {
    let payload: AssignmentIdPayload = parse_body(body)?;

    let mut conn = state.db()?;
    load_inspected_assignment(&mut conn, user, payload.assignment_id)?;
    let assignment = lifecycle::complete_inspection(&mut conn, payload.assignment_id)?;

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
    let senior_cleaner_id = required_uuid(params, "senior_cleaner_id")?;
    user.require_self_or_admin(senior_cleaner_id)?;

    let mut conn = state.db()?;
    let history = reporting::senior_cleaner_salary_history(&mut conn, senior_cleaner_id)?;
    respond(StatusCode::OK, history)
}
