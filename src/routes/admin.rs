use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::Response,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::{password, AuthenticatedUser},
    error::{AppError, AppResult},
    lifecycle::{self, AssignOutcome, AssignRequest, AssignmentTarget},
    models::{
        Address, AddressStatus, Assignment, AssignmentStatus, NewAddress, NewUser, Role,
        ServiceType, User,
    },
    reporting::{self, PaymentFilter},
    routes::{
        respond, unknown_action,
        views::{AddressResponse, AssignmentResponse, WorkerResponse},
    },
    schema::{assignments, cleaning_addresses, users},
    state::AppState,
    utils::{
        json::parse_body,
        query::{optional_bool, optional_date, optional_str, required_uuid, QueryParams},
    },
};

pub async fn dispatch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    method: Method,
    Query(params): Query<QueryParams>,
    body: Bytes,
) -> AppResult<Response> {
    user.require_role(&[Role::Admin])?;

    let action = optional_str(&params, "action").unwrap_or_default();
    match (action, method) {
        ("addresses", Method::GET) => list_addresses(&state),
        ("addresses", Method::POST) => create_address(&state, &body),
        ("addresses", Method::PUT) => update_address(&state, &params, &body),
        ("addresses", Method::DELETE) => delete_address(&state, &params),
        ("workers", Method::GET) => list_workers(&state, &params),
        ("workers", Method::POST) => create_worker(&state, &body),
        ("maids", Method::GET) => list_maids(&state),
        ("maids", Method::POST) => create_worker(&state, &body),
        ("assign", Method::POST) => assign(&state, &body),
        ("verify", Method::POST) => verify(&state, &user, &body),
        ("cancel-assignment", Method::POST) => cancel_assignment(&state, &body),
        ("mark-paid", Method::POST) => mark_paid(&state, &body),
        ("salary-stats", Method::GET) => salary_stats(&state),
        ("payments", Method::GET) => payments(&state, &params),
        _ => Err(unknown_action(action)),
    }
}

#[derive(Serialize)]
struct AddressListItem {
    #[serde(flatten)]
    address: AddressResponse,
    assignment_id: Option<Uuid>,
    assignment_status: Option<String>,
    assigned_maid_id: Option<Uuid>,
    assigned_maid_name: Option<String>,
    salary: Option<Decimal>,
    senior_cleaner_id: Option<Uuid>,
    senior_cleaner_salary: Option<Decimal>,
}

fn list_addresses(state: &AppState) -> AppResult<Response> {
    let mut conn = state.db()?;

    let addresses: Vec<Address> = cleaning_addresses::table
        .order((
            cleaning_addresses::scheduled_date.desc(),
            cleaning_addresses::scheduled_time.desc(),
        ))
        .load(&mut conn)?;

    let address_ids: Vec<Uuid> = addresses.iter().map(|address| address.id).collect();
    let active: Vec<Assignment> = assignments::table
        .filter(assignments::address_id.eq_any(&address_ids))
        .filter(assignments::status.ne(AssignmentStatus::Cancelled.as_str()))
        .load(&mut conn)?;

    let maid_ids: Vec<Uuid> = active.iter().map(|assignment| assignment.maid_id).collect();
    let names = reporting::worker_names(&mut conn, &maid_ids)?;
    let by_address: HashMap<Uuid, &Assignment> = active
        .iter()
        .map(|assignment| (assignment.address_id, assignment))
        .collect();

    let items: Vec<AddressListItem> = addresses
        .iter()
        .map(|address| {
            let current = by_address.get(&address.id).copied();
            AddressListItem {
                address: AddressResponse::from(address),
                assignment_id: current.map(|a| a.id),
                assignment_status: current.map(|a| a.status.clone()),
                assigned_maid_id: current.map(|a| a.maid_id),
                assigned_maid_name: current.and_then(|a| names.get(&a.maid_id).cloned()),
                salary: current.and_then(|a| a.salary),
                senior_cleaner_id: current.and_then(|a| a.senior_cleaner_id),
                senior_cleaner_salary: current.and_then(|a| a.senior_cleaner_salary),
            }
        })
        .collect();

    respond(StatusCode::OK, json!({ "addresses": items }))
}

#[derive(Deserialize)]
struct CreateAddressRequest {
    address: String,
    client_name: String,
    client_phone: String,
    service_type: ServiceType,
    area: i32,
    price: Decimal,
    scheduled_date: NaiveDate,
    scheduled_time: NaiveTime,
    #[serde(default)]
    notes: Option<String>,
}

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

fn check_area_and_price(area: Option<i32>, price: Option<Decimal>) -> AppResult<()> {
    if area.is_some_and(|area| area <= 0) {
        return Err(AppError::bad_request("area must be positive"));
    }
    if price.is_some_and(|price| price.is_sign_negative()) {
        return Err(AppError::bad_request("price must not be negative"));
    }
    Ok(())
}

fn create_address(state: &AppState, body: &[u8]) -> AppResult<Response> {
    let payload: CreateAddressRequest = parse_body(body)?;
    require_text("address", &payload.address)?;
    require_text("client_name", &payload.client_name)?;
    check_area_and_price(Some(payload.area), Some(payload.price))?;

    let new_address = NewAddress {
        id: Uuid::new_v4(),
        address: payload.address.trim().to_string(),
        client_name: payload.client_name.trim().to_string(),
        client_phone: payload.client_phone,
        service_type: payload.service_type.as_str().to_string(),
        area: payload.area,
        price: payload.price,
        scheduled_date: payload.scheduled_date,
        scheduled_time: payload.scheduled_time,
        status: AddressStatus::Pending.as_str().to_string(),
        notes: payload.notes.unwrap_or_default(),
    };

    let mut conn = state.db()?;
    let address: Address = diesel::insert_into(cleaning_addresses::table)
        .values(&new_address)
        .get_result(&mut conn)?;
    tracing::info!(address_id = %address.id, service_type = %address.service_type, "address created");

    respond(
        StatusCode::CREATED,
        json!({ "address": AddressResponse::from(&address) }),
    )
}

#[derive(Deserialize)]
struct UpdateAddressRequest {
    address: Option<String>,
    client_name: Option<String>,
    client_phone: Option<String>,
    service_type: Option<ServiceType>,
    area: Option<i32>,
    price: Option<Decimal>,
    scheduled_date: Option<NaiveDate>,
    scheduled_time: Option<NaiveTime>,
    notes: Option<String>,
}

/// Columns an admin may edit. Status is owned by the assignment lifecycle.
#[derive(AsChangeset)]
#[diesel(table_name = cleaning_addresses)]
struct AddressChanges {
    address: Option<String>,
    client_name: Option<String>,
    client_phone: Option<String>,
    service_type: Option<&'static str>,
    area: Option<i32>,
    price: Option<Decimal>,
    scheduled_date: Option<NaiveDate>,
    scheduled_time: Option<NaiveTime>,
    notes: Option<String>,
}

impl AddressChanges {
    fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.client_name.is_none()
            && self.client_phone.is_none()
            && self.service_type.is_none()
            && self.area.is_none()
            && self.price.is_none()
            && self.scheduled_date.is_none()
            && self.scheduled_time.is_none()
            && self.notes.is_none()
    }
}

fn update_address(state: &AppState, params: &QueryParams, body: &[u8]) -> AppResult<Response> {
    let address_id = required_uuid(params, "id")?;
    let payload: UpdateAddressRequest = parse_body(body)?;
    if let Some(address) = &payload.address {
        require_text("address", address)?;
    }
    if let Some(client_name) = &payload.client_name {
        require_text("client_name", client_name)?;
    }
    check_area_and_price(payload.area, payload.price)?;

    let changes = AddressChanges {
        address: payload.address,
        client_name: payload.client_name,
        client_phone: payload.client_phone,
        service_type: payload.service_type.map(|service| service.as_str()),
        area: payload.area,
        price: payload.price,
        scheduled_date: payload.scheduled_date,
        scheduled_time: payload.scheduled_time,
        notes: payload.notes,
    };

    let mut conn = state.db()?;
    let found: Option<Address> = if changes.is_empty() {
        cleaning_addresses::table
            .find(address_id)
            .first(&mut conn)
            .optional()?
    } else {
        diesel::update(cleaning_addresses::table.find(address_id))
            .set(&changes)
            .get_result(&mut conn)
            .optional()?
    };
    let address =
        found.ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "address not found"))?;
    tracing::info!(address_id = %address.id, "address updated");

    respond(
        StatusCode::OK,
        json!({ "address": AddressResponse::from(&address) }),
    )
}

fn delete_address(state: &AppState, params: &QueryParams) -> AppResult<Response> {
    let address_id = required_uuid(params, "id")?;
    let mut conn = state.db()?;
    let deleted =
        diesel::delete(cleaning_addresses::table.find(address_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::new(StatusCode::NOT_FOUND, "address not found"));
    }
    tracing::info!(address_id = %address_id, "address deleted");
    respond(StatusCode::OK, json!({ "deleted": address_id }))
}

fn load_workers(state: &AppState, role: Option<Role>) -> AppResult<Vec<WorkerResponse>> {
    let mut conn = state.db()?;
    let mut query = users::table.order(users::full_name.asc()).into_boxed();
    query = match role {
        Some(role) => query.filter(users::role.eq(role.as_str())),
        None => query.filter(users::role.ne(Role::Admin.as_str())),
    };
    let workers: Vec<User> = query.load(&mut conn)?;
    Ok(workers.iter().map(WorkerResponse::from).collect())
}

fn list_workers(state: &AppState, params: &QueryParams) -> AppResult<Response> {
    let role = optional_str(params, "role")
        .map(|raw| raw.parse::<Role>().map_err(AppError::bad_request))
        .transpose()?;
    let workers = load_workers(state, role)?;
    respond(StatusCode::OK, json!({ "workers": workers }))
}

/// Maid-only listing under the older `maids` action name.
fn list_maids(state: &AppState) -> AppResult<Response> {
    let maids = load_workers(state, Some(Role::Maid))?;
    respond(StatusCode::OK, json!({ "maids": maids }))
}

#[derive(Deserialize)]
struct CreateWorkerRequest {
    email: String,
    password: String,
    full_name: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default = "default_worker_role")]
    role: Role,
}

fn default_worker_role() -> Role {
    Role::Maid
}

fn create_worker(state: &AppState, body: &[u8]) -> AppResult<Response> {
    let payload: CreateWorkerRequest = parse_body(body)?;
    require_text("email", &payload.email)?;
    require_text("full_name", &payload.full_name)?;
    if payload.password.is_empty() {
        return Err(AppError::bad_request("password is required"));
    }
    if payload.role == Role::Admin {
        return Err(AppError::bad_request(
            "role must be maid or senior_cleaner",
        ));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let new_user = NewUser {
        id: Uuid::new_v4(),
        email: payload.email.trim().to_lowercase(),
        password_hash,
        full_name: payload.full_name.trim().to_string(),
        phone: payload.phone.unwrap_or_default(),
        role: payload.role.as_str().to_string(),
    };

    let mut conn = state.db()?;
    let user: User = diesel::insert_into(users::table)
        .values(&new_user)
        .get_result(&mut conn)?;
    tracing::info!(user_id = %user.id, role = %user.role, "worker created");

    respond(
        StatusCode::CREATED,
        json!({ "worker": WorkerResponse::from(&user) }),
    )
}

#[derive(Deserialize)]
struct AssignPayload {
    address_id: Uuid,
    maid_id: Uuid,
    salary: Option<Decimal>,
    senior_cleaner_id: Option<Uuid>,
    senior_cleaner_salary: Option<Decimal>,
}

fn assign(state: &AppState, body: &[u8]) -> AppResult<Response> {
    let payload: AssignPayload = parse_body(body)?;
    let request = AssignRequest {
        address_id: payload.address_id,
        maid_id: payload.maid_id,
        salary: payload.salary,
        senior_cleaner_id: payload.senior_cleaner_id,
        senior_cleaner_salary: payload.senior_cleaner_salary,
    };
    request.validate()?;

    let mut conn = state.db()?;
    let (outcome, assignment) = lifecycle::create_assignment(&mut conn, &request)?;
    let status = match outcome {
        AssignOutcome::Created => StatusCode::CREATED,
        AssignOutcome::Unchanged | AssignOutcome::Updated => StatusCode::OK,
    };

    respond(
        status,
        json!({
            "outcome": outcome,
            "assignment": AssignmentResponse::from(assignment),
        }),
    )
}

/// Admin actions name their assignment directly or through its address.
#[derive(Deserialize)]
struct TargetPayload {
    assignment_id: Option<Uuid>,
    address_id: Option<Uuid>,
}

impl TargetPayload {
    fn into_target(self) -> AppResult<AssignmentTarget> {
        match (self.assignment_id, self.address_id) {
            (Some(id), _) => Ok(AssignmentTarget::Assignment(id)),
            (None, Some(address_id)) => Ok(AssignmentTarget::Address(address_id)),
            (None, None) => Err(AppError::bad_request(
                "assignment_id or address_id is required",
            )),
        }
    }
}

fn verify(state: &AppState, user: &AuthenticatedUser, body: &[u8]) -> AppResult<Response> {
    let target = parse_body::<TargetPayload>(body)?.into_target()?;
    let mut conn = state.db()?;
    let assignment = lifecycle::verify(&mut conn, target, user.user_id)?;
    respond(
        StatusCode::OK,
        json!({ "assignment": AssignmentResponse::from(assignment) }),
    )
}

fn cancel_assignment(state: &AppState, body: &[u8]) -> AppResult<Response> {
    let target = parse_body::<TargetPayload>(body)?.into_target()?;
    let mut conn = state.db()?;
    let assignment = lifecycle::cancel_assignment(&mut conn, target)?;
    respond(
        StatusCode::OK,
        json!({ "assignment": AssignmentResponse::from(assignment) }),
    )
}

#[derive(Deserialize)]
struct AssignmentIdPayload {
    assignment_id: Uuid,
}

fn mark_paid(state: &AppState, body: &[u8]) -> AppResult<Response> {
    let payload: AssignmentIdPayload = parse_body(body)?;
    let mut conn = state.db()?;
    let assignment = lifecycle::mark_paid(&mut conn, payload.assignment_id)?;
    respond(
        StatusCode::OK,
        json!({ "assignment": AssignmentResponse::from(assignment) }),
    )
}

fn salary_stats(state: &AppState) -> AppResult<Response> {
    let mut conn = state.db()?;
    let stats = reporting::salary_stats(&mut conn, Utc::now().date_naive())?;
    respond(StatusCode::OK, stats)
}

fn payments(state: &AppState, params: &QueryParams) -> AppResult<Response> {
    let filter = PaymentFilter {
        paid: optional_bool(params, "paid")?,
        date_from: optional_date(params, "date_from")?,
        date_to: optional_date(params, "date_to")?,
    };
    if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
        if from > to {
            return Err(AppError::bad_request("date_from must not be after date_to"));
        }
    }

    let mut conn = state.db()?;
    let rows = reporting::payments(&mut conn, &filter)?;
    respond(StatusCode::OK, json!({ "payments": rows }))
}
