//! Assignment lifecycle.
//!
//! Every operation takes a connection, runs inside a single transaction and
//! either commits all of its writes or none of them. Status changes on an
//! assignment are mirrored onto its address in the same transaction, except
//! for admin verification which leaves the address alone.

use chrono::{NaiveDateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::checklist::{build_checklist_for_tag, ChecklistItem, ChecklistMode};
use crate::models::{
    Address, AddressStatus, Assignment, AssignmentStatus, NewAssignment, Role, User,
};
use crate::schema::{assignments, cleaning_addresses, users};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("failed to encode checklist: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn conflict(message: impl Into<String>) -> LifecycleError {
    let message = message.into();
    warn!(reason = %message, "rejected assignment transition");
    LifecycleError::Conflict(message)
}

/// How an admin action names the assignment it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    Assignment(Uuid),
    /// The address's current non-cancelled assignment.
    Address(Uuid),
}

#[derive(Debug, Clone)]
pub struct AssignRequest {
    pub address_id: Uuid,
    pub maid_id: Uuid,
    pub salary: Option<Decimal>,
    pub senior_cleaner_id: Option<Uuid>,
    pub senior_cleaner_salary: Option<Decimal>,
}

impl AssignRequest {
    /// Requests carrying pay or a senior cleaner update an existing
    /// (address, maid) row in place; plain requests leave it untouched.
    pub fn has_terms(&self) -> bool {
        self.salary.is_some() || self.senior_cleaner_id.is_some() || self.senior_cleaner_salary.is_some()
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        for (field, amount) in [
            ("salary", self.salary),
            ("senior_cleaner_salary", self.senior_cleaner_salary),
        ] {
            if amount.is_some_and(|value| value.is_sign_negative()) {
                return Err(LifecycleError::Validation(format!(
                    "{field} must not be negative"
                )));
            }
        }
        Ok(())
    }

    /// Senior pay needs a senior cleaner, either in the request or already
    /// on the row being updated.
    fn check_senior_pay(&self, current_senior: Option<Uuid>) -> LifecycleResult<()> {
        if self.senior_cleaner_salary.is_some()
            && self.senior_cleaner_id.or(current_senior).is_none()
        {
            return Err(LifecycleError::Validation(
                "senior_cleaner_salary requires senior_cleaner_id".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOutcome {
    Created,
    Unchanged,
    Updated,
}

#[derive(AsChangeset)]
#[diesel(table_name = assignments)]
struct AssignmentTerms {
    salary: Option<Decimal>,
    senior_cleaner_id: Option<Uuid>,
    senior_cleaner_salary: Option<Decimal>,
}

/// Fields set by a photo upload. `None` leaves the column untouched.
#[derive(AsChangeset)]
#[diesel(table_name = assignments)]
struct PhotoChangeset<'a> {
    photo_before: Option<&'a str>,
    photo_after: Option<&'a str>,
    photos_uploaded_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    pub photo_before: Option<String>,
    pub photo_after: Option<String>,
}

impl PhotoUpload {
    fn before(&self) -> Option<&str> {
        self.photo_before.as_deref().filter(|value| !value.is_empty())
    }

    fn after(&self) -> Option<&str> {
        self.photo_after.as_deref().filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.before().is_none() && self.after().is_none()
    }
}

pub fn load_assignment(conn: &mut PgConnection, assignment_id: Uuid) -> LifecycleResult<Assignment> {
    assignments::table
        .find(assignment_id)
        .first(conn)
        .optional()?
        .ok_or(LifecycleError::NotFound("assignment"))
}

fn load_address(conn: &mut PgConnection, address_id: Uuid) -> LifecycleResult<Address> {
    cleaning_addresses::table
        .find(address_id)
        .first(conn)
        .optional()?
        .ok_or(LifecycleError::NotFound("address"))
}

fn load_worker(
    conn: &mut PgConnection,
    user_id: Uuid,
    role: Role,
    entity: &'static str,
) -> LifecycleResult<User> {
    let user: User = users::table
        .find(user_id)
        .first(conn)
        .optional()?
        .ok_or(LifecycleError::NotFound(entity))?;
    if user.role != role.as_str() {
        return Err(LifecycleError::Validation(format!(
            "user {user_id} is not a {role}"
        )));
    }
    Ok(user)
}

fn resolve_target(conn: &mut PgConnection, target: AssignmentTarget) -> LifecycleResult<Assignment> {
    match target {
        AssignmentTarget::Assignment(id) => load_assignment(conn, id),
        AssignmentTarget::Address(address_id) => {
            load_address(conn, address_id)?;
            assignments::table
                .filter(assignments::address_id.eq(address_id))
                .filter(assignments::status.ne(AssignmentStatus::Cancelled.as_str()))
                .first(conn)
                .optional()?
                .ok_or(LifecycleError::NotFound("assignment"))
        }
    }
}

fn set_address_status(
    conn: &mut PgConnection,
    address_id: Uuid,
    status: AddressStatus,
) -> LifecycleResult<()> {
    let updated = diesel::update(cleaning_addresses::table.find(address_id))
        .set(cleaning_addresses::status.eq(status.as_str()))
        .execute(conn)?;
    if updated == 0 {
        return Err(LifecycleError::NotFound("address"));
    }
    Ok(())
}

/// Binds an address to a maid.
///
/// A second request for the same (address, maid) pair never creates another
/// row: without terms it is a no-op, with terms it rewrites salary and senior
/// cleaner in place. Assigning a different maid cancels the address's
/// current assignment first so only one stays active.
pub fn create_assignment(
    conn: &mut PgConnection,
    request: &AssignRequest,
) -> LifecycleResult<(AssignOutcome, Assignment)> {
    request.validate()?;

    conn.transaction::<_, LifecycleError, _>(|conn| {
        load_address(conn, request.address_id)?;
        load_worker(conn, request.maid_id, Role::Maid, "maid")?;
        if let Some(senior_id) = request.senior_cleaner_id {
            load_worker(conn, senior_id, Role::SeniorCleaner, "senior cleaner")?;
        }

        let existing: Option<Assignment> = assignments::table
            .filter(assignments::address_id.eq(request.address_id))
            .filter(assignments::maid_id.eq(request.maid_id))
            .first(conn)
            .optional()?;

        if let Some(existing) = existing {
            return update_existing_terms(conn, existing, request);
        }

        request.check_senior_pay(None)?;

        let active: Vec<Assignment> = assignments::table
            .filter(assignments::address_id.eq(request.address_id))
            .filter(assignments::status.ne(AssignmentStatus::Cancelled.as_str()))
            .load(conn)?;
        if active
            .iter()
            .any(|row| row.lifecycle_status() == AssignmentStatus::Verified)
        {
            return Err(conflict("address already has a verified assignment"));
        }
        for previous in &active {
            diesel::update(assignments::table.find(previous.id))
                .set(assignments::status.eq(AssignmentStatus::Cancelled.as_str()))
                .execute(conn)?;
            info!(
                assignment_id = %previous.id,
                address_id = %request.address_id,
                "cancelled previous assignment on reassignment"
            );
        }

        let new_assignment = NewAssignment {
            id: Uuid::new_v4(),
            address_id: request.address_id,
            maid_id: request.maid_id,
            senior_cleaner_id: request.senior_cleaner_id,
            status: AssignmentStatus::Assigned.as_str().to_string(),
            salary: request.salary,
            senior_cleaner_salary: request.senior_cleaner_salary,
            assigned_at: now(),
        };

        let inserted = diesel::insert_into(assignments::table)
            .values(&new_assignment)
            .on_conflict((assignments::address_id, assignments::maid_id))
            .do_nothing()
            .execute(conn)?;

        if inserted == 0 {
            // A concurrent request created the pair between our read and insert.
            let row: Assignment = assignments::table
                .filter(assignments::address_id.eq(request.address_id))
                .filter(assignments::maid_id.eq(request.maid_id))
                .first(conn)?;
            return update_existing_terms(conn, row, request);
        }

        set_address_status(conn, request.address_id, AddressStatus::Assigned)?;
        let assignment = load_assignment(conn, new_assignment.id)?;
        info!(
            assignment_id = %assignment.id,
            address_id = %assignment.address_id,
            maid_id = %assignment.maid_id,
            "assignment created"
        );
        Ok((AssignOutcome::Created, assignment))
    })
}

fn update_existing_terms(
    conn: &mut PgConnection,
    existing: Assignment,
    request: &AssignRequest,
) -> LifecycleResult<(AssignOutcome, Assignment)> {
    if !request.has_terms() {
        return Ok((AssignOutcome::Unchanged, existing));
    }
    match existing.lifecycle_status() {
        AssignmentStatus::Verified => {
            return Err(conflict("salary is locked once the assignment is verified"))
        }
        AssignmentStatus::Cancelled => return Err(conflict("assignment is cancelled")),
        _ => {}
    }
    request.check_senior_pay(existing.senior_cleaner_id)?;

    let terms = AssignmentTerms {
        salary: request.salary,
        senior_cleaner_id: request.senior_cleaner_id,
        senior_cleaner_salary: request.senior_cleaner_salary,
    };
    let updated: Assignment = diesel::update(assignments::table.find(existing.id))
        .set(&terms)
        .get_result(conn)?;
    info!(assignment_id = %updated.id, "assignment terms updated");
    Ok((AssignOutcome::Updated, updated))
}

/// Statuses a maid may request through [`update_status`].
pub fn validate_maid_status(next: AssignmentStatus) -> LifecycleResult<()> {
    if matches!(next, AssignmentStatus::InProgress | AssignmentStatus::Completed) {
        Ok(())
    } else {
        Err(LifecycleError::Validation(
            "status must be in_progress or completed".into(),
        ))
    }
}

/// Maid-driven progress: `in_progress` starts the work checklist,
/// `completed` stamps the completion time.
pub fn update_status(
    conn: &mut PgConnection,
    assignment_id: Uuid,
    next: AssignmentStatus,
) -> LifecycleResult<Assignment> {
    validate_maid_status(next)?;

    conn.transaction::<_, LifecycleError, _>(|conn| {
        let assignment = load_assignment(conn, assignment_id)?;
        let current = assignment.lifecycle_status();
        if !current.can_transition_to(next) {
            return Err(conflict(format!(
                "cannot move assignment from {current} to {next}"
            )));
        }

        let stamp = now();
        let updated: Assignment = match next {
            AssignmentStatus::InProgress => {
                let address = load_address(conn, assignment.address_id)?;
                let checklist =
                    build_checklist_for_tag(&address.service_type, ChecklistMode::Work);
                diesel::update(assignments::table.find(assignment_id))
                    .set((
                        assignments::status.eq(next.as_str()),
                        assignments::checklist_data.eq(Some(serde_json::to_value(&checklist)?)),
                        assignments::checklist_started_at.eq(Some(stamp)),
                    ))
                    .get_result(conn)?
            }
            _ => diesel::update(assignments::table.find(assignment_id))
                .set((
                    assignments::status.eq(next.as_str()),
                    assignments::completed_at.eq(Some(stamp)),
                ))
                .get_result(conn)?,
        };

        set_address_status(conn, updated.address_id, next.mirrored_address_status())?;
        info!(assignment_id = %assignment_id, from = %current, to = %next, "assignment status updated");
        Ok(updated)
    })
}

/// Replaces the work checklist. Item ids are not checked against the
/// template.
pub fn update_checklist(
    conn: &mut PgConnection,
    assignment_id: Uuid,
    items: &[ChecklistItem],
) -> LifecycleResult<Assignment> {
    conn.transaction::<_, LifecycleError, _>(|conn| {
        let assignment = load_assignment(conn, assignment_id)?;
        if assignment.checklist_data.is_none() {
            return Err(conflict("checklist has not been started"));
        }
        let updated = diesel::update(assignments::table.find(assignment_id))
            .set(assignments::checklist_data.eq(Some(serde_json::to_value(items)?)))
            .get_result(conn)?;
        Ok(updated)
    })
}

pub fn start_inspection(conn: &mut PgConnection, assignment_id: Uuid) -> LifecycleResult<Assignment> {
    conn.transaction::<_, LifecycleError, _>(|conn| {
        let assignment = load_assignment(conn, assignment_id)?;
        if assignment.senior_cleaner_id.is_none() {
            return Err(conflict("assignment has no senior cleaner"));
        }
        if assignment.lifecycle_status() == AssignmentStatus::Cancelled {
            return Err(conflict("assignment is cancelled"));
        }
        if assignment.inspection_completed_at.is_some() {
            return Err(conflict("inspection is already completed"));
        }

        let address = load_address(conn, assignment.address_id)?;
        let checklist = build_checklist_for_tag(&address.service_type, ChecklistMode::Inspection);
        let updated: Assignment = diesel::update(assignments::table.find(assignment_id))
            .set((
                assignments::inspection_checklist_data.eq(Some(serde_json::to_value(&checklist)?)),
                assignments::inspection_started_at.eq(Some(now())),
            ))
            .get_result(conn)?;
        info!(assignment_id = %assignment_id, items = checklist.len(), "inspection started");
        Ok(updated)
    })
}

pub fn update_inspection_checklist(
    conn: &mut PgConnection,
    assignment_id: Uuid,
    items: &[ChecklistItem],
) -> LifecycleResult<Assignment> {
    conn.transaction::<_, LifecycleError, _>(|conn| {
        let assignment = load_assignment(conn, assignment_id)?;
        if assignment.inspection_checklist_data.is_none() {
            return Err(conflict("inspection has not been started"));
        }
        let updated = diesel::update(assignments::table.find(assignment_id))
            .set(assignments::inspection_checklist_data.eq(Some(serde_json::to_value(items)?)))
            .get_result(conn)?;
        Ok(updated)
    })
}

/// Senior-cleaner verification. Stamps inspection completion and
/// verification with one instant and marks both rows verified. On a job an
/// admin already verified only the inspection stamp is added, so the
/// existing `verified_at` is kept.
pub fn complete_inspection(
    conn: &mut PgConnection,
    assignment_id: Uuid,
) -> LifecycleResult<Assignment> {
    conn.transaction::<_, LifecycleError, _>(|conn| {
        let assignment = load_assignment(conn, assignment_id)?;
        if assignment.inspection_started_at.is_none() {
            return Err(conflict("inspection has not been started"));
        }
        if assignment.inspection_completed_at.is_some() {
            return Err(conflict("inspection is already completed"));
        }
        let current = assignment.lifecycle_status();
        let already_verified = current == AssignmentStatus::Verified;
        if !already_verified && !current.can_transition_to(AssignmentStatus::Verified) {
            return Err(conflict(format!(
                "cannot complete inspection while assignment is {current}"
            )));
        }

        let stamp = now();
        let verified_at = match assignment.verified_at {
            Some(at) if already_verified => at,
            _ => stamp,
        };
        let updated: Assignment = diesel::update(assignments::table.find(assignment_id))
            .set((
                assignments::status.eq(AssignmentStatus::Verified.as_str()),
                assignments::inspection_completed_at.eq(Some(stamp)),
                assignments::verified_at.eq(Some(verified_at)),
            ))
            .get_result(conn)?;
        set_address_status(conn, updated.address_id, AddressStatus::Verified)?;
        info!(assignment_id = %assignment_id, "inspection completed, assignment verified");
        Ok(updated)
    })
}

/// Admin verification for jobs without an inspection. Unlike
/// [`complete_inspection`] it records the verifying admin and does not touch
/// the address status.
pub fn verify(
    conn: &mut PgConnection,
    target: AssignmentTarget,
    verified_by: Uuid,
) -> LifecycleResult<Assignment> {
    conn.transaction::<_, LifecycleError, _>(|conn| {
        let assignment = resolve_target(conn, target)?;
        let current = assignment.lifecycle_status();
        if !current.can_transition_to(AssignmentStatus::Verified) {
            return Err(conflict(format!("cannot verify assignment while it is {current}")));
        }

        let updated: Assignment = diesel::update(assignments::table.find(assignment.id))
            .set((
                assignments::status.eq(AssignmentStatus::Verified.as_str()),
                assignments::verified_at.eq(Some(now())),
                assignments::verified_by.eq(Some(verified_by)),
            ))
            .get_result(conn)?;
        info!(assignment_id = %updated.id, verified_by = %verified_by, "assignment verified by admin");
        Ok(updated)
    })
}

/// Cancels an assignment and its address together. Cancelling twice is a
/// no-op; verified assignments cannot be cancelled.
pub fn cancel_assignment(
    conn: &mut PgConnection,
    target: AssignmentTarget,
) -> LifecycleResult<Assignment> {
    conn.transaction::<_, LifecycleError, _>(|conn| {
        let assignment = resolve_target(conn, target)?;
        let current = assignment.lifecycle_status();
        if current == AssignmentStatus::Cancelled {
            return Ok(assignment);
        }
        if !current.can_transition_to(AssignmentStatus::Cancelled) {
            return Err(conflict(format!("cannot cancel assignment while it is {current}")));
        }

        let updated: Assignment = diesel::update(assignments::table.find(assignment.id))
            .set(assignments::status.eq(AssignmentStatus::Cancelled.as_str()))
            .get_result(conn)?;
        set_address_status(conn, updated.address_id, AddressStatus::Cancelled)?;
        info!(assignment_id = %updated.id, from = %current, "assignment cancelled");
        Ok(updated)
    })
}

pub fn mark_paid(conn: &mut PgConnection, assignment_id: Uuid) -> LifecycleResult<Assignment> {
    conn.transaction::<_, LifecycleError, _>(|conn| {
        let assignment = load_assignment(conn, assignment_id)?;
        if assignment.verified_at.is_none() {
            return Err(conflict("only verified assignments can be paid"));
        }
        if assignment.paid {
            return Ok(assignment);
        }
        let updated = diesel::update(assignments::table.find(assignment_id))
            .set(assignments::paid.eq(true))
            .get_result(conn)?;
        info!(assignment_id = %assignment_id, "assignment marked paid");
        Ok(updated)
    })
}

pub fn upload_photos(
    conn: &mut PgConnection,
    assignment_id: Uuid,
    upload: &PhotoUpload,
) -> LifecycleResult<Assignment> {
    let assignment = load_assignment(conn, assignment_id)?;
    if upload.is_empty() {
        return Ok(assignment);
    }

    let changes = PhotoChangeset {
        photo_before: upload.before(),
        photo_after: upload.after(),
        photos_uploaded_at: Some(now()),
    };
    let updated = diesel::update(assignments::table.find(assignment_id))
        .set(&changes)
        .get_result(conn)?;
    Ok(updated)
}
