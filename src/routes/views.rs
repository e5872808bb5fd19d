//! JSON shapes returned by the action endpoints.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Address, Assignment, User};
use crate::utils::time::{to_iso, to_iso_opt};

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub id: Uuid,
    pub address: String,
    pub client_name: String,
    pub client_phone: String,
    pub service_type: String,
    pub area: i32,
    pub price: Decimal,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub status: String,
    pub notes: String,
    pub created_at: String,
}

impl From<&Address> for AddressResponse {
    fn from(address: &Address) -> Self {
        Self {
            id: address.id,
            address: address.address.clone(),
            client_name: address.client_name.clone(),
            client_phone: address.client_phone.clone(),
            service_type: address.service_type.clone(),
            area: address.area,
            price: address.price,
            scheduled_date: address.scheduled_date,
            scheduled_time: address.scheduled_time,
            status: address.status.clone(),
            notes: address.notes.clone(),
            created_at: to_iso(address.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub address_id: Uuid,
    pub maid_id: Uuid,
    pub senior_cleaner_id: Option<Uuid>,
    pub status: String,
    pub salary: Option<Decimal>,
    pub senior_cleaner_salary: Option<Decimal>,
    pub paid: bool,
    pub assigned_at: String,
    pub completed_at: Option<String>,
    pub verified_at: Option<String>,
    pub verified_by: Option<Uuid>,
    pub checklist_data: Option<Value>,
    pub checklist_started_at: Option<String>,
    pub inspection_checklist_data: Option<Value>,
    pub inspection_started_at: Option<String>,
    pub inspection_completed_at: Option<String>,
    pub photo_before: Option<String>,
    pub photo_after: Option<String>,
    pub photos_uploaded_at: Option<String>,
}

impl From<&Assignment> for AssignmentResponse {
    fn from(assignment: &Assignment) -> Self {
        Self {
            id: assignment.id,
            address_id: assignment.address_id,
            maid_id: assignment.maid_id,
            senior_cleaner_id: assignment.senior_cleaner_id,
            status: assignment.status.clone(),
            salary: assignment.salary,
            senior_cleaner_salary: assignment.senior_cleaner_salary,
            paid: assignment.paid,
            assigned_at: to_iso(assignment.assigned_at),
            completed_at: to_iso_opt(assignment.completed_at),
            verified_at: to_iso_opt(assignment.verified_at),
            verified_by: assignment.verified_by,
            checklist_data: assignment.checklist_data.clone(),
            checklist_started_at: to_iso_opt(assignment.checklist_started_at),
            inspection_checklist_data: assignment.inspection_checklist_data.clone(),
            inspection_started_at: to_iso_opt(assignment.inspection_started_at),
            inspection_completed_at: to_iso_opt(assignment.inspection_completed_at),
            photo_before: assignment.photo_before.clone(),
            photo_after: assignment.photo_after.clone(),
            photos_uploaded_at: to_iso_opt(assignment.photos_uploaded_at),
        }
    }
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self::from(&assignment)
    }
}

/// An assignment together with the job it belongs to, as listed on the
/// maid and senior-cleaner dashboards.
#[derive(Debug, Serialize)]
pub struct AssignmentListItem {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    pub address: AddressResponse,
    pub maid_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkerResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub role: String,
    pub created_at: String,
}

impl From<&User> for WorkerResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            role: user.role.clone(),
            created_at: to_iso(user.created_at),
        }
    }
}
