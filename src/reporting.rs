//! Salary and payment reports derived from assignment rows.
//!
//! Maids earn `salary` once an assignment is verified; senior cleaners earn
//! `senior_cleaner_salary` once their inspection is completed. The loaders
//! fetch rows with bound filters and the grouping happens in plain functions
//! below so it can be tested without a database.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Address, Assignment, Role};
use crate::schema::{assignments, cleaning_addresses, users};
use crate::utils::time::to_iso_opt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    pub id: Uuid,
    pub full_name: String,
    pub role: Role,
}

/// One payable job for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Earning {
    pub worker_id: Uuid,
    pub amount: Option<Decimal>,
    pub earned_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerEarnings {
    pub worker_id: Uuid,
    pub worker_name: String,
    pub role: Role,
    pub total_earned: Decimal,
    pub completed_count: i64,
    pub current_month_earned: Decimal,
    pub current_month_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalaryStats {
    pub stats: Vec<WorkerEarnings>,
    pub total_paid: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentFilter {
    pub paid: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl PaymentFilter {
    fn accepts_date(&self, completed_at: NaiveDateTime) -> bool {
        let day = completed_at.date();
        self.date_from.map_or(true, |from| day >= from) && self.date_to.map_or(true, |to| day <= to)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRow {
    pub id: Uuid,
    pub address: String,
    pub client_name: String,
    pub scheduled_date: NaiveDate,
    pub service_type: String,
    pub area: i32,
    pub maid_id: Uuid,
    pub maid_name: Option<String>,
    pub salary: Option<Decimal>,
    pub senior_cleaner_id: Option<Uuid>,
    pub senior_cleaner_name: Option<String>,
    pub senior_cleaner_salary: Option<Decimal>,
    pub verified_at: Option<String>,
    pub inspection_completed_at: Option<String>,
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalaryRecord {
    pub id: Uuid,
    pub address: String,
    pub client_name: String,
    pub scheduled_date: NaiveDate,
    pub service_type: String,
    pub area: i32,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub salary: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalaryHistory {
    pub records: Vec<SalaryRecord>,
    pub total_earned: Decimal,
}

/// Groups earnings per worker. Every worker gets a row, including those with
/// nothing earned yet. Rows are sorted by total earned, highest first; ties
/// keep the order of `workers`.
pub fn aggregate_earnings(
    workers: &[Worker],
    earnings: &[Earning],
    today: NaiveDate,
) -> Vec<WorkerEarnings> {
    let mut by_worker: HashMap<Uuid, WorkerEarnings> = workers
        .iter()
        .map(|worker| {
            (
                worker.id,
                WorkerEarnings {
                    worker_id: worker.id,
                    worker_name: worker.full_name.clone(),
                    role: worker.role,
                    total_earned: Decimal::ZERO,
                    completed_count: 0,
                    current_month_earned: Decimal::ZERO,
                    current_month_count: 0,
                },
            )
        })
        .collect();

    for earning in earnings {
        let Some(entry) = by_worker.get_mut(&earning.worker_id) else {
            continue;
        };
        let amount = earning.amount.unwrap_or(Decimal::ZERO);
        entry.total_earned += amount;
        entry.completed_count += 1;
        if earning.earned_at.year() == today.year() && earning.earned_at.month() == today.month() {
            entry.current_month_earned += amount;
            entry.current_month_count += 1;
        }
    }

    let mut stats: Vec<WorkerEarnings> = workers
        .iter()
        .filter_map(|worker| by_worker.remove(&worker.id))
        .collect();
    stats.sort_by(|a, b| b.total_earned.cmp(&a.total_earned));
    stats
}

/// Amount handed out for a paid assignment. The senior cleaner's share only
/// counts once their inspection is completed, matching what they earn.
pub fn paid_amount(assignment: &Assignment) -> Decimal {
    if !assignment.paid {
        return Decimal::ZERO;
    }
    let senior_share = assignment
        .inspection_completed_at
        .and(assignment.senior_cleaner_salary)
        .unwrap_or(Decimal::ZERO);
    assignment.salary.unwrap_or(Decimal::ZERO) + senior_share
}

/// Keeps completed assignments that pass the date bounds, newest first.
pub fn order_payments<'a>(
    rows: &'a [(Assignment, Address)],
    filter: &PaymentFilter,
) -> Vec<&'a (Assignment, Address)> {
    let mut selected: Vec<(NaiveDateTime, &(Assignment, Address))> = rows
        .iter()
        .filter(|(assignment, _)| filter.paid.map_or(true, |paid| assignment.paid == paid))
        .filter_map(|row| row.0.completion_timestamp().map(|at| (at, row)))
        .filter(|(at, _)| filter.accepts_date(*at))
        .collect();
    selected.sort_by(|a, b| b.0.cmp(&a.0));
    selected.into_iter().map(|(_, row)| row).collect()
}

pub fn total_of<'a>(amounts: impl IntoIterator<Item = &'a Decimal>) -> Decimal {
    amounts.into_iter().copied().sum()
}

fn load_workers(conn: &mut PgConnection) -> QueryResult<Vec<Worker>> {
    let rows: Vec<(Uuid, String, String)> = users::table
        .filter(users::role.eq_any([Role::Maid.as_str(), Role::SeniorCleaner.as_str()]))
        .order(users::full_name.asc())
        .select((users::id, users::full_name, users::role))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .filter_map(|(id, full_name, role)| {
            role.parse().ok().map(|role| Worker {
                id,
                full_name,
                role,
            })
        })
        .collect())
}

/// Full names of the given users, keyed by id.
pub fn worker_names(conn: &mut PgConnection, ids: &[Uuid]) -> QueryResult<HashMap<Uuid, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, String)> = users::table
        .filter(users::id.eq_any(ids))
        .select((users::id, users::full_name))
        .load(conn)?;
    Ok(rows.into_iter().collect())
}

pub fn salary_stats(conn: &mut PgConnection, today: NaiveDate) -> QueryResult<SalaryStats> {
    let workers = load_workers(conn)?;

    let maid_rows: Vec<(Uuid, Option<Decimal>, Option<NaiveDateTime>)> = assignments::table
        .filter(assignments::verified_at.is_not_null())
        .select((
            assignments::maid_id,
            assignments::salary,
            assignments::verified_at,
        ))
        .load(conn)?;

    let senior_rows: Vec<(Option<Uuid>, Option<Decimal>, Option<NaiveDateTime>)> =
        assignments::table
            .filter(assignments::inspection_completed_at.is_not_null())
            .filter(assignments::senior_cleaner_id.is_not_null())
            .select((
                assignments::senior_cleaner_id,
                assignments::senior_cleaner_salary,
                assignments::inspection_completed_at,
            ))
            .load(conn)?;

    let earnings: Vec<Earning> = maid_rows
        .into_iter()
        .filter_map(|(worker_id, amount, at)| {
            at.map(|earned_at| Earning {
                worker_id,
                amount,
                earned_at,
            })
        })
        .chain(senior_rows.into_iter().filter_map(|(worker_id, amount, at)| {
            Some(Earning {
                worker_id: worker_id?,
                amount,
                earned_at: at?,
            })
        }))
        .collect();

    let paid: Vec<Assignment> = assignments::table
        .filter(assignments::paid.eq(true))
        .load(conn)?;
    let total_paid: Decimal = paid.iter().map(paid_amount).sum();

    Ok(SalaryStats {
        stats: aggregate_earnings(&workers, &earnings, today),
        total_paid,
    })
}

pub fn payments(conn: &mut PgConnection, filter: &PaymentFilter) -> QueryResult<Vec<PaymentRow>> {
    let mut query = assignments::table
        .inner_join(cleaning_addresses::table)
        .filter(
            assignments::verified_at
                .is_not_null()
                .or(assignments::inspection_completed_at.is_not_null()),
        )
        .into_boxed();
    if let Some(paid) = filter.paid {
        query = query.filter(assignments::paid.eq(paid));
    }
    let rows: Vec<(Assignment, Address)> = query.load(conn)?;

    let ordered = order_payments(&rows, filter);
    let mut worker_ids: Vec<Uuid> = ordered
        .iter()
        .flat_map(|(assignment, _)| {
            std::iter::once(assignment.maid_id).chain(assignment.senior_cleaner_id)
        })
        .collect();
    worker_ids.sort_unstable();
    worker_ids.dedup();
    let names = worker_names(conn, &worker_ids)?;

    Ok(ordered
        .into_iter()
        .map(|(assignment, address)| PaymentRow {
            id: assignment.id,
            address: address.address.clone(),
            client_name: address.client_name.clone(),
            scheduled_date: address.scheduled_date,
            service_type: address.service_type.clone(),
            area: address.area,
            maid_id: assignment.maid_id,
            maid_name: names.get(&assignment.maid_id).cloned(),
            salary: assignment.salary,
            senior_cleaner_id: assignment.senior_cleaner_id,
            senior_cleaner_name: assignment
                .senior_cleaner_id
                .and_then(|id| names.get(&id).cloned()),
            senior_cleaner_salary: assignment.senior_cleaner_salary,
            verified_at: to_iso_opt(assignment.verified_at),
            inspection_completed_at: to_iso_opt(assignment.inspection_completed_at),
            paid: assignment.paid,
        })
        .collect())
}

pub fn maid_salary_history(conn: &mut PgConnection, maid_id: Uuid) -> QueryResult<SalaryHistory> {
    let rows: Vec<(Assignment, Address)> = assignments::table
        .inner_join(cleaning_addresses::table)
        .filter(assignments::maid_id.eq(maid_id))
        .filter(assignments::verified_at.is_not_null())
        .order(assignments::verified_at.desc())
        .load(conn)?;

    let records: Vec<SalaryRecord> = rows
        .into_iter()
        .map(|(assignment, address)| SalaryRecord {
            id: assignment.id,
            address: address.address,
            client_name: address.client_name,
            scheduled_date: address.scheduled_date,
            service_type: address.service_type,
            area: address.area,
            started_at: to_iso_opt(assignment.checklist_started_at),
            completed_at: to_iso_opt(assignment.verified_at),
            salary: assignment.salary.unwrap_or(Decimal::ZERO),
        })
        .collect();
    let total_earned = total_of(records.iter().map(|record| &record.salary));
    Ok(SalaryHistory {
        records,
        total_earned,
    })
}

pub fn senior_cleaner_salary_history(
    conn: &mut PgConnection,
    senior_cleaner_id: Uuid,
) -> QueryResult<SalaryHistory> {
    let rows: Vec<(Assignment, Address)> = assignments::table
        .inner_join(cleaning_addresses::table)
        .filter(assignments::senior_cleaner_id.eq(senior_cleaner_id))
        .filter(assignments::inspection_completed_at.is_not_null())
        .order(assignments::inspection_completed_at.desc())
        .load(conn)?;

    let records: Vec<SalaryRecord> = rows
        .into_iter()
        .map(|(assignment, address)| SalaryRecord {
            id: assignment.id,
            address: address.address,
            client_name: address.client_name,
            scheduled_date: address.scheduled_date,
            service_type: address.service_type,
            area: address.area,
            started_at: to_iso_opt(assignment.inspection_started_at),
            completed_at: to_iso_opt(assignment.inspection_completed_at),
            salary: assignment.senior_cleaner_salary.unwrap_or(Decimal::ZERO),
        })
        .collect();
    let total_earned = total_of(records.iter().map(|record| &record.salary));
    Ok(SalaryHistory {
        records,
        total_earned,
    })
}
