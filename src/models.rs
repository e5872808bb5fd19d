use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = cleaning_addresses)]
pub struct Address {
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
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cleaning_addresses)]
pub struct NewAddress {
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
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = assignments)]
#[diesel(belongs_to(Address, foreign_key = address_id))]
pub struct Assignment {
    pub id: Uuid,
    pub address_id: Uuid,
    pub maid_id: Uuid,
    pub senior_cleaner_id: Option<Uuid>,
    pub status: String,
    pub salary: Option<Decimal>,
    pub senior_cleaner_salary: Option<Decimal>,
    pub paid: bool,
    pub assigned_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub verified_at: Option<NaiveDateTime>,
    pub verified_by: Option<Uuid>,
    pub checklist_data: Option<serde_json::Value>,
    pub checklist_started_at: Option<NaiveDateTime>,
    pub inspection_checklist_data: Option<serde_json::Value>,
    pub inspection_started_at: Option<NaiveDateTime>,
    pub inspection_completed_at: Option<NaiveDateTime>,
    pub photo_before: Option<String>,
    pub photo_after: Option<String>,
    pub photos_uploaded_at: Option<NaiveDateTime>,
}

impl Assignment {
    /// Parsed lifecycle status. Rows are only ever written through
    /// [`AssignmentStatus::as_str`], so an unknown value means the row was
    /// edited by hand and is treated as terminal.
    pub fn lifecycle_status(&self) -> AssignmentStatus {
        self.status
            .parse()
            .unwrap_or(AssignmentStatus::Cancelled)
    }

    /// Completion instant used by payment reporting: the admin verification
    /// stamp, or the inspection stamp when only that one exists.
    pub fn completion_timestamp(&self) -> Option<NaiveDateTime> {
        self.verified_at.or(self.inspection_completed_at)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = assignments)]
pub struct NewAssignment {
    pub id: Uuid,
    pub address_id: Uuid,
    pub maid_id: Uuid,
    pub senior_cleaner_id: Option<Uuid>,
    pub status: String,
    pub salary: Option<Decimal>,
    pub senior_cleaner_salary: Option<Decimal>,
    pub assigned_at: NaiveDateTime,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {other}", $label)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    Role, "role" {
        Admin => "admin",
        Maid => "maid",
        SeniorCleaner => "senior_cleaner",
    }
);

string_enum!(
    /// Kind of cleaning booked for an address; selects the checklist template.
    ServiceType, "service type" {
        Basic => "basic",
        Deep => "deep",
        After => "after",
        Office => "office",
    }
);

string_enum!(
    AddressStatus, "address status" {
        Pending => "pending",
        Assigned => "assigned",
        InProgress => "in_progress",
        Completed => "completed",
        Verified => "verified",
        Cancelled => "cancelled",
    }
);

string_enum!(
    AssignmentStatus, "assignment status" {
        Assigned => "assigned",
        InProgress => "in_progress",
        Completed => "completed",
        Verified => "verified",
        Cancelled => "cancelled",
    }
);

impl AssignmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AssignmentStatus::Verified | AssignmentStatus::Cancelled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `cancelled` is reachable from every state except `verified`; the
    /// forward path is strictly `assigned -> in_progress -> completed ->
    /// verified`.
    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Assigned, InProgress)
                | (InProgress, Completed)
                | (Completed, Verified)
                | (Assigned | InProgress | Completed, Cancelled)
        )
    }

    /// Address status mirrored when the assignment enters this state.
    pub fn mirrored_address_status(self) -> AddressStatus {
        match self {
            AssignmentStatus::Assigned => AddressStatus::Assigned,
            AssignmentStatus::InProgress => AddressStatus::InProgress,
            AssignmentStatus::Completed => AddressStatus::Completed,
            AssignmentStatus::Verified => AddressStatus::Verified,
            AssignmentStatus::Cancelled => AddressStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_round_trip() {
        for status in AssignmentStatus::ALL {
            assert_eq!(status.as_str().parse::<AssignmentStatus>(), Ok(*status));
        }
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(*role));
        }
    }

    #[test]
    fn unknown_service_type_is_rejected() {
        let err = "spring".parse::<ServiceType>().unwrap_err();
        assert_eq!(err, "unknown service type: spring");
    }

    #[test]
    fn forward_path_is_strictly_ordered() {
        use AssignmentStatus::*;
        assert!(Assigned.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Verified));

        assert!(!Assigned.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Verified.can_transition_to(Completed));
        assert!(!Assigned.can_transition_to(Assigned));
    }

    #[test]
    fn cancelled_is_terminal_and_verified_cannot_be_cancelled() {
        use AssignmentStatus::*;
        for next in AssignmentStatus::ALL {
            assert!(!Cancelled.can_transition_to(*next));
        }
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!Verified.can_transition_to(Cancelled));
        assert!(Cancelled.is_terminal());
        assert!(Verified.is_terminal());
    }

    #[test]
    fn serde_uses_snake_case_tags() {
        let json = serde_json::to_string(&Role::SeniorCleaner).unwrap();
        assert_eq!(json, "\"senior_cleaner\"");
        let parsed: AssignmentStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(parsed, AssignmentStatus::InProgress);
    }
}
