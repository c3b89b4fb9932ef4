//! Book instance (physical, borrowable copy) model and related types

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Availability of a book instance.
///
/// Stored as a single character, `m` being the default for new copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum LoanStatus {
    #[serde(rename = "m")]
    Maintenance,
    #[serde(rename = "o")]
    OnLoan,
    #[serde(rename = "a")]
    Available,
    #[serde(rename = "r")]
    Reserved,
}

impl LoanStatus {
    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        }
    }

    /// Whether a copy in this status may be moved to `next`.
    ///
    /// Copies can always be sent to maintenance; they come back as available.
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        use LoanStatus::*;

        if *self == next || next == Maintenance {
            return true;
        }
        matches!(
            (self, next),
            (Available, OnLoan)
                | (Available, Reserved)
                | (Reserved, OnLoan)
                | (Reserved, Available)
                | (OnLoan, Available)
                | (Maintenance, Available)
        )
    }

    pub fn check_transition(&self, next: LoanStatus) -> AppResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::BusinessRule(format!(
                "Cannot change status from '{}' to '{}'",
                self.label(),
                next.label()
            )))
        }
    }

    /// Status edits outside the loan workflow: lending needs a borrower,
    /// so only `borrow` may put a copy on loan.
    pub fn check_manual_change(&self, next: LoanStatus) -> AppResult<()> {
        if next == LoanStatus::OnLoan && *self != LoanStatus::OnLoan {
            return Err(AppError::BusinessRule(
                "Use the borrow action to lend a copy".to_string(),
            ));
        }
        self.check_transition(next)
    }
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Maintenance
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(LoanStatus::Maintenance),
            "o" => Ok(LoanStatus::OnLoan),
            "a" => Ok(LoanStatus::Available),
            "r" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: &str = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.code(), buf)
    }
}

/// Book instance row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: Option<i32>,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i32>,
    pub status: LoanStatus,
    // Computed fields (populated when queried with JOINs, None otherwise)
    #[sqlx(default)]
    #[serde(default)]
    pub book_title: Option<String>,
    #[sqlx(default)]
    #[serde(default)]
    pub borrower_username: Option<String>,
}

impl BookInstance {
    /// Overdue when a due date is set and has passed
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_back.map(|due| today > due).unwrap_or(false)
    }

    /// One-line summary used by instance lists
    pub fn display_info(&self) -> String {
        let due_back = self
            .due_back
            .map(|d| d.to_string())
            .unwrap_or_else(|| "None".to_string());
        format!(
            "{}, Status: {}, Due Back: {}, ID: {}",
            self.book_title.as_deref().unwrap_or(""),
            self.status.label(),
            due_back,
            self.id
        )
    }
}

impl std::fmt::Display for BookInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.book_title {
            Some(title) => write!(f, "{} ({})", self.id, title),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Book instance as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookInstanceView {
    pub id: Uuid,
    pub book_id: Option<i32>,
    pub book_title: Option<String>,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub status: LoanStatus,
    pub status_label: String,
    pub borrower_id: Option<i32>,
    pub borrower_username: Option<String>,
    pub is_overdue: bool,
    pub display_info: String,
}

impl BookInstanceView {
    pub fn new(instance: BookInstance, today: NaiveDate) -> Self {
        let is_overdue = instance.is_overdue(today);
        let display_info = instance.display_info();
        Self {
            id: instance.id,
            book_id: instance.book_id,
            book_title: instance.book_title,
            imprint: instance.imprint,
            due_back: instance.due_back,
            status: instance.status,
            status_label: instance.status.label().to_string(),
            borrower_id: instance.borrower_id,
            borrower_username: instance.borrower_username,
            is_overdue,
            display_info,
        }
    }
}

/// Create book instance request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookInstance {
    pub book_id: i32,
    #[validate(length(min = 1, max = 200, message = "Imprint must be 1-200 characters"))]
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    /// Defaults to maintenance
    pub status: Option<LoanStatus>,
}

/// Status change request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatus {
    pub status: LoanStatus,
}

/// Lend a copy to a user
#[derive(Debug, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub borrower_id: i32,
    /// Defaults to today plus the configured loan period
    pub due_back: Option<NaiveDate>,
}

/// Loan renewal form
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewBookForm {
    /// Enter a date between now and the renewal limit (default 4 weeks)
    pub renewal_date: NaiveDate,
}

impl RenewBookForm {
    /// Validate the requested date against `today`, returning the cleaned value
    pub fn clean(&self, today: NaiveDate, max_weeks: i64) -> AppResult<NaiveDate> {
        let date = self.renewal_date;

        if date < today {
            return Err(AppError::field("renewal_date", "Invalid date - renewal in past"));
        }

        if date > today + Duration::weeks(max_weeks) {
            return Err(AppError::field(
                "renewal_date",
                format!("Invalid date - renewal more than {} weeks ahead", max_weeks),
            ));
        }

        Ok(date)
    }
}

/// Initial state of the renewal form
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenewalProposal {
    pub book_instance: BookInstanceView,
    pub proposed_renewal_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use LoanStatus::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instance(status: LoanStatus, due_back: Option<NaiveDate>) -> BookInstance {
        BookInstance {
            id: Uuid::nil(),
            book_id: Some(1),
            imprint: "Harper, 1974".to_string(),
            due_back,
            borrower_id: None,
            status,
            book_title: Some("The Dispossessed".to_string()),
            borrower_username: None,
        }
    }

    #[test]
    fn test_status_codes() {
        for status in [Maintenance, OnLoan, Available, Reserved] {
            assert_eq!(status.code().parse::<LoanStatus>().unwrap(), status);
        }
        assert!("x".parse::<LoanStatus>().is_err());
        assert_eq!(LoanStatus::default(), Maintenance);
        assert_eq!(OnLoan.to_string(), "On loan");
    }

    #[test]
    fn test_status_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&OnLoan).unwrap(), "\"o\"");
        let status: LoanStatus = serde_json::from_str("\"r\"").unwrap();
        assert_eq!(status, Reserved);
    }

    #[test]
    fn test_transitions() {
        assert!(Available.can_transition_to(OnLoan));
        assert!(Available.can_transition_to(Reserved));
        assert!(Reserved.can_transition_to(OnLoan));
        assert!(OnLoan.can_transition_to(Available));
        assert!(OnLoan.can_transition_to(Maintenance));
        assert!(Maintenance.can_transition_to(Available));
        assert!(Reserved.can_transition_to(Reserved));

        assert!(!Maintenance.can_transition_to(OnLoan));
        assert!(!Maintenance.can_transition_to(Reserved));
        assert!(!OnLoan.can_transition_to(Reserved));
        assert!(matches!(
            Maintenance.check_transition(OnLoan),
            Err(AppError::BusinessRule(_))
        ));
    }

    #[test]
    fn test_manual_change_cannot_lend() {
        for from in [Available, Reserved, Maintenance] {
            match from.check_manual_change(OnLoan) {
                Err(AppError::BusinessRule(msg)) => {
                    assert_eq!(msg, "Use the borrow action to lend a copy")
                }
                other => panic!("unexpected: {:?}", other),
            }
        }

        assert!(OnLoan.check_manual_change(Maintenance).is_ok());
        assert!(OnLoan.check_manual_change(Available).is_ok());
        assert!(OnLoan.check_manual_change(OnLoan).is_ok());
        assert!(Available.check_manual_change(Reserved).is_ok());
        assert!(Maintenance.check_manual_change(Reserved).is_err());
    }

    #[test]
    fn test_is_overdue() {
        let today = date(2024, 3, 10);
        assert!(instance(OnLoan, Some(date(2024, 3, 9))).is_overdue(today));
        assert!(!instance(OnLoan, Some(today)).is_overdue(today));
        assert!(!instance(OnLoan, Some(date(2024, 3, 11))).is_overdue(today));
        assert!(!instance(Available, None).is_overdue(today));
    }

    #[test]
    fn test_display_info() {
        let copy = instance(OnLoan, Some(date(2024, 3, 9)));
        assert_eq!(
            copy.display_info(),
            "The Dispossessed, Status: On loan, Due Back: 2024-03-09, ID: 00000000-0000-0000-0000-000000000000"
        );
        let copy = instance(Available, None);
        assert!(copy.display_info().contains("Due Back: None"));
    }

    #[test]
    fn test_renewal_form() {
        let today = date(2024, 3, 10);
        let form = |d| RenewBookForm { renewal_date: d };

        assert_eq!(form(today).clean(today, 4).unwrap(), today);
        assert!(form(date(2024, 4, 7)).clean(today, 4).is_ok());

        match form(date(2024, 3, 9)).clean(today, 4) {
            Err(AppError::Form(fields)) => {
                assert_eq!(fields["renewal_date"], vec!["Invalid date - renewal in past"]);
            }
            other => panic!("unexpected: {:?}", other),
        }

        match form(date(2024, 4, 8)).clean(today, 4) {
            Err(AppError::Form(fields)) => {
                assert_eq!(
                    fields["renewal_date"],
                    vec!["Invalid date - renewal more than 4 weeks ahead"]
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_view_computes_flags() {
        let view = BookInstanceView::new(instance(OnLoan, Some(date(2024, 1, 1))), date(2024, 2, 1));
        assert!(view.is_overdue);
        assert_eq!(view.status_label, "On loan");
    }
}
