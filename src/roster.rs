use chrono::{DateTime, Months, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{CourseId, EnquiryId, InstituteId, StudentId};

/// an institute branch; clerks are scoped to exactly one of these
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institute {
    pub id: InstituteId,
    pub name: String,
    pub location: Option<String>,
}

/// a course offered by an institute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub institute_id: InstituteId,
    pub name: String,
    pub duration_months: u32,
    pub total_fee: Money,
    pub admission_fee: Money,
    pub image_url: Option<String>,
}

impl Course {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::Validation {
                field: "name",
                message: "course name is required".to_string(),
            });
        }
        if self.duration_months == 0 {
            return Err(LedgerError::Validation {
                field: "duration_months",
                message: "course duration must be at least one month".to_string(),
            });
        }
        if self.total_fee.is_negative() || self.admission_fee.is_negative() {
            return Err(LedgerError::Validation {
                field: "total_fee",
                message: "fees cannot be negative".to_string(),
            });
        }
        Ok(())
    }

    /// one month's tuition, total fee spread evenly across the duration
    pub fn monthly_fee(&self) -> Money {
        self.total_fee / Decimal::from(self.duration_months)
    }
}

/// an enrolled student
///
/// paid-to-date is never stored here; it is derived from settled ledger
/// entries at read time. the only money field is the carry-forward credit
/// left behind by an overpaying allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub institute_id: InstituteId,
    pub course_id: CourseId,
    pub name: String,
    pub email: String,
    pub enrollment_date: NaiveDate,
    pub guardian_name: Option<String>,
    pub mobile: Option<String>,
    pub guardian_mobile: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub credit_balance: Money,
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// course window closes this many calendar months after enrollment
    pub fn course_end_date(&self, course: &Course) -> NaiveDate {
        self.enrollment_date + Months::new(course.duration_months)
    }
}

/// a walk-in enquiry, convertible into an enrollment exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enquiry {
    pub id: EnquiryId,
    pub institute_id: InstituteId,
    pub course_id: CourseId,
    pub name: String,
    pub email: String,
    pub guardian_name: Option<String>,
    pub mobile: Option<String>,
    pub guardian_mobile: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub image_url: Option<String>,
    pub enquiry_date: Option<NaiveDate>,
    pub converted: bool,
    pub converted_on: Option<DateTime<Utc>>,
}

/// a notice shown to every institute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
}

impl Announcement {
    pub fn new(title: impl Into<String>, description: impl Into<String>, time: &SafeTimeProvider) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            posted_at: time.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn course(duration: u32, total: i64) -> Course {
        Course {
            id: Uuid::new_v4(),
            institute_id: Uuid::new_v4(),
            name: "Data Structures".to_string(),
            duration_months: duration,
            total_fee: Money::from_major(total),
            admission_fee: Money::from_major(500),
            image_url: None,
        }
    }

    fn student(enrollment: NaiveDate, c: &Course) -> Student {
        Student {
            id: Uuid::new_v4(),
            institute_id: c.institute_id,
            course_id: c.id,
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            enrollment_date: enrollment,
            guardian_name: None,
            mobile: None,
            guardian_mobile: None,
            address: None,
            date_of_birth: None,
            image_url: None,
            credit_balance: Money::ZERO,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_monthly_fee_even_split() {
        let c = course(10, 10_000);
        assert_eq!(c.monthly_fee(), Money::from_major(1000));
    }

    #[test]
    fn test_monthly_fee_rounds_to_cents() {
        let c = course(3, 10_000);
        assert_eq!(c.monthly_fee().to_string(), "3333.33");
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let c = course(0, 10_000);
        assert!(matches!(
            c.validate(),
            Err(LedgerError::Validation { field: "duration_months", .. })
        ));
    }

    #[test]
    fn test_course_end_date_uses_calendar_months() {
        let c = course(10, 10_000);
        let s = student(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &c);
        assert_eq!(s.course_end_date(&c), NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
    }

    #[test]
    fn test_course_end_date_clamps_short_months() {
        let c = course(1, 1_000);
        let s = student(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), &c);
        // jan 31 + 1 month lands on the last day of february
        assert_eq!(s.course_end_date(&c), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
