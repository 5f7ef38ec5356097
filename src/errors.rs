use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::BillingMonth;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation failed for {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("student not found: {id}")]
    StudentNotFound {
        id: Uuid,
    },

    #[error("course not found: {id}")]
    CourseNotFound {
        id: Uuid,
    },

    #[error("institute not found: {id}")]
    InstituteNotFound {
        id: Uuid,
    },

    #[error("enquiry not found: {id}")]
    EnquiryNotFound {
        id: Uuid,
    },

    #[error("enquiry already converted: {id}")]
    EnquiryAlreadyConverted {
        id: Uuid,
    },

    #[error("payment date {payment_date} outside course window {window_start} to {window_end}")]
    OutOfRangeDate {
        payment_date: NaiveDate,
        window_start: NaiveDate,
        window_end: NaiveDate,
    },

    #[error("course mismatch: payment for {requested}, student enrolled in {enrolled}")]
    CourseMismatch {
        requested: Uuid,
        enrolled: Uuid,
    },

    #[error("month {month} already settled for student {student_id}")]
    DuplicateMonth {
        student_id: Uuid,
        month: BillingMonth,
    },

    #[error("invalid month format: {input}")]
    InvalidMonthFormat {
        input: String,
    },

    #[error("no billable month available for allocation")]
    NothingToAllocate,

    #[error("payment exceeds remaining schedule by {remainder}")]
    OverpaymentRejected {
        remainder: Money,
    },

    #[error("no pending entries matched the approval request")]
    NoPendingRows,

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
