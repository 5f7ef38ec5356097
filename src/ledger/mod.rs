pub mod allocation;
pub mod approval;
pub mod schedule;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{BillingMonth, CourseId, EntryId, EntryKind, PaymentStatus, StudentId};

pub use allocation::AllocationEngine;
pub use approval::ApprovalEngine;
pub use schedule::{BillableMonth, FeeSchedule};

/// one persisted ledger row: a month of tuition or an admission charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub amount_paid: Money,
    pub month: BillingMonth,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub kind: EntryKind,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    /// one billable month of course fees
    pub fn tuition(
        student_id: StudentId,
        course_id: CourseId,
        amount_paid: Money,
        month: BillingMonth,
        payment_date: NaiveDate,
        payment_method: impl Into<String>,
        status: PaymentStatus,
        time: &SafeTimeProvider,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            amount_paid,
            month,
            payment_date,
            payment_method: payment_method.into(),
            status,
            kind: EntryKind::Tuition,
            created_at: time.now(),
            approved_at: None,
        }
    }

    /// the one-time admission charge booked at enrollment, always settled
    pub fn admission(
        student_id: StudentId,
        course_id: CourseId,
        amount_paid: Money,
        payment_date: NaiveDate,
        time: &SafeTimeProvider,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            amount_paid,
            month: BillingMonth::from_date(payment_date),
            payment_date,
            payment_method: "cash".to_string(),
            status: PaymentStatus::Approved,
            kind: EntryKind::Admission,
            created_at: time.now(),
            approved_at: Some(time.now()),
        }
    }

    /// settled tuition blocks its month from being billed again
    pub fn blocks_month(&self) -> bool {
        self.kind == EntryKind::Tuition && self.status.is_settled()
    }
}

/// a tendered payment, before allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: String,
}

/// what an allocation did with a payment
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    /// rows created, one per booked month, in month order
    pub entries: Vec<LedgerEntry>,
    /// total booked into the ledger
    pub allocated: Money,
    /// prior credit consumed alongside the tendered amount
    pub credit_used: Money,
    /// what was left over after booking, before the overpayment policy
    pub remainder: Money,
}

impl AllocationOutcome {
    pub fn months(&self) -> Vec<BillingMonth> {
        self.entries.iter().map(|e| e.month).collect()
    }
}
