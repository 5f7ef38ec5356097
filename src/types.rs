use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{LedgerError, Result};

/// unique identifier for a student
pub type StudentId = Uuid;

/// unique identifier for a course
pub type CourseId = Uuid;

/// unique identifier for an institute
pub type InstituteId = Uuid;

/// unique identifier for an enquiry
pub type EnquiryId = Uuid;

/// unique identifier for a ledger entry
pub type EntryId = Uuid;

/// ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// collected at the front desk, awaiting back-office approval
    Pending,
    /// audited and confirmed
    Approved,
    /// collected and confirmed in one step
    Completed,
    /// rejected or reversed
    Failed,
}

impl PaymentStatus {
    /// settled entries count toward paid months and block re-billing
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Completed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// what a ledger entry pays for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// one billable month of course fees; at most one settled entry per month
    Tuition,
    /// one-time admission charge at enrollment; exempt from the month rule
    Admission,
}

/// calendar month key in `YYYY-MM` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(LedgerError::InvalidMonthFormat {
                input: format!("{year:04}-{month:02}"),
            });
        }
        Ok(BillingMonth { year, month })
    }

    /// the calendar month a date falls in
    pub fn from_date(date: NaiveDate) -> Self {
        BillingMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// strict `YYYY-MM` parse
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || LedgerError::InvalidMonthFormat {
            input: input.to_string(),
        };
        let (y, m) = input.split_once('-').ok_or_else(invalid)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        BillingMonth::new(year, month).map_err(|_| invalid())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// the following calendar month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            BillingMonth {
                year: self.year + 1,
                month: 1,
            }
        } else {
            BillingMonth {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// first calendar day of the month
    pub fn first_day(&self) -> NaiveDate {
        // year/month are validated at construction, day 1 always resolves
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }

    /// last calendar day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingMonth {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        BillingMonth::parse(s)
    }
}

impl TryFrom<String> for BillingMonth {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self> {
        BillingMonth::parse(&s)
    }
}

impl From<BillingMonth> for String {
    fn from(m: BillingMonth) -> String {
        m.to_string()
    }
}

/// which calendar month opens a student's billable sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirstBillableMonth {
    /// the enrollment month itself counts as month one
    EnrollmentMonth,
    /// billing begins the month after enrollment
    FollowingMonth,
}

/// where the allocation scan begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStart {
    /// start at the payment date's own month; a settled entry there
    /// rejects the payment as a duplicate
    PaymentMonth,
    /// start the month after enrollment and skip forward past every
    /// settled month to the first unpaid one
    EnrollmentSuccessor,
}

/// what happens to a remainder smaller than one monthly fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverpaymentPolicy {
    /// hold the remainder as student credit, consumed by the next allocation
    CarryForward,
    /// discard the remainder from the ledger
    Drop,
    /// refuse the payment outright
    Reject,
}

/// query filter carried by every caller
///
/// an unrestricted scope sees all institutes; a scoped one behaves as if
/// students outside its institute do not exist. the core never makes
/// authorization decisions, it only applies the filter it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QueryScope {
    pub institute: Option<InstituteId>,
}

impl QueryScope {
    /// admin scope: no institute filter
    pub fn unrestricted() -> Self {
        QueryScope { institute: None }
    }

    /// clerk scope: restricted to one institute
    pub fn institute(id: InstituteId) -> Self {
        QueryScope {
            institute: Some(id),
        }
    }

    /// whether a record owned by the given institute is visible
    pub fn permits(&self, institute_id: InstituteId) -> bool {
        match self.institute {
            None => true,
            Some(own) => own == institute_id,
        }
    }
}
