pub mod config;
pub mod decimal;
pub mod enrollment;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod reports;
pub mod roster;
pub mod store;
pub mod types;

// re-export key types
pub use config::LedgerConfig;
pub use decimal::Money;
pub use enrollment::{EnrollmentEngine, NewStudent};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use ledger::{
    AllocationEngine, AllocationOutcome, ApprovalEngine, BillableMonth, FeeSchedule, LedgerEntry,
    PaymentRequest,
};
pub use reports::{
    DelinquencyReport, DelinquentStudent, MonthCollection, MonthStatus, PaymentDetail,
    PaymentRecord, PeriodSummary, ReconciliationReporter, StudentStatement,
};
pub use roster::{Announcement, Course, Enquiry, Institute, Student};
pub use store::{InMemoryLedgerStore, InMemoryRosterStore, LedgerStore, RosterStore};
pub use types::{
    AllocationStart, BillingMonth, CourseId, EnquiryId, EntryId, EntryKind, FirstBillableMonth,
    InstituteId, OverpaymentPolicy, PaymentStatus, QueryScope, StudentId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
