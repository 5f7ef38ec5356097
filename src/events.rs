use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{BillingMonth, CourseId, EnquiryId, InstituteId, PaymentStatus, StudentId};

/// all events that can be emitted by the ledger engines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // enrollment events
    StudentEnrolled {
        student_id: StudentId,
        institute_id: InstituteId,
        course_id: CourseId,
        enrollment_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    EnquiryConverted {
        enquiry_id: EnquiryId,
        student_id: StudentId,
        timestamp: DateTime<Utc>,
    },
    AdmissionFeeCharged {
        student_id: StudentId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // allocation events
    PaymentAllocated {
        student_id: StudentId,
        course_id: CourseId,
        tendered: Money,
        credit_used: Money,
        allocated: Money,
        months: Vec<BillingMonth>,
        status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
    CreditCarried {
        student_id: StudentId,
        remainder: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    RemainderDropped {
        student_id: StudentId,
        remainder: Money,
        timestamp: DateTime<Utc>,
    },

    // approval events
    EntriesApproved {
        count: u32,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
