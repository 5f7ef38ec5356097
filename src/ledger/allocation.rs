use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::schedule::{BillableMonth, FeeSchedule};
use crate::ledger::{AllocationOutcome, LedgerEntry, PaymentRequest};
use crate::store::{LedgerStore, RosterStore};
use crate::types::{AllocationStart, BillingMonth, OverpaymentPolicy, QueryScope};

/// turns one tendered payment into monthly ledger entries
///
/// a payment is split across the student's unpaid billable months, one
/// entry per month, oldest candidate first. the first entry may be partial;
/// every later one is a full monthly fee. what the course schedule cannot
/// absorb is handled by the configured overpayment policy.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    config: LedgerConfig,
}

impl AllocationEngine {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn allocate<R, L>(
        &self,
        request: &PaymentRequest,
        scope: &QueryScope,
        roster: &mut R,
        ledger: &mut L,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<AllocationOutcome>
    where
        R: RosterStore,
        L: LedgerStore,
    {
        if !request.amount.is_positive() {
            return Err(LedgerError::Validation {
                field: "amount",
                message: format!("amount must be positive, got {}", request.amount),
            });
        }
        if request.method.trim().is_empty() {
            return Err(LedgerError::Validation {
                field: "method",
                message: "payment method is required".to_string(),
            });
        }

        let mut student = roster
            .get_student(request.student_id)?
            .filter(|s| scope.permits(s.institute_id))
            .ok_or(LedgerError::StudentNotFound {
                id: request.student_id,
            })?;
        let course = roster
            .get_course(student.course_id)?
            .ok_or(LedgerError::CourseNotFound {
                id: student.course_id,
            })?;

        if request.course_id != student.course_id {
            return Err(LedgerError::CourseMismatch {
                requested: request.course_id,
                enrolled: student.course_id,
            });
        }

        let window_end = student.course_end_date(&course);
        if request.payment_date < student.enrollment_date || request.payment_date > window_end {
            return Err(LedgerError::OutOfRangeDate {
                payment_date: request.payment_date,
                window_start: student.enrollment_date,
                window_end,
            });
        }

        let schedule = FeeSchedule::for_student(&student, &course)
            .with_first_month(self.config.first_billable_month);
        let monthly_fee = schedule.monthly_fee();
        if !monthly_fee.is_positive() {
            return Err(LedgerError::Validation {
                field: "total_fee",
                message: "course has no monthly fee to allocate against".to_string(),
            });
        }

        let start_month = match self.config.allocation_start {
            AllocationStart::PaymentMonth => BillingMonth::from_date(request.payment_date),
            AllocationStart::EnrollmentSuccessor => {
                BillingMonth::from_date(student.enrollment_date).next()
            }
        };

        // under the payment-month convention a settled start month means the
        // caller is re-collecting a month already on the books
        if self.config.allocation_start == AllocationStart::PaymentMonth
            && ledger
                .find_by_student_and_month(student.id, start_month)?
                .is_some()
        {
            return Err(LedgerError::DuplicateMonth {
                student_id: student.id,
                month: start_month,
            });
        }

        let mut open_months: Vec<BillableMonth> = Vec::new();
        for billable in schedule.course_months() {
            if billable.month < start_month {
                continue;
            }
            if ledger
                .find_by_student_and_month(student.id, billable.month)?
                .is_none()
            {
                open_months.push(billable);
            }
        }

        let credit_used = student.credit_balance;
        let mut available = request.amount + credit_used;
        let mut planned: Vec<(BillableMonth, Money)> = Vec::new();
        for billable in &open_months {
            let portion = if planned.is_empty() {
                available.min(monthly_fee)
            } else if available >= monthly_fee {
                monthly_fee
            } else {
                break;
            };
            planned.push((*billable, portion));
            available -= portion;
        }
        let remainder = available;

        if planned.is_empty() {
            return Err(LedgerError::NothingToAllocate);
        }
        if remainder.is_positive() && self.config.overpayment == OverpaymentPolicy::Reject {
            return Err(LedgerError::OverpaymentRejected { remainder });
        }

        let mut entries = Vec::with_capacity(planned.len());
        let mut allocated = Money::ZERO;
        for (billable, portion) in planned {
            let entry = LedgerEntry::tuition(
                student.id,
                student.course_id,
                portion,
                billable.month,
                request.payment_date,
                request.method.clone(),
                self.config.initial_status,
                time,
            );
            ledger.insert(entry.clone())?;
            allocated += portion;
            entries.push(entry);
        }

        let new_balance = match self.config.overpayment {
            OverpaymentPolicy::CarryForward => remainder,
            OverpaymentPolicy::Drop | OverpaymentPolicy::Reject => Money::ZERO,
        };
        if new_balance != student.credit_balance {
            student.credit_balance = new_balance;
            roster.update_student(student.clone())?;
        }

        info!(
            "allocated {} across {} month(s) for student {} (credit used {}, remainder {})",
            allocated,
            entries.len(),
            student.id,
            credit_used,
            remainder
        );

        events.emit(Event::PaymentAllocated {
            student_id: student.id,
            course_id: student.course_id,
            tendered: request.amount,
            credit_used,
            allocated,
            months: entries.iter().map(|e| e.month).collect(),
            status: self.config.initial_status,
            timestamp: time.now(),
        });
        if remainder.is_positive() {
            match self.config.overpayment {
                OverpaymentPolicy::CarryForward => {
                    events.emit(Event::CreditCarried {
                        student_id: student.id,
                        remainder,
                        new_balance,
                        timestamp: time.now(),
                    });
                }
                OverpaymentPolicy::Drop => {
                    warn!(
                        "dropping remainder {} for student {}: schedule absorbed only {}",
                        remainder, student.id, allocated
                    );
                    events.emit(Event::RemainderDropped {
                        student_id: student.id,
                        remainder,
                        timestamp: time.now(),
                    });
                }
                OverpaymentPolicy::Reject => {}
            }
        }

        Ok(AllocationOutcome {
            entries,
            allocated,
            credit_used,
            remainder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Course, Institute, Student};
    use crate::store::{InMemoryLedgerStore, InMemoryRosterStore};
    use crate::types::PaymentStatus;
    use chrono::{NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        roster: InMemoryRosterStore,
        ledger: InMemoryLedgerStore,
        time: SafeTimeProvider,
        events: EventStore,
        student_id: Uuid,
        course_id: Uuid,
        institute_id: Uuid,
    }

    impl Fixture {
        /// ten-month course at 10000 total, student enrolled 2024-01-01
        fn new() -> Self {
            let mut roster = InMemoryRosterStore::new();
            let time = SafeTimeProvider::new(TimeSource::Test(
                Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            ));
            let institute_id = Uuid::new_v4();
            let course_id = Uuid::new_v4();
            let student_id = Uuid::new_v4();

            roster
                .insert_institute(Institute {
                    id: institute_id,
                    name: "City Centre".to_string(),
                    location: None,
                })
                .unwrap();
            roster
                .insert_course(Course {
                    id: course_id,
                    institute_id,
                    name: "Data Structures".to_string(),
                    duration_months: 10,
                    total_fee: Money::from_major(10_000),
                    admission_fee: Money::from_major(500),
                    image_url: None,
                })
                .unwrap();
            roster
                .insert_student(Student {
                    id: student_id,
                    institute_id,
                    course_id,
                    name: "Asha".to_string(),
                    email: "asha@example.com".to_string(),
                    enrollment_date: date(2024, 1, 1),
                    guardian_name: None,
                    mobile: None,
                    guardian_mobile: None,
                    address: None,
                    date_of_birth: None,
                    image_url: None,
                    credit_balance: Money::ZERO,
                    created_at: time.now(),
                })
                .unwrap();

            Self {
                roster,
                ledger: InMemoryLedgerStore::new(),
                time,
                events: EventStore::new(),
                student_id,
                course_id,
                institute_id,
            }
        }

        fn request(&self, amount: i64, payment_date: NaiveDate) -> PaymentRequest {
            PaymentRequest {
                student_id: self.student_id,
                course_id: self.course_id,
                amount: Money::from_major(amount),
                payment_date,
                method: "cash".to_string(),
            }
        }

        fn allocate(
            &mut self,
            engine: &AllocationEngine,
            amount: i64,
            payment_date: NaiveDate,
        ) -> Result<AllocationOutcome> {
            let request = self.request(amount, payment_date);
            engine.allocate(
                &request,
                &QueryScope::unrestricted(),
                &mut self.roster,
                &mut self.ledger,
                &self.time,
                &mut self.events,
            )
        }

        fn credit(&self) -> Money {
            self.roster
                .get_student(self.student_id)
                .unwrap()
                .unwrap()
                .credit_balance
        }
    }

    #[test]
    fn test_overflow_books_consecutive_months_from_payment_month() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        let outcome = fx.allocate(&engine, 2500, date(2024, 3, 1)).unwrap();

        let months: Vec<String> = outcome.months().iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2024-03", "2024-04"]);
        for entry in &outcome.entries {
            assert_eq!(entry.amount_paid, Money::from_major(1000));
            assert_eq!(entry.status, PaymentStatus::Completed);
            assert_eq!(entry.payment_date, date(2024, 3, 1));
        }
        assert_eq!(outcome.allocated, Money::from_major(2000));
        assert_eq!(outcome.remainder, Money::from_major(500));
        // default policy keeps the remainder as credit
        assert_eq!(fx.credit(), Money::from_major(500));
    }

    #[test]
    fn test_drop_policy_discards_remainder() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig {
            overpayment: OverpaymentPolicy::Drop,
            ..LedgerConfig::direct()
        })
        .unwrap();

        let outcome = fx.allocate(&engine, 2500, date(2024, 3, 1)).unwrap();

        assert_eq!(outcome.allocated, Money::from_major(2000));
        assert_eq!(outcome.remainder, Money::from_major(500));
        assert_eq!(fx.credit(), Money::ZERO);
        assert!(fx
            .events
            .events()
            .iter()
            .any(|e| matches!(e, Event::RemainderDropped { remainder, .. }
                if *remainder == Money::from_major(500))));
    }

    #[test]
    fn test_reject_policy_persists_nothing() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig {
            overpayment: OverpaymentPolicy::Reject,
            ..LedgerConfig::direct()
        })
        .unwrap();

        let err = fx.allocate(&engine, 2500, date(2024, 3, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::OverpaymentRejected { remainder }
            if remainder == Money::from_major(500)));
        assert!(fx.ledger.is_empty());
        assert_eq!(fx.credit(), Money::ZERO);
    }

    #[test]
    fn test_exact_monthly_fee_books_one_entry() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        let outcome = fx.allocate(&engine, 1000, date(2024, 3, 1)).unwrap();

        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].status, PaymentStatus::Completed);
        assert!(outcome.remainder.is_zero());
        assert_eq!(fx.credit(), Money::ZERO);
    }

    #[test]
    fn test_front_desk_entries_start_pending() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::front_desk()).unwrap();

        let outcome = fx.allocate(&engine, 1000, date(2024, 3, 1)).unwrap();
        assert_eq!(outcome.entries[0].status, PaymentStatus::Pending);
    }

    #[test]
    fn test_settled_month_rejects_second_allocation() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        fx.allocate(&engine, 1000, date(2024, 3, 1)).unwrap();
        let err = fx.allocate(&engine, 1000, date(2024, 3, 15)).unwrap_err();

        assert!(matches!(err, LedgerError::DuplicateMonth { month, .. }
            if month.to_string() == "2024-03"));
    }

    #[test]
    fn test_pending_workflow_allows_second_row_same_month() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::front_desk()).unwrap();

        fx.allocate(&engine, 1000, date(2024, 3, 1)).unwrap();
        let second = fx.allocate(&engine, 1000, date(2024, 3, 15)).unwrap();

        assert_eq!(second.entries.len(), 1);
        assert_eq!(second.entries[0].status, PaymentStatus::Pending);
        assert_eq!(fx.ledger.len(), 2);
    }

    #[test]
    fn test_credit_tops_up_next_allocation() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        fx.allocate(&engine, 2500, date(2024, 3, 1)).unwrap();
        assert_eq!(fx.credit(), Money::from_major(500));

        // 500 tendered + 500 credit = one more full month
        let outcome = fx.allocate(&engine, 500, date(2024, 5, 2)).unwrap();
        assert_eq!(outcome.credit_used, Money::from_major(500));
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].month.to_string(), "2024-05");
        assert_eq!(outcome.entries[0].amount_paid, Money::from_major(1000));
        assert_eq!(fx.credit(), Money::ZERO);
    }

    #[test]
    fn test_enrollment_successor_scans_from_second_month() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig {
            allocation_start: AllocationStart::EnrollmentSuccessor,
            ..LedgerConfig::direct()
        })
        .unwrap();

        let outcome = fx.allocate(&engine, 1000, date(2024, 3, 1)).unwrap();
        assert_eq!(outcome.entries[0].month.to_string(), "2024-02");

        // the next payment skips the settled frontier instead of failing
        let next = fx.allocate(&engine, 1000, date(2024, 3, 20)).unwrap();
        assert_eq!(next.entries[0].month.to_string(), "2024-03");
    }

    #[test]
    fn test_partial_tender_books_partial_first_month() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        let outcome = fx.allocate(&engine, 400, date(2024, 3, 1)).unwrap();
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].amount_paid, Money::from_major(400));
        assert!(outcome.remainder.is_zero());
    }

    #[test]
    fn test_allocation_never_extends_past_course_end() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig {
            overpayment: OverpaymentPolicy::Drop,
            ..LedgerConfig::direct()
        })
        .unwrap();

        // september payment leaves sep + oct open on a jan-oct course
        let outcome = fx.allocate(&engine, 5000, date(2024, 9, 3)).unwrap();
        let months: Vec<String> = outcome.months().iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2024-09", "2024-10"]);
        assert_eq!(outcome.remainder, Money::from_major(3000));
    }

    #[test]
    fn test_rejects_zero_amount() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        let err = fx.allocate(&engine, 0, date(2024, 3, 1)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { field: "amount", .. }));
    }

    #[test]
    fn test_rejects_date_outside_course_window() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        let before = fx.allocate(&engine, 1000, date(2023, 12, 31)).unwrap_err();
        assert!(matches!(before, LedgerError::OutOfRangeDate { .. }));

        let after = fx.allocate(&engine, 1000, date(2024, 11, 2)).unwrap_err();
        assert!(matches!(after, LedgerError::OutOfRangeDate { .. }));
    }

    #[test]
    fn test_rejects_course_mismatch() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        let mut request = fx.request(1000, date(2024, 3, 1));
        request.course_id = Uuid::new_v4();
        let err = engine
            .allocate(
                &request,
                &QueryScope::unrestricted(),
                &mut fx.roster,
                &mut fx.ledger,
                &fx.time,
                &mut fx.events,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::CourseMismatch { .. }));
    }

    #[test]
    fn test_scope_hides_students_of_other_institutes() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        let request = fx.request(1000, date(2024, 3, 1));
        let foreign = QueryScope::institute(Uuid::new_v4());
        let err = engine
            .allocate(
                &request,
                &foreign,
                &mut fx.roster,
                &mut fx.ledger,
                &fx.time,
                &mut fx.events,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::StudentNotFound { .. }));

        // the student's own institute scope works
        let own = QueryScope::institute(fx.institute_id);
        let outcome = engine
            .allocate(
                &request,
                &own,
                &mut fx.roster,
                &mut fx.ledger,
                &fx.time,
                &mut fx.events,
            )
            .unwrap();
        assert_eq!(outcome.entries.len(), 1);
    }

    #[test]
    fn test_fails_when_every_month_is_settled() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig {
            overpayment: OverpaymentPolicy::Drop,
            ..LedgerConfig::direct()
        })
        .unwrap();

        // settle sep and oct, then tender again in october
        fx.allocate(&engine, 2000, date(2024, 9, 3)).unwrap();
        let err = fx.allocate(&engine, 1000, date(2024, 10, 3)).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateMonth { .. }));

        // the successor convention keeps booking open months until none remain
        let successor = AllocationEngine::new(LedgerConfig {
            allocation_start: AllocationStart::EnrollmentSuccessor,
            overpayment: OverpaymentPolicy::Drop,
            ..LedgerConfig::direct()
        })
        .unwrap();
        fx.allocate(&successor, 8000, date(2024, 10, 4)).unwrap();
        let err = fx.allocate(&successor, 1000, date(2024, 10, 5)).unwrap_err();
        assert!(matches!(err, LedgerError::NothingToAllocate));
    }

    #[test]
    fn test_emits_allocation_event() {
        let mut fx = Fixture::new();
        let engine = AllocationEngine::new(LedgerConfig::direct()).unwrap();

        fx.allocate(&engine, 2500, date(2024, 3, 1)).unwrap();

        let allocated = fx.events.events().iter().find_map(|e| match e {
            Event::PaymentAllocated {
                tendered, months, ..
            } => Some((*tendered, months.len())),
            _ => None,
        });
        assert_eq!(allocated, Some((Money::from_major(2500), 2)));
        assert!(fx
            .events
            .events()
            .iter()
            .any(|e| matches!(e, Event::CreditCarried { .. })));
    }
}
