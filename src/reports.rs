/// reconciliation reporting: period summaries, delinquency, statements
///
/// read-side views over the roster and ledger stores. every operation
/// takes the caller's scope and explicit dates; the only implicit date
/// is the period-summary default window, which comes from the supplied
/// time provider.
use chrono::{Months, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::ledger::FeeSchedule;
use crate::store::{LedgerStore, RosterStore};
use crate::types::{BillingMonth, EntryId, EntryKind, PaymentStatus, QueryScope, StudentId};

/// collections over a date window, grouped by calendar month
#[derive(Debug, Serialize)]
pub struct PeriodSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub months: Vec<MonthCollection>,
    pub grand_total: Money,
}

#[derive(Debug, Serialize)]
pub struct MonthCollection {
    pub month: BillingMonth,
    pub total: Money,
    pub payments: Vec<PaymentDetail>,
}

#[derive(Debug, Serialize)]
pub struct PaymentDetail {
    pub entry_id: EntryId,
    pub student_id: StudentId,
    pub student_name: String,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: String,
    pub status: PaymentStatus,
}

/// students with unpaid fees for one billing month
#[derive(Debug, Serialize)]
pub struct DelinquencyReport {
    pub month: BillingMonth,
    pub reference_date: NaiveDate,
    pub students: Vec<DelinquentStudent>,
    pub total_pending: Money,
}

#[derive(Debug, Serialize)]
pub struct DelinquentStudent {
    pub student_id: StudentId,
    pub name: String,
    pub course_name: String,
    pub months_billed: u32,
    pub total_due: Money,
    pub paid_to_date: Money,
    pub credit_balance: Money,
    pub pending: Money,
}

/// one student's fee position as of a given date
#[derive(Debug, Serialize)]
pub struct StudentStatement {
    pub student_id: StudentId,
    pub name: String,
    pub course_name: String,
    pub enrollment_date: NaiveDate,
    pub course_end_date: NaiveDate,
    pub total_fee: Money,
    pub monthly_fee: Money,
    pub admission_fee_paid: Money,
    pub tuition_paid: Money,
    pub credit_balance: Money,
    pub total_pending: Money,
    pub months: Vec<MonthStatus>,
    pub payments: Vec<PaymentRecord>,
}

#[derive(Debug, Serialize)]
pub struct MonthStatus {
    pub month: BillingMonth,
    pub monthly_fee: Money,
    pub paid: bool,
    pub amount_paid: Money,
    pub pending: Money,
}

#[derive(Debug, Serialize)]
pub struct PaymentRecord {
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: String,
    pub status: PaymentStatus,
}

impl PeriodSummary {
    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl DelinquencyReport {
    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl StudentStatement {
    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// builds reconciliation views from the stores
pub struct ReconciliationReporter {
    config: LedgerConfig,
}

impl ReconciliationReporter {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(ReconciliationReporter { config })
    }

    /// collections between `from` and `to` (both inclusive), grouped by
    /// the calendar month of the payment date
    ///
    /// defaults: `to` = today, `from` = `to` minus the configured summary
    /// window. all statuses and entry kinds are included; rows whose
    /// student no longer resolves are dropped with a warning. an
    /// inverted window is an empty summary, not an error.
    pub fn period_summary<R, L>(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        scope: &QueryScope,
        roster: &R,
        ledger: &L,
        time: &SafeTimeProvider,
    ) -> Result<PeriodSummary>
    where
        R: RosterStore,
        L: LedgerStore,
    {
        let to = to.unwrap_or_else(|| time.now().date_naive());
        let from = from.unwrap_or_else(|| to - Months::new(self.config.default_summary_months));

        if from > to {
            return Ok(PeriodSummary {
                from,
                to,
                months: Vec::new(),
                grand_total: Money::ZERO,
            });
        }

        let mut buckets: BTreeMap<BillingMonth, Vec<PaymentDetail>> = BTreeMap::new();
        for entry in ledger.find_by_date_range(from, to)? {
            let student = match roster.get_student(entry.student_id)? {
                Some(student) => student,
                None => {
                    warn!(
                        "dropping entry {} from summary: student {} is not in the roster",
                        entry.id, entry.student_id
                    );
                    continue;
                }
            };
            if !scope.permits(student.institute_id) {
                continue;
            }
            buckets
                .entry(BillingMonth::from_date(entry.payment_date))
                .or_default()
                .push(PaymentDetail {
                    entry_id: entry.id,
                    student_id: student.id,
                    student_name: student.name.clone(),
                    amount: entry.amount_paid,
                    payment_date: entry.payment_date,
                    method: entry.payment_method.clone(),
                    status: entry.status,
                });
        }

        let months: Vec<MonthCollection> = buckets
            .into_iter()
            .map(|(month, payments)| {
                let total = payments.iter().map(|p| p.amount).sum();
                MonthCollection {
                    month,
                    total,
                    payments,
                }
            })
            .collect();
        let grand_total = months.iter().map(|m| m.total).sum();

        Ok(PeriodSummary {
            from,
            to,
            months,
            grand_total,
        })
    }

    /// students who owe fees for the given `YYYY-MM` month
    ///
    /// the roster window is the trailing year ending at the month's last
    /// day, so the report for a past month stays stable no matter when
    /// it is run. a student is skipped when a settled tuition entry
    /// already covers the month; otherwise their position is valued at
    /// the month's end and they are listed when pending fees remain
    /// after subtracting payments and credit. sorted by pending fee,
    /// largest first.
    pub fn month_delinquency<R, L>(
        &self,
        month: &str,
        scope: &QueryScope,
        roster: &R,
        ledger: &L,
    ) -> Result<DelinquencyReport>
    where
        R: RosterStore,
        L: LedgerStore,
    {
        let month: BillingMonth = month.parse()?;
        let reference_date = month.last_day();
        let window_start = month.first_day() - Months::new(12);

        let mut students = Vec::new();
        for student in roster.find_enrolled_between(window_start, reference_date, scope)? {
            if ledger
                .find_by_student_and_month(student.id, month)?
                .is_some()
            {
                continue;
            }
            let course = match roster.get_course(student.course_id)? {
                Some(course) => course,
                None => {
                    warn!(
                        "dropping student {} from delinquency report: course {} is not in the roster",
                        student.id, student.course_id
                    );
                    continue;
                }
            };
            let schedule = FeeSchedule::for_student(&student, &course)
                .with_first_month(self.config.first_billable_month);
            let total_due = schedule.total_due(reference_date);
            let paid_to_date = settled_tuition_total(ledger, student.id)?;
            let pending = total_due - paid_to_date - student.credit_balance;
            if !pending.is_positive() {
                continue;
            }
            students.push(DelinquentStudent {
                student_id: student.id,
                name: student.name.clone(),
                course_name: course.name.clone(),
                months_billed: schedule.billable_count(reference_date),
                total_due,
                paid_to_date,
                credit_balance: student.credit_balance,
                pending,
            });
        }

        students.sort_by(|a, b| b.pending.cmp(&a.pending));
        let total_pending = students.iter().map(|s| s.pending).sum();

        Ok(DelinquencyReport {
            month,
            reference_date,
            students,
            total_pending,
        })
    }

    /// one student's month-by-month fee position as of `as_of`
    ///
    /// walks the billable months up to `as_of` (never past course end),
    /// marking each month settled or open, and derives the paid totals
    /// from the ledger. `total_pending` is clamped at zero: a student
    /// who paid ahead owes nothing, and the surplus shows up as credit.
    pub fn student_statement<R, L>(
        &self,
        student_id: StudentId,
        scope: &QueryScope,
        roster: &R,
        ledger: &L,
        as_of: NaiveDate,
    ) -> Result<StudentStatement>
    where
        R: RosterStore,
        L: LedgerStore,
    {
        let student = roster
            .get_student(student_id)?
            .filter(|s| scope.permits(s.institute_id))
            .ok_or(LedgerError::StudentNotFound { id: student_id })?;
        let course = roster
            .get_course(student.course_id)?
            .ok_or(LedgerError::CourseNotFound {
                id: student.course_id,
            })?;

        let schedule = FeeSchedule::for_student(&student, &course)
            .with_first_month(self.config.first_billable_month);
        let entries = ledger.find_by_student(student.id)?;

        let mut admission_fee_paid = Money::ZERO;
        let mut tuition_paid = Money::ZERO;
        for entry in entries.iter().filter(|e| e.status.is_settled()) {
            match entry.kind {
                EntryKind::Admission => admission_fee_paid += entry.amount_paid,
                EntryKind::Tuition => tuition_paid += entry.amount_paid,
            }
        }

        let months: Vec<MonthStatus> = schedule
            .months(as_of)
            .map(|billable| {
                let amount_paid: Money = entries
                    .iter()
                    .filter(|e| {
                        e.kind == EntryKind::Tuition
                            && e.status.is_settled()
                            && e.month == billable.month
                    })
                    .map(|e| e.amount_paid)
                    .sum();
                MonthStatus {
                    month: billable.month,
                    monthly_fee: billable.monthly_fee,
                    paid: amount_paid.is_positive(),
                    amount_paid,
                    pending: (billable.monthly_fee - amount_paid).max(Money::ZERO),
                }
            })
            .collect();

        let total_due = schedule.total_due(as_of);
        let total_pending = (total_due - tuition_paid - student.credit_balance).max(Money::ZERO);

        let payments = entries
            .iter()
            .map(|e| PaymentRecord {
                amount: e.amount_paid,
                payment_date: e.payment_date,
                method: e.payment_method.clone(),
                status: e.status,
            })
            .collect();

        Ok(StudentStatement {
            student_id: student.id,
            name: student.name.clone(),
            course_name: course.name.clone(),
            enrollment_date: student.enrollment_date,
            course_end_date: student.course_end_date(&course),
            total_fee: course.total_fee,
            monthly_fee: schedule.monthly_fee(),
            admission_fee_paid,
            tuition_paid,
            credit_balance: student.credit_balance,
            total_pending,
            months,
            payments,
        })
    }
}

/// sum of a student's settled tuition entries
fn settled_tuition_total<L: LedgerStore>(ledger: &L, student_id: StudentId) -> Result<Money> {
    Ok(ledger
        .find_by_student(student_id)?
        .iter()
        .filter(|e| e.kind == EntryKind::Tuition && e.status.is_settled())
        .map(|e| e.amount_paid)
        .sum())
}
