use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::roster::{Course, Student};
use crate::types::{BillingMonth, FirstBillableMonth};

/// one month of the billable sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BillableMonth {
    pub month: BillingMonth,
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
    pub monthly_fee: Money,
}

/// the billable-month calculator
///
/// months elapse on a fixed 30-day rule: `floor(days since enrollment / 30)`,
/// never a calendar diff. the billable sequence itself is made of calendar
/// months, capped at the course duration. pure; the reference date is always
/// an explicit argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    enrollment_date: NaiveDate,
    duration_months: u32,
    total_fee: Money,
    monthly_fee: Money,
    first_month: FirstBillableMonth,
}

impl FeeSchedule {
    pub fn new(enrollment_date: NaiveDate, duration_months: u32, total_fee: Money) -> Self {
        let monthly_fee = if duration_months == 0 {
            Money::ZERO
        } else {
            total_fee / Decimal::from(duration_months)
        };
        Self {
            enrollment_date,
            duration_months,
            total_fee,
            monthly_fee,
            first_month: FirstBillableMonth::EnrollmentMonth,
        }
    }

    pub fn for_student(student: &Student, course: &Course) -> Self {
        Self::new(student.enrollment_date, course.duration_months, course.total_fee)
    }

    pub fn with_first_month(mut self, first_month: FirstBillableMonth) -> Self {
        self.first_month = first_month;
        self
    }

    pub fn monthly_fee(&self) -> Money {
        self.monthly_fee
    }

    pub fn duration_months(&self) -> u32 {
        self.duration_months
    }

    /// the calendar month that opens the billable sequence
    pub fn first_month(&self) -> BillingMonth {
        let enrollment = BillingMonth::from_date(self.enrollment_date);
        match self.first_month {
            FirstBillableMonth::EnrollmentMonth => enrollment,
            FirstBillableMonth::FollowingMonth => enrollment.next(),
        }
    }

    /// the calendar month that closes the billable sequence
    pub fn final_month(&self) -> BillingMonth {
        let mut month = self.first_month();
        for _ in 1..self.duration_months.max(1) {
            month = month.next();
        }
        month
    }

    /// whole 30-day periods elapsed since enrollment; negative spans are zero
    pub fn elapsed_months(&self, as_of: NaiveDate) -> u32 {
        let days = (as_of - self.enrollment_date).num_days();
        if days < 0 {
            0
        } else {
            (days / 30) as u32
        }
    }

    /// months billable as of a date, never more than the course duration
    pub fn billable_count(&self, as_of: NaiveDate) -> u32 {
        self.elapsed_months(as_of).min(self.duration_months)
    }

    /// tuition owed as of a date
    pub fn total_due(&self, as_of: NaiveDate) -> Money {
        self.monthly_fee * Decimal::from(self.billable_count(as_of))
    }

    /// every calendar month of the course, first to last
    pub fn course_months(&self) -> impl Iterator<Item = BillableMonth> {
        let monthly_fee = self.monthly_fee;
        std::iter::successors(Some(self.first_month()), |m| Some(m.next()))
            .take(self.duration_months as usize)
            .map(move |month| BillableMonth {
                month,
                month_start: month.first_day(),
                month_end: month.last_day(),
                monthly_fee,
            })
    }

    /// the billable sequence as of a date: a lazy, finite iterator that can
    /// be recreated any number of times
    pub fn months(&self, as_of: NaiveDate) -> impl Iterator<Item = BillableMonth> {
        self.course_months().take(self.billable_count(as_of) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule() -> FeeSchedule {
        FeeSchedule::new(date(2024, 1, 1), 10, Money::from_major(10_000))
    }

    #[test]
    fn test_elapsed_uses_thirty_day_months() {
        let s = schedule();
        // exactly 95 days after enrollment: floor(95/30) = 3
        assert_eq!(s.elapsed_months(date(2024, 4, 5)), 3);
        assert_eq!(s.elapsed_months(date(2024, 1, 1)), 0);
        assert_eq!(s.elapsed_months(date(2024, 1, 30)), 0);
        assert_eq!(s.elapsed_months(date(2024, 1, 31)), 1);
    }

    #[test]
    fn test_negative_span_clamps_to_zero() {
        let s = schedule();
        assert_eq!(s.elapsed_months(date(2023, 6, 1)), 0);
        assert_eq!(s.months(date(2023, 6, 1)).count(), 0);
    }

    #[test]
    fn test_never_more_months_than_duration() {
        let s = schedule();
        // years past course end
        assert_eq!(s.billable_count(date(2030, 1, 1)), 10);
        assert_eq!(s.months(date(2030, 1, 1)).count(), 10);
    }

    #[test]
    fn test_first_month_is_enrollment_month() {
        let s = schedule();
        let first = s.months(date(2024, 3, 1)).next().unwrap();
        assert_eq!(first.month.to_string(), "2024-01");
        assert_eq!(first.month_start, date(2024, 1, 1));
        assert_eq!(first.month_end, date(2024, 1, 31));
        assert_eq!(first.monthly_fee, Money::from_major(1000));
    }

    #[test]
    fn test_following_month_policy_shifts_sequence() {
        let s = schedule().with_first_month(FirstBillableMonth::FollowingMonth);
        let first = s.months(date(2024, 3, 1)).next().unwrap();
        assert_eq!(first.month.to_string(), "2024-02");
        assert_eq!(s.final_month().to_string(), "2024-11");
    }

    #[test]
    fn test_sequence_is_consecutive_calendar_months() {
        let s = schedule();
        let months: Vec<String> = s
            .months(date(2024, 4, 5))
            .map(|b| b.month.to_string())
            .collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let s = schedule();
        let first: Vec<BillableMonth> = s.months(date(2024, 6, 1)).collect();
        let second: Vec<BillableMonth> = s.months(date(2024, 6, 1)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_total_due_tracks_elapsed_months() {
        let s = schedule();
        assert_eq!(s.total_due(date(2024, 4, 5)), Money::from_major(3000));
        assert_eq!(s.total_due(date(2030, 1, 1)), Money::from_major(10_000));
    }

    #[test]
    fn test_monthly_fee_times_duration_stays_within_one_cent() {
        for (duration, total) in [(10u32, 10_000i64), (3, 10_000), (7, 8_400), (12, 35_999)] {
            let s = FeeSchedule::new(date(2024, 1, 1), duration, Money::from_major(total));
            let rebuilt = s.monthly_fee() * Decimal::from(duration);
            let drift = (rebuilt - Money::from_major(total)).abs();
            assert!(
                drift <= Money::CENT * Decimal::from(duration),
                "duration {duration} total {total}: drift {drift}"
            );
        }
    }

    #[test]
    fn test_final_month_spans_course_duration() {
        let s = schedule();
        assert_eq!(s.final_month().to_string(), "2024-10");
        let december = FeeSchedule::new(date(2023, 12, 15), 3, Money::from_major(3000));
        assert_eq!(december.final_month().to_string(), "2024-02"); // dec, jan, feb
    }
}
