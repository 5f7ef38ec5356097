use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::errors::{LedgerError, Result};
use crate::ledger::LedgerEntry;
use crate::roster::{Announcement, Course, Enquiry, Institute, Student};
use crate::types::{
    BillingMonth, CourseId, EnquiryId, EntryId, EntryKind, InstituteId, PaymentStatus, QueryScope,
    StudentId,
};
use uuid::Uuid;

/// persistence seam for ledger entries
///
/// the month-uniqueness invariant lives here, where a database would hold
/// it as a unique index: insert is optimistic and fails on conflict.
pub trait LedgerStore {
    /// persist one entry; fails `DuplicateMonth` when a settled tuition
    /// entry already occupies (student, course, month)
    fn insert(&mut self, entry: LedgerEntry) -> Result<()>;

    /// earliest settled tuition entry for the pair, if any
    fn find_by_student_and_month(
        &self,
        student_id: StudentId,
        month: BillingMonth,
    ) -> Result<Option<LedgerEntry>>;

    /// every entry for a student, ordered by month then creation time
    fn find_by_student(&self, student_id: StudentId) -> Result<Vec<LedgerEntry>>;

    /// entries whose payment_date falls in [from, to], both ends inclusive
    fn find_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LedgerEntry>>;

    /// bulk status update; only pending → approved is permitted. returns
    /// how many entries changed; entries whose transition would put a
    /// second settled tuition entry on a month are skipped.
    fn update_status(
        &mut self,
        ids: &[EntryId],
        new_status: PaymentStatus,
        approved_at: DateTime<Utc>,
    ) -> Result<u32>;
}

/// persistence seam for institutes, courses, students and enquiries
pub trait RosterStore {
    fn get_institute(&self, id: InstituteId) -> Result<Option<Institute>>;
    fn get_course(&self, id: CourseId) -> Result<Option<Course>>;
    fn get_student(&self, id: StudentId) -> Result<Option<Student>>;
    fn get_enquiry(&self, id: EnquiryId) -> Result<Option<Enquiry>>;

    fn find_student_by_email(&self, email: &str) -> Result<Option<Student>>;

    /// students whose enrollment_date falls in [start, end], filtered by
    /// the caller's scope; roster source for the delinquency report
    fn find_enrolled_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        scope: &QueryScope,
    ) -> Result<Vec<Student>>;

    fn insert_institute(&mut self, institute: Institute) -> Result<()>;
    fn insert_course(&mut self, course: Course) -> Result<()>;
    fn insert_student(&mut self, student: Student) -> Result<()>;
    fn update_student(&mut self, student: Student) -> Result<()>;
    fn insert_enquiry(&mut self, enquiry: Enquiry) -> Result<()>;
    fn mark_enquiry_converted(&mut self, id: EnquiryId, converted_on: DateTime<Utc>)
        -> Result<()>;

    /// drop unconverted enquiries dated before the cutoff; returns how
    /// many were removed. enquiries without a date are kept.
    fn purge_enquiries_before(&mut self, cutoff: NaiveDate) -> Result<u32>;

    fn insert_announcement(&mut self, announcement: Announcement) -> Result<()>;
    fn list_announcements(&self) -> Result<Vec<Announcement>>;
}

/// vec-backed ledger store for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    entries: Vec<LedgerEntry>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all(&self) -> &[LedgerEntry] {
        &self.entries
    }

    fn month_is_blocked(&self, student_id: StudentId, course_id: CourseId, month: BillingMonth) -> bool {
        self.entries.iter().any(|e| {
            e.student_id == student_id
                && e.course_id == course_id
                && e.month == month
                && e.blocks_month()
        })
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn insert(&mut self, entry: LedgerEntry) -> Result<()> {
        if entry.kind == EntryKind::Tuition
            && self.month_is_blocked(entry.student_id, entry.course_id, entry.month)
        {
            return Err(LedgerError::DuplicateMonth {
                student_id: entry.student_id,
                month: entry.month,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    fn find_by_student_and_month(
        &self,
        student_id: StudentId,
        month: BillingMonth,
    ) -> Result<Option<LedgerEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.student_id == student_id && e.month == month && e.blocks_month())
            .min_by_key(|e| e.created_at)
            .cloned())
    }

    fn find_by_student(&self, student_id: StudentId) -> Result<Vec<LedgerEntry>> {
        let mut rows: Vec<LedgerEntry> = self
            .entries
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.month.cmp(&b.month).then(a.created_at.cmp(&b.created_at)));
        Ok(rows)
    }

    fn find_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<LedgerEntry>> {
        let mut rows: Vec<LedgerEntry> = self
            .entries
            .iter()
            .filter(|e| e.payment_date >= from && e.payment_date <= to)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.payment_date.cmp(&b.payment_date).then(a.created_at.cmp(&b.created_at)));
        Ok(rows)
    }

    fn update_status(
        &mut self,
        ids: &[EntryId],
        new_status: PaymentStatus,
        approved_at: DateTime<Utc>,
    ) -> Result<u32> {
        if new_status != PaymentStatus::Approved {
            return Err(LedgerError::Validation {
                field: "new_status",
                message: "only the pending to approved transition is supported".to_string(),
            });
        }
        let mut updated = 0u32;
        for idx in 0..self.entries.len() {
            let entry = &self.entries[idx];
            if !ids.contains(&entry.id) || entry.status != PaymentStatus::Pending {
                continue;
            }
            // approving the second of two pending entries on one month
            // would break the settled-month invariant; leave it pending
            let (student_id, course_id, month) = (entry.student_id, entry.course_id, entry.month);
            if entry.kind == EntryKind::Tuition
                && self.month_is_blocked(student_id, course_id, month)
            {
                continue;
            }
            let entry = &mut self.entries[idx];
            entry.status = new_status;
            entry.approved_at = Some(approved_at);
            updated += 1;
        }
        Ok(updated)
    }
}

/// hashmap-backed roster store for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryRosterStore {
    institutes: HashMap<InstituteId, Institute>,
    courses: HashMap<CourseId, Course>,
    students: HashMap<StudentId, Student>,
    enquiries: HashMap<EnquiryId, Enquiry>,
    announcements: Vec<Announcement>,
}

impl InMemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RosterStore for InMemoryRosterStore {
    fn get_institute(&self, id: InstituteId) -> Result<Option<Institute>> {
        Ok(self.institutes.get(&id).cloned())
    }

    fn get_course(&self, id: CourseId) -> Result<Option<Course>> {
        Ok(self.courses.get(&id).cloned())
    }

    fn get_student(&self, id: StudentId) -> Result<Option<Student>> {
        Ok(self.students.get(&id).cloned())
    }

    fn get_enquiry(&self, id: EnquiryId) -> Result<Option<Enquiry>> {
        Ok(self.enquiries.get(&id).cloned())
    }

    fn find_student_by_email(&self, email: &str) -> Result<Option<Student>> {
        Ok(self
            .students
            .values()
            .find(|s| s.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn find_enrolled_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        scope: &QueryScope,
    ) -> Result<Vec<Student>> {
        let mut matched: Vec<Student> = self
            .students
            .values()
            .filter(|s| {
                s.enrollment_date >= start
                    && s.enrollment_date <= end
                    && scope.permits(s.institute_id)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.enrollment_date
                .cmp(&b.enrollment_date)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(matched)
    }

    fn insert_institute(&mut self, institute: Institute) -> Result<()> {
        self.institutes.insert(institute.id, institute);
        Ok(())
    }

    fn insert_course(&mut self, course: Course) -> Result<()> {
        course.validate()?;
        self.courses.insert(course.id, course);
        Ok(())
    }

    fn insert_student(&mut self, student: Student) -> Result<()> {
        self.students.insert(student.id, student);
        Ok(())
    }

    fn update_student(&mut self, student: Student) -> Result<()> {
        match self.students.get_mut(&student.id) {
            Some(existing) => {
                *existing = student;
                Ok(())
            }
            None => Err(LedgerError::StudentNotFound { id: student.id }),
        }
    }

    fn insert_enquiry(&mut self, enquiry: Enquiry) -> Result<()> {
        self.enquiries.insert(enquiry.id, enquiry);
        Ok(())
    }

    fn mark_enquiry_converted(
        &mut self,
        id: EnquiryId,
        converted_on: DateTime<Utc>,
    ) -> Result<()> {
        match self.enquiries.get_mut(&id) {
            Some(enquiry) => {
                enquiry.converted = true;
                enquiry.converted_on = Some(converted_on);
                Ok(())
            }
            None => Err(LedgerError::EnquiryNotFound { id }),
        }
    }

    fn purge_enquiries_before(&mut self, cutoff: NaiveDate) -> Result<u32> {
        let before = self.enquiries.len();
        self.enquiries.retain(|_, e| {
            e.converted || e.enquiry_date.map_or(true, |d| d >= cutoff)
        });
        Ok((before - self.enquiries.len()) as u32)
    }

    fn insert_announcement(&mut self, announcement: Announcement) -> Result<()> {
        self.announcements.push(announcement);
        Ok(())
    }

    fn list_announcements(&self) -> Result<Vec<Announcement>> {
        let mut list = self.announcements.clone();
        list.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(list)
    }
}
