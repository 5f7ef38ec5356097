use chrono::{Months, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::LedgerEntry;
use crate::roster::Student;
use crate::store::{LedgerStore, RosterStore};
use crate::types::{CourseId, EnquiryId, InstituteId, QueryScope};

/// intake form for a new enrollment
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub institute_id: InstituteId,
    pub course_id: CourseId,
    pub enrollment_date: NaiveDate,
    pub guardian_name: Option<String>,
    pub mobile: Option<String>,
    pub guardian_mobile: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub image_url: Option<String>,
}

/// admits students onto the roster, directly or out of an enquiry
///
/// enrollment books the course's admission fee as a settled cash entry in
/// the same step, so the ledger carries every rupee the institute collected
/// from day one.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrollmentEngine;

impl EnrollmentEngine {
    /// enquiries older than this are eligible for the purge job
    const ENQUIRY_RETENTION_MONTHS: u32 = 6;

    pub fn new() -> Self {
        Self
    }

    pub fn enroll<R, L>(
        &self,
        new: NewStudent,
        scope: &QueryScope,
        roster: &mut R,
        ledger: &mut L,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Student>
    where
        R: RosterStore,
        L: LedgerStore,
    {
        if new.name.trim().is_empty() {
            return Err(LedgerError::Validation {
                field: "name",
                message: "student name is required".to_string(),
            });
        }
        if new.email.trim().is_empty() {
            return Err(LedgerError::Validation {
                field: "email",
                message: "student email is required".to_string(),
            });
        }
        if !scope.permits(new.institute_id) {
            return Err(LedgerError::Validation {
                field: "institute_id",
                message: "institute is outside the caller's scope".to_string(),
            });
        }
        roster
            .get_institute(new.institute_id)?
            .ok_or(LedgerError::InstituteNotFound {
                id: new.institute_id,
            })?;
        let course = roster
            .get_course(new.course_id)?
            .ok_or(LedgerError::CourseNotFound { id: new.course_id })?;
        if course.institute_id != new.institute_id {
            return Err(LedgerError::Validation {
                field: "course_id",
                message: "course belongs to a different institute".to_string(),
            });
        }
        if roster.find_student_by_email(&new.email)?.is_some() {
            return Err(LedgerError::Validation {
                field: "email",
                message: format!("a student with email {} already exists", new.email),
            });
        }

        let student = Student {
            id: Uuid::new_v4(),
            institute_id: new.institute_id,
            course_id: new.course_id,
            name: new.name,
            email: new.email,
            enrollment_date: new.enrollment_date,
            guardian_name: new.guardian_name,
            mobile: new.mobile,
            guardian_mobile: new.guardian_mobile,
            address: new.address,
            date_of_birth: new.date_of_birth,
            image_url: new.image_url,
            credit_balance: Money::ZERO,
            created_at: time.now(),
        };
        roster.insert_student(student.clone())?;
        info!(
            "enrolled {} into course {} effective {}",
            student.id, student.course_id, student.enrollment_date
        );
        events.emit(Event::StudentEnrolled {
            student_id: student.id,
            institute_id: student.institute_id,
            course_id: student.course_id,
            enrollment_date: student.enrollment_date,
            timestamp: time.now(),
        });

        if course.admission_fee.is_positive() {
            let entry = LedgerEntry::admission(
                student.id,
                course.id,
                course.admission_fee,
                time.now().date_naive(),
                time,
            );
            ledger.insert(entry)?;
            events.emit(Event::AdmissionFeeCharged {
                student_id: student.id,
                amount: course.admission_fee,
                timestamp: time.now(),
            });
        } else {
            debug!("course {} has no admission fee, skipping charge", course.id);
        }

        Ok(student)
    }

    /// turn an enquiry into an enrollment, effective today; each enquiry
    /// converts at most once
    pub fn convert_enquiry<R, L>(
        &self,
        enquiry_id: EnquiryId,
        scope: &QueryScope,
        roster: &mut R,
        ledger: &mut L,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Student>
    where
        R: RosterStore,
        L: LedgerStore,
    {
        let enquiry = roster
            .get_enquiry(enquiry_id)?
            .filter(|e| scope.permits(e.institute_id))
            .ok_or(LedgerError::EnquiryNotFound { id: enquiry_id })?;
        if enquiry.converted {
            return Err(LedgerError::EnquiryAlreadyConverted { id: enquiry_id });
        }

        let new = NewStudent {
            name: enquiry.name,
            email: enquiry.email,
            institute_id: enquiry.institute_id,
            course_id: enquiry.course_id,
            enrollment_date: time.now().date_naive(),
            guardian_name: enquiry.guardian_name,
            mobile: enquiry.mobile,
            guardian_mobile: enquiry.guardian_mobile,
            address: enquiry.address,
            date_of_birth: enquiry.date_of_birth,
            image_url: enquiry.image_url,
        };
        let student = self.enroll(new, scope, roster, ledger, time, events)?;

        roster.mark_enquiry_converted(enquiry_id, time.now())?;
        events.emit(Event::EnquiryConverted {
            enquiry_id,
            student_id: student.id,
            timestamp: time.now(),
        });
        Ok(student)
    }

    /// drop unconverted enquiries that went stale; returns how many left
    pub fn purge_old_enquiries<R>(
        &self,
        roster: &mut R,
        time: &SafeTimeProvider,
    ) -> Result<u32>
    where
        R: RosterStore,
    {
        let cutoff = time.now().date_naive() - Months::new(Self::ENQUIRY_RETENTION_MONTHS);
        let purged = roster.purge_enquiries_before(cutoff)?;
        if purged > 0 {
            info!("purged {} enquiries older than {}", purged, cutoff);
        }
        Ok(purged)
    }
}
