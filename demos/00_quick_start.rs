/// quick start - minimal example to get started
use fee_ledger_rs::{
    AllocationEngine, EnrollmentEngine, EventStore, InMemoryLedgerStore, InMemoryRosterStore,
    LedgerConfig, Money, NewStudent, PaymentRequest, QueryScope, RosterStore, SafeTimeProvider,
    TimeSource, Uuid,
};
use fee_ledger_rs::roster::{Course, Institute};
use chrono::{NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    ));
    let mut roster = InMemoryRosterStore::new();
    let mut ledger = InMemoryLedgerStore::new();
    let mut events = EventStore::new();
    let scope = QueryScope::unrestricted();

    // set up one institute with a ten-month course
    let institute_id = Uuid::new_v4();
    let course_id = Uuid::new_v4();
    roster.insert_institute(Institute {
        id: institute_id,
        name: "City Centre".to_string(),
        location: Some("MG Road".to_string()),
    })?;
    roster.insert_course(Course {
        id: course_id,
        institute_id,
        name: "Data Structures".to_string(),
        duration_months: 10,
        total_fee: Money::from_major(10_000),
        admission_fee: Money::from_major(500),
        image_url: None,
    })?;

    // enroll a student; the admission fee is booked right away
    let student = EnrollmentEngine::new().enroll(
        NewStudent {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            institute_id,
            course_id,
            enrollment_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            guardian_name: None,
            mobile: None,
            guardian_mobile: None,
            address: None,
            date_of_birth: None,
            image_url: None,
        },
        &scope,
        &mut roster,
        &mut ledger,
        &time,
        &mut events,
    )?;
    println!("enrolled {} ({})", student.name, student.id);

    // take a payment covering the first month
    let engine = AllocationEngine::new(LedgerConfig::direct())?;
    let outcome = engine.allocate(
        &PaymentRequest {
            student_id: student.id,
            course_id,
            amount: Money::from_major(1_000),
            payment_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            method: "cash".to_string(),
        },
        &scope,
        &mut roster,
        &mut ledger,
        &time,
        &mut events,
    )?;

    let months: Vec<String> = outcome.months().iter().map(|m| m.to_string()).collect();
    println!("allocated {} across [{}]", outcome.allocated, months.join(", "));
    println!("ledger now holds {} entries", ledger.len());

    Ok(())
}
