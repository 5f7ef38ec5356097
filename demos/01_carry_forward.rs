/// carry forward - overpayments become credit and top up later payments
use fee_ledger_rs::{
    AllocationEngine, EventStore, InMemoryLedgerStore, InMemoryRosterStore, LedgerConfig, Money,
    PaymentRequest, QueryScope, RosterStore, SafeTimeProvider, TimeSource, Uuid,
};
use fee_ledger_rs::roster::{Course, Institute, Student};
use chrono::{Duration, NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== carry forward example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut roster = InMemoryRosterStore::new();
    let mut ledger = InMemoryLedgerStore::new();
    let mut events = EventStore::new();
    let scope = QueryScope::unrestricted();

    // ten-month course at 10000 total, so the monthly fee is 1000
    let institute_id = Uuid::new_v4();
    let course_id = Uuid::new_v4();
    let student_id = Uuid::new_v4();
    roster.insert_institute(Institute {
        id: institute_id,
        name: "City Centre".to_string(),
        location: None,
    })?;
    roster.insert_course(Course {
        id: course_id,
        institute_id,
        name: "Data Structures".to_string(),
        duration_months: 10,
        total_fee: Money::from_major(10_000),
        admission_fee: Money::ZERO,
        image_url: None,
    })?;
    roster.insert_student(Student {
        id: student_id,
        institute_id,
        course_id,
        name: "Asha".to_string(),
        email: "asha@example.com".to_string(),
        enrollment_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        guardian_name: None,
        mobile: None,
        guardian_mobile: None,
        address: None,
        date_of_birth: None,
        image_url: None,
        credit_balance: Money::ZERO,
        created_at: time.now(),
    })?;

    let engine = AllocationEngine::new(LedgerConfig::direct())?;

    // pay 2500 on march 1st: covers march and april, carries 500
    let outcome = engine.allocate(
        &PaymentRequest {
            student_id,
            course_id,
            amount: Money::from_major(2_500),
            payment_date: time.now().date_naive(),
            method: "cash".to_string(),
        },
        &scope,
        &mut roster,
        &mut ledger,
        &time,
        &mut events,
    )?;
    print_outcome("payment 1: 2500 tendered", &outcome);
    print_credit(&roster, student_id)?;

    // two months later, 500 plus the carried 500 settles may in full
    controller.advance(Duration::days(61));
    println!("\nadvanced to {}", time.now().format("%Y-%m-%d"));
    let outcome = engine.allocate(
        &PaymentRequest {
            student_id,
            course_id,
            amount: Money::from_major(500),
            payment_date: time.now().date_naive(),
            method: "cash".to_string(),
        },
        &scope,
        &mut roster,
        &mut ledger,
        &time,
        &mut events,
    )?;
    print_outcome("payment 2: 500 tendered", &outcome);
    print_credit(&roster, student_id)?;

    println!("\nevents recorded:");
    for event in events.events() {
        println!("  {}", serde_json::to_string(event)?);
    }

    Ok(())
}

fn print_outcome(label: &str, outcome: &fee_ledger_rs::AllocationOutcome) {
    let months: Vec<String> = outcome.months().iter().map(|m| m.to_string()).collect();
    println!(
        "{}: allocated {} (credit used {}) across [{}], remainder {}",
        label,
        outcome.allocated,
        outcome.credit_used,
        months.join(", "),
        outcome.remainder
    );
}

fn print_credit(roster: &InMemoryRosterStore, student_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    let student = roster.get_student(student_id)?.unwrap();
    println!("credit balance is now {}", student.credit_balance);
    Ok(())
}
