/// front desk approval - clerk collections wait for back-office approval
use fee_ledger_rs::{
    AllocationEngine, ApprovalEngine, EventStore, InMemoryLedgerStore, InMemoryRosterStore,
    LedgerConfig, LedgerStore, Money, PaymentRequest, PaymentStatus, QueryScope, RosterStore,
    SafeTimeProvider, TimeSource, Uuid,
};
use fee_ledger_rs::roster::{Course, Institute, Student};
use chrono::{NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== front desk approval example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 2, 10, 11, 0, 0).unwrap(),
    ));
    let mut roster = InMemoryRosterStore::new();
    let mut ledger = InMemoryLedgerStore::new();
    let mut events = EventStore::new();

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

    // the clerk works under an institute-bound scope and books pending rows
    let clerk_scope = QueryScope::institute(institute_id);
    let front_desk = AllocationEngine::new(LedgerConfig::front_desk())?;
    let outcome = front_desk.allocate(
        &PaymentRequest {
            student_id,
            course_id,
            amount: Money::from_major(2_000),
            payment_date: time.now().date_naive(),
            method: "upi".to_string(),
        },
        &clerk_scope,
        &mut roster,
        &mut ledger,
        &time,
        &mut events,
    )?;

    println!("clerk collected 2000:");
    for entry in &outcome.entries {
        println!("  {} {} {}", entry.month, entry.amount_paid, entry.status);
    }

    // pending rows do not hold the month, so a duplicate is still possible
    // until the back office approves
    let pending_ids: Vec<_> = ledger
        .all()
        .iter()
        .filter(|e| e.status == PaymentStatus::Pending)
        .map(|e| e.id)
        .collect();

    let approved = ApprovalEngine::new().approve(&pending_ids, &mut ledger, &time, &mut events)?;
    println!("\nback office approved {} entries:", approved);
    for entry in ledger.find_by_student(student_id)? {
        println!(
            "  {} {} {} (approved at {})",
            entry.month,
            entry.amount_paid,
            entry.status,
            entry.approved_at.map(|t| t.to_rfc3339()).unwrap_or_default()
        );
    }

    // a second charge for an approved month is now rejected
    let again = front_desk.allocate(
        &PaymentRequest {
            student_id,
            course_id,
            amount: Money::from_major(1_000),
            payment_date: time.now().date_naive(),
            method: "upi".to_string(),
        },
        &clerk_scope,
        &mut roster,
        &mut ledger,
        &time,
        &mut events,
    );
    println!("\nretry for the same month: {:?}", again.err());

    Ok(())
}
