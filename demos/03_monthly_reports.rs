/// monthly reports - period summary, delinquency and student statements
use fee_ledger_rs::{
    AllocationEngine, EventStore, InMemoryLedgerStore, InMemoryRosterStore, LedgerConfig, Money,
    PaymentRequest, QueryScope, ReconciliationReporter, RosterStore, SafeTimeProvider, TimeSource,
    Uuid,
};
use fee_ledger_rs::roster::{Course, Institute, Student};
use chrono::{Duration, NaiveDate, TimeZone, Utc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== monthly reports example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut roster = InMemoryRosterStore::new();
    let mut ledger = InMemoryLedgerStore::new();
    let mut events = EventStore::new();
    let scope = QueryScope::unrestricted();

    let institute_id = Uuid::new_v4();
    let course_id = Uuid::new_v4();
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

    // two students on the same course, enrolled new year's day
    let payer = add_student(&mut roster, institute_id, course_id, "Asha", &time)?;
    let absentee = add_student(&mut roster, institute_id, course_id, "Ravi", &time)?;

    // asha pays every month; ravi never shows up
    let engine = AllocationEngine::new(LedgerConfig::direct())?;
    for _ in 0..3 {
        engine.allocate(
            &PaymentRequest {
                student_id: payer,
                course_id,
                amount: Money::from_major(1_000),
                payment_date: time.now().date_naive(),
                method: "cash".to_string(),
            },
            &scope,
            &mut roster,
            &mut ledger,
            &time,
            &mut events,
        )?;
        controller.advance(Duration::days(31));
    }
    println!("today is {}", time.now().format("%Y-%m-%d"));

    let reporter = ReconciliationReporter::new(LedgerConfig::direct())?;

    // everything collected in the first quarter
    let summary = reporter.period_summary(
        Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
        &scope,
        &roster,
        &ledger,
        &time,
    )?;
    println!("\nperiod summary 2024-01-01 .. 2024-03-31:");
    println!("{}", summary.to_json_pretty()?);

    // who still owes fees for march
    let delinquency = reporter.month_delinquency("2024-03", &scope, &roster, &ledger)?;
    println!("\ndelinquency report for 2024-03:");
    for entry in &delinquency.students {
        println!(
            "  {} owes {} ({} months billed, {} paid)",
            entry.name, entry.pending, entry.months_billed, entry.paid_to_date
        );
    }
    println!("total pending: {}", delinquency.total_pending);

    // one student's position, month by month
    let statement = reporter.student_statement(
        absentee,
        &scope,
        &roster,
        &ledger,
        time.now().date_naive(),
    )?;
    println!("\nstatement for {}:", statement.name);
    for month in &statement.months {
        println!(
            "  {}: fee {}, paid {}, pending {}",
            month.month, month.monthly_fee, month.amount_paid, month.pending
        );
    }
    println!("total pending: {}", statement.total_pending);

    Ok(())
}

fn add_student(
    roster: &mut InMemoryRosterStore,
    institute_id: Uuid,
    course_id: Uuid,
    name: &str,
    time: &SafeTimeProvider,
) -> Result<Uuid, Box<dyn std::error::Error>> {
    let id = Uuid::new_v4();
    roster.insert_student(Student {
        id,
        institute_id,
        course_id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
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
    Ok(id)
}
