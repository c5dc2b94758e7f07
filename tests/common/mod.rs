//! Test utilities and fixtures for Coursepay integration tests

#![allow(dead_code)]

use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

// Re-export the main library crate
pub use coursepay::db::{AppState, init_db, queries};
pub use coursepay::handlers;
pub use coursepay::models::*;
pub use coursepay::payments::RazorpayClient;

/// Key secret used by the test Razorpay client. Tests that sign payloads
/// must HMAC with this value.
pub const TEST_KEY_SECRET: &str = "test_razorpay_secret";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an AppState for testing with an in-memory database
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        razorpay: RazorpayClient::new("rzp_test_key", TEST_KEY_SECRET),
    }
}

/// Create a Router with the payment endpoints
pub fn payments_app(state: AppState) -> Router {
    handlers::payments::router().with_state(state)
}

/// Create a Router with the admin endpoints
pub fn admin_app(state: AppState) -> Router {
    handlers::admin::router().with_state(state)
}

/// Create a test user with no referrer
pub fn create_test_user(conn: &Connection, email: &str) -> User {
    let input = CreateUser {
        name: format!("Test User {}", email),
        email: email.to_string(),
        referred_by: None,
    };
    queries::create_user(conn, &input).expect("Failed to create test user")
}

/// Create a test user referred by an existing user
pub fn create_test_referred_user(conn: &Connection, email: &str, referrer_id: &str) -> User {
    let input = CreateUser {
        name: format!("Test User {}", email),
        email: email.to_string(),
        referred_by: Some(referrer_id.to_string()),
    };
    queries::create_user(conn, &input).expect("Failed to create test user")
}

/// Create a test course
pub fn create_test_course(
    conn: &Connection,
    title: &str,
    price: i64,
    duration_days: i64,
) -> Course {
    let input = CreateCourse {
        title: title.to_string(),
        description: None,
        price,
        duration_days,
    };
    queries::create_course(conn, &input).expect("Failed to create test course")
}

/// Create a test sales agent
pub fn create_test_agent(conn: &Connection, agent_code: &str) -> Agent {
    let input = CreateAgent {
        name: format!("Test Agent {}", agent_code),
        agent_code: agent_code.to_string(),
    };
    queries::create_agent(conn, &input).expect("Failed to create test agent")
}

/// Set the referral reward settings (cashback in paise, 0 max = unlimited)
pub fn set_referral_settings(
    conn: &Connection,
    cashback_amount: i64,
    max_referrals: i64,
) -> ReferralSettings {
    let input = UpsertReferralSettings {
        cashback_amount,
        max_referrals,
    };
    queries::upsert_referral_settings(conn, &input).expect("Failed to set referral settings")
}

/// Create a pending transaction for an order, as order creation would
pub fn create_pending_transaction(
    conn: &Connection,
    order_id: &str,
    user_id: &str,
    course_id: &str,
    amount: i64,
    agent_ref_code: Option<&str>,
) -> Transaction {
    let input = CreateTransaction {
        order_id: order_id.to_string(),
        user_id: user_id.to_string(),
        course_id: course_id.to_string(),
        amount,
        agent_ref_code: agent_ref_code.map(|s| s.to_string()),
    };
    queries::create_transaction(conn, &input).expect("Failed to create test transaction")
}

/// Get the current timestamp
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Get a future timestamp (days from now)
pub fn future_timestamp(days: i64) -> i64 {
    now() + (days * 86400)
}

/// Get a past timestamp (days ago)
pub fn past_timestamp(days: i64) -> i64 {
    now() - (days * 86400)
}
