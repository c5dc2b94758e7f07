use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    AGENT_COLS, COURSE_COLS, REFERRAL_SETTINGS_COLS, TRANSACTION_COLS, USER_COLS, query_all,
    query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Users ============

/// Create a user.
pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO users (id, name, email, referred_by, first_purchase_reward_given, first_purchase_reward_amount, wallet_balance, purchased_courses, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, NULL, 0, '[]', ?5, ?6)",
        params![&id, &input.name, &email, &input.referred_by, now, now],
    )?;

    Ok(User {
        id,
        name: input.name.clone(),
        email,
        referred_by: input.referred_by.clone(),
        first_purchase_reward_given: false,
        first_purchase_reward_amount: None,
        wallet_balance: 0,
        purchased_courses: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email],
    )
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    query_all(
        conn,
        &format!("SELECT {} FROM users ORDER BY created_at", USER_COLS),
        &[],
    )
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

/// Replace a user's purchase array wholesale. Only the migration rewrite is
/// allowed to touch existing elements, so this is its dedicated write path.
pub fn set_purchased_courses(
    conn: &Connection,
    user_id: &str,
    entries: &[PurchaseEntry],
) -> Result<()> {
    let json = serde_json::to_string(entries)?;
    conn.execute(
        "UPDATE users SET purchased_courses = ?2, updated_at = ?3 WHERE id = ?1",
        params![user_id, json, now()],
    )?;
    Ok(())
}

/// Append one entry to a user's purchase array in place. Stored elements,
/// legacy shapes included, are left untouched.
pub fn push_purchase(conn: &Connection, user_id: &str, entry: &PurchaseEntry) -> Result<()> {
    let entry_json = serde_json::to_string(entry)?;
    conn.execute(
        "UPDATE users SET purchased_courses = json_insert(purchased_courses, '$[#]', json(?2)), updated_at = ?3
         WHERE id = ?1",
        params![user_id, entry_json, now()],
    )?;
    Ok(())
}

/// Add to a user's cashback wallet. Returns false when the user id does not
/// resolve (a dangling referred_by reference).
pub fn credit_wallet(conn: &Connection, user_id: &str, amount: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET wallet_balance = wallet_balance + ?2, updated_at = ?3 WHERE id = ?1",
        params![user_id, amount, now()],
    )?;
    Ok(affected > 0)
}

/// Record that this user's first purchase has paid out its referral reward.
pub fn mark_first_purchase_rewarded(conn: &Connection, user_id: &str, amount: i64) -> Result<()> {
    conn.execute(
        "UPDATE users SET first_purchase_reward_given = 1, first_purchase_reward_amount = ?2, updated_at = ?3
         WHERE id = ?1",
        params![user_id, amount, now()],
    )?;
    Ok(())
}

/// Number of users referred by `referrer_id` whose first purchase has
/// already been rewarded. Compared against the policy cap before paying out.
pub fn count_rewarded_referrals(conn: &Connection, referrer_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE referred_by = ?1 AND first_purchase_reward_given = 1",
        params![referrer_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ============ Courses ============

/// Create a course.
pub fn create_course(conn: &Connection, input: &CreateCourse) -> Result<Course> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO courses (id, title, description, price, duration_days, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            &input.title,
            &input.description,
            input.price,
            input.duration_days,
            now,
            now
        ],
    )?;

    Ok(Course {
        id,
        title: input.title.clone(),
        description: input.description.clone(),
        price: input.price,
        duration_days: input.duration_days,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_course_by_id(conn: &Connection, id: &str) -> Result<Option<Course>> {
    query_one(
        conn,
        &format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLS),
        &[&id],
    )
}

pub fn list_courses(conn: &Connection) -> Result<Vec<Course>> {
    query_all(
        conn,
        &format!("SELECT {} FROM courses ORDER BY created_at", COURSE_COLS),
        &[],
    )
}

// ============ Enrollments ============

/// Add a user to a course's enrollment set. Returns false when the user was
/// already enrolled; the UNIQUE pair makes repeat grants a no-op.
pub fn try_enroll_user(conn: &Connection, course_id: &str, user_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO enrollments (id, course_id, user_id, enrolled_at) VALUES (?1, ?2, ?3, ?4)",
        params![gen_id(), course_id, user_id, now()],
    )?;
    Ok(affected > 0)
}

pub fn is_user_enrolled(conn: &Connection, course_id: &str, user_id: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM enrollments WHERE course_id = ?1 AND user_id = ?2",
            params![course_id, user_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    Ok(exists)
}

pub fn list_enrolled_users(conn: &Connection, course_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT user_id FROM enrollments WHERE course_id = ?1 ORDER BY enrolled_at")?;
    let rows = stmt
        .query_map(params![course_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ Agents ============

/// Create a sales agent.
pub fn create_agent(conn: &Connection, input: &CreateAgent) -> Result<Agent> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO agents (id, name, agent_code, total_sale, count_sale, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, 0, ?4, ?5)",
        params![&id, &input.name, &input.agent_code, now, now],
    )?;

    Ok(Agent {
        id,
        name: input.name.clone(),
        agent_code: input.agent_code.clone(),
        total_sale: 0,
        count_sale: 0,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_agent_by_id(conn: &Connection, id: &str) -> Result<Option<Agent>> {
    query_one(
        conn,
        &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLS),
        &[&id],
    )
}

pub fn get_agent_by_code(conn: &Connection, agent_code: &str) -> Result<Option<Agent>> {
    query_one(
        conn,
        &format!("SELECT {} FROM agents WHERE agent_code = ?1", AGENT_COLS),
        &[&agent_code],
    )
}

pub fn list_agents(conn: &Connection) -> Result<Vec<Agent>> {
    query_all(
        conn,
        &format!("SELECT {} FROM agents ORDER BY created_at", AGENT_COLS),
        &[],
    )
}

/// Credit a settled sale to the agent owning `agent_code`. Returns false
/// when no agent carries the code; settlement treats that as a no-op.
pub fn record_agent_sale(conn: &Connection, agent_code: &str, amount: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE agents SET total_sale = total_sale + ?2, count_sale = count_sale + 1, updated_at = ?3
         WHERE agent_code = ?1",
        params![agent_code, amount, now()],
    )?;
    Ok(affected > 0)
}

// ============ Referral Settings ============

pub fn get_referral_settings(conn: &Connection) -> Result<Option<ReferralSettings>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM referral_settings WHERE id = 1",
            REFERRAL_SETTINGS_COLS
        ),
        &[],
    )
}

/// Write the reward policy (insert or update the singleton row).
pub fn upsert_referral_settings(
    conn: &Connection,
    input: &UpsertReferralSettings,
) -> Result<ReferralSettings> {
    let now = now();
    conn.execute(
        "INSERT INTO referral_settings (id, cashback_amount, max_referrals, updated_at)
         VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET cashback_amount = excluded.cashback_amount, max_referrals = excluded.max_referrals, updated_at = excluded.updated_at",
        params![input.cashback_amount, input.max_referrals, now],
    )?;

    Ok(ReferralSettings {
        cashback_amount: input.cashback_amount,
        max_referrals: input.max_referrals,
        updated_at: now,
    })
}

// ============ Transactions ============

/// Open a pending transaction for a gateway order.
pub fn create_transaction(conn: &Connection, input: &CreateTransaction) -> Result<Transaction> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO transactions (id, order_id, payment_id, signature, user_id, course_id, amount, status, agent_ref_code, created_at, updated_at)
         VALUES (?1, ?2, NULL, NULL, ?3, ?4, ?5, 'pending', ?6, ?7, ?8)",
        params![
            &id,
            &input.order_id,
            &input.user_id,
            &input.course_id,
            input.amount,
            &input.agent_ref_code,
            now,
            now
        ],
    )?;

    Ok(Transaction {
        id,
        order_id: input.order_id.clone(),
        payment_id: None,
        signature: None,
        user_id: input.user_id.clone(),
        course_id: input.course_id.clone(),
        amount: input.amount,
        status: TransactionStatus::Pending,
        agent_ref_code: input.agent_ref_code.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn get_transaction_by_order_id(
    conn: &Connection,
    order_id: &str,
) -> Result<Option<Transaction>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE order_id = ?1",
            TRANSACTION_COLS
        ),
        &[&order_id],
    )
}

/// Flip the pending transaction for `order_id` to success, recording the
/// gateway payment id and verified signature.
///
/// The status guard in the WHERE clause makes settlement first-wins: exactly
/// one caller ever gets the row back. Later calls see None, whether the
/// order is unknown or already settled.
pub fn try_settle_transaction(
    conn: &Connection,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<Option<Transaction>> {
    let ts = now();
    query_one(
        conn,
        &format!(
            "UPDATE transactions SET status = 'success', payment_id = ?2, signature = ?3, updated_at = ?4
             WHERE order_id = ?1 AND status = 'pending'
             RETURNING {}",
            TRANSACTION_COLS
        ),
        &[&order_id, &payment_id, &signature, &ts],
    )
}

// ============ Purchase Expiry ============

/// Flag purchase entries whose access window has lapsed. Returns the number
/// of entries flipped. Legacy elements carry no expiry and are skipped.
pub fn expire_due_purchases(conn: &Connection, now_ts: i64) -> Result<usize> {
    let users = list_users(conn)?;
    let mut flipped = 0;

    for user in users {
        let mut records = user.purchased_courses;
        let mut changed = 0;
        for record in &mut records {
            if let PurchaseRecord::Entry(entry) = record
                && entry.is_due(now_ts)
            {
                entry.is_expired = true;
                changed += 1;
            }
        }
        if changed > 0 {
            let json = serde_json::to_string(&records)?;
            conn.execute(
                "UPDATE users SET purchased_courses = ?2, updated_at = ?3 WHERE id = ?1",
                params![&user.id, json, now()],
            )?;
            flipped += changed;
        }
    }

    Ok(flipped)
}
