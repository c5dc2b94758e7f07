//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! This module provides a `FromRow` trait that models can implement to
//! define how they are constructed from database rows, plus helper functions
//! for common query patterns.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
///
/// This provides graceful error handling instead of panicking when database
/// contains invalid enum values (from corruption, migration errors, etc.).
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Parse a TEXT column holding JSON. An unreadable document surfaces as a
/// row error rather than being silently treated as empty.
fn parse_json<T: serde::de::DeserializeOwned>(row: &Row, col: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(col)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Trait for constructing a type from a database row.
///
/// Implementing this trait allows using the `query_one` and `query_all`
/// helper functions, reducing repetitive row mapping closures.
pub trait FromRow: Sized {
    /// Construct an instance from a database row.
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, name, email, referred_by, first_purchase_reward_given, first_purchase_reward_amount, wallet_balance, purchased_courses, created_at, updated_at";

pub const COURSE_COLS: &str = "id, title, description, price, duration_days, created_at, updated_at";

pub const TRANSACTION_COLS: &str = "id, order_id, payment_id, signature, user_id, course_id, amount, status, agent_ref_code, created_at, updated_at";

pub const AGENT_COLS: &str = "id, name, agent_code, total_sale, count_sale, created_at, updated_at";

pub const REFERRAL_SETTINGS_COLS: &str = "cashback_amount, max_referrals, updated_at";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            referred_by: row.get(3)?,
            first_purchase_reward_given: row.get::<_, i32>(4)? != 0,
            first_purchase_reward_amount: row.get(5)?,
            wallet_balance: row.get(6)?,
            purchased_courses: parse_json(row, 7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for Course {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Course {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            duration_days: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for Transaction {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Transaction {
            id: row.get(0)?,
            order_id: row.get(1)?,
            payment_id: row.get(2)?,
            signature: row.get(3)?,
            user_id: row.get(4)?,
            course_id: row.get(5)?,
            amount: row.get(6)?,
            status: parse_enum(row, 7, "status")?,
            agent_ref_code: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl FromRow for Agent {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Agent {
            id: row.get(0)?,
            name: row.get(1)?,
            agent_code: row.get(2)?,
            total_sale: row.get(3)?,
            count_sale: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for ReferralSettings {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ReferralSettings {
            cashback_amount: row.get(0)?,
            max_referrals: row.get(1)?,
            updated_at: row.get(2)?,
        })
    }
}
