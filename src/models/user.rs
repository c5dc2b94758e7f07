use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};
use crate::models::course::{DEFAULT_ACCESS_DAYS, SECONDS_PER_DAY};

/// Basic email format validation.
///
/// Intentionally permissive: exactly one @, non-empty local part, domain with
/// at least one dot. Not meant to be RFC 5322 compliant.
fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    let local_part = parts[0];
    let domain_part = parts[1];

    if local_part.is_empty() || local_part.contains(' ') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.is_empty()
        || !domain_part.contains('.')
        || domain_part.starts_with('.')
        || domain_part.ends_with('.')
    {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

/// A marketplace user (course purchaser, possibly referred by another user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Id of the user who referred this one, set at signup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
    /// Set once the referrer has been paid out for this user's first purchase.
    pub first_purchase_reward_given: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_purchase_reward_amount: Option<i64>,
    /// Referral cashback balance in paise.
    pub wallet_balance: i64,
    pub purchased_courses: Vec<PurchaseRecord>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub referred_by: Option<String>,
}

impl CreateUser {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        Ok(())
    }
}

/// One element of a user's purchased-courses array.
///
/// The array predates the current entry shape: the oldest records hold bare
/// course ids, slightly newer ones hold partial objects, current ones hold
/// the full entry. All shapes deserialize here and are preserved as stored
/// until a grant triggers the migration rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PurchaseRecord {
    Legacy(String),
    Entry(PurchaseEntry),
}

impl PurchaseRecord {
    /// Bare ids and objects without a course reference are pre-migration
    /// shapes; any one of them forces a full-array rewrite on the next grant.
    pub fn needs_migration(&self) -> bool {
        match self {
            PurchaseRecord::Legacy(_) => true,
            PurchaseRecord::Entry(entry) => entry.course.is_none(),
        }
    }

    /// A countable purchase: new-shape entry with both course and expiry set.
    pub fn is_valid(&self) -> bool {
        match self {
            PurchaseRecord::Legacy(_) => false,
            PurchaseRecord::Entry(entry) => entry.is_valid(),
        }
    }
}

/// Fully-shaped purchase entry. Field names match the stored JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default)]
    pub is_expired: bool,
}

impl PurchaseEntry {
    pub fn new(course_id: &str, purchased_at: i64, expires_at: i64) -> Self {
        Self {
            course: Some(course_id.to_string()),
            purchase_date: Some(purchased_at),
            expiry_date: Some(expires_at),
            is_expired: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.course.is_some() && self.expiry_date.is_some()
    }

    /// Access window has lapsed but the entry has not been flagged yet.
    pub fn is_due(&self, now: i64) -> bool {
        !self.is_expired && self.expiry_date.is_some_and(|e| e <= now)
    }
}

/// Number of entries that count as real purchases. Zero means the next
/// settled payment is this user's first purchase.
pub fn valid_purchase_count(records: &[PurchaseRecord]) -> usize {
    records.iter().filter(|r| r.is_valid()).count()
}

/// Rewrite a mixed-shape purchase array into uniform entries.
///
/// Bare course ids become full entries anchored at `now`, with the expiry
/// taken from the course duration via `duration_days` (falling back to
/// [`DEFAULT_ACCESS_DAYS`] when the course cannot be resolved). Objects that
/// reference no course are dropped. Entries already carrying a course pass
/// through unchanged, even when partially filled.
pub fn normalize_purchases<F>(
    records: &[PurchaseRecord],
    now: i64,
    mut duration_days: F,
) -> Vec<PurchaseEntry>
where
    F: FnMut(&str) -> Option<i64>,
{
    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        match record {
            PurchaseRecord::Legacy(course_id) => {
                let days = duration_days(course_id).unwrap_or(DEFAULT_ACCESS_DAYS);
                entries.push(PurchaseEntry::new(course_id, now, now + days * SECONDS_PER_DAY));
            }
            PurchaseRecord::Entry(entry) if entry.course.is_some() => {
                entries.push(entry.clone());
            }
            PurchaseRecord::Entry(_) => {
                tracing::warn!("Dropping purchase entry without course reference");
            }
        }
    }
    entries
}
