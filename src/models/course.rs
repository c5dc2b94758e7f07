use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};

pub const SECONDS_PER_DAY: i64 = 86400;

/// Access window granted when the course backing a legacy purchase record
/// can no longer be resolved.
pub const DEFAULT_ACCESS_DAYS: i64 = 365;

/// A purchasable course. Enrollment membership lives in its own table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in paise, charged as-is when an order is created.
    pub price: i64,
    /// Length of the access window granted on purchase, in days.
    pub duration_days: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Course {
    /// Epoch seconds at which access purchased at `purchased_at` lapses.
    pub fn access_expiry(&self, purchased_at: i64) -> i64 {
        purchased_at + self.duration_days * SECONDS_PER_DAY
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    pub duration_days: i64,
}

impl CreateCourse {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest(msg::TITLE_EMPTY.into()));
        }
        if self.price <= 0 {
            return Err(AppError::BadRequest(msg::PRICE_INVALID.into()));
        }
        if self.duration_days < 1 {
            return Err(AppError::BadRequest(msg::DURATION_INVALID.into()));
        }
        Ok(())
    }
}
