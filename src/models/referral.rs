use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};

/// Marketplace-wide referral reward policy. Stored as a single row; no
/// reward is ever issued while it is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralSettings {
    /// Amount credited to a referrer per rewarded first purchase, in paise.
    pub cashback_amount: i64,
    /// Rewarded referrals allowed per referrer. Zero means unlimited.
    pub max_referrals: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpsertReferralSettings {
    pub cashback_amount: i64,
    #[serde(default)]
    pub max_referrals: i64,
}

impl UpsertReferralSettings {
    pub fn validate(&self) -> Result<()> {
        if self.cashback_amount < 0 || self.max_referrals < 0 {
            return Err(AppError::BadRequest(msg::AMOUNT_NEGATIVE.into()));
        }
        Ok(())
    }
}
