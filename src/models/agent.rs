use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};

/// A sales agent credited with commissions on referred purchases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    /// Code customers enter at checkout, unique across agents.
    pub agent_code: String,
    /// Lifetime settled amount in paise.
    pub total_sale: i64,
    /// Number of settled sales.
    pub count_sale: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateAgent {
    pub name: String,
    pub agent_code: String,
}

impl CreateAgent {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        if self.agent_code.trim().is_empty() {
            return Err(AppError::BadRequest(msg::AGENT_CODE_EMPTY.into()));
        }
        Ok(())
    }
}
