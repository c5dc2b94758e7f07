use serde::{Deserialize, Serialize};

/// A payment order and its settlement state.
///
/// Created PENDING when a gateway order is opened; flipped to SUCCESS exactly
/// once when a verified payment for its order id arrives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Gateway order id, unique per transaction.
    pub order_id: String,
    /// Gateway payment id, recorded at settlement.
    pub payment_id: Option<String>,
    /// Verified payment signature, recorded at settlement.
    pub signature: Option<String>,
    pub user_id: String,
    pub course_id: String,
    /// Amount in paise.
    pub amount: i64,
    pub status: TransactionStatus,
    /// Sales-agent code captured at order time, if any.
    pub agent_ref_code: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data required to open a new pending transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransaction {
    pub order_id: String,
    pub user_id: String,
    pub course_id: String,
    pub amount: i64,
    pub agent_ref_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Success,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
