pub mod agent;
pub mod course;
pub mod referral;
pub mod transaction;
pub mod user;

pub use agent::*;
pub use course::*;
pub use referral::*;
pub use transaction::*;
pub use user::*;
