mod from_row;
mod schema;
pub mod queries;

pub use from_row::{FromRow, query_all, query_one};
pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::RazorpayClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and the payment gateway client
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Razorpay REST client, also the signature verifier.
    pub razorpay: RazorpayClient,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
