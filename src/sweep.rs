//! Background task that flags course purchases whose access window has lapsed.

use std::time::Duration;

use chrono::Utc;

use crate::db::{AppState, queries};

/// Spawns a background task that periodically marks lapsed purchases as expired.
/// Runs hourly; nothing else writes the stored flag, so an entry read between
/// passes can still show `isExpired: false` after its window has lapsed.
pub fn spawn_expiry_sweep(state: AppState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(60 * 60); // 1 hour

        loop {
            tokio::time::sleep(interval).await;

            match state.db.get() {
                Ok(conn) => match queries::expire_due_purchases(&conn, Utc::now().timestamp()) {
                    Ok(count) => {
                        if count > 0 {
                            tracing::debug!("Marked {} purchases as expired", count);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to expire purchases: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to get db connection for expiry sweep: {}", e);
                }
            }
        }
    });

    tracing::info!("Purchase expiry sweep started (runs hourly)");
}
