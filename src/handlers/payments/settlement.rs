//! Post-verification settlement: everything that must happen exactly once
//! per paid order.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result, msg};
use crate::models::{
    PurchaseEntry, Transaction, User, normalize_purchases, valid_purchase_count,
};

use super::notice::PaymentAttempt;

/// What a settlement run did, for the post-commit log line.
#[derive(Debug)]
pub struct Settlement {
    pub transaction: Transaction,
    pub agent_credited: bool,
    pub reward_credited: bool,
    pub purchases_migrated: bool,
}

/// Apply all effects of a verified payment in one database transaction:
/// flip the pending transaction to success, credit the sales agent, settle
/// the referral reward, grant course access, enroll the user.
///
/// The status flip doubles as the claim: it runs first, and when another
/// request already settled this order nothing else happens. A later failure
/// (user or course row missing) rolls the whole batch back on drop, leaving
/// the transaction pending.
pub fn settle(
    conn: &mut Connection,
    attempt: &PaymentAttempt,
    signature: &str,
) -> Result<Settlement> {
    let tx = conn.transaction()?;

    let txn =
        queries::try_settle_transaction(&tx, &attempt.order_id, &attempt.payment_id, signature)?
            .ok_or(AppError::TransactionNotFound)?;

    let agent_credited = match &txn.agent_ref_code {
        Some(code) => {
            let credited = queries::record_agent_sale(&tx, code, txn.amount)?;
            if !credited {
                tracing::debug!("Unknown agent code {} on order {}", code, txn.order_id);
            }
            credited
        }
        None => false,
    };

    let user = queries::get_user_by_id(&tx, &txn.user_id)?
        .ok_or_else(|| AppError::NotFound(msg::USER_NOT_FOUND.into()))?;
    let course = queries::get_course_by_id(&tx, &txn.course_id)?
        .ok_or_else(|| AppError::NotFound(msg::COURSE_NOT_FOUND.into()))?;

    let reward_credited = settle_referral_reward(&tx, &user)?;

    let now = chrono::Utc::now().timestamp();
    let entry = PurchaseEntry::new(&course.id, now, course.access_expiry(now));

    // A single pre-migration element forces the full-array rewrite; the
    // common case appends in place and leaves stored entries alone.
    let purchases_migrated = user.purchased_courses.iter().any(|r| r.needs_migration());
    if purchases_migrated {
        let mut entries = normalize_purchases(&user.purchased_courses, now, |course_id| {
            queries::get_course_by_id(&tx, course_id)
                .ok()
                .flatten()
                .map(|c| c.duration_days)
        });
        entries.push(entry);
        queries::set_purchased_courses(&tx, &user.id, &entries)?;
    } else {
        queries::push_purchase(&tx, &user.id, &entry)?;
    }

    queries::try_enroll_user(&tx, &course.id, &user.id)?;

    tx.commit()?;

    Ok(Settlement {
        transaction: txn,
        agent_credited,
        reward_credited,
        purchases_migrated,
    })
}

/// Pay the referral reward when every policy gate passes: this is the
/// user's first valid purchase, a referrer is recorded, the reward has not
/// been paid before, policy settings exist, and the referrer has cap room.
///
/// The referrer wallet is credited before the purchaser is flagged.
fn settle_referral_reward(tx: &Connection, user: &User) -> Result<bool> {
    if user.first_purchase_reward_given {
        return Ok(false);
    }
    let Some(referrer_id) = &user.referred_by else {
        return Ok(false);
    };
    if valid_purchase_count(&user.purchased_courses) > 0 {
        return Ok(false);
    }
    let Some(settings) = queries::get_referral_settings(tx)? else {
        return Ok(false);
    };
    if settings.max_referrals != 0 {
        let rewarded = queries::count_rewarded_referrals(tx, referrer_id)?;
        if rewarded >= settings.max_referrals {
            tracing::debug!(
                "Referral cap reached for referrer {} ({}/{})",
                referrer_id,
                rewarded,
                settings.max_referrals
            );
            return Ok(false);
        }
    }

    if !queries::credit_wallet(tx, referrer_id, settings.cashback_amount)? {
        tracing::warn!("Referrer {} not found, wallet credit skipped", referrer_id);
    }
    queries::mark_first_purchase_rewarded(tx, &user.id, settings.cashback_amount)?;

    Ok(true)
}
