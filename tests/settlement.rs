//! Settlement semantics: referral rewards, purchase-array migration,
//! enrollment, and agent commission, exercised directly against the
//! database without going through the HTTP layer.

mod common;

use common::*;
use coursepay::handlers::payments::{PaymentAttempt, settle};
use rusqlite::{Connection, params};

fn attempt(order_id: &str) -> PaymentAttempt {
    PaymentAttempt {
        order_id: order_id.to_string(),
        payment_id: "pay_settle".to_string(),
        signature: Some("sig_settle".to_string()),
    }
}

fn settle_order(conn: &mut Connection, order_id: &str) -> coursepay::handlers::payments::Settlement {
    settle(conn, &attempt(order_id), "sig_settle").expect("Settlement failed")
}

/// Overwrite a user's stored purchase array with raw JSON (for pre-migration shapes)
fn set_raw_purchases(conn: &Connection, user_id: &str, json: &str) {
    conn.execute(
        "UPDATE users SET purchased_courses = ?1 WHERE id = ?2",
        params![json, user_id],
    )
    .expect("Failed to set raw purchases");
}

// ============ Referral Reward Tests ============

#[test]
fn test_first_purchase_credits_referrer_wallet() {
    let mut conn = setup_test_db();
    set_referral_settings(&conn, 5000, 0);
    let referrer = create_test_user(&conn, "referrer@example.com");
    let buyer = create_test_referred_user(&conn, "buyer@example.com", &referrer.id);
    let course = create_test_course(&conn, "Course A", 10000, 30);
    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, course.price, None);

    let result = settle_order(&mut conn, "order_1");

    assert!(result.reward_credited);

    let referrer = queries::get_user_by_id(&conn, &referrer.id).unwrap().unwrap();
    assert_eq!(referrer.wallet_balance, 5000);

    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    assert!(buyer.first_purchase_reward_given);
    assert_eq!(buyer.first_purchase_reward_amount, Some(5000));
}

#[test]
fn test_reward_not_repeated_on_second_purchase() {
    let mut conn = setup_test_db();
    set_referral_settings(&conn, 5000, 0);
    let referrer = create_test_user(&conn, "referrer@example.com");
    let buyer = create_test_referred_user(&conn, "buyer@example.com", &referrer.id);
    let course_a = create_test_course(&conn, "Course A", 10000, 30);
    let course_b = create_test_course(&conn, "Course B", 20000, 30);
    create_pending_transaction(&conn, "order_1", &buyer.id, &course_a.id, 10000, None);
    create_pending_transaction(&conn, "order_2", &buyer.id, &course_b.id, 20000, None);

    let first = settle_order(&mut conn, "order_1");
    let second = settle_order(&mut conn, "order_2");

    assert!(first.reward_credited);
    assert!(!second.reward_credited);

    let referrer = queries::get_user_by_id(&conn, &referrer.id).unwrap().unwrap();
    assert_eq!(referrer.wallet_balance, 5000, "Reward must be paid exactly once");
}

#[test]
fn test_no_reward_without_referrer() {
    let mut conn = setup_test_db();
    set_referral_settings(&conn, 5000, 0);
    let buyer = create_test_user(&conn, "buyer@example.com");
    let course = create_test_course(&conn, "Course A", 10000, 30);
    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, None);

    let result = settle_order(&mut conn, "order_1");

    assert!(!result.reward_credited);
    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    assert!(!buyer.first_purchase_reward_given);
}

#[test]
fn test_no_reward_without_settings() {
    let mut conn = setup_test_db();
    let referrer = create_test_user(&conn, "referrer@example.com");
    let buyer = create_test_referred_user(&conn, "buyer@example.com", &referrer.id);
    let course = create_test_course(&conn, "Course A", 10000, 30);
    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, None);

    let result = settle_order(&mut conn, "order_1");

    assert!(!result.reward_credited);

    // The flag stays clear so nothing is recorded as paid
    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    assert!(!buyer.first_purchase_reward_given);
    let referrer = queries::get_user_by_id(&conn, &referrer.id).unwrap().unwrap();
    assert_eq!(referrer.wallet_balance, 0);
}

#[test]
fn test_reward_respects_referral_cap() {
    let mut conn = setup_test_db();
    set_referral_settings(&conn, 5000, 2);
    let referrer = create_test_user(&conn, "referrer@example.com");
    let course = create_test_course(&conn, "Course A", 10000, 30);

    for (i, email) in ["a@example.com", "b@example.com", "c@example.com"]
        .iter()
        .enumerate()
    {
        let buyer = create_test_referred_user(&conn, email, &referrer.id);
        create_pending_transaction(
            &conn,
            &format!("order_{}", i),
            &buyer.id,
            &course.id,
            10000,
            None,
        );
    }

    let first = settle_order(&mut conn, "order_0");
    let second = settle_order(&mut conn, "order_1");
    let third = settle_order(&mut conn, "order_2");

    assert!(first.reward_credited);
    assert!(second.reward_credited);
    assert!(!third.reward_credited, "Cap of 2 must block the third reward");

    let referrer = queries::get_user_by_id(&conn, &referrer.id).unwrap().unwrap();
    assert_eq!(referrer.wallet_balance, 10000);

    // The third buyer keeps a clear flag
    let third_buyer = queries::get_user_by_email(&conn, "c@example.com")
        .unwrap()
        .unwrap();
    assert!(!third_buyer.first_purchase_reward_given);
}

#[test]
fn test_cap_zero_means_unlimited() {
    let mut conn = setup_test_db();
    set_referral_settings(&conn, 1000, 0);
    let referrer = create_test_user(&conn, "referrer@example.com");
    let course = create_test_course(&conn, "Course A", 10000, 30);

    for (i, email) in ["a@example.com", "b@example.com", "c@example.com"]
        .iter()
        .enumerate()
    {
        let buyer = create_test_referred_user(&conn, email, &referrer.id);
        create_pending_transaction(
            &conn,
            &format!("order_{}", i),
            &buyer.id,
            &course.id,
            10000,
            None,
        );
    }

    for i in 0..3 {
        let result = settle_order(&mut conn, &format!("order_{}", i));
        assert!(result.reward_credited);
    }

    let referrer = queries::get_user_by_id(&conn, &referrer.id).unwrap().unwrap();
    assert_eq!(referrer.wallet_balance, 3000);
}

#[test]
fn test_prior_valid_purchase_blocks_reward() {
    let mut conn = setup_test_db();
    set_referral_settings(&conn, 5000, 0);
    let referrer = create_test_user(&conn, "referrer@example.com");
    let buyer = create_test_referred_user(&conn, "buyer@example.com", &referrer.id);
    let course = create_test_course(&conn, "Course A", 10000, 30);

    // The buyer already owns a countable purchase
    let existing = PurchaseEntry::new("some-other-course", past_timestamp(10), future_timestamp(20));
    queries::set_purchased_courses(&conn, &buyer.id, &[existing]).unwrap();

    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, None);
    let result = settle_order(&mut conn, "order_1");

    assert!(!result.reward_credited);
    let referrer = queries::get_user_by_id(&conn, &referrer.id).unwrap().unwrap();
    assert_eq!(referrer.wallet_balance, 0);
}

#[test]
fn test_legacy_records_do_not_block_first_purchase_reward() {
    let mut conn = setup_test_db();
    set_referral_settings(&conn, 5000, 0);
    let referrer = create_test_user(&conn, "referrer@example.com");
    let buyer = create_test_referred_user(&conn, "buyer@example.com", &referrer.id);
    let course = create_test_course(&conn, "Course A", 10000, 30);

    // Bare ids and courseless objects are not countable purchases
    set_raw_purchases(
        &conn,
        &buyer.id,
        r#"["ancient-course-id", {"isExpired": false}]"#,
    );

    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, None);
    let result = settle_order(&mut conn, "order_1");

    assert!(result.reward_credited, "Pre-migration records must not count");
    let referrer = queries::get_user_by_id(&conn, &referrer.id).unwrap().unwrap();
    assert_eq!(referrer.wallet_balance, 5000);
}

#[test]
fn test_vanished_referrer_does_not_fail_settlement() {
    let mut conn = setup_test_db();
    set_referral_settings(&conn, 5000, 0);
    // referred_by is a plain id; the row it names was never created
    let buyer = create_test_referred_user(&conn, "buyer@example.com", "user-long-gone");
    let course = create_test_course(&conn, "Course A", 10000, 30);
    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, None);

    let result = settle_order(&mut conn, "order_1");

    // The wallet credit finds no row; the purchase still settles and the
    // buyer is flagged so a retry cannot pay the reward twice
    assert!(result.reward_credited);
    assert!(queries::is_user_enrolled(&conn, &course.id, &buyer.id).unwrap());

    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    assert!(buyer.first_purchase_reward_given);
    assert_eq!(buyer.first_purchase_reward_amount, Some(5000));
    assert_eq!(buyer.wallet_balance, 0, "No wallet anywhere received the credit");
}

// ============ Purchase Migration Tests ============

#[test]
fn test_settlement_migrates_mixed_purchase_array() {
    let mut conn = setup_test_db();
    let buyer = create_test_user(&conn, "buyer@example.com");
    let old_course = create_test_course(&conn, "Old Course", 5000, 10);
    let new_course = create_test_course(&conn, "New Course", 10000, 30);

    let kept = format!(
        r#"["{}", {{"course": "kept-course", "purchaseDate": 1700000000, "expiryDate": 1710000000, "isExpired": true}}, {{"isExpired": false}}]"#,
        old_course.id
    );
    set_raw_purchases(&conn, &buyer.id, &kept);

    create_pending_transaction(&conn, "order_1", &buyer.id, &new_course.id, 10000, None);
    let before = now();
    let result = settle_order(&mut conn, "order_1");

    assert!(result.purchases_migrated);

    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    // legacy id resolved + complete entry kept + new purchase; courseless object dropped
    assert_eq!(buyer.purchased_courses.len(), 3);

    let entries: Vec<&PurchaseEntry> = buyer
        .purchased_courses
        .iter()
        .map(|r| match r {
            PurchaseRecord::Entry(e) => e,
            PurchaseRecord::Legacy(id) => panic!("Bare id {} survived migration", id),
        })
        .collect();

    // Legacy id resolved against its course duration (10 days), anchored at settlement
    assert_eq!(entries[0].course.as_deref(), Some(old_course.id.as_str()));
    let purchased_at = entries[0].purchase_date.unwrap();
    assert!(purchased_at >= before && purchased_at <= now());
    assert_eq!(entries[0].expiry_date.unwrap() - purchased_at, 10 * 86400);

    // The complete entry passes through untouched
    assert_eq!(entries[1].course.as_deref(), Some("kept-course"));
    assert_eq!(entries[1].purchase_date, Some(1700000000));
    assert_eq!(entries[1].expiry_date, Some(1710000000));
    assert!(entries[1].is_expired);

    // The settled purchase lands last
    assert_eq!(entries[2].course.as_deref(), Some(new_course.id.as_str()));
    assert!(!entries[2].is_expired);
}

#[test]
fn test_migration_of_bare_ids_grows_array_by_one() {
    let mut conn = setup_test_db();
    let buyer = create_test_user(&conn, "buyer@example.com");
    let old_course = create_test_course(&conn, "Old Course", 5000, 10);
    let new_course = create_test_course(&conn, "New Course", 10000, 30);

    // Bare id plus one complete entry, nothing droppable
    let stored = format!(
        r#"["{}", {{"course": "kept-course", "purchaseDate": 1700000000, "expiryDate": 1710000000, "isExpired": false}}]"#,
        old_course.id
    );
    set_raw_purchases(&conn, &buyer.id, &stored);

    create_pending_transaction(&conn, "order_1", &buyer.id, &new_course.id, 10000, None);
    settle_order(&mut conn, "order_1");

    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    assert_eq!(buyer.purchased_courses.len(), 3);
    for record in &buyer.purchased_courses {
        match record {
            PurchaseRecord::Entry(e) => {
                assert!(e.course.is_some());
                assert!(e.purchase_date.is_some());
                assert!(e.expiry_date.is_some());
            }
            PurchaseRecord::Legacy(id) => panic!("Bare id {} survived migration", id),
        }
    }
}

#[test]
fn test_migration_defaults_unknown_course_to_a_year() {
    let mut conn = setup_test_db();
    let buyer = create_test_user(&conn, "buyer@example.com");
    let course = create_test_course(&conn, "Course A", 10000, 30);

    set_raw_purchases(&conn, &buyer.id, r#"["deleted-course-id"]"#);

    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, None);
    settle_order(&mut conn, "order_1");

    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    let migrated = match &buyer.purchased_courses[0] {
        PurchaseRecord::Entry(e) => e,
        PurchaseRecord::Legacy(id) => panic!("Bare id {} survived migration", id),
    };
    assert_eq!(migrated.course.as_deref(), Some("deleted-course-id"));
    assert_eq!(
        migrated.expiry_date.unwrap() - migrated.purchase_date.unwrap(),
        365 * 86400
    );
}

#[test]
fn test_clean_array_appends_without_rewrite() {
    let mut conn = setup_test_db();
    let buyer = create_test_user(&conn, "buyer@example.com");
    let course = create_test_course(&conn, "Course A", 10000, 30);

    let existing = PurchaseEntry::new("earlier-course", 1700000000, 1702000000);
    queries::set_purchased_courses(&conn, &buyer.id, &[existing]).unwrap();

    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, None);
    let result = settle_order(&mut conn, "order_1");

    assert!(!result.purchases_migrated);

    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    assert_eq!(buyer.purchased_courses.len(), 2);
    let first = match &buyer.purchased_courses[0] {
        PurchaseRecord::Entry(e) => e,
        PurchaseRecord::Legacy(id) => panic!("Unexpected bare id {}", id),
    };
    assert_eq!(first.course.as_deref(), Some("earlier-course"));
    assert_eq!(first.purchase_date, Some(1700000000));
    assert_eq!(first.expiry_date, Some(1702000000));
}

// ============ Enrollment Tests ============

#[test]
fn test_repeat_purchase_does_not_duplicate_enrollment() {
    let mut conn = setup_test_db();
    let buyer = create_test_user(&conn, "buyer@example.com");
    let course = create_test_course(&conn, "Course A", 10000, 30);
    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, None);
    create_pending_transaction(&conn, "order_2", &buyer.id, &course.id, 10000, None);

    settle_order(&mut conn, "order_1");
    settle_order(&mut conn, "order_2");

    let enrolled = queries::list_enrolled_users(&conn, &course.id).unwrap();
    assert_eq!(enrolled, vec![buyer.id.clone()]);

    // Both settlements still granted an access window
    let buyer = queries::get_user_by_id(&conn, &buyer.id).unwrap().unwrap();
    assert_eq!(buyer.purchased_courses.len(), 2);
}

// ============ Agent Commission Tests ============

#[test]
fn test_agent_commission_accumulates_across_orders() {
    let mut conn = setup_test_db();
    let agent = create_test_agent(&conn, "AGENT7");
    let course = create_test_course(&conn, "Course A", 10000, 30);
    let buyer_a = create_test_user(&conn, "a@example.com");
    let buyer_b = create_test_user(&conn, "b@example.com");
    create_pending_transaction(&conn, "order_1", &buyer_a.id, &course.id, 10000, Some("AGENT7"));
    create_pending_transaction(&conn, "order_2", &buyer_b.id, &course.id, 25000, Some("AGENT7"));

    let first = settle_order(&mut conn, "order_1");
    let second = settle_order(&mut conn, "order_2");
    assert!(first.agent_credited);
    assert!(second.agent_credited);

    let agent = queries::get_agent_by_id(&conn, &agent.id).unwrap().unwrap();
    assert_eq!(agent.total_sale, 35000);
    assert_eq!(agent.count_sale, 2);
}

#[test]
fn test_unknown_agent_code_does_not_fail_settlement() {
    let mut conn = setup_test_db();
    let buyer = create_test_user(&conn, "buyer@example.com");
    let course = create_test_course(&conn, "Course A", 10000, 30);
    create_pending_transaction(&conn, "order_1", &buyer.id, &course.id, 10000, Some("GHOST"));

    let result = settle_order(&mut conn, "order_1");

    assert!(!result.agent_credited);
    let txn = queries::get_transaction_by_order_id(&conn, "order_1")
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Success);
}

// ============ Atomicity Tests ============

#[test]
fn test_settlement_rolls_back_when_course_missing() {
    let mut conn = setup_test_db();
    let buyer = create_test_user(&conn, "buyer@example.com");
    // Transaction references a course row that does not exist
    create_pending_transaction(&conn, "order_1", &buyer.id, "no-such-course", 10000, None);

    let result = settle(&mut conn, &attempt("order_1"), "sig_settle");
    assert!(result.is_err());

    // The claim was rolled back, so the order can be settled after repair
    let txn = queries::get_transaction_by_order_id(&conn, "order_1")
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Pending);
    assert!(txn.payment_id.is_none());
}

#[test]
fn test_settlement_rolls_back_agent_credit_on_failure() {
    let mut conn = setup_test_db();
    let agent = create_test_agent(&conn, "AGENT7");
    let buyer = create_test_user(&conn, "buyer@example.com");
    create_pending_transaction(
        &conn,
        "order_1",
        &buyer.id,
        "no-such-course",
        10000,
        Some("AGENT7"),
    );

    let result = settle(&mut conn, &attempt("order_1"), "sig_settle");
    assert!(result.is_err());

    let agent = queries::get_agent_by_id(&conn, &agent.id).unwrap().unwrap();
    assert_eq!(agent.total_sale, 0);
    assert_eq!(agent.count_sale, 0);
}
