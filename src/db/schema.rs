use rusqlite::Connection;

/// Initialize the database schema
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Users (purchasers; referred_by links to the referring user)
        -- purchased_courses is a JSON array carried over from the legacy
        -- system: elements are bare course-id strings, partial objects, or
        -- full {course, purchaseDate, expiryDate, isExpired} entries.
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            referred_by TEXT, -- may name a user row that no longer exists
            first_purchase_reward_given INTEGER NOT NULL DEFAULT 0,
            first_purchase_reward_amount INTEGER,
            wallet_balance INTEGER NOT NULL DEFAULT 0,
            purchased_courses TEXT NOT NULL DEFAULT '[]',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        CREATE INDEX IF NOT EXISTS idx_users_referred_by ON users(referred_by);

        -- Courses
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            price INTEGER NOT NULL,
            duration_days INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Enrollment membership (set semantics via the UNIQUE pair)
        CREATE TABLE IF NOT EXISTS enrollments (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            enrolled_at INTEGER NOT NULL,

            UNIQUE(course_id, user_id)
        );
        CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id);
        CREATE INDEX IF NOT EXISTS idx_enrollments_user ON enrollments(user_id);

        -- Payment transactions (one per gateway order)
        -- user_id and course_id are held as plain ids: a row can outlive
        -- its user or course, and settlement re-resolves both, failing the
        -- whole batch when either is gone. Existence is checked when the
        -- order is created, not here.
        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL UNIQUE,
            payment_id TEXT,
            signature TEXT,
            user_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            amount INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'success')),
            agent_ref_code TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_order_status ON transactions(order_id, status);

        -- Sales agents
        CREATE TABLE IF NOT EXISTS agents (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            agent_code TEXT NOT NULL UNIQUE,
            total_sale INTEGER NOT NULL DEFAULT 0,
            count_sale INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_agents_code ON agents(agent_code);

        -- Referral reward policy (singleton row)
        CREATE TABLE IF NOT EXISTS referral_settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            cashback_amount INTEGER NOT NULL,
            max_referrals INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}
