use rusqlite::Connection;

/// Initialize the database schema. Safe to run on every startup.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Users (account management owns name/email/role)
        -- welcomed_at: NULL until the first-purchase welcome is claimed
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('user', 'admin', 'super_admin')),
            api_key_hash TEXT NOT NULL UNIQUE,
            welcomed_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            price INTEGER NOT NULL CHECK (price >= 0),
            category TEXT NOT NULL CHECK (category IN ('video', 'book')),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Entitlements: one row per owned course, the primary key gives set semantics
        CREATE TABLE IF NOT EXISTS user_courses (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            granted_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, course_id)
        );
        CREATE INDEX IF NOT EXISTS idx_user_courses_course ON user_courses(course_id);

        -- Payment ledger, keyed by the gateway reference.
        -- No foreign keys: records outlive the course/user rows they point at.
        CREATE TABLE IF NOT EXISTS payments (
            reference TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            amount INTEGER NOT NULL CHECK (amount > 0),
            email TEXT NOT NULL,
            full_name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'success', 'failed')),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payments_course_status ON payments(course_id, status);
        CREATE INDEX IF NOT EXISTS idx_payments_user ON payments(user_id);
        "#,
    )
}
