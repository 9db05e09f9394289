use chrono::Utc;
use rusqlite::{Connection, params};

use crate::crypto::{generate_api_key, hash_secret};
use crate::error::{AppError, Result, msg};
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{
    COURSE_COLS, COURSE_COLS_C, PAYMENT_COLS, USER_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Map a UNIQUE / PRIMARY KEY violation to `Conflict`, pass everything else through.
fn conflict_on_duplicate(err: rusqlite::Error, message: &str) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            AppError::Conflict(message.to_string())
        }
        _ => err.into(),
    }
}

// ============ Users ============

/// Create a user. Returns the user and their API key (shown once, stored hashed).
pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<(User, String)> {
    input.validate()?;

    let id = EntityType::User.gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();
    let name = input.name.trim().to_string();
    let api_key = generate_api_key();

    conn.execute(
        "INSERT INTO users (id, email, name, role, api_key_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![&id, &email, &name, input.role.as_ref(), hash_secret(&api_key), now],
    )
    .map_err(|e| conflict_on_duplicate(e, "A user with this email already exists"))?;

    let user = User {
        id,
        email,
        name,
        role: input.role,
        welcomed_at: None,
        created_at: now,
        updated_at: now,
    };
    Ok((user, api_key))
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email],
    )
}

pub fn get_user_by_api_key(conn: &Connection, api_key: &str) -> Result<Option<User>> {
    let hash = hash_secret(api_key);
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE api_key_hash = ?1", USER_COLS),
        &[&hash],
    )
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .map_err(Into::into)
}

/// Hard delete a user. Entitlement rows go with it via ON DELETE CASCADE.
pub fn delete_user(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Atomically claim the first-purchase welcome for a user.
///
/// Returns:
/// - `Ok(true)` if this call flipped `welcomed_at` from NULL (caller sends the welcome)
/// - `Ok(false)` if the user was already welcomed or does not exist
pub fn try_claim_welcome(conn: &Connection, user_id: &str) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "UPDATE users SET welcomed_at = ?1, updated_at = ?1 WHERE id = ?2 AND welcomed_at IS NULL",
        params![now, user_id],
    )?;
    Ok(affected > 0)
}

// ============ Courses ============

pub fn create_course(conn: &Connection, input: &CreateCourse) -> Result<Course> {
    if input.title.trim().is_empty() {
        return Err(AppError::Validation("Course title cannot be empty".into()));
    }
    if input.price < 0 {
        return Err(AppError::Validation("Course price cannot be negative".into()));
    }

    let id = EntityType::Course.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO courses (id, title, price, category, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![&id, input.title.trim(), input.price, input.category.as_ref(), now],
    )?;

    Ok(Course {
        id,
        title: input.title.trim().to_string(),
        price: input.price,
        category: input.category,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_course_by_id(conn: &Connection, id: &str) -> Result<Option<Course>> {
    query_one(
        conn,
        &format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLS),
        &[&id],
    )
}

pub fn count_courses(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))
        .map_err(Into::into)
}

// ============ Entitlements ============

/// Add a course to a user's owned set.
///
/// Set-union semantics: returns `Ok(false)` when the user already owned it,
/// leaving the set unchanged.
pub fn grant_course(conn: &Connection, user_id: &str, course_id: &str) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO user_courses (user_id, course_id, granted_at) VALUES (?1, ?2, ?3)",
        params![user_id, course_id, now()],
    )?;
    Ok(inserted > 0)
}

pub fn user_owns_course(conn: &Connection, user_id: &str, course_id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM user_courses WHERE user_id = ?1 AND course_id = ?2)",
        params![user_id, course_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

pub fn list_user_courses(conn: &Connection, user_id: &str) -> Result<Vec<Course>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM courses c
             JOIN user_courses uc ON uc.course_id = c.id
             WHERE uc.user_id = ?1
             ORDER BY uc.granted_at, c.id",
            COURSE_COLS_C
        ),
        &[&user_id],
    )
}

// ============ Payment Ledger ============

/// Record a new purchase attempt in `pending` state.
///
/// A reference that is already in the ledger is reported as `Conflict` and the
/// existing record is left untouched.
pub fn create_payment_record(
    conn: &Connection,
    input: &CreatePaymentRecord,
) -> Result<PaymentRecord> {
    let now = now();
    let email = input.email.trim().to_lowercase();

    conn.execute(
        "INSERT INTO payments (reference, user_id, course_id, amount, email, full_name, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?7)",
        params![
            &input.reference,
            &input.user_id,
            &input.course_id,
            input.amount,
            &email,
            &input.full_name,
            now
        ],
    )
    .map_err(|e| conflict_on_duplicate(e, msg::DUPLICATE_REFERENCE))?;

    Ok(PaymentRecord {
        reference: input.reference.clone(),
        user_id: input.user_id.clone(),
        course_id: input.course_id.clone(),
        amount: input.amount,
        email,
        full_name: input.full_name.clone(),
        status: PaymentStatus::Pending,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_payment_by_reference(conn: &Connection, reference: &str) -> Result<Option<PaymentRecord>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payments WHERE reference = ?1", PAYMENT_COLS),
        &[&reference],
    )
}

/// Compare-and-set a pending payment into a terminal status.
///
/// Returns:
/// - `Ok(true)` if this call moved the record out of `pending`
/// - `Ok(false)` if the record is already terminal (or absent)
pub fn try_transition_payment(
    conn: &Connection,
    reference: &str,
    to: PaymentStatus,
) -> Result<bool> {
    if !to.is_terminal() {
        return Err(AppError::Internal(format!(
            "Cannot transition payment {} back to {}",
            reference,
            to.as_ref()
        )));
    }
    let affected = conn.execute(
        "UPDATE payments SET status = ?1, updated_at = ?2 WHERE reference = ?3 AND status = 'pending'",
        params![to.as_ref(), now(), reference],
    )?;
    Ok(affected > 0)
}

pub fn delete_payment(conn: &Connection, reference: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM payments WHERE reference = ?1", params![reference])?;
    Ok(deleted > 0)
}

// ============ Reporting ============

/// Successful payments for a course, oldest first, with their summed amount.
pub fn get_course_buyers(conn: &Connection, course_id: &str) -> Result<CourseBuyers> {
    let data: Vec<PaymentRecord> = query_all(
        conn,
        &format!(
            "SELECT {} FROM payments WHERE course_id = ?1 AND status = 'success'
             ORDER BY created_at, reference",
            PAYMENT_COLS
        ),
        &[&course_id],
    )?;
    let total_amount = data.iter().map(|p| p.amount).sum();

    Ok(CourseBuyers {
        count: data.len(),
        total_amount,
        data,
    })
}

/// Distinct paying users and revenue across all successful payments, plus the course count.
pub fn get_payment_totals(conn: &Connection) -> Result<PaymentTotals> {
    let (total_users, total_amount): (i64, i64) = conn.query_row(
        "SELECT COUNT(DISTINCT user_id), COALESCE(SUM(amount), 0)
         FROM payments WHERE status = 'success'",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(PaymentTotals {
        total_users,
        total_amount,
        total_courses: count_courses(conn)?,
    })
}
