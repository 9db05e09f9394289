//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum, surfacing bad values as a column type error
/// instead of panicking.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, name, role, welcomed_at, created_at, updated_at";

pub const COURSE_COLS: &str = "id, title, price, category, created_at, updated_at";

/// Course columns qualified for joins against `user_courses`
pub const COURSE_COLS_C: &str =
    "c.id, c.title, c.price, c.category, c.created_at, c.updated_at";

pub const PAYMENT_COLS: &str =
    "reference, user_id, course_id, amount, email, full_name, status, created_at, updated_at";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            role: parse_enum(row, 3, "role")?,
            welcomed_at: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for Course {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Course {
            id: row.get(0)?,
            title: row.get(1)?,
            price: row.get(2)?,
            category: parse_enum(row, 3, "category")?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl FromRow for PaymentRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(PaymentRecord {
            reference: row.get(0)?,
            user_id: row.get(1)?,
            course_id: row.get(2)?,
            amount: row.get(3)?,
            email: row.get(4)?,
            full_name: row.get(5)?,
            status: parse_enum(row, 6, "status")?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}
