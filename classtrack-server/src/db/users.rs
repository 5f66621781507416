//! User store operations

use sqlx::{Row, SqlitePool};

use classtrack_common::{Error, Result};

use crate::models::{User, UserRole};

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        role: UserRole::parse(&role)?,
        hourly_rate: row.get("hourly_rate"),
        is_active: row.get::<i64, _>("is_active") != 0,
    })
}

/// Insert a user, returning the new id
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    full_name: &str,
    role: UserRole,
    hourly_rate: f64,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO users (email, full_name, role, hourly_rate) VALUES (?, ?, ?, ?)",
    )
    .bind(email)
    .bind(full_name)
    .bind(role.as_str())
    .bind(hourly_rate)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Fetch a user by id and role; NotFound when the id or role doesn't match
pub async fn get_user(pool: &SqlitePool, user_id: i64, role: UserRole) -> Result<User> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ? AND role = ?")
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => user_from_row(&row),
        None => Err(Error::NotFound(format!(
            "No {} with id {}",
            role.as_str(),
            user_id
        ))),
    }
}

/// Look up a user by email and role
pub async fn find_by_email(
    pool: &SqlitePool,
    email: &str,
    role: UserRole,
) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE email = ? AND role = ?")
        .bind(email)
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// All active users of the given role, ordered by name
pub async fn list_active(pool: &SqlitePool, role: UserRole) -> Result<Vec<User>> {
    let rows = sqlx::query(
        "SELECT * FROM users WHERE role = ? AND is_active = 1 ORDER BY full_name ASC",
    )
    .bind(role.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(user_from_row).collect()
}
