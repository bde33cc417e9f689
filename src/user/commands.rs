use super::model::{UpsertProfileCommand, User};
use crate::error::{AppError, AppResult};
use sqlx::PgConnection;
use tracing::info;

/// Create or update the caller's profile.
///
/// The account kind is fixed on first write; a later attempt to flip a
/// homeowner into a contractor (or back) is rejected.
pub async fn upsert_profile(
    conn: &mut PgConnection,
    user_id: &str,
    cmd: UpsertProfileCommand,
) -> AppResult<User> {
    info!("{:<12} --> Upsert profile id: {}", "Command", user_id);
    let name = cmd.name.trim();
    let email = cmd.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(AppError::bad_request("Name is required"));
    }
    if !email.contains('@') {
        return Err(AppError::bad_request("A valid email is required"));
    }

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, user_type, name, email)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email
         WHERE users.user_type = EXCLUDED.user_type
         RETURNING id, user_type, name, email, created_at",
    )
    .bind(user_id)
    .bind(cmd.user_type.as_str())
    .bind(name)
    .bind(&email)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::conflict("Email already in use")
        }
        other => AppError::from(other),
    })?;

    user.ok_or_else(|| AppError::conflict("Account type cannot be changed"))
}
