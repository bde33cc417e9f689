use crate::macros::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum!(
    /// Discriminates the two kinds of account.
    UserType, "user type" {
        Homeowner => "homeowner",
        Contractor => "contractor",
    }
);

// User profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[sqlx(try_from = "String")]
    pub user_type: UserType,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Profile body for `PUT /users/me`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileCommand {
    pub user_type: UserType,
    pub name: String,
    pub email: String,
}
