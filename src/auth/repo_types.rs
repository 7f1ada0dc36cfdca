use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the store.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String, // stored trimmed and lowercased
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string
    pub created_at: OffsetDateTime,
}
