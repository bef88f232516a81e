use sqlx::postgres::PgQueryResult;
use uuid::Uuid;

use crate::{
    models::{AuditAction, AuditEvent},
    PGPool,
};

/// Appends one audit row. The timestamp is assigned by the database, not
/// the client, so ordering follows per-write server time.
pub async fn append(
    user_id: Uuid,
    action: AuditAction,
    details: serde_json::Value,
    pool: &PGPool,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query("INSERT INTO audit_logs (id, user_id, action, details) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(action)
        .bind(sqlx::types::Json(details))
        .execute(pool)
        .await
}

// Append-only log: insert and list are the whole surface.
pub async fn list(pool: &PGPool) -> Result<Vec<AuditEvent>, sqlx::Error> {
    sqlx::query_as::<_, AuditEvent>("SELECT * FROM audit_logs ORDER BY ts DESC")
        .fetch_all(pool)
        .await
}
