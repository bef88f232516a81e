use sqlx::postgres::PgQueryResult;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    dto::UpdateEventDto,
    models::{Event, TicketCategory},
    PGPool,
};

pub async fn create(event: &Event, pool: &PGPool) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        "INSERT INTO events (id, name, dt, venue, category, descr, ticket_categories, booking_deadline)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(event.id)
    .bind(&event.name)
    .bind(event.dt)
    .bind(&event.venue)
    .bind(&event.category)
    .bind(&event.descr)
    .bind(&event.ticket_categories)
    .bind(event.booking_deadline)
    .execute(pool)
    .await
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_all(pool: &PGPool) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY dt")
        .fetch_all(pool)
        .await
}

pub async fn set_fields(
    id: Uuid,
    fields: &UpdateEventDto,
    pool: &PGPool,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE events SET
            name = COALESCE($2, name),
            dt = COALESCE($3, dt),
            venue = COALESCE($4, venue),
            category = COALESCE($5, category),
            descr = COALESCE($6, descr),
            booking_deadline = COALESCE($7, booking_deadline)
         WHERE id = $1",
    )
    .bind(id)
    .bind(&fields.name)
    .bind(fields.dt)
    .bind(&fields.venue)
    .bind(&fields.category)
    .bind(&fields.descr)
    .bind(fields.booking_deadline)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

pub async fn set_ticket_categories(
    id: Uuid,
    categories: &Json<Vec<TicketCategory>>,
    pool: &PGPool,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("UPDATE events SET ticket_categories = $2 WHERE id = $1")
        .bind(id)
        .bind(categories)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

// Administrators hard-delete events.
pub async fn delete(id: Uuid, pool: &PGPool) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
