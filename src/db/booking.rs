use sqlx::postgres::PgQueryResult;
use uuid::Uuid;

use crate::{
    models::{Booking, BookingStatus},
    PGPool,
};

pub async fn create(booking: &Booking, pool: &PGPool) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        "INSERT INTO bookings (id, user_id, event_id, event_name, event_dt, tickets,
                               total_amount, created_at, status, payment_screenshot)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(booking.id)
    .bind(booking.user_id)
    .bind(booking.event_id)
    .bind(&booking.event_name)
    .bind(booking.event_dt)
    .bind(&booking.tickets)
    .bind(booking.total_amount)
    .bind(booking.created_at)
    .bind(booking.status)
    .bind(&booking.payment_screenshot)
    .execute(pool)
    .await
}

pub async fn get_by_id(id: Uuid, pool: &PGPool) -> Result<Booking, sqlx::Error> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_for_user(user_id: Uuid, pool: &PGPool) -> Result<Vec<Booking>, sqlx::Error> {
    sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_for_event(event_id: Uuid, pool: &PGPool) -> Result<Vec<Booking>, sqlx::Error> {
    sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE event_id = $1 ORDER BY created_at DESC",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}

pub async fn get_all(pool: &PGPool) -> Result<Vec<Booking>, sqlx::Error> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

// Conditionless single-row write; callers own any state-machine checks.
pub async fn set_status(
    id: Uuid,
    status: BookingStatus,
    pool: &PGPool,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}
