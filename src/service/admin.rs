use log::error;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    db,
    dto::{
        NewEventDto, PaymentDecision, UpdateEventDto, UpdateTicketCategoryDto,
        VerificationDecision,
    },
    errors::ApiError,
    models::{AuditAction, AuditEvent, Booking, BookingStatus, Event, TicketCategory, User},
    service::auth::UserAuthData,
    service::notify,
    service::verify::{EventInsights, InsightsInput, VerifierClient},
    PGPool,
};

/// Admin claims can go stale; the flag on the user row is authoritative.
pub async fn require_admin(auth: &UserAuthData, pool: &PGPool) -> Result<User, ApiError> {
    let user = match db::user::get_by_id(auth.user_id, pool).await {
        Ok(user) => user,
        Err(_) => return Err(ApiError::Unauthorized),
    };
    if user.disabled || !user.admin {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

pub async fn create_event(dto: NewEventDto, pool: &PGPool) -> Result<Event, ApiError> {
    let categories = dto
        .ticket_categories
        .into_iter()
        .map(|c| TicketCategory {
            id: Uuid::new_v4(),
            name: c.name,
            price: c.price,
            limit: c.limit,
            sold: 0,
        })
        .collect::<Vec<_>>();
    if categories.is_empty() {
        return Err(ApiError::Validation(
            "an event needs at least one ticket category".to_string(),
        ));
    }
    if categories.iter().any(|c| c.price < 0.0 || c.limit == 0) {
        return Err(ApiError::Validation(
            "ticket categories need a non-negative price and a positive limit".to_string(),
        ));
    }
    let event = Event {
        id: Uuid::new_v4(),
        name: dto.name,
        dt: dto.dt,
        venue: dto.venue,
        category: dto.category,
        descr: dto.descr,
        ticket_categories: Json(categories),
        booking_deadline: dto.booking_deadline,
    };
    match db::event::create(&event, pool).await {
        Ok(_) => Ok(event),
        Err(err) => {
            error!("failed to create event: {:?}", err);
            Err(ApiError::Internal)
        }
    }
}

pub async fn update_event(
    id: Uuid,
    fields: UpdateEventDto,
    pool: &PGPool,
) -> Result<Event, ApiError> {
    // 404 before a silent zero-row update
    let event = db::event::get_by_id(id, pool)
        .await
        .map_err(ApiError::from_db)?;
    db::event::set_fields(id, &fields, pool)
        .await
        .map_err(ApiError::from_db)?;
    if let Some(lines) = fields.ticket_categories {
        let merged = merge_categories(&event.ticket_categories, lines)?;
        db::event::set_ticket_categories(id, &Json(merged), pool)
            .await
            .map_err(ApiError::from_db)?;
    }
    db::event::get_by_id(id, pool).await.map_err(ApiError::from_db)
}

/// Applies an admin's category edits over the stored list. Sold counts
/// ride along from the categories being replaced; brand-new lines start
/// at zero.
pub fn merge_categories(
    existing: &[TicketCategory],
    lines: Vec<UpdateTicketCategoryDto>,
) -> Result<Vec<TicketCategory>, ApiError> {
    if lines.is_empty() {
        return Err(ApiError::Validation(
            "an event needs at least one ticket category".to_string(),
        ));
    }
    if lines.iter().any(|l| l.price < 0.0 || l.limit == 0) {
        return Err(ApiError::Validation(
            "ticket categories need a non-negative price and a positive limit".to_string(),
        ));
    }
    let merged = lines
        .into_iter()
        .map(|line| {
            let sold = line
                .id
                .and_then(|id| existing.iter().find(|c| c.id == id))
                .map(|c| c.sold)
                .unwrap_or(0);
            TicketCategory {
                id: line.id.unwrap_or_else(Uuid::new_v4),
                name: line.name,
                price: line.price,
                limit: line.limit,
                sold,
            }
        })
        .collect();
    Ok(merged)
}

pub async fn delete_event(id: Uuid, pool: &PGPool) -> Result<(), ApiError> {
    let deleted = db::event::delete(id, pool).await.map_err(ApiError::from_db)?;
    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

/// Mirrors the identity-review decision onto the user row and pings the
/// notification placeholder. Conditionless single-row write.
pub async fn set_identity_verification(
    user_id: Uuid,
    decision: VerificationDecision,
    pool: &PGPool,
) -> Result<User, ApiError> {
    let user = db::user::get_by_id(user_id, pool)
        .await
        .map_err(ApiError::from_db)?;
    let status = decision.as_status();
    db::user::set_verification_status(user_id, status, pool)
        .await
        .map_err(ApiError::from_db)?;

    let subject = match decision {
        VerificationDecision::Verified => "Your ID verification was approved",
        VerificationDecision::Rejected => "Your ID verification was rejected",
    };
    notify::notify_user(&user.email, subject, "Log in to TicketSwift for details.");

    Ok(User {
        verification_status: status,
        ..user
    })
}

/// Confirms or cancels a pending payment. The event's `sold` counters
/// are never adjusted here; capacity is gated by the manual review, not
/// by a counter.
pub async fn set_payment_status(
    admin_id: Uuid,
    booking_id: Uuid,
    decision: PaymentDecision,
    pool: &PGPool,
) -> Result<Booking, ApiError> {
    let booking = db::booking::get_by_id(booking_id, pool)
        .await
        .map_err(ApiError::from_db)?;
    let status = decision.as_status();
    db::booking::set_status(booking_id, status, pool)
        .await
        .map_err(ApiError::from_db)?;

    match decision {
        PaymentDecision::Confirmed => {
            if let Ok(owner) = db::user::get_by_id(booking.user_id, pool).await {
                notify::notify_user(
                    &owner.email,
                    "Your booking is confirmed",
                    &format!("Your tickets for {} are ready to download.", booking.event_name),
                );
            }
        }
        PaymentDecision::Cancelled => {
            append_admin_cancel_audit(admin_id, booking_id, pool);
        }
    }

    Ok(Booking { status, ..booking })
}

/// Unconditional cancellation: no check that the booking is not already
/// Cancelled, no `sold` decrement.
pub async fn cancel_booking(
    admin_id: Uuid,
    booking_id: Uuid,
    pool: &PGPool,
) -> Result<Booking, ApiError> {
    let booking = db::booking::get_by_id(booking_id, pool)
        .await
        .map_err(ApiError::from_db)?;
    db::booking::set_status(booking_id, BookingStatus::Cancelled, pool)
        .await
        .map_err(ApiError::from_db)?;

    if let Ok(owner) = db::user::get_by_id(booking.user_id, pool).await {
        notify::notify_user(
            &owner.email,
            "Your booking was cancelled",
            &format!("Your booking for {} was cancelled.", booking.event_name),
        );
    }
    append_admin_cancel_audit(admin_id, booking_id, pool);

    Ok(Booking {
        status: BookingStatus::Cancelled,
        ..booking
    })
}

fn append_admin_cancel_audit(admin_id: Uuid, booking_id: Uuid, pool: &PGPool) {
    let audit_pool = pool.clone();
    let details = serde_json::json!({ "bookingId": booking_id });
    actix_web::rt::spawn(async move {
        if let Err(err) = db::audit::append(
            admin_id,
            AuditAction::CancelBookingAdmin,
            details,
            &audit_pool,
        )
        .await
        {
            error!("failed to append cancel-booking-admin audit event: {:?}", err);
        }
    });
}

pub async fn set_user_disabled(
    user_id: Uuid,
    disabled: bool,
    pool: &PGPool,
) -> Result<User, ApiError> {
    let user = db::user::get_by_id(user_id, pool)
        .await
        .map_err(ApiError::from_db)?;
    db::user::set_disabled(user_id, disabled, pool)
        .await
        .map_err(ApiError::from_db)?;
    Ok(User { disabled, ..user })
}

pub async fn list_users(pool: &PGPool) -> Result<Vec<User>, ApiError> {
    db::user::get_all(pool).await.map_err(ApiError::from_db)
}

pub async fn list_bookings(pool: &PGPool) -> Result<Vec<Booking>, ApiError> {
    db::booking::get_all(pool).await.map_err(ApiError::from_db)
}

pub async fn list_audit_log(pool: &PGPool) -> Result<Vec<AuditEvent>, ApiError> {
    db::audit::list(pool).await.map_err(ApiError::from_db)
}

/// Aggregates confirmed bookings for one event into the input the hosted
/// model turns into a dashboard summary.
pub fn aggregate_insights(bookings: &[Booking]) -> InsightsInput {
    let mut input = InsightsInput {
        total_tickets_sold: 0,
        total_revenue: 0.0,
        category_distribution: Default::default(),
    };
    for booking in bookings {
        if booking.status != BookingStatus::Confirmed {
            continue;
        }
        input.total_revenue += booking.total_amount;
        for ticket in booking.tickets.iter() {
            input.total_tickets_sold += 1;
            *input
                .category_distribution
                .entry(ticket.category_name.clone())
                .or_insert(0) += 1;
        }
    }
    input
}

pub async fn event_insights(
    event_id: Uuid,
    verifier: Option<&VerifierClient>,
    pool: &PGPool,
) -> Result<EventInsights, ApiError> {
    let client = match verifier {
        Some(client) => client,
        None => {
            return Err(ApiError::Validation(
                "insights are unavailable: no verifier configured".to_string(),
            ))
        }
    };
    db::event::get_by_id(event_id, pool)
        .await
        .map_err(ApiError::from_db)?;
    let bookings = db::booking::get_for_event(event_id, pool)
        .await
        .map_err(ApiError::from_db)?;
    let input = aggregate_insights(&bookings);
    client.event_insights(&input).await.map_err(|err| {
        error!("insights request failed: {:?}", err);
        ApiError::Internal
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ticket;
    use chrono::Utc;

    fn booking(status: BookingStatus, prices: &[f64]) -> Booking {
        let tickets = prices
            .iter()
            .map(|p| Ticket {
                id: Uuid::new_v4(),
                category_name: if *p > 100.0 { "VIP" } else { "Normal" }.to_string(),
                price: *p,
            })
            .collect::<Vec<_>>();
        Booking {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            event_name: "Expo".to_string(),
            event_dt: Utc::now(),
            total_amount: prices.iter().sum(),
            tickets: Json(tickets),
            created_at: Utc::now(),
            status,
            payment_screenshot: None,
        }
    }

    #[test]
    fn category_edit_keeps_sold_counts() {
        let existing = vec![TicketCategory {
            id: Uuid::new_v4(),
            name: "Normal".to_string(),
            price: 50.0,
            limit: 100,
            sold: 42,
        }];
        let kept_id = existing[0].id;
        let lines = vec![
            UpdateTicketCategoryDto {
                id: Some(kept_id),
                name: "Standard".to_string(),
                price: 60.0,
                limit: 120,
            },
            UpdateTicketCategoryDto {
                id: None,
                name: "VIP".to_string(),
                price: 150.0,
                limit: 20,
            },
        ];

        let merged = merge_categories(&existing, lines).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, kept_id);
        assert_eq!(merged[0].name, "Standard");
        assert_eq!(merged[0].price, 60.0);
        assert_eq!(merged[0].sold, 42);
        assert_eq!(merged[1].sold, 0);
    }

    #[test]
    fn category_edit_rejects_bad_lines() {
        let line = |price: f64, limit: u32| UpdateTicketCategoryDto {
            id: None,
            name: "Normal".to_string(),
            price,
            limit,
        };
        assert!(merge_categories(&[], vec![]).is_err());
        assert!(merge_categories(&[], vec![line(-1.0, 10)]).is_err());
        assert!(merge_categories(&[], vec![line(50.0, 0)]).is_err());
    }

    #[test]
    fn insights_count_only_confirmed_bookings() {
        let bookings = vec![
            booking(BookingStatus::Confirmed, &[50.0, 50.0]),
            booking(BookingStatus::Confirmed, &[120.0]),
            booking(BookingStatus::PaymentPending, &[50.0]),
            booking(BookingStatus::Cancelled, &[120.0, 120.0]),
        ];
        let input = aggregate_insights(&bookings);
        assert_eq!(input.total_tickets_sold, 3);
        assert_eq!(input.total_revenue, 220.0);
        assert_eq!(input.category_distribution["Normal"], 2);
        assert_eq!(input.category_distribution["VIP"], 1);
    }
}
