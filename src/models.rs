use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "verification_status", rename_all = "PascalCase")]
pub enum VerificationStatus {
    NotSubmitted,
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "PascalCase")]
pub enum BookingStatus {
    PaymentPending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    UserLogin,
    CreateBooking,
    CancelBookingUser,
    CancelBookingAdmin,
}

#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub pwd_hash: String,
    pub verification_status: VerificationStatus,
    pub admin: bool,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The status enum is the single source of truth; the boolean the
    /// clients see is derived here, never stored.
    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }
}

/// Priced tier within an event. Lives inside the event row as JSONB,
/// same lifetime as the event.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TicketCategory {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub limit: u32,
    pub sold: u32,
}

impl TicketCategory {
    /// Tickets still available for sale. A corrupted `sold` above `limit`
    /// reads as zero remaining rather than a negative count.
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.sold)
    }
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub dt: DateTime<Utc>,
    pub venue: String,
    pub category: String,
    pub descr: String,
    pub ticket_categories: Json<Vec<TicketCategory>>,
    pub booking_deadline: Option<DateTime<Utc>>,
}

impl Event {
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        match self.booking_deadline {
            Some(deadline) => now > deadline,
            None => false,
        }
    }
}

/// One purchased unit. Embedded in the booking row, generated at
/// booking-creation time with the price snapshotted from the selection.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub category_name: String,
    pub price: f64,
}

#[derive(Debug, Clone, FromRow, serde::Serialize, serde::Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub event_name: String,
    pub event_dt: DateTime<Utc>,
    pub tickets: Json<Vec<Ticket>>,
    pub total_amount: f64,
    pub created_at: DateTime<Utc>,
    pub status: BookingStatus,
    pub payment_screenshot: Option<String>,
}

impl Booking {
    /// Tickets are released to the owner only after admin confirmation.
    pub fn downloadable(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// Append-only audit record. `ts` is assigned by the database on insert.
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: AuditAction,
    pub ts: DateTime<Utc>,
    pub details: Json<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(limit: u32, sold: u32) -> TicketCategory {
        TicketCategory {
            id: Uuid::new_v4(),
            name: "Normal".to_string(),
            price: 50.0,
            limit,
            sold,
        }
    }

    #[test]
    fn remaining_is_limit_minus_sold() {
        assert_eq!(category(10, 8).remaining(), 2);
    }

    #[test]
    fn corrupted_sold_reads_as_zero_remaining() {
        assert_eq!(category(10, 14).remaining(), 0);
    }

    #[test]
    fn only_confirmed_bookings_are_downloadable() {
        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            event_name: "Expo".to_string(),
            event_dt: Utc::now(),
            tickets: Json(vec![]),
            total_amount: 50.0,
            created_at: Utc::now(),
            status: BookingStatus::PaymentPending,
            payment_screenshot: None,
        };
        assert!(!booking.downloadable());
        assert!(Booking {
            status: BookingStatus::Confirmed,
            ..booking.clone()
        }
        .downloadable());
        assert!(!Booking {
            status: BookingStatus::Cancelled,
            ..booking
        }
        .downloadable());
    }

    #[test]
    fn deadline_only_blocks_after_it_passes() {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            name: "Concert".to_string(),
            dt: now + chrono::Duration::days(30),
            venue: "Hall".to_string(),
            category: "Music".to_string(),
            descr: String::new(),
            ticket_categories: Json(vec![]),
            booking_deadline: Some(now + chrono::Duration::days(7)),
        };
        assert!(!event.deadline_passed(now));
        assert!(event.deadline_passed(now + chrono::Duration::days(8)));

        let open_ended = Event {
            booking_deadline: None,
            ..event
        };
        assert!(!open_ended.deadline_passed(now + chrono::Duration::days(365)));
    }
}
