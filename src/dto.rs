use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{BookingStatus, Event, TicketCategory, User, VerificationStatus};

#[derive(Debug, Deserialize, Clone)]
pub struct RegisterDto {
    pub name: String,
    pub email: String,
    pub pwd: String,
    pub pwd_confirm: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginDto {
    pub email: String,
    pub pwd: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshDto {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub name: String,
    pub admin: bool,
    pub exp: usize,
}

impl Claims {
    pub fn new(user: &User, exp: usize) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            admin: user.admin,
            exp,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewTicketCategoryDto {
    pub name: String,
    pub price: f64,
    pub limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewEventDto {
    pub name: String,
    pub dt: DateTime<Utc>,
    pub venue: String,
    pub category: String,
    pub descr: String,
    pub ticket_categories: Vec<NewTicketCategoryDto>,
    pub booking_deadline: Option<DateTime<Utc>>,
}

/// Category line in an event update. A line carrying an id replaces the
/// stored category of that id and keeps its sold count; a line without
/// one becomes a new category.
#[derive(Debug, Deserialize, Clone)]
pub struct UpdateTicketCategoryDto {
    pub id: Option<Uuid>,
    pub name: String,
    pub price: f64,
    pub limit: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdateEventDto {
    pub name: Option<String>,
    pub dt: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub category: Option<String>,
    pub descr: Option<String>,
    pub ticket_categories: Option<Vec<UpdateTicketCategoryDto>>,
    pub booking_deadline: Option<DateTime<Utc>>,
}

/// One booking attempt: quantities keyed by ticket-category id plus the
/// payment-proof reference captured in the payment step.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRequestDto {
    pub event_id: Uuid,
    pub quantities: HashMap<Uuid, u32>,
    pub payment_screenshot: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationUploadDto {
    pub photo_data_uri: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum VerificationDecision {
    Verified,
    Rejected,
}

impl VerificationDecision {
    pub fn as_status(self) -> VerificationStatus {
        match self {
            VerificationDecision::Verified => VerificationStatus::Verified,
            VerificationDecision::Rejected => VerificationStatus::Rejected,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationDecisionDto {
    pub decision: VerificationDecision,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDecision {
    Confirmed,
    Cancelled,
}

impl PaymentDecision {
    pub fn as_status(self) -> BookingStatus {
        match self {
            PaymentDecision::Confirmed => BookingStatus::Confirmed,
            PaymentDecision::Cancelled => BookingStatus::Cancelled,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentDecisionDto {
    pub status: PaymentDecision,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub verification_status: VerificationStatus,
    pub verified: bool,
    pub admin: bool,
    pub disabled: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            verification_status: user.verification_status,
            verified: user.is_verified(),
            admin: user.admin,
            disabled: user.disabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub limit: u32,
    pub sold: u32,
    pub remaining: u32,
}

impl From<&TicketCategory> for CategoryView {
    fn from(cat: &TicketCategory) -> Self {
        Self {
            id: cat.id,
            name: cat.name.clone(),
            price: cat.price,
            limit: cat.limit,
            sold: cat.sold,
            remaining: cat.remaining(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub name: String,
    pub dt: DateTime<Utc>,
    pub venue: String,
    pub category: String,
    pub descr: String,
    pub ticket_categories: Vec<CategoryView>,
    pub booking_deadline: Option<DateTime<Utc>>,
    pub booking_closed: bool,
}

impl EventResponse {
    pub fn from_event(event: &Event, now: DateTime<Utc>) -> Self {
        Self {
            id: event.id,
            name: event.name.clone(),
            dt: event.dt,
            venue: event.venue.clone(),
            category: event.category.clone(),
            descr: event.descr.clone(),
            ticket_categories: event.ticket_categories.iter().map(CategoryView::from).collect(),
            booking_deadline: event.booking_deadline,
            booking_closed: event.deadline_passed(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn verified_flag_is_derived_from_status() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Aisha".to_string(),
            email: "aisha@example.com".to_string(),
            pwd_hash: String::new(),
            verification_status: VerificationStatus::Pending,
            admin: false,
            disabled: false,
            created_at: Utc::now(),
        };
        let resp = UserResponse::from(user.clone());
        assert!(!resp.verified);

        let verified = User {
            verification_status: VerificationStatus::Verified,
            ..user
        };
        assert!(UserResponse::from(verified).verified);
    }

    #[test]
    fn category_view_floors_remaining() {
        let cat = TicketCategory {
            id: Uuid::new_v4(),
            name: "VIP".to_string(),
            price: 120.0,
            limit: 5,
            sold: 9,
        };
        assert_eq!(CategoryView::from(&cat).remaining, 0);
    }
}
