use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use log::error;
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    db,
    errors::ApiError,
    models::{AuditAction, Booking, BookingStatus, Event, Ticket, User},
    service::gate::{self, GateDecision},
    service::inventory::TicketSelection,
    service::verify::{ReceiptVerdict, VerifierClient, VerifierError},
    PGPool,
};

/// Advisory outcome of the payment-proof pre-check. `InFlight` and
/// `Failed` both gate submission; replacing the image resets to
/// `InFlight` for a fresh check.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ReceiptCheck {
    NotRun,
    InFlight,
    Passed { note: Option<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SessionState {
    SelectingTickets,
    AwaitingPayment,
    Submitting,
    Submitted,
}

#[derive(Debug, Display, Error, PartialEq)]
pub enum SessionError {
    #[display(fmt = "select at least one ticket")]
    EmptySelection,
    #[display(fmt = "{}", _0)]
    Blocked(#[error(not(source))] String),
    #[display(fmt = "booking step out of order")]
    WrongState,
    #[display(fmt = "upload a payment screenshot first")]
    NoScreenshot,
    #[display(fmt = "receipt check still in progress")]
    CheckInFlight,
    #[display(fmt = "{}", _0)]
    CheckFailed(#[error(not(source))] String),
}

/// One booking attempt, modeled as an explicit serializable state object
/// with pure transitions. The only side effects live in `submit`, which
/// drives a session from selection to the written booking row.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BookingSession {
    state: SessionState,
    selection: TicketSelection,
    screenshot: Option<String>,
    receipt_check: ReceiptCheck,
}

impl BookingSession {
    pub fn new(selection: TicketSelection) -> Self {
        Self {
            state: SessionState::SelectingTickets,
            selection,
            screenshot: None,
            receipt_check: ReceiptCheck::NotRun,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn receipt_check(&self) -> &ReceiptCheck {
        &self.receipt_check
    }

    pub fn selection(&self) -> &TicketSelection {
        &self.selection
    }

    pub fn screenshot(&self) -> Option<&str> {
        self.screenshot.as_deref()
    }

    /// SelectingTickets -> AwaitingPayment, for a non-zero selection the
    /// gate allows.
    pub fn confirm_selection(&mut self, gate: &GateDecision) -> Result<(), SessionError> {
        if self.state != SessionState::SelectingTickets {
            return Err(SessionError::WrongState);
        }
        if self.selection.total_tickets() == 0 {
            return Err(SessionError::EmptySelection);
        }
        if let GateDecision::Blocked(reason) = gate {
            return Err(SessionError::Blocked(reason.message().to_string()));
        }
        self.state = SessionState::AwaitingPayment;
        Ok(())
    }

    /// Stores (or replaces) the payment-proof reference and marks the
    /// advisory check as in flight. Replacing the image discards any
    /// earlier verdict.
    pub fn attach_screenshot(&mut self, reference: String) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingPayment {
            return Err(SessionError::WrongState);
        }
        self.screenshot = Some(reference);
        self.receipt_check = ReceiptCheck::InFlight;
        Ok(())
    }

    /// Feeds the advisory result back in. A collaborator failure is not a
    /// verdict: the submission goes through for manual review.
    pub fn record_verdict(&mut self, outcome: Result<ReceiptVerdict, VerifierError>) {
        if self.receipt_check != ReceiptCheck::InFlight {
            return;
        }
        self.receipt_check = match outcome {
            Ok(verdict) if verdict.passed() => ReceiptCheck::Passed {
                note: Some(verdict.reason),
            },
            Ok(verdict) => ReceiptCheck::Failed {
                reason: verdict.reason,
            },
            Err(_) => ReceiptCheck::Passed {
                note: Some("automatic check unavailable; submission will be reviewed manually".to_string()),
            },
        };
    }

    /// Called when the pre-check is not configured at all.
    pub fn skip_check(&mut self) {
        if self.receipt_check == ReceiptCheck::InFlight {
            self.receipt_check = ReceiptCheck::Passed { note: None };
        }
    }

    pub fn can_submit(&self) -> bool {
        self.state == SessionState::AwaitingPayment
            && self.screenshot.is_some()
            && matches!(
                self.receipt_check,
                ReceiptCheck::Passed { .. } | ReceiptCheck::NotRun
            )
    }

    /// AwaitingPayment -> Submitting.
    pub fn begin_submit(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingPayment {
            return Err(SessionError::WrongState);
        }
        if self.screenshot.is_none() {
            return Err(SessionError::NoScreenshot);
        }
        match &self.receipt_check {
            ReceiptCheck::InFlight => return Err(SessionError::CheckInFlight),
            ReceiptCheck::Failed { reason } => {
                return Err(SessionError::CheckFailed(reason.clone()))
            }
            ReceiptCheck::NotRun | ReceiptCheck::Passed { .. } => {}
        }
        self.state = SessionState::Submitting;
        Ok(())
    }

    /// Builds the booking with quantities and prices snapshotted from the
    /// selection, one ticket per purchased unit. Prices are not re-read
    /// from the event at this point.
    pub fn build_booking(&self, user: &User, event: &Event, now: DateTime<Utc>) -> Booking {
        let mut tickets = Vec::new();
        for (category, quantity) in self.selection.lines() {
            for _ in 0..quantity {
                tickets.push(Ticket {
                    id: Uuid::new_v4(),
                    category_name: category.name.clone(),
                    price: category.price,
                });
            }
        }
        Booking {
            id: Uuid::new_v4(),
            user_id: user.id,
            event_id: event.id,
            event_name: event.name.clone(),
            event_dt: event.dt,
            tickets: Json(tickets),
            total_amount: self.selection.total_price(),
            created_at: now,
            status: BookingStatus::PaymentPending,
            payment_screenshot: self.screenshot.clone(),
        }
    }

    /// Submitting -> Submitted, after the write lands.
    pub fn complete(&mut self) {
        if self.state == SessionState::Submitting {
            self.state = SessionState::Submitted;
        }
    }

    /// Submitting -> AwaitingPayment, when the write fails.
    pub fn fail_submit(&mut self) {
        if self.state == SessionState::Submitting {
            self.state = SessionState::AwaitingPayment;
        }
    }
}

pub fn booking_audit_details(booking: &Booking) -> serde_json::Value {
    serde_json::json!({
        "bookingId": booking.id,
        "eventId": booking.event_id,
        "numberOfTickets": booking.tickets.len(),
        "totalAmount": booking.total_amount,
    })
}

pub struct BookingOutcome {
    pub booking: Booking,
    pub receipt_check: ReceiptCheck,
}

/// Drives one booking attempt end to end: gate, selection, advisory
/// receipt check, booking write in PaymentPending, audit append.
///
/// The capacity check is read-then-write over the event snapshot; nothing
/// reserves or decrements inventory here, so two submissions can pass the
/// same remaining-capacity check. Manual admin confirmation is the gate
/// against overbooking.
pub async fn submit(
    user: &User,
    event: &Event,
    quantities: &HashMap<Uuid, u32>,
    screenshot: String,
    verifier: Option<&VerifierClient>,
    pool: &PGPool,
) -> Result<BookingOutcome, ApiError> {
    let now = Utc::now();
    let decision = gate::evaluate(
        true,
        Some(user.verification_status),
        event.deadline_passed(now),
    );

    let selection =
        TicketSelection::from_quantities(event.ticket_categories.0.clone(), quantities)
            .map_err(|err| ApiError::Validation(err.to_string()))?;

    let mut session = BookingSession::new(selection);
    session
        .confirm_selection(&decision)
        .map_err(session_error)?;
    let expected_amount = session.selection().total_price();
    session.attach_screenshot(screenshot).map_err(session_error)?;

    match (verifier, session.screenshot().map(str::to_string)) {
        (Some(client), Some(uri)) => {
            let outcome = client.verify_payment_receipt(&uri, expected_amount).await;
            session.record_verdict(outcome);
        }
        _ => session.skip_check(),
    }

    session.begin_submit().map_err(session_error)?;
    let booking = session.build_booking(user, event, now);

    match db::booking::create(&booking, pool).await {
        Ok(_) => {
            session.complete();
            let audit_pool = pool.clone();
            let details = booking_audit_details(&booking);
            let user_id = user.id;
            actix_web::rt::spawn(async move {
                if let Err(err) =
                    db::audit::append(user_id, AuditAction::CreateBooking, details, &audit_pool)
                        .await
                {
                    error!("failed to append create-booking audit event: {:?}", err);
                }
            });
            Ok(BookingOutcome {
                booking,
                receipt_check: session.receipt_check().clone(),
            })
        }
        Err(err) => {
            session.fail_submit();
            error!("failed to write booking: {:?}", err);
            Err(ApiError::Internal)
        }
    }
}

fn session_error(err: SessionError) -> ApiError {
    match err {
        SessionError::Blocked(reason) => ApiError::Blocked(reason),
        other => ApiError::Validation(other.to_string()),
    }
}

/// Owner-initiated cancellation: refused once the booking is already
/// Cancelled, otherwise a conditionless status write plus audit.
pub async fn cancel_own(user_id: Uuid, booking_id: Uuid, pool: &PGPool) -> Result<Booking, ApiError> {
    let booking = db::booking::get_by_id(booking_id, pool)
        .await
        .map_err(ApiError::from_db)?;
    if booking.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    if booking.status == BookingStatus::Cancelled {
        return Err(ApiError::Validation(
            "booking is already cancelled".to_string(),
        ));
    }
    db::booking::set_status(booking_id, BookingStatus::Cancelled, pool)
        .await
        .map_err(ApiError::from_db)?;

    let audit_pool = pool.clone();
    let details = serde_json::json!({ "bookingId": booking_id });
    actix_web::rt::spawn(async move {
        if let Err(err) =
            db::audit::append(user_id, AuditAction::CancelBookingUser, details, &audit_pool).await
        {
            error!("failed to append cancel-booking-user audit event: {:?}", err);
        }
    });

    Ok(Booking {
        status: BookingStatus::Cancelled,
        ..booking
    })
}

/// Ticket download for the owner; only Confirmed bookings are
/// downloadable.
pub async fn tickets_for_download(
    user_id: Uuid,
    booking_id: Uuid,
    pool: &PGPool,
) -> Result<Vec<Ticket>, ApiError> {
    let booking = db::booking::get_by_id(booking_id, pool)
        .await
        .map_err(ApiError::from_db)?;
    if booking.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    if !booking.downloadable() {
        return Err(ApiError::Validation(
            "tickets are available once the booking is confirmed".to_string(),
        ));
    }
    Ok(booking.tickets.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TicketCategory, VerificationStatus};
    use crate::service::gate::BlockReason;

    fn verified_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Hamza".to_string(),
            email: "hamza@example.com".to_string(),
            pwd_hash: String::new(),
            verification_status: VerificationStatus::Verified,
            admin: false,
            disabled: false,
            created_at: Utc::now(),
        }
    }

    fn event_with(categories: Vec<TicketCategory>) -> Event {
        Event {
            id: Uuid::new_v4(),
            name: "Open Air".to_string(),
            dt: Utc::now() + chrono::Duration::days(14),
            venue: "Stadium".to_string(),
            category: "Music".to_string(),
            descr: String::new(),
            ticket_categories: Json(categories),
            booking_deadline: Some(Utc::now() + chrono::Duration::days(7)),
        }
    }

    fn category(price: f64) -> TicketCategory {
        TicketCategory {
            id: Uuid::new_v4(),
            name: "Normal".to_string(),
            price,
            limit: 100,
            sold: 0,
        }
    }

    fn selection_of(event: &Event, quantity: u32) -> TicketSelection {
        let id = event.ticket_categories.0[0].id;
        let map = HashMap::from([(id, quantity)]);
        TicketSelection::from_quantities(event.ticket_categories.0.clone(), &map).unwrap()
    }

    fn passing_verdict() -> Result<ReceiptVerdict, VerifierError> {
        Ok(ReceiptVerdict {
            is_receipt: true,
            amount_matches: true,
            reason: "looks valid".to_string(),
        })
    }

    fn failing_verdict() -> Result<ReceiptVerdict, VerifierError> {
        Ok(ReceiptVerdict {
            is_receipt: true,
            amount_matches: false,
            reason: "amount differs".to_string(),
        })
    }

    #[test]
    fn happy_path_builds_payment_pending_booking() {
        let user = verified_user();
        let event = event_with(vec![category(75.0)]);
        let mut session = BookingSession::new(selection_of(&event, 1));

        session.confirm_selection(&GateDecision::Allowed).unwrap();
        session
            .attach_screenshot("uploads/receipt-1.png".to_string())
            .unwrap();
        session.record_verdict(passing_verdict());
        assert!(session.can_submit());
        session.begin_submit().unwrap();

        let now = Utc::now();
        let booking = session.build_booking(&user, &event, now);
        assert_eq!(booking.status, BookingStatus::PaymentPending);
        assert_eq!(booking.total_amount, 75.0);
        assert_eq!(booking.tickets.len(), 1);
        assert_eq!(booking.tickets[0].price, 75.0);
        assert_eq!(booking.user_id, user.id);
        assert_eq!(booking.event_name, event.name);

        session.complete();
        assert_eq!(session.state(), SessionState::Submitted);

        let details = booking_audit_details(&booking);
        assert_eq!(details["numberOfTickets"], 1);
        assert_eq!(details["totalAmount"], 75.0);
    }

    #[test]
    fn blocked_gate_stops_confirmation() {
        let event = event_with(vec![category(50.0)]);
        let mut session = BookingSession::new(selection_of(&event, 1));
        let err = session
            .confirm_selection(&GateDecision::Blocked(BlockReason::VerificationPending))
            .unwrap_err();
        assert!(matches!(err, SessionError::Blocked(_)));
        assert_eq!(session.state(), SessionState::SelectingTickets);
    }

    #[test]
    fn empty_selection_cannot_be_confirmed() {
        let event = event_with(vec![category(50.0)]);
        let mut session = BookingSession::new(TicketSelection::new(event.ticket_categories.0.clone()));
        assert_eq!(
            session.confirm_selection(&GateDecision::Allowed),
            Err(SessionError::EmptySelection)
        );
    }

    #[test]
    fn negative_verdict_blocks_until_image_is_replaced() {
        let event = event_with(vec![category(50.0)]);
        let mut session = BookingSession::new(selection_of(&event, 2));
        session.confirm_selection(&GateDecision::Allowed).unwrap();

        session.attach_screenshot("uploads/cat.png".to_string()).unwrap();
        session.record_verdict(failing_verdict());
        assert!(!session.can_submit());
        assert!(matches!(
            session.begin_submit(),
            Err(SessionError::CheckFailed(_))
        ));

        // replacing the image re-runs the check and can re-enable submission
        session
            .attach_screenshot("uploads/receipt.png".to_string())
            .unwrap();
        assert_eq!(*session.receipt_check(), ReceiptCheck::InFlight);
        assert!(matches!(
            session.begin_submit(),
            Err(SessionError::CheckInFlight)
        ));
        session.record_verdict(passing_verdict());
        assert!(session.can_submit());
        assert!(session.begin_submit().is_ok());
    }

    #[test]
    fn verifier_failure_does_not_block_submission() {
        let event = event_with(vec![category(50.0)]);
        let mut session = BookingSession::new(selection_of(&event, 1));
        session.confirm_selection(&GateDecision::Allowed).unwrap();
        session.attach_screenshot("uploads/r.png".to_string()).unwrap();
        session.record_verdict(Err(VerifierError::RequestFailed("timeout".to_string())));
        assert!(session.can_submit());
    }

    #[test]
    fn write_failure_returns_to_awaiting_payment() {
        let event = event_with(vec![category(50.0)]);
        let mut session = BookingSession::new(selection_of(&event, 1));
        session.confirm_selection(&GateDecision::Allowed).unwrap();
        session.attach_screenshot("uploads/r.png".to_string()).unwrap();
        session.skip_check();
        session.begin_submit().unwrap();
        session.fail_submit();
        assert_eq!(session.state(), SessionState::AwaitingPayment);
        // the attempt can be retried
        assert!(session.begin_submit().is_ok());
    }

    #[test]
    fn three_tickets_snapshot_three_prices() {
        let user = verified_user();
        let event = event_with(vec![category(40.0)]);
        let mut session = BookingSession::new(selection_of(&event, 3));
        session.confirm_selection(&GateDecision::Allowed).unwrap();
        session.attach_screenshot("uploads/r.png".to_string()).unwrap();
        session.skip_check();
        session.begin_submit().unwrap();
        let booking = session.build_booking(&user, &event, Utc::now());
        assert_eq!(booking.tickets.len(), 3);
        assert_eq!(booking.total_amount, 120.0);
    }
}
