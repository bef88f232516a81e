use log::info;

/// Notification placeholder. Delivery is not wired up; reconciliation
/// transitions call this so the hook point exists and is observable in
/// the logs.
pub fn notify_user(email: &str, subject: &str, body: &str) {
    info!("notification to {}: [{}] {}", email, subject, body);
}
