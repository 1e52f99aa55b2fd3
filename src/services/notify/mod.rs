/*
 * Responsibility
 * - Notification-delivery collaborator (announcement and OTP mails)
 * - Delivery mechanics live behind the relay; this side only hands off a message
 *   and reports {success, details}
 */
pub mod client;
pub mod log_only;
pub mod webhook;

pub use client::{DeliveryReport, Notifier, NotifyError, OutboundMessage};
pub use log_only::LogNotifier;
pub use webhook::WebhookNotifier;
