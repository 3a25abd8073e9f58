//! Email delivery of change notifications over SMTP.

pub mod notifier;
pub mod template;
pub mod transport;

pub use notifier::EmailNotifier;
pub use transport::SmtpVariant;
