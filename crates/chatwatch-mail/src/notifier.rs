use crate::template::{render_html, render_subject};
use crate::transport::SmtpVariant;
use async_trait::async_trait;
use chatwatch_engine::config::MailSettings;
use chatwatch_engine::notifier::{NotificationEvent, Notifier, NotifyError};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::{Address, AsyncTransport};
use tracing::{debug, info, warn};

/// Sends one HTML email per event to the configured recipients.
pub struct EmailNotifier {
    settings: MailSettings,
    from: Mailbox,
    to: Vec<Mailbox>,
    variants: Vec<SmtpVariant>,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("settings", &self.settings)
            .field("variants", &self.variants)
            .finish()
    }
}

impl EmailNotifier {
    /// Validates the sender and the (comma separated) recipient list up front.
    pub fn new(settings: MailSettings) -> Result<Self, NotifyError> {
        let from = Mailbox::new(
            Some(settings.from_name.clone()),
            parse_address(&settings.user)?,
        );
        let to = settings
            .to
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|addr| parse_address(addr).map(|a| Mailbox::new(None, a)))
            .collect::<Result<Vec<_>, _>>()?;
        if to.is_empty() {
            return Err(NotifyError::InvalidAddress {
                address: settings.to.clone(),
                reason: "no recipients".into(),
            });
        }

        Ok(Self {
            settings,
            from,
            to,
            variants: SmtpVariant::ALL.to_vec(),
        })
    }

    /// Restrict delivery to the given transport variants, in order.
    pub fn with_variants(mut self, variants: Vec<SmtpVariant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn recipients(&self) -> &[Mailbox] {
        &self.to
    }

    pub fn build_message(&self, event: &NotificationEvent) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(render_subject(event))
            .header(ContentType::TEXT_HTML);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        builder
            .body(render_html(event))
            .map_err(|e| NotifyError::Message(e.to_string()))
    }
}

fn parse_address(raw: &str) -> Result<Address, NotifyError> {
    raw.trim()
        .parse::<Address>()
        .map_err(|e| NotifyError::InvalidAddress {
            address: raw.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let message = self.build_message(event)?;
        let mut failures = Vec::new();

        for variant in &self.variants {
            let transport = match variant.transport(&self.settings) {
                Ok(t) => t,
                Err(e) => {
                    debug!("Cannot set up {}: {}", variant, e);
                    failures.push(format!("{}: {}", variant, e));
                    continue;
                }
            };

            match transport.send(message.clone()).await {
                Ok(response) => {
                    info!("Email sent via {} ({})", variant, response.code());
                    return Ok(());
                }
                Err(e) => {
                    warn!("SMTP {} via {} failed: {}", self.settings.smtp_host, variant, e);
                    failures.push(format!("{}: {}", variant, e));
                }
            }
        }

        Err(NotifyError::Delivery(failures.join("; ")))
    }
}
