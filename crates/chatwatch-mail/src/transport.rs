use chatwatch_engine::config::MailSettings;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, Tokio1Executor};
use std::fmt;

/// Ways of reaching the SMTP relay, tried in order until one accepts the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpVariant {
    /// TLS from the first byte (SMTPS).
    ImplicitTls,
    /// Plain connection upgraded with STARTTLS on the submission port.
    StartTls,
    /// STARTTLS on the legacy relay port, for networks that block 465 and 587.
    StartTlsLegacy,
}

impl SmtpVariant {
    pub const ALL: [SmtpVariant; 3] = [
        SmtpVariant::ImplicitTls,
        SmtpVariant::StartTls,
        SmtpVariant::StartTlsLegacy,
    ];

    pub fn port(self) -> u16 {
        match self {
            SmtpVariant::ImplicitTls => 465,
            SmtpVariant::StartTls => 587,
            SmtpVariant::StartTlsLegacy => 25,
        }
    }

    pub fn transport(
        self,
        settings: &MailSettings,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error> {
        let builder = match self {
            SmtpVariant::ImplicitTls => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)?
            }
            SmtpVariant::StartTls | SmtpVariant::StartTlsLegacy => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
            }
        };

        Ok(builder
            .port(self.port())
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.pass.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build())
    }
}

impl fmt::Display for SmtpVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            SmtpVariant::ImplicitTls => "implicit TLS",
            SmtpVariant::StartTls | SmtpVariant::StartTlsLegacy => "STARTTLS",
        };
        write!(f, "{} on port {}", mode, self.port())
    }
}
