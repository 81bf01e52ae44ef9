//! Outbound mail: SMTP through lettre when configured, otherwise a logging mailer.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

use crate::config::SmtpConfig;
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
  /// Display name shown next to the sending address.
  pub from_name: Option<String>,
  pub from: String,
  pub to: String,
  pub reply_to: Option<String>,
  pub subject: String,
  pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, mail: OutgoingMail) -> Result<(), AppError>;
}

fn address(raw: &str) -> Result<Address, AppError> {
  raw
    .trim()
    .parse::<Address>()
    .map_err(|e| AppError::Mail(format!("invalid address '{raw}': {e}")))
}

pub struct SmtpMailer {
  transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
  pub fn new(config: &SmtpConfig) -> Result<Self, AppError> {
    let credentials = Credentials::new(config.username.clone(), config.password.clone());
    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
      .map_err(|e| AppError::Config(format!("SMTP relay '{}': {e}", config.host)))?
      .port(config.port)
      .credentials(credentials)
      .build();
    Ok(Self { transport })
  }

  fn build_message(mail: OutgoingMail) -> Result<Message, AppError> {
    let from = Mailbox::new(mail.from_name, address(&mail.from)?);
    let mut builder = Message::builder()
      .from(from)
      .to(Mailbox::new(None, address(&mail.to)?))
      .subject(mail.subject)
      .header(ContentType::TEXT_PLAIN);
    if let Some(reply_to) = mail.reply_to {
      builder = builder.reply_to(Mailbox::new(None, address(&reply_to)?));
    }
    builder
      .body(mail.body)
      .map_err(|e| AppError::Mail(format!("could not build message: {e}")))
  }
}

#[async_trait]
impl Mailer for SmtpMailer {
  #[instrument(name = "SmtpMailer::send", skip_all, fields(to = %mail.to, subject = %mail.subject), err(Display))]
  async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
    let message = Self::build_message(mail)?;
    self
      .transport
      .send(message)
      .await
      .map_err(|e| AppError::Mail(e.to_string()))?;
    info!("Mail delivered to relay.");
    Ok(())
  }
}

/// Writes mail to the log instead of sending it.
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
  async fn send(&self, mail: OutgoingMail) -> Result<(), AppError> {
    address(&mail.to)?;
    info!(
      to = %mail.to,
      reply_to = mail.reply_to.as_deref().unwrap_or("-"),
      subject = %mail.subject,
      body = %mail.body,
      "Mail not sent (no SMTP configured)."
    );
    Ok(())
  }
}
