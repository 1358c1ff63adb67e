//! Mail dispatch — the `MailSender` trait and its implementations.
//!
//! A sender delivers one composed email and reports the outcome. It never
//! retries internally: a duplicate email on a blind retry is worse than a
//! delayed one, so retry policy stays with the caller, tied to the
//! registration's transition.

use std::{
  future::Future,
  sync::{Arc, Mutex},
};

use thiserror::Error;

/// A composed email addressed for dispatch.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
  pub to:      String,
  pub subject: String,
  pub html:    String,
  pub text:    String,
}

#[derive(Debug, Error)]
pub enum SendError {
  #[error("mail transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The endpoint answered with a non-success status.
  #[error("mail endpoint rejected message ({status}): {body}")]
  Rejected { status: u16, body: String },
}

/// Delivers a composed email exactly once per call. Implementations must not
/// swallow failures.
pub trait MailSender: Send + Sync {
  fn send<'a>(
    &'a self,
    email: &'a OutboundEmail,
  ) -> impl Future<Output = Result<(), SendError>> + Send + 'a;
}

// ─── HTTP mailer ─────────────────────────────────────────────────────────────

/// Production sender: POSTs JSON to an external transactional-mail endpoint
/// with bearer authentication.
#[derive(Clone)]
pub struct HttpMailer {
  client:   reqwest::Client,
  endpoint: String,
  token:    String,
  from:     String,
}

impl HttpMailer {
  pub fn new(endpoint: String, token: String, from: String) -> Self {
    Self {
      client: reqwest::Client::new(),
      endpoint,
      token,
      from,
    }
  }
}

impl MailSender for HttpMailer {
  async fn send(&self, email: &OutboundEmail) -> Result<(), SendError> {
    let response = self
      .client
      .post(&self.endpoint)
      .bearer_auth(&self.token)
      .json(&serde_json::json!({
        "from": self.from,
        "to": email.to,
        "subject": email.subject,
        "html": email.html,
        "text": email.text,
      }))
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(SendError::Rejected { status: status.as_u16(), body });
    }

    tracing::debug!(to = %email.to, subject = %email.subject, "email dispatched");
    Ok(())
  }
}

// ─── Log sender ──────────────────────────────────────────────────────────────

/// Fallback sender for deployments without a configured mail endpoint:
/// logs the email and reports success. Useful for local development.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

impl MailSender for LogSender {
  async fn send(&self, email: &OutboundEmail) -> Result<(), SendError> {
    tracing::info!(
      to = %email.to,
      subject = %email.subject,
      "no mail endpoint configured; email logged instead of sent"
    );
    Ok(())
  }
}

// ─── Memory sender ───────────────────────────────────────────────────────────

/// Records every email instead of sending it. Shared test double for crates
/// exercising the notification path end to end.
#[derive(Clone, Default)]
pub struct MemorySender {
  sent: Arc<Mutex<Vec<OutboundEmail>>>,
}

impl MemorySender {
  pub fn new() -> Self {
    Self::default()
  }

  /// Everything "sent" so far, in dispatch order.
  pub fn sent(&self) -> Vec<OutboundEmail> {
    self.sent.lock().unwrap().clone()
  }
}

impl MailSender for MemorySender {
  async fn send(&self, email: &OutboundEmail) -> Result<(), SendError> {
    self.sent.lock().unwrap().push(email.clone());
    Ok(())
  }
}
