//! [`EmailNotifier`] — binds the composer to a sender behind the core
//! [`RegistrationNotifier`] trait.

use chrono::Utc;

use fledge_core::{
  lifecycle::{IssuedCredentials, RegistrationNotifier},
  registration::Registration,
  school::SchoolProfile,
};

use crate::{
  email::{ConfirmationEmail, WelcomeEmail},
  sender::{MailSender, OutboundEmail, SendError},
};

/// Composes each lifecycle email and hands it to the configured sender.
pub struct EmailNotifier<M> {
  sender: M,
}

impl<M> EmailNotifier<M> {
  pub fn new(sender: M) -> Self {
    Self { sender }
  }
}

impl<M: MailSender> RegistrationNotifier for EmailNotifier<M> {
  type Error = SendError;

  async fn confirmation(
    &self,
    registration: &Registration,
    school: &SchoolProfile,
  ) -> Result<(), SendError> {
    let rendered =
      ConfirmationEmail::from_registration(registration, school, Utc::now())
        .render();
    self
      .sender
      .send(&OutboundEmail {
        to:      registration.guardian_email.clone(),
        subject: rendered.subject,
        html:    rendered.html,
        text:    rendered.text,
      })
      .await
  }

  async fn welcome(
    &self,
    registration: &Registration,
    credentials: &IssuedCredentials,
    school: &SchoolProfile,
  ) -> Result<(), SendError> {
    let rendered =
      WelcomeEmail::from_registration(registration, credentials, school, Utc::now())
        .render();
    self
      .sender
      .send(&OutboundEmail {
        to:      registration.guardian_email.clone(),
        subject: rendered.subject,
        html:    rendered.html,
        text:    rendered.text,
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use rust_decimal_macros::dec;
  use uuid::Uuid;

  use super::*;
  use crate::sender::MemorySender;
  use fledge_core::{
    registration::RegistrationStatus,
    school::BankingDetails,
  };

  fn registration() -> Registration {
    Registration {
      registration_id:    Uuid::new_v4(),
      guardian_name:      "Thandi Mokoena".into(),
      guardian_email:     "thandi@example.com".into(),
      student_first_name: "Lwazi".into(),
      student_last_name:  "Mokoena".into(),
      student_birth_date: None,
      school_name:        "Acorn House Preschool".into(),
      base_fee:           dec!(300.00),
      discount_code:      None,
      final_fee:          dec!(300.00),
      discount_applied:   false,
      payment_reference:  "REG1767225600123K7Q2M".into(),
      status:             RegistrationStatus::Submitted,
      created_at:         Utc::now(),
      reviewed_at:        None,
    }
  }

  fn school() -> SchoolProfile {
    SchoolProfile {
      name:            "Acorn House Preschool".into(),
      contact_email:   "admin@acornhouse.example".into(),
      contact_phone:   "+27 10 000 0000".into(),
      banking:         BankingDetails {
        bank_name:      "FNB".into(),
        account_name:   "Acorn House Preschool".into(),
        account_number: "62000000000".into(),
        branch_code:    "250655".into(),
        account_type:   "Business".into(),
      },
      public_base_url: "https://acornhouse.example".into(),
      app_url:         "https://app.acornhouse.example".into(),
    }
  }

  #[tokio::test]
  async fn confirmation_addresses_the_guardian() {
    let sender = MemorySender::new();
    let notifier = EmailNotifier::new(sender.clone());

    notifier.confirmation(&registration(), &school()).await.unwrap();

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "thandi@example.com");
    assert!(sent[0].subject.contains("Registration received"));
    assert!(sent[0].html.contains("REG1767225600123K7Q2M"));
    assert!(sent[0].text.contains("REG1767225600123K7Q2M"));
  }

  #[tokio::test]
  async fn welcome_carries_credentials() {
    let sender = MemorySender::new();
    let notifier = EmailNotifier::new(sender.clone());
    let credentials = IssuedCredentials {
      temp_password: "Fj3kPq9sWx2m".into(),
      student_id:    "STU-1A2B3C4D".into(),
    };

    notifier
      .welcome(&registration(), &credentials, &school())
      .await
      .unwrap();

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].subject.contains("approved"));
    assert!(sent[0].html.contains("Fj3kPq9sWx2m"));
    assert!(sent[0].text.contains("STU-1A2B3C4D"));
  }
}
