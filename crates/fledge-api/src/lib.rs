//! JSON REST API for the Fledge registration service.
//!
//! Exposes an axum [`Router`] backed by any
//! [`fledge_core::store::RegistrationStore`] and
//! [`fledge_core::lifecycle::RegistrationNotifier`]. Auth, TLS, and
//! transport concerns are the caller's responsibility — admin endpoints are
//! expected to sit behind an external identity provider.

pub mod error;
pub mod payments;
pub mod registrations;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use fledge_core::{
  lifecycle::{RegistrationNotifier, RegistrationService},
  school::{BankingDetails, SchoolProfile},
  store::RegistrationStore,
};

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` plus
/// `FLEDGE_`-prefixed environment overrides, validated once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// Public base URL used to build upload-proof links in emails.
  pub public_base_url: String,
  /// Where approved guardians access the parent app.
  pub app_url:         String,
  #[serde(default = "fledge_core::fee::default_base_fee")]
  pub base_fee:        Decimal,
  pub school:          SchoolSection,
  pub banking:         BankingSection,
  #[serde(default)]
  pub mail:            MailSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchoolSection {
  pub name:          String,
  pub contact_email: String,
  pub contact_phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankingSection {
  pub bank_name:      String,
  pub account_name:   String,
  pub account_number: String,
  pub branch_code:    String,
  pub account_type:   String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSection {
  /// Transactional-mail endpoint; emails are only logged when absent.
  #[serde(default)]
  pub endpoint: Option<String>,
  #[serde(default)]
  pub token:    Option<String>,
  #[serde(default = "default_mail_from")]
  pub from:     String,
}

impl Default for MailSection {
  fn default() -> Self {
    Self {
      endpoint: None,
      token:    None,
      from:     default_mail_from(),
    }
  }
}

fn default_mail_from() -> String {
  "no-reply@localhost".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("base_fee must be positive")]
  NonPositiveBaseFee,

  #[error("{0} must be an http(s) URL")]
  InvalidUrl(&'static str),

  #[error("mail.token is required when mail.endpoint is set")]
  MissingMailToken,
}

impl ServerConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.base_fee <= Decimal::ZERO {
      return Err(ConfigError::NonPositiveBaseFee);
    }
    for (name, url) in [
      ("public_base_url", &self.public_base_url),
      ("app_url", &self.app_url),
    ] {
      if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidUrl(name));
      }
    }
    if self.mail.endpoint.is_some() && self.mail.token.is_none() {
      return Err(ConfigError::MissingMailToken);
    }
    Ok(())
  }

  /// The configuration facts the notifier renders into emails.
  pub fn school_profile(&self) -> SchoolProfile {
    SchoolProfile {
      name:            self.school.name.clone(),
      contact_email:   self.school.contact_email.clone(),
      contact_phone:   self.school.contact_phone.clone(),
      banking:         BankingDetails {
        bank_name:      self.banking.bank_name.clone(),
        account_name:   self.banking.account_name.clone(),
        account_number: self.banking.account_number.clone(),
        branch_code:    self.banking.branch_code.clone(),
        account_type:   self.banking.account_type.clone(),
      },
      public_base_url: self.public_base_url.clone(),
      app_url:         self.app_url.clone(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, N> {
  pub service: Arc<RegistrationService<S, N>>,
}

impl<S, N> Clone for AppState<S, N> {
  fn clone(&self) -> Self {
    Self { service: Arc::clone(&self.service) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for the registration service.
pub fn router<S, N>(state: AppState<S, N>) -> Router
where
  S: RegistrationStore + 'static,
  N: RegistrationNotifier + 'static,
{
  Router::new()
    // Public surface
    .route(
      "/registrations",
      post(registrations::submit::<S, N>).get(registrations::list::<S, N>),
    )
    .route("/payments/proof", post(payments::upload_proof::<S, N>))
    // Admin surface
    .route("/registrations/{id}", get(registrations::get_one::<S, N>))
    .route(
      "/registrations/{id}/approve",
      post(registrations::approve::<S, N>),
    )
    .route(
      "/registrations/{id}/reject",
      post(registrations::reject::<S, N>),
    )
    .route(
      "/registrations/{id}/resend-confirmation",
      post(registrations::resend_confirmation::<S, N>),
    )
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
