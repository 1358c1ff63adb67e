//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as ISO 8601, money as the
//! decimal's canonical text form, and discount policies as compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use fledge_core::{
  discount::{DiscountCode, DiscountPolicy},
  registration::{PaymentArtifact, Registration, RegistrationStatus},
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::from_str(s).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Money ───────────────────────────────────────────────────────────────────

pub fn encode_money(amount: Decimal) -> String { amount.to_string() }

pub fn decode_money(s: &str) -> Result<Decimal> {
  Decimal::from_str(s).map_err(|e| Error::MoneyParse(e.to_string()))
}

// ─── RegistrationStatus ──────────────────────────────────────────────────────

pub fn encode_status(status: RegistrationStatus) -> &'static str {
  status.as_str()
}

pub fn decode_status(s: &str) -> Result<RegistrationStatus> {
  match s {
    "submitted" => Ok(RegistrationStatus::Submitted),
    "payment_uploaded" => Ok(RegistrationStatus::PaymentUploaded),
    "approved" => Ok(RegistrationStatus::Approved),
    "rejected" => Ok(RegistrationStatus::Rejected),
    other => Err(Error::UnknownStatus(other.to_string())),
  }
}

// ─── DiscountPolicy ──────────────────────────────────────────────────────────

pub fn encode_policy(policy: &DiscountPolicy) -> Result<String> {
  Ok(serde_json::to_string(policy)?)
}

pub fn decode_policy(s: &str) -> Result<DiscountPolicy> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `registrations` row.
pub struct RawRegistration {
  pub registration_id:    String,
  pub guardian_name:      String,
  pub guardian_email:     String,
  pub student_first_name: String,
  pub student_last_name:  String,
  pub student_birth_date: Option<String>,
  pub school_name:        String,
  pub base_fee:           String,
  pub discount_code:      Option<String>,
  pub final_fee:          String,
  pub discount_applied:   bool,
  pub payment_reference:  String,
  pub status:             String,
  pub created_at:         String,
  pub reviewed_at:        Option<String>,
}

impl RawRegistration {
  pub fn into_registration(self) -> Result<Registration> {
    Ok(Registration {
      registration_id:    decode_uuid(&self.registration_id)?,
      guardian_name:      self.guardian_name,
      guardian_email:     self.guardian_email,
      student_first_name: self.student_first_name,
      student_last_name:  self.student_last_name,
      student_birth_date: self
        .student_birth_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      school_name:        self.school_name,
      base_fee:           decode_money(&self.base_fee)?,
      discount_code:      self.discount_code,
      final_fee:          decode_money(&self.final_fee)?,
      discount_applied:   self.discount_applied,
      payment_reference:  self.payment_reference,
      status:             decode_status(&self.status)?,
      created_at:         decode_dt(&self.created_at)?,
      reviewed_at:        self.reviewed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `payment_artifacts` row.
pub struct RawArtifact {
  pub artifact_id:       String,
  pub registration_id:   String,
  pub claimed_reference: String,
  pub artifact_url:      String,
  pub uploaded_at:       String,
}

impl RawArtifact {
  pub fn into_artifact(self) -> Result<PaymentArtifact> {
    Ok(PaymentArtifact {
      artifact_id:       decode_uuid(&self.artifact_id)?,
      registration_id:   decode_uuid(&self.registration_id)?,
      claimed_reference: self.claimed_reference,
      artifact_url:      self.artifact_url,
      uploaded_at:       decode_dt(&self.uploaded_at)?,
    })
  }
}

/// Raw strings read directly from a `discount_codes` row.
pub struct RawDiscountCode {
  pub code:        String,
  pub policy_json: String,
  pub valid_from:  Option<String>,
  pub valid_until: Option<String>,
  pub usage_cap:   Option<u32>,
  pub times_used:  u32,
}

impl RawDiscountCode {
  pub fn into_code(self) -> Result<DiscountCode> {
    Ok(DiscountCode {
      code:        self.code,
      policy:      decode_policy(&self.policy_json)?,
      valid_from:  self.valid_from.as_deref().map(decode_dt).transpose()?,
      valid_until: self.valid_until.as_deref().map(decode_dt).transpose()?,
      usage_cap:   self.usage_cap,
      times_used:  self.times_used,
    })
  }
}
