//! Registration — one applicant's admission record and its lifecycle state.
//!
//! A registration is created once at submission and never physically deleted.
//! After creation, only `status` and `reviewed_at` ever change, and only
//! through the state machine in [`crate::lifecycle`]. The fee fields and the
//! payment reference are frozen at creation time.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Status ──────────────────────────────────────────────────────────────────

/// The lifecycle state of a registration.
///
/// `submitted → payment_uploaded → approved` is the normal path; `approved`
/// may also be reached directly from `submitted` for payments verified out of
/// band. `approved` and `rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
  Submitted,
  PaymentUploaded,
  Approved,
  Rejected,
}

impl RegistrationStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Approved | Self::Rejected)
  }

  /// Whether the state machine permits a transition from `self` to `next`.
  /// No transition skips a state forward, and nothing leaves a terminal
  /// state.
  pub fn may_become(self, next: Self) -> bool {
    matches!(
      (self, next),
      (Self::Submitted, Self::PaymentUploaded)
        | (Self::Submitted, Self::Approved)
        | (Self::Submitted, Self::Rejected)
        | (Self::PaymentUploaded, Self::Approved)
        | (Self::PaymentUploaded, Self::Rejected)
    )
  }

  /// The discriminant string stored in the `status` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Submitted => "submitted",
      Self::PaymentUploaded => "payment_uploaded",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
    }
  }
}

impl std::fmt::Display for RegistrationStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Registration ────────────────────────────────────────────────────────────

/// One applicant's admission record.
///
/// `final_fee` is always recomputed server-side from `base_fee` and
/// `discount_code`; it is never accepted from a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
  pub registration_id:    Uuid,
  pub guardian_name:      String,
  /// Contact key, not an identity key — one guardian may register several
  /// students.
  pub guardian_email:     String,
  pub student_first_name: String,
  pub student_last_name:  String,
  pub student_birth_date: Option<NaiveDate>,
  pub school_name:        String,
  pub base_fee:           Decimal,
  pub discount_code:      Option<String>,
  pub final_fee:          Decimal,
  pub discount_applied:   bool,
  /// Unique across all registrations for the lifetime of the store.
  /// Generated once, immutable thereafter.
  pub payment_reference:  String,
  pub status:             RegistrationStatus,
  pub created_at:         DateTime<Utc>,
  pub reviewed_at:        Option<DateTime<Utc>>,
}

impl Registration {
  /// The student's display name as rendered into emails.
  pub fn student_name(&self) -> String {
    format!("{} {}", self.student_first_name, self.student_last_name)
  }
}

// ─── NewRegistration ─────────────────────────────────────────────────────────

/// Input to [`crate::store::RegistrationStore::create_registration`].
///
/// The id, `created_at` and initial `submitted` status are assigned by the
/// store; they are not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewRegistration {
  pub guardian_name:      String,
  pub guardian_email:     String,
  pub student_first_name: String,
  pub student_last_name:  String,
  pub student_birth_date: Option<NaiveDate>,
  pub school_name:        String,
  pub base_fee:           Decimal,
  pub discount_code:      Option<String>,
  pub final_fee:          Decimal,
  pub discount_applied:   bool,
  pub payment_reference:  String,
}

// ─── PaymentArtifact ─────────────────────────────────────────────────────────

/// An uploaded proof-of-payment pointer.
///
/// Not trusted as ground truth — it only enables human admin review. The
/// claimed reference is recorded as typed by the guardian.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentArtifact {
  pub artifact_id:       Uuid,
  pub registration_id:   Uuid,
  pub claimed_reference: String,
  pub artifact_url:      String,
  pub uploaded_at:       DateTime<Utc>,
}

/// Input to [`crate::store::RegistrationStore::attach_artifact`].
/// `artifact_id` and `uploaded_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPaymentArtifact {
  pub registration_id:   Uuid,
  pub claimed_reference: String,
  pub artifact_url:      String,
}
