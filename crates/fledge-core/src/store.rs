//! The `RegistrationStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `fledge-store-sqlite`). Higher layers (`fledge-api`, the lifecycle
//! service) depend on this abstraction, not on any concrete backend, so an
//! in-memory fake can stand in for tests.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  discount::DiscountCode,
  registration::{
    NewPaymentArtifact, NewRegistration, PaymentArtifact, Registration,
    RegistrationStatus,
  },
};

// ─── Error classification ────────────────────────────────────────────────────

/// Backend error with just enough classification for the lifecycle service.
///
/// The service needs to distinguish two conditions without knowing the
/// backend: an insert that tripped the payment-reference uniqueness
/// constraint (retried with fresh randomness), and a compare-and-swap status
/// update that found the row in a different state (surfaced as an invalid
/// transition).
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn is_duplicate_reference(&self) -> bool {
    false
  }

  fn is_status_conflict(&self) -> bool {
    false
  }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RegistrationStore::list_registrations`].
#[derive(Debug, Clone, Default)]
pub struct RegistrationQuery {
  pub status: Option<RegistrationStatus>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a registration store backend.
///
/// Registrations are created once and mutated only through
/// [`RegistrationStore::set_status`]; fee fields and the payment reference
/// are frozen at creation. All methods return `Send` futures so the trait can
/// be used in multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RegistrationStore: Send + Sync {
  type Error: StoreError;

  // ── Registrations ─────────────────────────────────────────────────────

  /// Persist a new registration with `status = submitted`. The id and
  /// `created_at` are assigned by the store. Fails with an error for which
  /// [`StoreError::is_duplicate_reference`] holds if the payment reference
  /// is already taken.
  fn create_registration(
    &self,
    input: NewRegistration,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  /// Retrieve a registration by id. Returns `None` if not found.
  fn get_registration(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Registration>, Self::Error>> + Send + '_;

  /// Exact lookup by payment reference — never fuzzy. Returns `None` when
  /// nothing matches.
  fn find_by_reference<'a>(
    &'a self,
    reference: &'a str,
  ) -> impl Future<Output = Result<Option<Registration>, Self::Error>> + Send + 'a;

  /// List registrations, newest first, optionally filtered by status.
  fn list_registrations<'a>(
    &'a self,
    query: &'a RegistrationQuery,
  ) -> impl Future<Output = Result<Vec<Registration>, Self::Error>> + Send + 'a;

  /// Compare-and-swap status update scoped to one registration.
  ///
  /// The row is updated only if its current status equals `expected`;
  /// otherwise the store fails with an error for which
  /// [`StoreError::is_status_conflict`] holds. `reviewed_at`, when given,
  /// is recorded alongside the transition.
  fn set_status(
    &self,
    id:          Uuid,
    expected:    RegistrationStatus,
    next:        RegistrationStatus,
    reviewed_at: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  // ── Payment artifacts ─────────────────────────────────────────────────

  /// Record an uploaded proof-of-payment pointer. The id and `uploaded_at`
  /// are assigned by the store.
  fn attach_artifact(
    &self,
    input: NewPaymentArtifact,
  ) -> impl Future<Output = Result<PaymentArtifact, Self::Error>> + Send + '_;

  /// All artifacts uploaded against a registration, oldest first.
  fn artifacts_for(
    &self,
    registration_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PaymentArtifact>, Self::Error>> + Send + '_;

  // ── Discount codes ────────────────────────────────────────────────────

  /// The full discount catalog. Read-only to the registration flow.
  fn list_discount_codes(
    &self,
  ) -> impl Future<Output = Result<Vec<DiscountCode>, Self::Error>> + Send + '_;

  /// Create or replace a catalog entry. Used by the admin collaborator and
  /// by tests; codes are stored uppercase.
  fn put_discount_code(
    &self,
    code: DiscountCode,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Advance a code's usage ledger by one. Called by the lifecycle service
  /// after a successful registration commit.
  fn increment_discount_usage<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
