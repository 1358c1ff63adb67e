//! The registration state machine.
//!
//! [`RegistrationService`] owns the authoritative lifecycle of a
//! registration record: it validates submissions, computes fees, allocates
//! payment references, drives status transitions, and couples each
//! transition to its exactly-once notification. Email dispatch is checked
//! against the current status before it happens, so retrying a transition
//! that already committed can never re-send an email.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  Error, Result, fee, reference,
  registration::{
    NewPaymentArtifact, NewRegistration, PaymentArtifact, Registration,
    RegistrationStatus,
  },
  school::SchoolProfile,
  store::{RegistrationQuery, RegistrationStore, StoreError as _},
};

/// How many fresh references to draw before giving up on a submission.
/// Collisions are expected to be rare; the budget exists so a pathological
/// store state surfaces as a typed, retryable error instead of a spin.
pub const DEFAULT_REFERENCE_ATTEMPTS: usize = 5;

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A public registration submission. `final_fee` is deliberately absent:
/// fees are always recomputed server-side.
#[derive(Debug, Clone)]
pub struct SubmissionInput {
  pub guardian_name:      String,
  pub guardian_email:     String,
  pub student_first_name: String,
  pub student_last_name:  String,
  pub student_birth_date: Option<NaiveDate>,
  pub school_name:        String,
  pub discount_code:      Option<String>,
}

/// Login material produced by the account-provisioning collaborator and
/// rendered into the welcome email. Never persisted by this crate.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
  pub temp_password: String,
  pub student_id:    String,
}

// ─── Receipts ────────────────────────────────────────────────────────────────

/// Outcome of the notification attached to a transition. Delivery failure is
/// reported here rather than as an error so callers can tell "nothing
/// happened" apart from "state changed but the email did not go out".
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NotificationStatus {
  Delivered,
  Failed { reason: String },
}

impl NotificationStatus {
  pub fn is_delivered(&self) -> bool {
    matches!(self, Self::Delivered)
  }
}

/// Result of a successful [`RegistrationService::submit`].
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
  pub registration: Registration,
  pub notification: NotificationStatus,
}

/// Result of a successful [`RegistrationService::approve`].
#[derive(Debug, Clone)]
pub struct ApprovalReceipt {
  pub registration: Registration,
  pub notification: NotificationStatus,
}

// ─── Notifier trait ──────────────────────────────────────────────────────────

/// Composes and dispatches the transactional emails coupled to lifecycle
/// transitions. Implemented by `fledge-mailer`; swapped for a recording fake
/// in tests.
pub trait RegistrationNotifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Send the submission-confirmation email for a freshly created
  /// registration.
  fn confirmation<'a>(
    &'a self,
    registration: &'a Registration,
    school: &'a SchoolProfile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Send the welcome email for an approved registration.
  fn welcome<'a>(
    &'a self,
    registration: &'a Registration,
    credentials: &'a IssuedCredentials,
    school: &'a SchoolProfile,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// The registration state machine, bound to a store backend and a notifier.
///
/// Each method is scoped to a single registration; no operation blocks on
/// another registration's lifecycle.
pub struct RegistrationService<S, N> {
  store:              S,
  notifier:           N,
  school:             SchoolProfile,
  base_fee:           Decimal,
  reference_attempts: usize,
}

impl<S, N> RegistrationService<S, N>
where
  S: RegistrationStore,
  N: RegistrationNotifier,
{
  pub fn new(store: S, notifier: N, school: SchoolProfile, base_fee: Decimal) -> Self {
    Self {
      store,
      notifier,
      school,
      base_fee,
      reference_attempts: DEFAULT_REFERENCE_ATTEMPTS,
    }
  }

  /// Override the reference retry budget. Mainly useful in tests.
  pub fn with_reference_attempts(mut self, attempts: usize) -> Self {
    self.reference_attempts = attempts.max(1);
    self
  }

  pub fn school(&self) -> &SchoolProfile {
    &self.school
  }

  // ── Submission ────────────────────────────────────────────────────────

  /// Create a new registration from a public submission.
  ///
  /// Validates required fields, computes the fee from the discount catalog,
  /// allocates a unique payment reference (bounded retry against the
  /// store's uniqueness constraint), persists the record with
  /// `status = submitted`, advances the discount usage ledger, and sends
  /// the confirmation email exactly once.
  ///
  /// A second submission for the same guardian/student pair is a new,
  /// independent registration with its own reference; duplicate
  /// suppression, if wanted, is an external policy.
  pub async fn submit(&self, input: SubmissionInput) -> Result<SubmitReceipt> {
    validate(&input)?;

    let now = Utc::now();
    let catalog = self
      .store
      .list_discount_codes()
      .await
      .map_err(Error::store)?;

    let claimed_code = input
      .discount_code
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .map(str::to_uppercase);

    let breakdown =
      fee::compute(self.base_fee, claimed_code.as_deref(), &catalog, now);

    let template = NewRegistration {
      guardian_name:      input.guardian_name,
      guardian_email:     input.guardian_email,
      student_first_name: input.student_first_name,
      student_last_name:  input.student_last_name,
      student_birth_date: input.student_birth_date,
      school_name:        input.school_name,
      base_fee:           self.base_fee,
      discount_code:      claimed_code.clone(),
      final_fee:          breakdown.final_fee,
      discount_applied:   breakdown.discount_applied,
      payment_reference:  String::new(),
    };

    let registration = self.insert_with_fresh_reference(template).await?;

    // Ledger update happens only after the commit, so retried or failed
    // submissions cannot double-count. Failure here does not void the
    // registration.
    if registration.discount_applied
      && let Some(code) = &registration.discount_code
      && let Err(err) = self.store.increment_discount_usage(code).await
    {
      tracing::warn!(code = %code, error = %err, "discount usage ledger update failed");
    }

    let notification = match self
      .notifier
      .confirmation(&registration, &self.school)
      .await
    {
      Ok(()) => NotificationStatus::Delivered,
      Err(err) => self.report_delivery_failure(&registration, "confirmation", err),
    };

    Ok(SubmitReceipt { registration, notification })
  }

  async fn insert_with_fresh_reference(
    &self,
    template: NewRegistration,
  ) -> Result<Registration> {
    for attempt in 1..=self.reference_attempts {
      let mut candidate = template.clone();
      candidate.payment_reference = reference::generate(Utc::now());

      match self.store.create_registration(candidate).await {
        Ok(registration) => return Ok(registration),
        Err(err) if err.is_duplicate_reference() => {
          tracing::warn!(attempt, "payment reference collision, drawing a fresh one");
        }
        Err(err) => return Err(Error::store(err)),
      }
    }
    Err(Error::DuplicateReference { attempts: self.reference_attempts })
  }

  // ── Payment matching ──────────────────────────────────────────────────

  /// Resolve a claimed payment reference to its registration by exact
  /// string match. Never fuzzy: a mistyped reference is a human admin's
  /// problem, not an auto-approval opportunity.
  pub async fn match_payment(&self, reference: &str) -> Result<Registration> {
    self
      .store
      .find_by_reference(reference)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::ReferenceNotFound(reference.to_string()))
  }

  /// Attach an uploaded proof-of-payment artifact and move the
  /// registration to `payment_uploaded`. Allowed only from `submitted`;
  /// sends no email — the upload awaits human review.
  pub async fn attach_payment(
    &self,
    registration_id: Uuid,
    claimed_reference: String,
    artifact_url: String,
  ) -> Result<Registration> {
    let current = self.require(registration_id).await?;
    self.ensure_may_become(&current, RegistrationStatus::PaymentUploaded)?;

    self
      .store
      .attach_artifact(NewPaymentArtifact {
        registration_id,
        claimed_reference,
        artifact_url,
      })
      .await
      .map_err(Error::store)?;

    self
      .transition(current, RegistrationStatus::PaymentUploaded, None)
      .await
  }

  // ── Review ────────────────────────────────────────────────────────────

  /// Approve a registration and send the welcome email exactly once.
  ///
  /// Allowed from `payment_uploaded`, or from `submitted` for payments
  /// verified out of band. A repeated call finds the registration already
  /// `approved` and fails with [`Error::InvalidTransition`] before any
  /// email is composed.
  pub async fn approve(
    &self,
    registration_id: Uuid,
    credentials: IssuedCredentials,
  ) -> Result<ApprovalReceipt> {
    let current = self.require(registration_id).await?;
    self.ensure_may_become(&current, RegistrationStatus::Approved)?;

    let registration = self
      .transition(current, RegistrationStatus::Approved, Some(Utc::now()))
      .await?;

    let notification = match self
      .notifier
      .welcome(&registration, &credentials, &self.school)
      .await
    {
      Ok(()) => NotificationStatus::Delivered,
      Err(err) => self.report_delivery_failure(&registration, "welcome", err),
    };

    Ok(ApprovalReceipt { registration, notification })
  }

  /// Re-send the confirmation email for an existing registration — an
  /// explicit admin action for guardians who lost the original. Changes no
  /// state; the exactly-once contract binds transitions, not deliberate
  /// resends.
  pub async fn resend_confirmation(&self, id: Uuid) -> Result<NotificationStatus> {
    let registration = self.require(id).await?;
    match self.notifier.confirmation(&registration, &self.school).await {
      Ok(()) => Ok(NotificationStatus::Delivered),
      Err(err) => {
        Ok(self.report_delivery_failure(&registration, "confirmation", err))
      }
    }
  }

  /// Reject a registration. Allowed from `submitted` or
  /// `payment_uploaded`. No email is coupled to this transition.
  pub async fn reject(
    &self,
    registration_id: Uuid,
    reason: Option<String>,
  ) -> Result<Registration> {
    let current = self.require(registration_id).await?;
    self.ensure_may_become(&current, RegistrationStatus::Rejected)?;

    if let Some(reason) = reason {
      tracing::info!(registration_id = %registration_id, reason = %reason, "registration rejected");
    }

    self
      .transition(current, RegistrationStatus::Rejected, Some(Utc::now()))
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn registration(&self, id: Uuid) -> Result<Option<Registration>> {
    self.store.get_registration(id).await.map_err(Error::store)
  }

  pub async fn list(&self, query: &RegistrationQuery) -> Result<Vec<Registration>> {
    self
      .store
      .list_registrations(query)
      .await
      .map_err(Error::store)
  }

  pub async fn artifacts(&self, registration_id: Uuid) -> Result<Vec<PaymentArtifact>> {
    self
      .store
      .artifacts_for(registration_id)
      .await
      .map_err(Error::store)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn require(&self, id: Uuid) -> Result<Registration> {
    self
      .store
      .get_registration(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RegistrationNotFound(id))
  }

  fn ensure_may_become(
    &self,
    current: &Registration,
    next: RegistrationStatus,
  ) -> Result<()> {
    if current.status.may_become(next) {
      Ok(())
    } else {
      Err(Error::InvalidTransition {
        id:   current.registration_id,
        from: current.status,
        to:   next,
      })
    }
  }

  /// Commit a transition via the store's compare-and-swap update. A lost
  /// race against a concurrent admin action surfaces as an invalid
  /// transition, never as a silent coercion.
  async fn transition(
    &self,
    current: Registration,
    next: RegistrationStatus,
    reviewed_at: Option<DateTime<Utc>>,
  ) -> Result<Registration> {
    match self
      .store
      .set_status(current.registration_id, current.status, next, reviewed_at)
      .await
    {
      Ok(updated) => Ok(updated),
      Err(err) if err.is_status_conflict() => Err(Error::InvalidTransition {
        id:   current.registration_id,
        from: current.status,
        to:   next,
      }),
      Err(err) => Err(Error::store(err)),
    }
  }

  fn report_delivery_failure<E: std::error::Error>(
    &self,
    registration: &Registration,
    kind: &str,
    err: E,
  ) -> NotificationStatus {
    tracing::warn!(
      registration_id = %registration.registration_id,
      kind,
      error = %err,
      "notification dispatch failed; transition already committed"
    );
    NotificationStatus::Failed { reason: err.to_string() }
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn validate(input: &SubmissionInput) -> Result<()> {
  if input.guardian_name.trim().is_empty() {
    return Err(Error::Validation { field: "guardian_name" });
  }
  if !email_is_well_formed(&input.guardian_email) {
    return Err(Error::Validation { field: "guardian_email" });
  }
  if input.student_first_name.trim().is_empty() {
    return Err(Error::Validation { field: "student_first_name" });
  }
  if input.student_last_name.trim().is_empty() {
    return Err(Error::Validation { field: "student_last_name" });
  }
  if input.school_name.trim().is_empty() {
    return Err(Error::Validation { field: "school_name" });
  }
  Ok(())
}

fn email_is_well_formed(address: &str) -> bool {
  match address.trim().split_once('@') {
    Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
    None => false,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  };

  use rust_decimal_macros::dec;

  use super::*;
  use crate::{
    discount::{DiscountCode, DiscountPolicy},
    school::{BankingDetails, SchoolProfile},
    store::StoreError,
  };

  // ── In-memory store fake ────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  enum MemoryError {
    #[error("payment reference already exists")]
    Duplicate,
    #[error("registration not found")]
    NotFound,
    #[error("registration is not in the expected status")]
    Conflict,
  }

  impl StoreError for MemoryError {
    fn is_duplicate_reference(&self) -> bool {
      matches!(self, Self::Duplicate)
    }

    fn is_status_conflict(&self) -> bool {
      matches!(self, Self::Conflict)
    }
  }

  #[derive(Default)]
  struct Inner {
    registrations:    Vec<Registration>,
    artifacts:        Vec<PaymentArtifact>,
    codes:            Vec<DiscountCode>,
    /// Fail this many upcoming inserts with a duplicate-reference error.
    forced_conflicts: usize,
  }

  #[derive(Clone, Default)]
  struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
  }

  impl MemoryStore {
    fn with_code(code: DiscountCode) -> Self {
      let store = Self::default();
      store.inner.lock().unwrap().codes.push(code);
      store
    }

    fn force_conflicts(&self, n: usize) {
      self.inner.lock().unwrap().forced_conflicts = n;
    }

    fn count(&self) -> usize {
      self.inner.lock().unwrap().registrations.len()
    }
  }

  impl RegistrationStore for MemoryStore {
    type Error = MemoryError;

    async fn create_registration(
      &self,
      input: NewRegistration,
    ) -> Result<Registration, MemoryError> {
      let mut inner = self.inner.lock().unwrap();
      if inner.forced_conflicts > 0 {
        inner.forced_conflicts -= 1;
        return Err(MemoryError::Duplicate);
      }
      if inner
        .registrations
        .iter()
        .any(|r| r.payment_reference == input.payment_reference)
      {
        return Err(MemoryError::Duplicate);
      }
      let registration = Registration {
        registration_id:    Uuid::new_v4(),
        guardian_name:      input.guardian_name,
        guardian_email:     input.guardian_email,
        student_first_name: input.student_first_name,
        student_last_name:  input.student_last_name,
        student_birth_date: input.student_birth_date,
        school_name:        input.school_name,
        base_fee:           input.base_fee,
        discount_code:      input.discount_code,
        final_fee:          input.final_fee,
        discount_applied:   input.discount_applied,
        payment_reference:  input.payment_reference,
        status:             RegistrationStatus::Submitted,
        created_at:         Utc::now(),
        reviewed_at:        None,
      };
      inner.registrations.push(registration.clone());
      Ok(registration)
    }

    async fn get_registration(
      &self,
      id: Uuid,
    ) -> Result<Option<Registration>, MemoryError> {
      let inner = self.inner.lock().unwrap();
      Ok(
        inner
          .registrations
          .iter()
          .find(|r| r.registration_id == id)
          .cloned(),
      )
    }

    async fn find_by_reference(
      &self,
      reference: &str,
    ) -> Result<Option<Registration>, MemoryError> {
      let inner = self.inner.lock().unwrap();
      Ok(
        inner
          .registrations
          .iter()
          .find(|r| r.payment_reference == reference)
          .cloned(),
      )
    }

    async fn list_registrations(
      &self,
      query: &RegistrationQuery,
    ) -> Result<Vec<Registration>, MemoryError> {
      let inner = self.inner.lock().unwrap();
      Ok(
        inner
          .registrations
          .iter()
          .filter(|r| query.status.is_none_or(|s| r.status == s))
          .cloned()
          .collect(),
      )
    }

    async fn set_status(
      &self,
      id: Uuid,
      expected: RegistrationStatus,
      next: RegistrationStatus,
      reviewed_at: Option<DateTime<Utc>>,
    ) -> Result<Registration, MemoryError> {
      let mut inner = self.inner.lock().unwrap();
      let registration = inner
        .registrations
        .iter_mut()
        .find(|r| r.registration_id == id)
        .ok_or(MemoryError::NotFound)?;
      if registration.status != expected {
        return Err(MemoryError::Conflict);
      }
      registration.status = next;
      if reviewed_at.is_some() {
        registration.reviewed_at = reviewed_at;
      }
      Ok(registration.clone())
    }

    async fn attach_artifact(
      &self,
      input: NewPaymentArtifact,
    ) -> Result<PaymentArtifact, MemoryError> {
      let artifact = PaymentArtifact {
        artifact_id:       Uuid::new_v4(),
        registration_id:   input.registration_id,
        claimed_reference: input.claimed_reference,
        artifact_url:      input.artifact_url,
        uploaded_at:       Utc::now(),
      };
      self.inner.lock().unwrap().artifacts.push(artifact.clone());
      Ok(artifact)
    }

    async fn artifacts_for(
      &self,
      registration_id: Uuid,
    ) -> Result<Vec<PaymentArtifact>, MemoryError> {
      let inner = self.inner.lock().unwrap();
      Ok(
        inner
          .artifacts
          .iter()
          .filter(|a| a.registration_id == registration_id)
          .cloned()
          .collect(),
      )
    }

    async fn list_discount_codes(&self) -> Result<Vec<DiscountCode>, MemoryError> {
      Ok(self.inner.lock().unwrap().codes.clone())
    }

    async fn put_discount_code(&self, code: DiscountCode) -> Result<(), MemoryError> {
      self.inner.lock().unwrap().codes.push(code);
      Ok(())
    }

    async fn increment_discount_usage(&self, code: &str) -> Result<(), MemoryError> {
      let mut inner = self.inner.lock().unwrap();
      if let Some(c) = inner.codes.iter_mut().find(|c| c.code == code) {
        c.times_used += 1;
      }
      Ok(())
    }
  }

  // ── Recording notifier fake ─────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("mail collaborator unavailable")]
  struct NotifyError;

  #[derive(Clone, Default)]
  struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
  }

  impl RecordingNotifier {
    fn sent(&self) -> Vec<String> {
      self.sent.lock().unwrap().clone()
    }

    fn fail_next_sends(&self) {
      self.fail.store(true, Ordering::SeqCst);
    }
  }

  impl RegistrationNotifier for RecordingNotifier {
    type Error = NotifyError;

    async fn confirmation(
      &self,
      registration: &Registration,
      _school: &SchoolProfile,
    ) -> Result<(), NotifyError> {
      if self.fail.load(Ordering::SeqCst) {
        return Err(NotifyError);
      }
      self
        .sent
        .lock()
        .unwrap()
        .push(format!("confirmation:{}", registration.registration_id));
      Ok(())
    }

    async fn welcome(
      &self,
      registration: &Registration,
      _credentials: &IssuedCredentials,
      _school: &SchoolProfile,
    ) -> Result<(), NotifyError> {
      if self.fail.load(Ordering::SeqCst) {
        return Err(NotifyError);
      }
      self
        .sent
        .lock()
        .unwrap()
        .push(format!("welcome:{}", registration.registration_id));
      Ok(())
    }
  }

  // ── Fixtures ────────────────────────────────────────────────────────────

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

  fn half_off() -> DiscountCode {
    DiscountCode {
      code:        "LAUNCH50".into(),
      policy:      DiscountPolicy::PercentOff(dec!(50)),
      valid_from:  None,
      valid_until: None,
      usage_cap:   None,
      times_used:  0,
    }
  }

  fn submission() -> SubmissionInput {
    SubmissionInput {
      guardian_name:      "Thandi Mokoena".into(),
      guardian_email:     "thandi@example.com".into(),
      student_first_name: "Lwazi".into(),
      student_last_name:  "Mokoena".into(),
      student_birth_date: None,
      school_name:        "Acorn House Preschool".into(),
      discount_code:      None,
    }
  }

  fn service(
    store: MemoryStore,
    notifier: RecordingNotifier,
  ) -> RegistrationService<MemoryStore, RecordingNotifier> {
    RegistrationService::new(store, notifier, school(), dec!(300.00))
  }

  fn credentials() -> IssuedCredentials {
    IssuedCredentials {
      temp_password: "Fj3kPq9sWx2m".into(),
      student_id:    "STU-1A2B3C4D".into(),
    }
  }

  // ── Submission ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn submit_persists_and_sends_confirmation_once() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier.clone());

    let receipt = svc.submit(submission()).await.unwrap();

    assert_eq!(receipt.registration.status, RegistrationStatus::Submitted);
    assert_eq!(receipt.registration.final_fee, dec!(300.00));
    assert!(!receipt.registration.discount_applied);
    assert!(receipt.registration.payment_reference.starts_with("REG"));
    assert!(receipt.notification.is_delivered());
    assert_eq!(store.count(), 1);
    assert_eq!(notifier.sent().len(), 1);
    assert!(notifier.sent()[0].starts_with("confirmation:"));
  }

  #[tokio::test]
  async fn submit_applies_discount_and_advances_usage_ledger() {
    let store = MemoryStore::with_code(half_off());
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier.clone());

    let mut input = submission();
    input.discount_code = Some("launch50".into());
    let receipt = svc.submit(input).await.unwrap();

    assert_eq!(receipt.registration.final_fee, dec!(150.00));
    assert!(receipt.registration.discount_applied);
    assert_eq!(receipt.registration.discount_code.as_deref(), Some("LAUNCH50"));

    let codes = store.inner.lock().unwrap().codes.clone();
    assert_eq!(codes[0].times_used, 1);
  }

  #[tokio::test]
  async fn submit_with_unknown_code_does_not_touch_ledger() {
    let store = MemoryStore::with_code(half_off());
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier);

    let mut input = submission();
    input.discount_code = Some("NOPE".into());
    let receipt = svc.submit(input).await.unwrap();

    assert_eq!(receipt.registration.final_fee, dec!(300.00));
    assert!(!receipt.registration.discount_applied);
    assert_eq!(store.inner.lock().unwrap().codes[0].times_used, 0);
  }

  #[tokio::test]
  async fn submit_missing_email_persists_and_sends_nothing() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier.clone());

    let mut input = submission();
    input.guardian_email = "  ".into();
    let err = svc.submit(input).await.unwrap_err();

    assert!(matches!(err, Error::Validation { field: "guardian_email" }));
    assert_eq!(store.count(), 0);
    assert!(notifier.sent().is_empty());
  }

  #[tokio::test]
  async fn submit_retries_reference_collisions() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier);

    store.force_conflicts(2);
    let receipt = svc.submit(submission()).await.unwrap();

    assert_eq!(store.count(), 1);
    assert!(!receipt.registration.payment_reference.is_empty());
  }

  #[tokio::test]
  async fn submit_surfaces_exhausted_reference_budget() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier.clone());

    store.force_conflicts(DEFAULT_REFERENCE_ATTEMPTS);
    let err = svc.submit(submission()).await.unwrap_err();

    assert!(matches!(
      err,
      Error::DuplicateReference { attempts: DEFAULT_REFERENCE_ATTEMPTS }
    ));
    assert_eq!(store.count(), 0);
    assert!(notifier.sent().is_empty());
  }

  #[tokio::test]
  async fn resubmission_creates_an_independent_registration() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier);

    let first = svc.submit(submission()).await.unwrap();
    let second = svc.submit(submission()).await.unwrap();

    assert_eq!(store.count(), 2);
    assert_ne!(
      first.registration.registration_id,
      second.registration.registration_id
    );
    assert_ne!(
      first.registration.payment_reference,
      second.registration.payment_reference
    );
  }

  #[tokio::test]
  async fn notification_failure_does_not_void_the_registration() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier.clone());

    notifier.fail_next_sends();
    let receipt = svc.submit(submission()).await.unwrap();

    assert_eq!(store.count(), 1);
    assert!(matches!(
      receipt.notification,
      NotificationStatus::Failed { .. }
    ));
  }

  #[tokio::test]
  async fn resend_confirmation_repeats_without_mutating_state() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store, notifier.clone());

    let receipt = svc.submit(submission()).await.unwrap();
    let id = receipt.registration.registration_id;

    let status = svc.resend_confirmation(id).await.unwrap();
    assert!(status.is_delivered());

    let confirmations = notifier
      .sent()
      .into_iter()
      .filter(|s| s.starts_with("confirmation:"))
      .count();
    assert_eq!(confirmations, 2);
    let current = svc.registration(id).await.unwrap().unwrap();
    assert_eq!(current.status, RegistrationStatus::Submitted);
  }

  // ── Payment matching ────────────────────────────────────────────────────

  #[tokio::test]
  async fn match_payment_finds_exact_reference() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store, notifier);

    let receipt = svc.submit(submission()).await.unwrap();
    let found = svc
      .match_payment(&receipt.registration.payment_reference)
      .await
      .unwrap();

    assert_eq!(found.registration_id, receipt.registration.registration_id);
  }

  #[tokio::test]
  async fn match_payment_unknown_reference_mutates_nothing() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store.clone(), notifier);

    let receipt = svc.submit(submission()).await.unwrap();
    let err = svc.match_payment("REG000000000000XXXXX").await.unwrap_err();

    assert!(matches!(err, Error::ReferenceNotFound(_)));
    let current = svc
      .registration(receipt.registration.registration_id)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(current.status, RegistrationStatus::Submitted);
  }

  #[tokio::test]
  async fn attach_payment_transitions_without_email() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store, notifier.clone());

    let receipt = svc.submit(submission()).await.unwrap();
    let id = receipt.registration.registration_id;
    let reference = receipt.registration.payment_reference.clone();

    let updated = svc
      .attach_payment(id, reference, "uploads/pop-001.pdf".into())
      .await
      .unwrap();

    assert_eq!(updated.status, RegistrationStatus::PaymentUploaded);
    assert_eq!(svc.artifacts(id).await.unwrap().len(), 1);
    // Only the original confirmation email, nothing for the upload.
    assert_eq!(notifier.sent().len(), 1);
  }

  #[tokio::test]
  async fn attach_payment_twice_is_an_invalid_transition() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store, notifier);

    let receipt = svc.submit(submission()).await.unwrap();
    let id = receipt.registration.registration_id;
    let reference = receipt.registration.payment_reference.clone();

    svc
      .attach_payment(id, reference.clone(), "uploads/pop-001.pdf".into())
      .await
      .unwrap();
    let err = svc
      .attach_payment(id, reference, "uploads/pop-002.pdf".into())
      .await
      .unwrap_err();

    assert!(matches!(err, Error::InvalidTransition { .. }));
  }

  // ── Approval ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn approve_sends_welcome_exactly_once() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store, notifier.clone());

    let receipt = svc.submit(submission()).await.unwrap();
    let id = receipt.registration.registration_id;
    let reference = receipt.registration.payment_reference.clone();
    svc
      .attach_payment(id, reference, "uploads/pop-001.pdf".into())
      .await
      .unwrap();

    let approval = svc.approve(id, credentials()).await.unwrap();
    assert_eq!(approval.registration.status, RegistrationStatus::Approved);
    assert!(approval.registration.reviewed_at.is_some());
    assert!(approval.notification.is_delivered());

    // Second approval must not dispatch a second welcome email.
    let err = svc.approve(id, credentials()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));

    let welcomes = notifier
      .sent()
      .into_iter()
      .filter(|s| s.starts_with("welcome:"))
      .count();
    assert_eq!(welcomes, 1);
  }

  #[tokio::test]
  async fn approve_from_submitted_is_the_permitted_shortcut() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store, notifier);

    let receipt = svc.submit(submission()).await.unwrap();
    let approval = svc
      .approve(receipt.registration.registration_id, credentials())
      .await
      .unwrap();

    assert_eq!(approval.registration.status, RegistrationStatus::Approved);
  }

  #[tokio::test]
  async fn approve_on_rejected_leaves_status_unchanged() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store, notifier.clone());

    let receipt = svc.submit(submission()).await.unwrap();
    let id = receipt.registration.registration_id;
    svc.reject(id, Some("no payment received".into())).await.unwrap();

    let err = svc.approve(id, credentials()).await.unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { from: RegistrationStatus::Rejected, .. }
    ));

    let current = svc.registration(id).await.unwrap().unwrap();
    assert_eq!(current.status, RegistrationStatus::Rejected);
    assert!(!notifier.sent().iter().any(|s| s.starts_with("welcome:")));
  }

  #[tokio::test]
  async fn reject_sets_reviewed_at_and_sends_nothing() {
    let store = MemoryStore::default();
    let notifier = RecordingNotifier::default();
    let svc = service(store, notifier.clone());

    let receipt = svc.submit(submission()).await.unwrap();
    let rejected = svc
      .reject(receipt.registration.registration_id, None)
      .await
      .unwrap();

    assert_eq!(rejected.status, RegistrationStatus::Rejected);
    assert!(rejected.reviewed_at.is_some());
    assert_eq!(notifier.sent().len(), 1); // confirmation only
  }
}
