//! [`SqliteStore`] — the SQLite implementation of [`RegistrationStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use fledge_core::{
  discount::DiscountCode,
  registration::{
    NewPaymentArtifact, NewRegistration, PaymentArtifact, Registration,
    RegistrationStatus,
  },
  store::{RegistrationQuery, RegistrationStore},
};

use crate::{
  Error, Result,
  encode::{
    RawArtifact, RawDiscountCode, RawRegistration, encode_date, encode_dt,
    encode_money, encode_policy, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

/// Column list shared by every `registrations` SELECT, in `RawRegistration`
/// field order.
const REGISTRATION_COLUMNS: &str = "registration_id, guardian_name, \
   guardian_email, student_first_name, student_last_name, \
   student_birth_date, school_name, base_fee, discount_code, final_fee, \
   discount_applied, payment_reference, status, created_at, reviewed_at";

fn registration_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRegistration> {
  Ok(RawRegistration {
    registration_id:    row.get(0)?,
    guardian_name:      row.get(1)?,
    guardian_email:     row.get(2)?,
    student_first_name: row.get(3)?,
    student_last_name:  row.get(4)?,
    student_birth_date: row.get(5)?,
    school_name:        row.get(6)?,
    base_fee:           row.get(7)?,
    discount_code:      row.get(8)?,
    final_fee:          row.get(9)?,
    discount_applied:   row.get(10)?,
    payment_reference:  row.get(11)?,
    status:             row.get(12)?,
    created_at:         row.get(13)?,
    reviewed_at:        row.get(14)?,
  })
}

/// Whether an insert failed on the `payment_reference` UNIQUE constraint.
fn is_reference_conflict(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, Some(msg)))
      if code.code == rusqlite::ErrorCode::ConstraintViolation
        && msg.contains("payment_reference")
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A registration store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, so the same
/// handle is shared by every concurrent request.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RegistrationStore impl ──────────────────────────────────────────────────

impl RegistrationStore for SqliteStore {
  type Error = Error;

  // ── Registrations ─────────────────────────────────────────────────────────

  async fn create_registration(&self, input: NewRegistration) -> Result<Registration> {
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

    let id_str         = encode_uuid(registration.registration_id);
    let guardian_name  = registration.guardian_name.clone();
    let guardian_email = registration.guardian_email.clone();
    let first_name     = registration.student_first_name.clone();
    let last_name      = registration.student_last_name.clone();
    let birth_date     = registration.student_birth_date.map(encode_date);
    let school_name    = registration.school_name.clone();
    let base_fee       = encode_money(registration.base_fee);
    let discount_code  = registration.discount_code.clone();
    let final_fee      = encode_money(registration.final_fee);
    let applied        = registration.discount_applied;
    let reference      = registration.payment_reference.clone();
    let status_str     = encode_status(registration.status).to_owned();
    let created_at     = encode_dt(registration.created_at);

    let outcome = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO registrations (
             registration_id, guardian_name, guardian_email,
             student_first_name, student_last_name, student_birth_date,
             school_name, base_fee, discount_code, final_fee,
             discount_applied, payment_reference, status, created_at,
             reviewed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, NULL)",
          rusqlite::params![
            id_str,
            guardian_name,
            guardian_email,
            first_name,
            last_name,
            birth_date,
            school_name,
            base_fee,
            discount_code,
            final_fee,
            applied,
            reference,
            status_str,
            created_at,
          ],
        )?;
        Ok(())
      })
      .await;

    match outcome {
      Ok(()) => Ok(registration),
      Err(err) if is_reference_conflict(&err) => Err(Error::DuplicateReference),
      Err(err) => Err(err.into()),
    }
  }

  async fn get_registration(&self, id: Uuid) -> Result<Option<Registration>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRegistration> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE registration_id = ?1"
              ),
              rusqlite::params![id_str],
              registration_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRegistration::into_registration).transpose()
  }

  async fn find_by_reference(&self, reference: &str) -> Result<Option<Registration>> {
    // Exact match only; SQLite string equality on TEXT is case-sensitive,
    // which is what the matcher contract requires.
    let reference = reference.to_owned();

    let raw: Option<RawRegistration> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE payment_reference = ?1"
              ),
              rusqlite::params![reference],
              registration_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRegistration::into_registration).transpose()
  }

  async fn list_registrations(&self, query: &RegistrationQuery) -> Result<Vec<Registration>> {
    let status_str = query.status.map(encode_status).map(str::to_owned);
    let limit_val  = query.limit.unwrap_or(100) as i64;
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawRegistration> = self
      .conn
      .call(move |conn| {
        let where_clause = if status_str.is_some() {
          "WHERE status = ?1"
        } else {
          ""
        };
        let sql = format!(
          "SELECT {REGISTRATION_COLUMNS} FROM registrations
           {where_clause}
           ORDER BY created_at DESC
           LIMIT ?2 OFFSET ?3"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![status_str.as_deref(), limit_val, offset_val],
            registration_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawRegistration::into_registration)
      .collect()
  }

  async fn set_status(
    &self,
    id:          Uuid,
    expected:    RegistrationStatus,
    next:        RegistrationStatus,
    reviewed_at: Option<DateTime<Utc>>,
  ) -> Result<Registration> {
    let id_str       = encode_uuid(id);
    let expected_str = encode_status(expected).to_owned();
    let next_str     = encode_status(next).to_owned();
    let reviewed_str = reviewed_at.map(encode_dt);

    let (affected, raw): (usize, Option<RawRegistration>) = self
      .conn
      .call(move |conn| {
        let affected = conn.execute(
          "UPDATE registrations
           SET status = ?3, reviewed_at = COALESCE(?4, reviewed_at)
           WHERE registration_id = ?1 AND status = ?2",
          rusqlite::params![id_str, expected_str, next_str, reviewed_str],
        )?;

        let raw = conn
          .query_row(
            &format!(
              "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE registration_id = ?1"
            ),
            rusqlite::params![id_str],
            registration_from_row,
          )
          .optional()?;

        Ok((affected, raw))
      })
      .await?;

    match (affected, raw) {
      (0, None) => Err(Error::RegistrationNotFound(id)),
      (0, Some(_)) => Err(Error::StatusConflict(id)),
      (_, Some(raw)) => raw.into_registration(),
      (_, None) => Err(Error::RegistrationNotFound(id)),
    }
  }

  // ── Payment artifacts ─────────────────────────────────────────────────────

  async fn attach_artifact(&self, input: NewPaymentArtifact) -> Result<PaymentArtifact> {
    let artifact = PaymentArtifact {
      artifact_id:       Uuid::new_v4(),
      registration_id:   input.registration_id,
      claimed_reference: input.claimed_reference,
      artifact_url:      input.artifact_url,
      uploaded_at:       Utc::now(),
    };

    let id_str       = encode_uuid(artifact.artifact_id);
    let reg_id_str   = encode_uuid(artifact.registration_id);
    let reference    = artifact.claimed_reference.clone();
    let url          = artifact.artifact_url.clone();
    let uploaded_str = encode_dt(artifact.uploaded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO payment_artifacts (
             artifact_id, registration_id, claimed_reference, artifact_url,
             uploaded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, reg_id_str, reference, url, uploaded_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(artifact)
  }

  async fn artifacts_for(&self, registration_id: Uuid) -> Result<Vec<PaymentArtifact>> {
    let reg_id_str = encode_uuid(registration_id);

    let raws: Vec<RawArtifact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT artifact_id, registration_id, claimed_reference,
                  artifact_url, uploaded_at
           FROM payment_artifacts
           WHERE registration_id = ?1
           ORDER BY uploaded_at ASC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![reg_id_str], |row| {
            Ok(RawArtifact {
              artifact_id:       row.get(0)?,
              registration_id:   row.get(1)?,
              claimed_reference: row.get(2)?,
              artifact_url:      row.get(3)?,
              uploaded_at:       row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArtifact::into_artifact).collect()
  }

  // ── Discount codes ────────────────────────────────────────────────────────

  async fn list_discount_codes(&self) -> Result<Vec<DiscountCode>> {
    let raws: Vec<RawDiscountCode> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT code, policy_json, valid_from, valid_until, usage_cap,
                  times_used
           FROM discount_codes",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawDiscountCode {
              code:        row.get(0)?,
              policy_json: row.get(1)?,
              valid_from:  row.get(2)?,
              valid_until: row.get(3)?,
              usage_cap:   row.get(4)?,
              times_used:  row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDiscountCode::into_code).collect()
  }

  async fn put_discount_code(&self, code: DiscountCode) -> Result<()> {
    let code_str    = code.code.to_uppercase();
    let policy_str  = encode_policy(&code.policy)?;
    let from_str    = code.valid_from.map(encode_dt);
    let until_str   = code.valid_until.map(encode_dt);
    let usage_cap   = code.usage_cap;
    let times_used  = code.times_used;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO discount_codes (
             code, policy_json, valid_from, valid_until, usage_cap,
             times_used
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            code_str, policy_str, from_str, until_str, usage_cap, times_used,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn increment_discount_usage(&self, code: &str) -> Result<()> {
    let code_str = code.to_uppercase();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE discount_codes SET times_used = times_used + 1 WHERE code = ?1",
          rusqlite::params![code_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
