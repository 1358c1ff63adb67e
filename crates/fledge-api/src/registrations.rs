//! Handlers for `/registrations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/registrations` | Public submission endpoint |
//! | `GET`  | `/registrations` | Admin list, `?status=&limit=&offset=` |
//! | `GET`  | `/registrations/{id}` | 404 if not found |
//! | `POST` | `/registrations/{id}/approve` | Admin review, 409 on bad transition |
//! | `POST` | `/registrations/{id}/reject` | Admin review |
//! | `POST` | `/registrations/{id}/resend-confirmation` | Admin action, no state change |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use rand::{Rng as _, distributions::Alphanumeric};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fledge_core::{
  lifecycle::{
    IssuedCredentials, NotificationStatus, RegistrationNotifier, SubmissionInput,
  },
  registration::{Registration, RegistrationStatus},
  store::{RegistrationQuery, RegistrationStore},
};

use crate::{AppState, error::ApiError};

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub guardian_name:      String,
  pub guardian_email:     String,
  pub student_first_name: String,
  pub student_last_name:  String,
  #[serde(default)]
  pub student_birth_date: Option<NaiveDate>,
  pub school_name:        String,
  #[serde(default)]
  pub discount_code:      Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
  pub registration_id:   Uuid,
  pub payment_reference: String,
  pub final_fee:         Decimal,
  pub discount_applied:  bool,
  pub status:            RegistrationStatus,
  pub notification:      NotificationStatus,
}

/// `POST /registrations` — the public submission endpoint.
///
/// The fee is always recomputed server-side; the body carries no fee field
/// to tamper with.
pub async fn submit<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RegistrationStore,
  N: RegistrationNotifier,
{
  let receipt = state
    .service
    .submit(SubmissionInput {
      guardian_name:      body.guardian_name,
      guardian_email:     body.guardian_email,
      student_first_name: body.student_first_name,
      student_last_name:  body.student_last_name,
      student_birth_date: body.student_birth_date,
      school_name:        body.school_name,
      discount_code:      body.discount_code,
    })
    .await?;

  Ok((
    StatusCode::CREATED,
    Json(SubmitResponse {
      registration_id:   receipt.registration.registration_id,
      payment_reference: receipt.registration.payment_reference.clone(),
      final_fee:         receipt.registration.final_fee,
      discount_applied:  receipt.registration.discount_applied,
      status:            receipt.registration.status,
      notification:      receipt.notification,
    }),
  ))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<RegistrationStatus>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /registrations[?status=<status>&limit=<n>&offset=<n>]`
pub async fn list<S, N>(
  State(state): State<AppState<S, N>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Registration>>, ApiError>
where
  S: RegistrationStore,
  N: RegistrationNotifier,
{
  let registrations = state
    .service
    .list(&RegistrationQuery {
      status: params.status,
      limit:  params.limit,
      offset: params.offset,
    })
    .await?;
  Ok(Json(registrations))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /registrations/{id}`
pub async fn get_one<S, N>(
  State(state): State<AppState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Registration>, ApiError>
where
  S: RegistrationStore,
  N: RegistrationNotifier,
{
  let registration = state
    .service
    .registration(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("registration {id} not found")))?;
  Ok(Json(registration))
}

// ─── Approve ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ApproveBody {
  /// Temporary password for the provisioned parent account; generated when
  /// absent.
  #[serde(default)]
  pub temp_password: Option<String>,
  /// Student identifier from the provisioning collaborator; derived from
  /// the registration id when absent.
  #[serde(default)]
  pub student_id:    Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
  pub registration_id: Uuid,
  pub status:          RegistrationStatus,
  pub reviewed_at:     Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notification:    Option<NotificationStatus>,
}

/// `POST /registrations/{id}/approve` — body fields are optional; send `{}`
/// to let the server issue credentials.
pub async fn approve<S, N>(
  State(state): State<AppState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ApproveBody>,
) -> Result<Json<ReviewResponse>, ApiError>
where
  S: RegistrationStore,
  N: RegistrationNotifier,
{
  let credentials = IssuedCredentials {
    temp_password: body.temp_password.unwrap_or_else(generate_temp_password),
    student_id:    body.student_id.unwrap_or_else(|| derive_student_id(id)),
  };

  let receipt = state.service.approve(id, credentials).await?;
  Ok(Json(ReviewResponse {
    registration_id: receipt.registration.registration_id,
    status:          receipt.registration.status,
    reviewed_at:     receipt.registration.reviewed_at,
    notification:    Some(receipt.notification),
  }))
}

// ─── Reject ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
  #[serde(default)]
  pub reason: Option<String>,
}

/// `POST /registrations/{id}/reject`
pub async fn reject<S, N>(
  State(state): State<AppState<S, N>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RejectBody>,
) -> Result<Json<ReviewResponse>, ApiError>
where
  S: RegistrationStore,
  N: RegistrationNotifier,
{
  let registration = state.service.reject(id, body.reason).await?;
  Ok(Json(ReviewResponse {
    registration_id: registration.registration_id,
    status:          registration.status,
    reviewed_at:     registration.reviewed_at,
    notification:    None,
  }))
}

// ─── Resend confirmation ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ResendResponse {
  pub registration_id: Uuid,
  pub notification:    NotificationStatus,
}

/// `POST /registrations/{id}/resend-confirmation`
pub async fn resend_confirmation<S, N>(
  State(state): State<AppState<S, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ResendResponse>, ApiError>
where
  S: RegistrationStore,
  N: RegistrationNotifier,
{
  let notification = state.service.resend_confirmation(id).await?;
  Ok(Json(ResendResponse { registration_id: id, notification }))
}

// ─── Credential helpers ──────────────────────────────────────────────────────

fn generate_temp_password() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(12)
    .map(char::from)
    .collect()
}

fn derive_student_id(registration_id: Uuid) -> String {
  let compact = registration_id.simple().to_string();
  format!("STU-{}", compact[..8].to_uppercase())
}
