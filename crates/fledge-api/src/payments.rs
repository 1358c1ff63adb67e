//! Handlers for `/payments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/payments/proof` | Attach an uploaded proof by claimed reference |

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fledge_core::{
  lifecycle::RegistrationNotifier,
  registration::RegistrationStatus,
  store::RegistrationStore,
};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ProofBody {
  /// The payment reference as the guardian typed it.
  pub reference:    String,
  /// Pointer to the uploaded proof document; storage is external.
  pub artifact_url: String,
}

#[derive(Debug, Serialize)]
pub struct ProofResponse {
  pub registration_id:   Uuid,
  pub payment_reference: String,
  pub status:            RegistrationStatus,
}

/// `POST /payments/proof`
///
/// Resolves the claimed reference by exact match and moves the registration
/// to `payment_uploaded` for human review. A reference that matches nothing
/// is a 404 with no state change — mismatches are resolved by an admin, not
/// by guessing.
pub async fn upload_proof<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<ProofBody>,
) -> Result<Json<ProofResponse>, ApiError>
where
  S: RegistrationStore,
  N: RegistrationNotifier,
{
  let registration = state.service.match_payment(&body.reference).await?;
  let updated = state
    .service
    .attach_payment(
      registration.registration_id,
      body.reference,
      body.artifact_url,
    )
    .await?;

  Ok(Json(ProofResponse {
    registration_id:   updated.registration_id,
    payment_reference: updated.payment_reference.clone(),
    status:            updated.status,
  }))
}
