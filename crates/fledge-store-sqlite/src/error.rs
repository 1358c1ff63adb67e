//! Error type for `fledge-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("money parse error: {0}")]
  MoneyParse(String),

  #[error("unknown registration status: {0:?}")]
  UnknownStatus(String),

  /// An insert tripped the UNIQUE constraint on `payment_reference`.
  #[error("payment reference already exists")]
  DuplicateReference,

  #[error("registration not found: {0}")]
  RegistrationNotFound(Uuid),

  /// A compare-and-swap status update found the row in a different state.
  #[error("registration {0} is not in the expected status")]
  StatusConflict(Uuid),
}

impl fledge_core::store::StoreError for Error {
  fn is_duplicate_reference(&self) -> bool {
    matches!(self, Self::DuplicateReference)
  }

  fn is_status_conflict(&self) -> bool {
    matches!(self, Self::StatusConflict(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
