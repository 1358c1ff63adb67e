//! Error types for `fledge-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::registration::RegistrationStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing or malformed required field: {field}")]
  Validation { field: &'static str },

  #[error("could not allocate a unique payment reference after {attempts} attempts")]
  DuplicateReference { attempts: usize },

  #[error("registration {id} cannot move from {from} to {to}")]
  InvalidTransition {
    id:   Uuid,
    from: RegistrationStatus,
    to:   RegistrationStatus,
  },

  #[error("registration not found: {0}")]
  RegistrationNotFound(Uuid),

  #[error("no registration matches payment reference {0:?}")]
  ReferenceNotFound(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error from any [`crate::store::RegistrationStore`]
  /// implementation.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
