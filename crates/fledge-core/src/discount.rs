//! Discount codes — named policies reducing the registration fee.
//!
//! The catalog is owned by an external admin collaborator and is read-only to
//! the registration flow. The usage counter is advanced by the lifecycle
//! service only after a successful registration commit, never by the fee
//! calculator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a discount code reduces the base fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DiscountPolicy {
  /// Percentage off the base fee, 0–100.
  PercentOff(Decimal),
  /// Fixed amount off the base fee, in the same currency as the fee.
  AmountOff(Decimal),
}

/// A named discount policy with optional validity constraints.
///
/// Codes are stored uppercase; lookup is case-insensitive so guardians can
/// type them in any case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCode {
  pub code:        String,
  pub policy:      DiscountPolicy,
  pub valid_from:  Option<DateTime<Utc>>,
  pub valid_until: Option<DateTime<Utc>>,
  pub usage_cap:   Option<u32>,
  pub times_used:  u32,
}

impl DiscountCode {
  /// Whether the code can be applied at `now`: inside its validity window
  /// and under its usage cap.
  pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
    if let Some(from) = self.valid_from
      && now < from
    {
      return false;
    }
    if let Some(until) = self.valid_until
      && now > until
    {
      return false;
    }
    if let Some(cap) = self.usage_cap
      && self.times_used >= cap
    {
      return false;
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use rust_decimal_macros::dec;

  use super::*;

  fn code() -> DiscountCode {
    DiscountCode {
      code:        "LAUNCH50".into(),
      policy:      DiscountPolicy::PercentOff(dec!(50)),
      valid_from:  None,
      valid_until: None,
      usage_cap:   None,
      times_used:  0,
    }
  }

  #[test]
  fn unconstrained_code_is_usable() {
    assert!(code().is_usable(Utc::now()));
  }

  #[test]
  fn window_bounds_are_enforced() {
    let now = Utc::now();
    let mut c = code();
    c.valid_from = Some(now + Duration::hours(1));
    assert!(!c.is_usable(now));

    let mut c = code();
    c.valid_until = Some(now - Duration::hours(1));
    assert!(!c.is_usable(now));
  }

  #[test]
  fn exhausted_cap_disables_code() {
    let mut c = code();
    c.usage_cap = Some(10);
    c.times_used = 10;
    assert!(!c.is_usable(Utc::now()));

    c.times_used = 9;
    assert!(c.is_usable(Utc::now()));
  }
}
