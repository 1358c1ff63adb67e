//! Fee calculation — a pure function of the base fee, the claimed discount
//! code and the discount catalog.
//!
//! The calculator never mutates a code's usage counter; that ledger update is
//! triggered by the caller after a successful registration commit, so retried
//! or failed submissions cannot double-count.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::discount::{DiscountCode, DiscountPolicy};

/// Currency amounts are rendered and persisted with two decimal places.
pub const FEE_SCALE: u32 = 2;

/// The default one-time registration fee when configuration supplies none.
pub fn default_base_fee() -> Decimal {
  Decimal::new(300_00, FEE_SCALE)
}

/// The outcome of a fee computation. `final_fee` is always in
/// `[0, base_fee]`, rounded half-up to two decimal places.
#[derive(Debug, Clone, PartialEq)]
pub struct FeeBreakdown {
  pub final_fee:        Decimal,
  pub discount_applied: bool,
  pub discount_amount:  Decimal,
}

impl FeeBreakdown {
  fn undiscounted(base_fee: Decimal) -> Self {
    Self {
      final_fee:        round(base_fee),
      discount_applied: false,
      discount_amount:  Decimal::ZERO,
    }
  }
}

/// Compute the fee for a submission.
///
/// A code that is absent, unknown, outside its validity window or over its
/// usage cap leaves the base fee untouched. A valid code applies its policy,
/// clamped so the result can neither go negative nor exceed the base fee.
pub fn compute(
  base_fee: Decimal,
  code:     Option<&str>,
  catalog:  &[DiscountCode],
  now:      DateTime<Utc>,
) -> FeeBreakdown {
  let claimed = match code.map(str::trim) {
    Some(c) if !c.is_empty() => c,
    _ => return FeeBreakdown::undiscounted(base_fee),
  };

  let Some(discount) = catalog
    .iter()
    .find(|d| d.code.eq_ignore_ascii_case(claimed))
  else {
    return FeeBreakdown::undiscounted(base_fee);
  };

  if !discount.is_usable(now) {
    return FeeBreakdown::undiscounted(base_fee);
  }

  let reduced = match discount.policy {
    DiscountPolicy::PercentOff(percent) => {
      base_fee - base_fee * percent / Decimal::ONE_HUNDRED
    }
    DiscountPolicy::AmountOff(amount) => base_fee - amount,
  };

  let final_fee = round(reduced.clamp(Decimal::ZERO, base_fee));
  FeeBreakdown {
    final_fee,
    discount_applied: final_fee < base_fee,
    discount_amount: round(base_fee - final_fee),
  }
}

/// Half-up rounding to [`FEE_SCALE`] decimal places, so displayed currency
/// never carries fractional cents.
fn round(amount: Decimal) -> Decimal {
  amount.round_dp_with_strategy(FEE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
