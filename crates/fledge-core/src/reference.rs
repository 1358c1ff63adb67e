//! Payment reference generation.
//!
//! References are quoted by guardians in free-text bank transfers and matched
//! back verbatim, so the alphabet is restricted to uppercase alphanumerics
//! with no separators that banking rails might strip. The millisecond
//! timestamp gives a monotonic, human-sortable uniqueness floor; the random
//! suffix covers same-millisecond submissions. Callers must still retry with
//! fresh randomness if the store reports a uniqueness violation on insert.

use chrono::{DateTime, Utc};
use rand::Rng as _;

/// Fixed textual prefix on every reference.
pub const PREFIX: &str = "REG";

/// Length of the random suffix drawn from [`ALPHABET`].
pub const SUFFIX_LEN: usize = 5;

/// 36-symbol uppercase alphanumeric alphabet.
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produce a fresh payment reference, e.g. `REG1767225600123K7Q2M`.
pub fn generate(now: DateTime<Utc>) -> String {
  let mut rng = rand::thread_rng();
  let suffix: String = (0..SUFFIX_LEN)
    .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
    .collect();
  format!("{PREFIX}{}{suffix}", now.timestamp_millis())
}
