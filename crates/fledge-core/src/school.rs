//! Operational identity of the centre — the configuration-owned facts that
//! appear in outbound emails but never vary per registration.

use serde::{Deserialize, Serialize};

/// Banking details printed into the confirmation email so a guardian can pay
/// by EFT and quote the payment reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankingDetails {
  pub bank_name:      String,
  pub account_name:   String,
  pub account_number: String,
  pub branch_code:    String,
  pub account_type:   String,
}

/// The centre's operational profile, supplied by configuration and validated
/// at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolProfile {
  pub name:            String,
  pub contact_email:   String,
  pub contact_phone:   String,
  pub banking:         BankingDetails,
  /// Public base URL used to build the upload-proof-of-payment link.
  pub public_base_url: String,
  /// Where approved guardians access the parent app.
  pub app_url:         String,
}

impl SchoolProfile {
  /// The upload-proof link for a given payment reference.
  pub fn upload_url(&self, reference: &str) -> String {
    format!(
      "{}/upload-payment?ref={reference}",
      self.public_base_url.trim_end_matches('/')
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn profile(base_url: &str) -> SchoolProfile {
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
      public_base_url: base_url.into(),
      app_url:         "https://app.acornhouse.example".into(),
    }
  }

  #[test]
  fn upload_url_carries_reference() {
    let url = profile("https://acornhouse.example").upload_url("REG123ABCDE");
    assert_eq!(url, "https://acornhouse.example/upload-payment?ref=REG123ABCDE");
  }

  #[test]
  fn upload_url_tolerates_trailing_slash() {
    let url = profile("https://acornhouse.example/").upload_url("REG123ABCDE");
    assert_eq!(url, "https://acornhouse.example/upload-payment?ref=REG123ABCDE");
  }
}
