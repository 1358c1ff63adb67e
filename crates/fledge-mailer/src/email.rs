//! Email payloads and their renderings.
//!
//! An email is a struct of facts; `render` produces the HTML and plain-text
//! channels from those same fields. Anything added to one channel must come
//! from the struct, which is what keeps the two variants content-equivalent
//! by construction rather than by discipline.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use fledge_core::{
  lifecycle::IssuedCredentials,
  registration::Registration,
  school::{BankingDetails, SchoolProfile},
};

/// Conventional symbol for the billing currency.
pub const CURRENCY_SYMBOL: &str = "R";

/// Length of the free trial granted on approval, in days.
pub const TRIAL_DAYS: u32 = 7;

/// Informational monthly-fee tiers by student age, shown in the confirmation
/// email. Charged in addition to the one-time registration fee.
pub const MONTHLY_FEE_TIERS: &[(&str, &str)] = &[
  ("6 months - 1 year", "R850.00/month"),
  ("1 - 3 years", "R720.00/month"),
  ("4 - 6 years", "R680.00/month"),
];

/// A composed email, ready for dispatch.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
  pub subject: String,
  pub html:    String,
  pub text:    String,
}

/// Render a currency amount with exactly two decimal places, e.g. `R300.00`.
pub fn format_money(amount: Decimal) -> String {
  let rounded =
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
  format!("{CURRENCY_SYMBOL}{rounded:.2}")
}

// ─── Confirmation ────────────────────────────────────────────────────────────

/// Facts rendered into the submission-confirmation email.
#[derive(Debug, Clone)]
pub struct ConfirmationEmail {
  pub guardian_name:     String,
  pub student_name:      String,
  pub school_name:       String,
  pub base_fee:          Decimal,
  pub final_fee:         Decimal,
  pub discount_applied:  bool,
  pub payment_reference: String,
  pub upload_url:        String,
  pub banking:           BankingDetails,
  pub contact_email:     String,
  pub contact_phone:     String,
  pub year:              i32,
}

impl ConfirmationEmail {
  pub fn from_registration(
    registration: &Registration,
    school: &SchoolProfile,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      guardian_name:     registration.guardian_name.clone(),
      student_name:      registration.student_name(),
      school_name:       registration.school_name.clone(),
      base_fee:          registration.base_fee,
      final_fee:         registration.final_fee,
      discount_applied:  registration.discount_applied,
      payment_reference: registration.payment_reference.clone(),
      upload_url:        school.upload_url(&registration.payment_reference),
      banking:           school.banking.clone(),
      contact_email:     school.contact_email.clone(),
      contact_phone:     school.contact_phone.clone(),
      year:              now.year(),
    }
  }

  pub fn subject(&self) -> String {
    format!(
      "Registration received - {} at {}",
      self.student_name, self.school_name
    )
  }

  pub fn render(&self) -> RenderedEmail {
    RenderedEmail {
      subject: self.subject(),
      html:    self.html(),
      text:    self.text(),
    }
  }

  /// The fee as displayed: discounted price beside the struck-through
  /// original whenever a discount applied.
  fn fee_html(&self) -> String {
    if self.discount_applied {
      format!(
        "<s>{}</s> <strong style=\"color:#16a34a;font-size:20px;\">{}</strong>",
        format_money(self.base_fee),
        format_money(self.final_fee)
      )
    } else {
      format!(
        "<strong style=\"font-size:20px;\">{}</strong>",
        format_money(self.final_fee)
      )
    }
  }

  fn fee_text(&self) -> String {
    if self.discount_applied {
      format!(
        "{} (was {}, discount applied)",
        format_money(self.final_fee),
        format_money(self.base_fee)
      )
    } else {
      format_money(self.final_fee)
    }
  }

  fn html(&self) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>Registration Received</title></head>\n");
    out.push_str("<body style=\"margin:0;padding:20px;font-family:Arial,sans-serif;background-color:#f5f5f5;color:#333;line-height:1.6;\">\n");
    out.push_str("<div style=\"max-width:600px;margin:0 auto;background-color:#ffffff;padding:30px;border-radius:8px;\">\n");

    out.push_str("<h1 style=\"color:#f59e0b;font-size:24px;margin:0 0 10px 0;\">Registration received</h1>\n");
    out.push_str(&format!("<p>Dear {},</p>\n", self.guardian_name));
    out.push_str(&format!(
      "<p>We have received your registration for <strong>{}</strong> at <strong>{}</strong>. \
       It cannot be approved until proof of payment has been uploaded and verified.</p>\n",
      self.student_name, self.school_name
    ));

    out.push_str("<h2 style=\"font-size:18px;border-bottom:2px solid #f59e0b;padding-bottom:8px;\">Registration fee</h2>\n");
    out.push_str(&format!("<p>{}</p>\n", self.fee_html()));

    // Banking block — first of the two places the reference appears.
    out.push_str("<h2 style=\"font-size:18px;border-bottom:2px solid #f59e0b;padding-bottom:8px;\">Banking details</h2>\n");
    out.push_str("<div style=\"background-color:#f8f9fa;padding:15px;border-radius:6px;\">\n");
    out.push_str(&format!("<p style=\"margin:6px 0;\"><strong>Bank:</strong> {}</p>\n", self.banking.bank_name));
    out.push_str(&format!("<p style=\"margin:6px 0;\"><strong>Account name:</strong> {}</p>\n", self.banking.account_name));
    out.push_str(&format!("<p style=\"margin:6px 0;\"><strong>Account number:</strong> {}</p>\n", self.banking.account_number));
    out.push_str(&format!("<p style=\"margin:6px 0;\"><strong>Branch code:</strong> {}</p>\n", self.banking.branch_code));
    out.push_str(&format!("<p style=\"margin:6px 0;\"><strong>Account type:</strong> {}</p>\n", self.banking.account_type));
    out.push_str(&format!(
      "<p style=\"margin:6px 0;\"><strong>Reference:</strong> <span style=\"font-family:monospace;font-weight:bold;color:#dc2626;\">{}</span></p>\n",
      self.payment_reference
    ));
    out.push_str(&format!("<p style=\"margin:6px 0;\"><strong>Amount:</strong> {}</p>\n", format_money(self.final_fee)));
    out.push_str("</div>\n");

    // Instructions block — the reference again, deliberately. Guardians copy
    // from whichever block they happen to read.
    out.push_str("<h2 style=\"font-size:18px;border-bottom:2px solid #f59e0b;padding-bottom:8px;\">Next steps</h2>\n");
    out.push_str("<ol>\n");
    out.push_str(&format!(
      "<li style=\"margin:8px 0;\">Pay {} by EFT using the reference <code style=\"font-weight:bold;\">{}</code> exactly as shown.</li>\n",
      format_money(self.final_fee),
      self.payment_reference
    ));
    out.push_str(&format!(
      "<li style=\"margin:8px 0;\">Upload your proof of payment: <a href=\"{}\">{}</a></li>\n",
      self.upload_url, self.upload_url
    ));
    out.push_str("<li style=\"margin:8px 0;\">Our team verifies the payment and approves the registration, usually within 1-2 business days.</li>\n");
    out.push_str("</ol>\n");

    out.push_str("<h2 style=\"font-size:18px;border-bottom:2px solid #f59e0b;padding-bottom:8px;\">Monthly fees</h2>\n");
    out.push_str("<div style=\"background-color:#f8f9fa;padding:15px;border-radius:6px;\">\n");
    for (tier, amount) in MONTHLY_FEE_TIERS {
      out.push_str(&format!(
        "<p style=\"margin:6px 0;\"><strong>{tier}:</strong> {amount}</p>\n"
      ));
    }
    out.push_str("</div>\n");
    out.push_str("<p style=\"font-size:14px;color:#666;\">Monthly fees are charged in addition to the one-time registration fee.</p>\n");

    out.push_str(&format!(
      "<p>Questions? Contact {} or {}.</p>\n",
      self.contact_email, self.contact_phone
    ));
    out.push_str(&format!(
      "<p>Thank you for choosing {}.</p>\n",
      self.school_name
    ));
    out.push_str(&format!(
      "<div style=\"margin-top:30px;padding-top:20px;border-top:1px solid #e5e7eb;font-size:12px;color:#6b7280;text-align:center;\">\
       <p>&copy; {} {}. All rights reserved.</p></div>\n",
      self.year, self.school_name
    ));

    out.push_str("</div>\n</body>\n</html>\n");
    out
  }

  fn text(&self) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str("REGISTRATION RECEIVED\n\n");
    out.push_str(&format!("Dear {},\n\n", self.guardian_name));
    out.push_str(&format!(
      "We have received your registration for {} at {}. It cannot be approved \
       until proof of payment has been uploaded and verified.\n\n",
      self.student_name, self.school_name
    ));

    out.push_str("REGISTRATION FEE\n----------------\n");
    out.push_str(&format!("{}\n\n", self.fee_text()));

    out.push_str("BANKING DETAILS\n---------------\n");
    out.push_str(&format!("Bank: {}\n", self.banking.bank_name));
    out.push_str(&format!("Account name: {}\n", self.banking.account_name));
    out.push_str(&format!("Account number: {}\n", self.banking.account_number));
    out.push_str(&format!("Branch code: {}\n", self.banking.branch_code));
    out.push_str(&format!("Account type: {}\n", self.banking.account_type));
    out.push_str(&format!("Reference: {}\n", self.payment_reference));
    out.push_str(&format!("Amount: {}\n\n", format_money(self.final_fee)));

    out.push_str("NEXT STEPS\n----------\n");
    out.push_str(&format!(
      "1. Pay {} by EFT using the reference {} exactly as shown.\n",
      format_money(self.final_fee),
      self.payment_reference
    ));
    out.push_str(&format!(
      "2. Upload your proof of payment: {}\n",
      self.upload_url
    ));
    out.push_str(
      "3. Our team verifies the payment and approves the registration, \
       usually within 1-2 business days.\n\n",
    );

    out.push_str("MONTHLY FEES\n------------\n");
    for (tier, amount) in MONTHLY_FEE_TIERS {
      out.push_str(&format!("{tier}: {amount}\n"));
    }
    out.push_str(
      "Monthly fees are charged in addition to the one-time registration fee.\n\n",
    );

    out.push_str(&format!(
      "Questions? Contact {} or {}.\n\n",
      self.contact_email, self.contact_phone
    ));
    out.push_str(&format!("Thank you for choosing {}.\n\n", self.school_name));
    out.push_str(&format!(
      "(c) {} {}. All rights reserved.\n",
      self.year, self.school_name
    ));
    out
  }
}

// ─── Welcome ─────────────────────────────────────────────────────────────────

/// Facts rendered into the approval/welcome email.
#[derive(Debug, Clone)]
pub struct WelcomeEmail {
  pub guardian_name:  String,
  pub guardian_email: String,
  pub temp_password:  String,
  pub student_name:   String,
  pub student_id:     String,
  pub school_name:    String,
  pub app_url:        String,
  pub year:           i32,
}

impl WelcomeEmail {
  pub fn from_registration(
    registration: &Registration,
    credentials: &IssuedCredentials,
    school: &SchoolProfile,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      guardian_name:  registration.guardian_name.clone(),
      guardian_email: registration.guardian_email.clone(),
      temp_password:  credentials.temp_password.clone(),
      student_name:   registration.student_name(),
      student_id:     credentials.student_id.clone(),
      school_name:    registration.school_name.clone(),
      app_url:        school.app_url.clone(),
      year:           now.year(),
    }
  }

  pub fn subject(&self) -> String {
    format!("Registration approved - welcome to {}", self.school_name)
  }

  pub fn render(&self) -> RenderedEmail {
    RenderedEmail {
      subject: self.subject(),
      html:    self.html(),
      text:    self.text(),
    }
  }

  fn html(&self) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>Registration Approved</title></head>\n");
    out.push_str("<body style=\"margin:0;padding:20px;font-family:Arial,sans-serif;background-color:#f5f5f5;color:#333;line-height:1.6;\">\n");
    out.push_str("<div style=\"max-width:600px;margin:0 auto;background-color:#ffffff;padding:30px;border-radius:8px;\">\n");

    out.push_str("<h1 style=\"color:#16a34a;font-size:24px;margin:0 0 10px 0;\">Registration approved</h1>\n");
    out.push_str(&format!("<p>Dear {},</p>\n", self.guardian_name));
    out.push_str(&format!(
      "<p>Your registration for <strong>{}</strong> at <strong>{}</strong> has been approved.</p>\n",
      self.student_name, self.school_name
    ));

    out.push_str("<h2 style=\"font-size:18px;border-bottom:2px solid #16a34a;padding-bottom:8px;\">Your login credentials</h2>\n");
    out.push_str("<div style=\"background-color:#f8f9fa;padding:15px;border-radius:6px;\">\n");
    out.push_str(&format!("<p style=\"margin:6px 0;\"><strong>Email:</strong> {}</p>\n", self.guardian_email));
    out.push_str(&format!(
      "<p style=\"margin:6px 0;\"><strong>Temporary password:</strong> <span style=\"font-family:monospace;\">{}</span></p>\n",
      self.temp_password
    ));
    out.push_str(&format!(
      "<p style=\"margin:6px 0;\"><strong>Student ID:</strong> <span style=\"font-family:monospace;\">{}</span></p>\n",
      self.student_id
    ));
    out.push_str("</div>\n");
    out.push_str("<p style=\"color:#dc2626;font-size:13px;\">Please change your password after your first login.</p>\n");

    out.push_str(&format!(
      "<p>Your {TRIAL_DAYS}-day free trial of the parent app starts now. \
       Sign in here: <a href=\"{}\">{}</a></p>\n",
      self.app_url, self.app_url
    ));

    out.push_str(&format!(
      "<p>We look forward to welcoming {} to {}.</p>\n",
      self.student_name, self.school_name
    ));
    out.push_str(&format!(
      "<div style=\"margin-top:30px;padding-top:20px;border-top:1px solid #e5e7eb;font-size:12px;color:#6b7280;text-align:center;\">\
       <p>&copy; {} {}. All rights reserved.</p></div>\n",
      self.year, self.school_name
    ));

    out.push_str("</div>\n</body>\n</html>\n");
    out
  }

  fn text(&self) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str("REGISTRATION APPROVED\n\n");
    out.push_str(&format!("Dear {},\n\n", self.guardian_name));
    out.push_str(&format!(
      "Your registration for {} at {} has been approved.\n\n",
      self.student_name, self.school_name
    ));

    out.push_str("YOUR LOGIN CREDENTIALS\n----------------------\n");
    out.push_str(&format!("Email: {}\n", self.guardian_email));
    out.push_str(&format!("Temporary password: {}\n", self.temp_password));
    out.push_str(&format!("Student ID: {}\n\n", self.student_id));
    out.push_str("Please change your password after your first login.\n\n");

    out.push_str(&format!(
      "Your {TRIAL_DAYS}-day free trial of the parent app starts now. \
       Sign in here: {}\n\n",
      self.app_url
    ));

    out.push_str(&format!(
      "We look forward to welcoming {} to {}.\n\n",
      self.student_name, self.school_name
    ));
    out.push_str(&format!(
      "(c) {} {}. All rights reserved.\n",
      self.year, self.school_name
    ));
    out
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
