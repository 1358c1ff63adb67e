//! Transactional email for the Fledge registration service.
//!
//! Each email is a typed payload struct ([`email::ConfirmationEmail`],
//! [`email::WelcomeEmail`]) rendered into both HTML and plain text from the
//! same fields, so the two channels cannot drift apart. Dispatch goes
//! through the [`sender::MailSender`] trait; the production implementation
//! POSTs to an external transactional-mail endpoint and never retries on its
//! own — retry policy belongs to the caller, tied to the registration's
//! transition.

pub mod email;
pub mod notifier;
pub mod sender;

pub use email::{ConfirmationEmail, RenderedEmail, WelcomeEmail};
pub use notifier::EmailNotifier;
pub use sender::{HttpMailer, LogSender, MailSender, MemorySender, OutboundEmail, SendError};
