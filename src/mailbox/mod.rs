//! Mail ingestion
//!
//! Incoming e-mails are fetched from a [`MailSource`], stored as
//! [`MailboxEmail`] records, then turned into tickets or answers by the
//! [`MailboxProcessor`]. E-mails failing to be processed stay in the mailbox
//! with their last error until they succeed or run out of attempts.

mod email;
mod processor;
mod source;

pub use email::{IncomingEmail, MailboxEmail};
pub use processor::{CollectReport, MailboxProcessor, Outcome};
#[cfg(test)]
pub use source::MockMailSource;
pub use source::{DirectorySource, MailSource};
