use crate::core::MailboxEmailId;
use crate::core::validation::normalize_email;
use crate::error::Result;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*"?([^"<]*?)"?\s*<([^>]+)>\s*$"#).expect("address pattern is valid")
});

static TICKET_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[#(\d+)\]").expect("ticket tag pattern is valid"));

/// An already parsed incoming e-mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingEmail {
    /// Message-ID header
    pub message_id: String,
    /// From header, `Name <address>` or a bare address
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub in_reply_to: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    /// Auto-Submitted header
    #[serde(default)]
    pub auto_submitted: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl IncomingEmail {
    /// Sender address, normalized, and display name
    pub fn sender(&self) -> Result<(String, String)> {
        match ADDRESS_RE.captures(&self.from) {
            Some(caps) => Ok((normalize_email(&caps[2])?, caps[1].trim().to_string())),
            None => Ok((normalize_email(&self.from)?, String::new())),
        }
    }

    /// Mail sent by robots (auto-replies, bounces) must not open tickets
    pub fn is_auto_submitted(&self) -> bool {
        self.auto_submitted
            .as_deref()
            .is_some_and(|value| !value.trim().eq_ignore_ascii_case("no"))
    }

    /// Message-IDs this e-mail replies to, most specific first
    pub fn replied_ids(&self) -> Vec<&str> {
        self.in_reply_to
            .iter()
            .chain(self.references.iter().rev())
            .map(String::as_str)
            .collect()
    }

    /// Ticket number tagged in the subject as `[#42]`
    pub fn ticket_tag(&self) -> Option<u64> {
        TICKET_TAG_RE
            .captures(&self.subject)
            .and_then(|caps| caps[1].parse().ok())
    }
}

/// An incoming e-mail waiting to be processed, or failing to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxEmail {
    pub id: MailboxEmailId,
    pub email: IncomingEmail,
    pub last_error: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl MailboxEmail {
    pub fn new(email: IncomingEmail) -> Self {
        Self {
            id: MailboxEmailId::new(),
            email,
            last_error: None,
            attempts: 0,
            created_at: Utc::now(),
        }
    }

    /// Record a processing failure
    pub fn fail(&mut self, error: impl ToString) {
        self.last_error = Some(error.to_string());
        self.attempts += 1;
    }
}
