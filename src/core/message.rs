use super::{MessageId, TicketId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel a message was posted through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageVia {
    #[default]
    Webapp,
    Email,
}

impl fmt::Display for MessageVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webapp => write!(f, "webapp"),
            Self::Email => write!(f, "email"),
        }
    }
}

/// A message in a ticket's discussion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub ticket_id: TicketId,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub content: String,
    /// Only visible to agents
    #[serde(default)]
    pub is_confidential: bool,
    #[serde(default)]
    pub via: MessageVia,
    /// Message-ID header of the e-mail this message came from or was sent as
    pub email_id: Option<String>,
}

impl Message {
    pub fn new(
        ticket_id: TicketId,
        created_by: UserId,
        content: impl Into<String>,
        is_confidential: bool,
        via: MessageVia,
    ) -> Self {
        Self {
            id: MessageId::new(),
            ticket_id,
            created_at: Utc::now(),
            created_by,
            content: content.into(),
            is_confidential,
            via,
            email_id: None,
        }
    }

    /// Attach the Message-ID of the e-mail carrying this message
    #[must_use]
    pub fn with_email_id(mut self, email_id: impl Into<String>) -> Self {
        self.email_id = Some(email_id.into());
        self
    }

    /// Message-ID used when the message is sent by e-mail
    pub fn outgoing_email_id(&self, host: &str) -> String {
        self.email_id
            .clone()
            .unwrap_or_else(|| format!("<message-{}@{host}>", self.id))
    }
}
