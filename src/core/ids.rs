//! Strongly typed identifiers
//!
//! Each entity kind gets its own UUID newtype so that a `UserId` can never be
//! passed where an `OrganizationId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse an identifier from its string form
            pub fn parse_str(s: &str) -> std::result::Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }

            /// The underlying UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// First eight hex characters, for compact display
            #[must_use]
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Self::parse_str(s)
            }
        }
    };
}

entity_id!(
    /// Identifier of an [`Organization`](super::Organization)
    OrganizationId
);
entity_id!(
    /// Identifier of a [`User`](super::User)
    UserId
);
entity_id!(
    /// Identifier of a [`Team`](super::Team)
    TeamId
);
entity_id!(
    /// Identifier of a [`Label`](super::Label)
    LabelId
);
entity_id!(
    /// Identifier of a [`Ticket`](super::Ticket)
    TicketId
);
entity_id!(
    /// Identifier of a [`Message`](super::Message)
    MessageId
);
entity_id!(
    /// Identifier of a [`Contract`](super::Contract)
    ContractId
);
entity_id!(
    /// Identifier of a [`TimeSpent`](super::TimeSpent)
    TimeSpentId
);
entity_id!(
    /// Identifier of a [`Role`](crate::auth::Role)
    RoleId
);
entity_id!(
    /// Identifier of an [`Authorization`](crate::auth::Authorization)
    AuthorizationId
);
entity_id!(
    /// Identifier of a stored [`MailboxEmail`](crate::mailbox::MailboxEmail)
    MailboxEmailId
);
entity_id!(
    /// Identifier of a queued [`OutgoingEmail`](crate::notifications::OutgoingEmail)
    OutgoingEmailId
);
