//! Persistence layer
//!
//! Records live under the project's `.bileto/` directory as YAML documents,
//! one directory per collection. Services only talk to the [`Repository`]
//! trait and the [`Lookups`] helpers built on it.

mod file;
mod repository;

pub use file::{FileStorage, ProjectState};
pub(crate) use file::write_atomically;
pub use repository::{Entity, Lookups, Repository};

use crate::auth::{Authorization, Role};
use crate::core::{
    AuthorizationId, Contract, ContractId, Label, LabelId, MailboxEmailId, Message, MessageId,
    Organization, OrganizationId, OutgoingEmailId, RoleId, Team, TeamId, Ticket, TicketId,
    TimeSpent, TimeSpentId, User, UserId,
};
use crate::mailbox::MailboxEmail;
use crate::notifications::OutgoingEmail;

/// Directory holding the project data, relative to the project root
pub const DATA_DIR: &str = ".bileto";

macro_rules! entity {
    ($type:ty, $id:ty, $collection:literal, $kind:literal) => {
        impl Entity for $type {
            type Id = $id;
            const COLLECTION: &'static str = $collection;
            const KIND: &'static str = $kind;

            fn id(&self) -> &Self::Id {
                &self.id
            }
        }
    };
}

entity!(Organization, OrganizationId, "organizations", "Organization");
entity!(User, UserId, "users", "User");
entity!(Team, TeamId, "teams", "Team");
entity!(Label, LabelId, "labels", "Label");
entity!(Ticket, TicketId, "tickets", "Ticket");
entity!(Message, MessageId, "messages", "Message");
entity!(Contract, ContractId, "contracts", "Contract");
entity!(TimeSpent, TimeSpentId, "time_spents", "Time spent");
entity!(Role, RoleId, "roles", "Role");
entity!(Authorization, AuthorizationId, "authorizations", "Authorization");
entity!(MailboxEmail, MailboxEmailId, "mailbox", "Mailbox email");
entity!(OutgoingEmail, OutgoingEmailId, "outbox", "Outgoing email");
