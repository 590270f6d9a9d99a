//! Core domain model
//!
//! Organizations, users, teams, labels, tickets, messages, contracts and
//! time spent. The types here only enforce their own invariants; rules that
//! involve several records (permissions, accounting, ingestion) live in the
//! dedicated modules.

mod builders;
mod contract;
mod ids;
mod message;
mod organization;
mod team;
mod ticket;
mod user;
pub mod validation;

pub use builders::{ContractBuilder, TicketBuilder};
pub use contract::{Contract, ContractAlerts, ContractStatus, TimeSpent};
pub use ids::{
    AuthorizationId, ContractId, LabelId, MailboxEmailId, MessageId, OrganizationId,
    OutgoingEmailId, RoleId, TeamId, TicketId, TimeSpentId, UserId,
};
pub use message::{Message, MessageVia};
pub use organization::Organization;
pub use team::{Label, LabelColor, Team};
pub use ticket::{Level, Status, Ticket, TicketType};
pub use user::{Locale, User};
