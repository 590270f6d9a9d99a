//! Command handlers
//!
//! Each handler takes the parsed arguments of one command, performs it
//! against the project opened in a [`HandlerContext`] and reports through
//! the [`OutputFormatter`](crate::cli::OutputFormatter).

mod common;
mod contract;
mod data;
mod init;
mod mailbox;
mod message;
mod org;
mod search;
mod teams;
mod tickets;
mod time;
mod users;

pub use common::HandlerContext;
pub use contract::{
    ContractParams, handle_contract_add, handle_contract_export, handle_contract_list,
    handle_contract_renew, handle_contract_show,
};
pub use data::{handle_data_csv, handle_data_export, handle_data_import};
pub use init::handle_init;
pub use mailbox::{handle_mailbox_collect, handle_mailbox_failed};
pub use message::handle_message_add;
pub use org::{handle_org_add, handle_org_delete, handle_org_edit, handle_org_list, handle_org_show};
pub use search::{handle_search, handle_search_delete, handle_search_list, handle_search_save};
pub use teams::{handle_label_add, handle_label_list, handle_team_add, handle_team_add_agent, handle_team_list};
pub use tickets::{
    EditTicketParams, NewTicketParams, handle_ticket_approve, handle_ticket_assign,
    handle_ticket_contract, handle_ticket_edit, handle_ticket_label, handle_ticket_list,
    handle_ticket_new, handle_ticket_observe, handle_ticket_refuse, handle_ticket_resolve,
    handle_ticket_show, handle_ticket_status,
};
pub use time::{handle_time_add, handle_time_report};
pub use users::{
    handle_role_add, handle_role_list, handle_role_show, handle_user_add, handle_user_grant,
    handle_user_list, handle_user_revoke, handle_user_show,
};
