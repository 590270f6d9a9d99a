//! Command-line interface
//!
//! Argument parsing lives in [`commands`], the command implementations in
//! [`handlers`] and terminal rendering in [`output`].

mod commands;
pub mod handlers;
pub mod output;
pub mod utils;

pub use commands::{
    Cli, Commands, ContractCommands, DataCommands, LabelCommands, MailboxCommands,
    MessageCommands, OrgCommands, RoleCommands, SearchArgs, SearchCommands, TeamCommands,
    TicketCommands, TimeCommands, UserCommands,
};
pub use output::OutputFormatter;
pub use utils::find_project_root;
