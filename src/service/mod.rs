//! Operations spanning several records: registering users and opening or
//! answering tickets. Shared by the command line, the mailbox and imports.

mod tickets;
mod users;

pub use tickets::{NewTicket, TicketDesk};
pub use users::Directory;
