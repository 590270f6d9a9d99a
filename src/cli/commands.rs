use clap::{Args, Parser, Subcommand};

/// Multi-tenant IT-support ticketing
#[derive(Parser, Debug)]
#[command(name = "bileto", version, about, long_about = None)]
pub struct Cli {
    /// Project directory (defaults to the closest directory holding `.bileto`)
    #[arg(short = 'p', long, global = true, env = "BILETO_PROJECT")]
    pub project: Option<String>,

    /// Act as this user (overrides `session.user`)
    #[arg(long = "as", global = true, value_name = "EMAIL")]
    pub as_user: Option<String>,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log debug information on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a project in the current directory
    Init {
        /// Project name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// E-mail of the first administrator
        #[arg(long)]
        admin_email: String,

        /// Name of the first administrator
        #[arg(long)]
        admin_name: Option<String>,

        /// Re-initialize an existing project
        #[arg(short, long)]
        force: bool,
    },

    /// Manage organizations
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },

    /// Manage users and their roles
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage roles
    Role {
        #[command(subcommand)]
        command: RoleCommands,
    },

    /// Manage teams of agents
    Team {
        #[command(subcommand)]
        command: TeamCommands,
    },

    /// Manage labels
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },

    /// Work on tickets
    Ticket {
        #[command(subcommand)]
        command: TicketCommands,
    },

    /// Answer tickets
    Message {
        #[command(subcommand)]
        command: MessageCommands,
    },

    /// Log and review time spent on tickets
    Time {
        #[command(subcommand)]
        command: TimeCommands,
    },

    /// Manage contracts
    Contract {
        #[command(subcommand)]
        command: ContractCommands,
    },

    /// Search tickets, or manage saved searches
    Search(SearchArgs),

    /// Import incoming e-mails
    Mailbox {
        #[command(subcommand)]
        command: MailboxCommands,
    },

    /// Export and import project data
    Data {
        #[command(subcommand)]
        command: DataCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrgCommands {
    /// Create an organization
    Add {
        name: String,

        /// Comma-separated e-mail domains owned by the organization
        #[arg(short, long)]
        domains: Option<String>,
    },

    /// List organizations
    List,

    /// Show an organization
    Show {
        /// Name or ID
        organization: String,
    },

    /// Rename an organization or change its domains
    Edit {
        organization: String,

        #[arg(long)]
        name: Option<String>,

        /// Comma-separated e-mail domains, replacing the current ones
        #[arg(short, long)]
        domains: Option<String>,
    },

    /// Delete an organization without tickets
    Delete {
        organization: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user
    Add {
        email: String,

        #[arg(short, long)]
        name: Option<String>,

        /// Default organization (derived from the e-mail domain when absent)
        #[arg(short, long)]
        org: Option<String>,

        /// Locale: en_GB or fr_FR
        #[arg(short, long)]
        locale: Option<String>,
    },

    /// List users
    List,

    /// Show a user and their authorizations
    Show { email: String },

    /// Grant a role to a user
    Grant {
        email: String,

        /// Role name or ID
        role: String,

        /// Organization the authorization is scoped to (global when absent)
        #[arg(short, long)]
        org: Option<String>,
    },

    /// Revoke a role from a user
    Revoke {
        email: String,

        role: String,

        /// Only revoke the authorization scoped to this organization
        #[arg(short, long)]
        org: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RoleCommands {
    /// Create a role
    Add {
        name: String,

        /// Role type: admin, agent or user
        #[arg(short = 't', long = "type")]
        role_type: String,

        /// Comma-separated permissions
        #[arg(long)]
        permissions: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Give this role to users created implicitly
        #[arg(long)]
        default: bool,
    },

    /// List roles
    List,

    /// Show a role and its permissions
    Show { role: String },
}

#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Create a team
    Add {
        name: String,

        /// Tickets assigned to the team are its responsibility
        #[arg(long)]
        responsible: bool,
    },

    /// List teams
    List,

    /// Add an agent to a team
    AddAgent { team: String, email: String },
}

#[derive(Subcommand, Debug)]
pub enum LabelCommands {
    /// Create a label
    Add {
        name: String,

        /// grey, primary, blue, green, orange or red
        #[arg(short, long, default_value = "grey")]
        color: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List labels
    List,
}

#[derive(Subcommand, Debug)]
pub enum TicketCommands {
    /// Open a ticket
    New {
        title: String,

        /// First message of the ticket
        #[arg(short = 'm', long)]
        content: Option<String>,

        /// Organization (defaults to the requester's one)
        #[arg(short, long)]
        org: Option<String>,

        /// Requester e-mail (defaults to the session user)
        #[arg(short, long)]
        requester: Option<String>,

        /// Assignee e-mail
        #[arg(short, long)]
        assignee: Option<String>,

        /// request or incident
        #[arg(short = 't', long = "type")]
        ticket_type: Option<String>,

        #[arg(long)]
        urgency: Option<String>,

        #[arg(long)]
        impact: Option<String>,

        #[arg(long)]
        priority: Option<String>,
    },

    /// List tickets
    List {
        /// Status or virtual status (open, finished)
        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        org: Option<String>,

        /// Assignee e-mail or @me
        #[arg(short, long)]
        assignee: Option<String>,

        #[arg(long)]
        sort: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a ticket and its messages
    Show { ticket: String },

    /// Change the title, type, urgency, impact, priority or organization
    Edit {
        ticket: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short = 't', long = "type")]
        ticket_type: Option<String>,

        #[arg(long)]
        urgency: Option<String>,

        #[arg(long)]
        impact: Option<String>,

        #[arg(long)]
        priority: Option<String>,

        /// Move the ticket to another organization
        #[arg(short, long)]
        org: Option<String>,
    },

    /// Assign a ticket to an agent and/or a team
    Assign {
        ticket: String,

        /// Agent e-mail
        #[arg(short, long, conflicts_with = "unassign")]
        user: Option<String>,

        /// Team name
        #[arg(long)]
        team: Option<String>,

        /// Remove the assignee
        #[arg(long)]
        unassign: bool,
    },

    /// Change the status of a ticket
    Status { ticket: String, status: String },

    /// Answer a ticket with its solution
    Resolve {
        ticket: String,

        /// Content of the solution
        content: String,
    },

    /// Approve the solution of a ticket, closing it
    Approve { ticket: String },

    /// Refuse the solution of a ticket, reopening it
    Refuse {
        ticket: String,

        /// Explain why the solution does not work
        #[arg(short = 'm', long)]
        content: Option<String>,
    },

    /// Add an observer to a ticket
    Observe { ticket: String, email: String },

    /// Add or remove labels
    Label {
        ticket: String,

        /// Comma-separated labels to add
        #[arg(short, long)]
        add: Option<String>,

        /// Comma-separated labels to remove
        #[arg(short, long)]
        remove: Option<String>,
    },

    /// Attach or detach a contract
    Contract {
        ticket: String,

        /// Contract to attach
        #[arg(short, long, conflicts_with = "detach")]
        attach: Option<String>,

        /// Contract to detach
        #[arg(short, long)]
        detach: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum MessageCommands {
    /// Add a message to a ticket
    Add {
        ticket: String,

        content: String,

        /// Only visible to agents
        #[arg(short, long)]
        confidential: bool,

        /// Also log time spent, e.g. 1h30m
        #[arg(short, long)]
        time: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TimeCommands {
    /// Log time spent on a ticket
    Add {
        ticket: String,

        /// Duration such as 1h30m, 2h, 45m or 90
        time: String,
    },

    /// Time spent on a ticket
    Report { ticket: String },
}

#[derive(Subcommand, Debug)]
pub enum ContractCommands {
    /// Create a contract
    Add {
        name: String,

        #[arg(short, long)]
        org: String,

        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: String,

        /// Last day, YYYY-MM-DD
        #[arg(long)]
        end: String,

        #[arg(long)]
        max_hours: u32,

        /// Time spent is rounded up to this many minutes
        #[arg(long, default_value_t = 0)]
        unit: u32,

        /// Alert when consumption reaches this percentage
        #[arg(long, default_value_t = 0)]
        hours_alert: u32,

        /// Alert this many days before the end
        #[arg(long, default_value_t = 0)]
        date_alert: u32,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List contracts
    List {
        #[arg(short, long)]
        org: Option<String>,
    },

    /// Show the consumption of a contract
    Show { contract: String },

    /// Create the contract following another one
    Renew {
        contract: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        max_hours: Option<u32>,

        /// Last day of the new contract, YYYY-MM-DD
        #[arg(long)]
        end: Option<String>,

        /// Attach the open tickets of the renewed contract
        #[arg(long)]
        attach_open_tickets: bool,
    },

    /// Export the time spent on a contract as CSV
    Export {
        contract: String,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct SearchArgs {
    #[command(subcommand)]
    pub command: Option<SearchCommands>,

    /// Query, e.g. `status:open assignee:@me printer`
    pub query: Option<String>,

    #[arg(short, long)]
    pub sort: Option<String>,

    #[arg(short, long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum SearchCommands {
    /// Save a query under a name, usable as @name
    Save {
        name: String,

        query: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List saved and built-in searches
    List,

    /// Delete a saved search
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum MailboxCommands {
    /// Import the e-mails waiting in the spool directory
    Collect {
        /// Spool directory (defaults to `mailbox.spool_dir`)
        #[arg(short, long)]
        dir: Option<String>,
    },

    /// List the e-mails that could not be imported
    Failed,
}

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Export every record of the project
    Export {
        /// json or yaml
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import a bundle exported by `data export`
    Import {
        file: String,

        /// Only check the bundle
        #[arg(long)]
        dry_run: bool,
    },

    /// Export the visible tickets as CSV
    Csv {
        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_query_or_subcommand() {
        let cli = Cli::parse_from(["bileto", "search", "status:open printer", "--limit", "5"]);
        match cli.command {
            Commands::Search(args) => {
                assert!(args.command.is_none());
                assert_eq!(args.query.as_deref(), Some("status:open printer"));
                assert_eq!(args.limit, Some(5));
            },
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from(["bileto", "--as", "alix@acme.example", "search", "list"]);
        assert_eq!(cli.as_user.as_deref(), Some("alix@acme.example"));
        assert!(matches!(
            cli.command,
            Commands::Search(SearchArgs {
                command: Some(SearchCommands::List),
                ..
            })
        ));
    }
}
