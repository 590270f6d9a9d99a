//! bileto - multi-tenant IT-support ticketing
//!
//! This is the main entry point for the bileto CLI application.
//! It handles command-line argument parsing and dispatches to the appropriate
//! command handlers.

use bileto::cli::handlers::{self, ContractParams, EditTicketParams, HandlerContext, NewTicketParams};
use bileto::cli::{
    Cli, Commands, ContractCommands, DataCommands, LabelCommands, MailboxCommands, MessageCommands,
    OrgCommands, OutputFormatter, RoleCommands, SearchArgs, SearchCommands, TeamCommands,
    TicketCommands, TimeCommands, UserCommands,
};
use bileto::error::{BiletoError, Result};
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

/// Main entry point for the bileto CLI
///
/// Parses command-line arguments and executes the requested command.
/// Errors are reported on stderr with a hint when one is available.
fn main() {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.json, cli.no_color);

    if let Err(e) = run(cli, &formatter) {
        handle_error(&e, &formatter);
        process::exit(1);
    }
}

/// Set up logging on stderr
///
/// `--verbose` forces debug logs, otherwise `RUST_LOG` decides and only
/// warnings are shown by default.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the CLI application with the parsed arguments
///
/// # Errors
///
/// Returns any error that occurs during command execution
fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    init_logging(cli.verbose);

    let project = cli.project.as_deref();
    if let Commands::Init {
        name,
        admin_email,
        admin_name,
        force,
    } = &cli.command
    {
        return handlers::handle_init(
            name.as_deref(),
            admin_email,
            admin_name.as_deref(),
            *force,
            project,
            formatter,
        );
    }

    let ctx = HandlerContext::new(project, cli.as_user.as_deref())?;
    dispatch_command(&ctx, cli.command, formatter)
}

fn dispatch_command(ctx: &HandlerContext, command: Commands, formatter: &OutputFormatter) -> Result<()> {
    match command {
        Commands::Init { .. } => Err(BiletoError::ProjectAlreadyInitialized {
            path: ctx.data_dir.display().to_string(),
        }),
        Commands::Org { command } => dispatch_org_command(ctx, command, formatter),
        Commands::User { command } => dispatch_user_command(ctx, command, formatter),
        Commands::Role { command } => dispatch_role_command(ctx, command, formatter),
        Commands::Team { command } => dispatch_team_command(ctx, command, formatter),
        Commands::Label { command } => dispatch_label_command(ctx, command, formatter),
        Commands::Ticket { command } => dispatch_ticket_command(ctx, command, formatter),
        Commands::Message { command } => match command {
            MessageCommands::Add {
                ticket,
                content,
                confidential,
                time,
            } => handlers::handle_message_add(ctx, &ticket, &content, confidential, time.as_deref(), formatter),
        },
        Commands::Time { command } => match command {
            TimeCommands::Add { ticket, time } => handlers::handle_time_add(ctx, &ticket, &time, formatter),
            TimeCommands::Report { ticket } => handlers::handle_time_report(ctx, &ticket, formatter),
        },
        Commands::Contract { command } => dispatch_contract_command(ctx, command, formatter),
        Commands::Search(args) => dispatch_search_command(ctx, args, formatter),
        Commands::Mailbox { command } => match command {
            MailboxCommands::Collect { dir } => handlers::handle_mailbox_collect(ctx, dir.as_deref(), formatter),
            MailboxCommands::Failed => handlers::handle_mailbox_failed(ctx, formatter),
        },
        Commands::Data { command } => match command {
            DataCommands::Export { format, output } => {
                handlers::handle_data_export(ctx, &format, output.as_deref(), formatter)
            },
            DataCommands::Import { file, dry_run } => handlers::handle_data_import(ctx, &file, dry_run, formatter),
            DataCommands::Csv { output } => handlers::handle_data_csv(ctx, output.as_deref(), formatter),
        },
    }
}

fn dispatch_org_command(ctx: &HandlerContext, command: OrgCommands, formatter: &OutputFormatter) -> Result<()> {
    match command {
        OrgCommands::Add { name, domains } => handlers::handle_org_add(ctx, &name, domains.as_deref(), formatter),
        OrgCommands::List => handlers::handle_org_list(ctx, formatter),
        OrgCommands::Show { organization } => handlers::handle_org_show(ctx, &organization, formatter),
        OrgCommands::Edit {
            organization,
            name,
            domains,
        } => handlers::handle_org_edit(ctx, &organization, name.as_deref(), domains.as_deref(), formatter),
        OrgCommands::Delete { organization, force } => {
            handlers::handle_org_delete(ctx, &organization, force, formatter)
        },
    }
}

fn dispatch_user_command(ctx: &HandlerContext, command: UserCommands, formatter: &OutputFormatter) -> Result<()> {
    match command {
        UserCommands::Add {
            email,
            name,
            org,
            locale,
        } => handlers::handle_user_add(
            ctx,
            &email,
            name.as_deref(),
            org.as_deref(),
            locale.as_deref(),
            formatter,
        ),
        UserCommands::List => handlers::handle_user_list(ctx, formatter),
        UserCommands::Show { email } => handlers::handle_user_show(ctx, &email, formatter),
        UserCommands::Grant { email, role, org } => {
            handlers::handle_user_grant(ctx, &email, &role, org.as_deref(), formatter)
        },
        UserCommands::Revoke { email, role, org } => {
            handlers::handle_user_revoke(ctx, &email, &role, org.as_deref(), formatter)
        },
    }
}

fn dispatch_role_command(ctx: &HandlerContext, command: RoleCommands, formatter: &OutputFormatter) -> Result<()> {
    match command {
        RoleCommands::Add {
            name,
            role_type,
            permissions,
            description,
            default,
        } => handlers::handle_role_add(
            ctx,
            &name,
            &role_type,
            permissions.as_deref(),
            description.as_deref(),
            default,
            formatter,
        ),
        RoleCommands::List => handlers::handle_role_list(ctx, formatter),
        RoleCommands::Show { role } => handlers::handle_role_show(ctx, &role, formatter),
    }
}

fn dispatch_team_command(ctx: &HandlerContext, command: TeamCommands, formatter: &OutputFormatter) -> Result<()> {
    match command {
        TeamCommands::Add { name, responsible } => handlers::handle_team_add(ctx, &name, responsible, formatter),
        TeamCommands::List => handlers::handle_team_list(ctx, formatter),
        TeamCommands::AddAgent { team, email } => handlers::handle_team_add_agent(ctx, &team, &email, formatter),
    }
}

fn dispatch_label_command(ctx: &HandlerContext, command: LabelCommands, formatter: &OutputFormatter) -> Result<()> {
    match command {
        LabelCommands::Add {
            name,
            color,
            description,
        } => handlers::handle_label_add(ctx, &name, &color, description.as_deref(), formatter),
        LabelCommands::List => handlers::handle_label_list(ctx, formatter),
    }
}

fn dispatch_ticket_command(ctx: &HandlerContext, command: TicketCommands, formatter: &OutputFormatter) -> Result<()> {
    match command {
        TicketCommands::New {
            title,
            content,
            org,
            requester,
            assignee,
            ticket_type,
            urgency,
            impact,
            priority,
        } => handlers::handle_ticket_new(
            ctx,
            NewTicketParams {
                title: &title,
                content: content.as_deref(),
                org: org.as_deref(),
                requester: requester.as_deref(),
                assignee: assignee.as_deref(),
                ticket_type: ticket_type.as_deref(),
                urgency: urgency.as_deref(),
                impact: impact.as_deref(),
                priority: priority.as_deref(),
            },
            formatter,
        ),
        TicketCommands::List {
            status,
            org,
            assignee,
            sort,
            limit,
        } => handlers::handle_ticket_list(
            ctx,
            status.as_deref(),
            org.as_deref(),
            assignee.as_deref(),
            sort.as_deref(),
            limit,
            formatter,
        ),
        TicketCommands::Show { ticket } => handlers::handle_ticket_show(ctx, &ticket, formatter),
        TicketCommands::Edit {
            ticket,
            title,
            ticket_type,
            urgency,
            impact,
            priority,
            org,
        } => handlers::handle_ticket_edit(
            ctx,
            EditTicketParams {
                ticket: &ticket,
                title: title.as_deref(),
                ticket_type: ticket_type.as_deref(),
                urgency: urgency.as_deref(),
                impact: impact.as_deref(),
                priority: priority.as_deref(),
                org: org.as_deref(),
            },
            formatter,
        ),
        TicketCommands::Assign {
            ticket,
            user,
            team,
            unassign,
        } => handlers::handle_ticket_assign(ctx, &ticket, user.as_deref(), team.as_deref(), unassign, formatter),
        TicketCommands::Status { ticket, status } => handlers::handle_ticket_status(ctx, &ticket, &status, formatter),
        TicketCommands::Resolve { ticket, content } => {
            handlers::handle_ticket_resolve(ctx, &ticket, &content, formatter)
        },
        TicketCommands::Approve { ticket } => handlers::handle_ticket_approve(ctx, &ticket, formatter),
        TicketCommands::Refuse { ticket, content } => {
            handlers::handle_ticket_refuse(ctx, &ticket, content.as_deref(), formatter)
        },
        TicketCommands::Observe { ticket, email } => handlers::handle_ticket_observe(ctx, &ticket, &email, formatter),
        TicketCommands::Label { ticket, add, remove } => {
            handlers::handle_ticket_label(ctx, &ticket, add.as_deref(), remove.as_deref(), formatter)
        },
        TicketCommands::Contract { ticket, attach, detach } => {
            handlers::handle_ticket_contract(ctx, &ticket, attach.as_deref(), detach.as_deref(), formatter)
        },
    }
}

fn dispatch_contract_command(
    ctx: &HandlerContext,
    command: ContractCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    match command {
        ContractCommands::Add {
            name,
            org,
            start,
            end,
            max_hours,
            unit,
            hours_alert,
            date_alert,
            notes,
        } => handlers::handle_contract_add(
            ctx,
            ContractParams {
                name: &name,
                org: &org,
                start: &start,
                end: &end,
                max_hours,
                unit,
                hours_alert,
                date_alert,
                notes: notes.as_deref(),
            },
            formatter,
        ),
        ContractCommands::List { org } => handlers::handle_contract_list(ctx, org.as_deref(), formatter),
        ContractCommands::Show { contract } => handlers::handle_contract_show(ctx, &contract, formatter),
        ContractCommands::Renew {
            contract,
            name,
            max_hours,
            end,
            attach_open_tickets,
        } => handlers::handle_contract_renew(
            ctx,
            &contract,
            name.as_deref(),
            max_hours,
            end.as_deref(),
            attach_open_tickets,
            formatter,
        ),
        ContractCommands::Export { contract, output } => {
            handlers::handle_contract_export(ctx, &contract, output.as_deref(), formatter)
        },
    }
}

fn dispatch_search_command(ctx: &HandlerContext, args: SearchArgs, formatter: &OutputFormatter) -> Result<()> {
    match args.command {
        Some(SearchCommands::Save {
            name,
            query,
            description,
        }) => handlers::handle_search_save(ctx, &name, &query, description.as_deref(), formatter),
        Some(SearchCommands::List) => handlers::handle_search_list(ctx, formatter),
        Some(SearchCommands::Delete { name }) => handlers::handle_search_delete(ctx, &name, formatter),
        None => handlers::handle_search(
            ctx,
            args.query.as_deref(),
            args.sort.as_deref(),
            args.limit,
            formatter,
        ),
    }
}

/// Print an error with its hint
///
/// In JSON mode the error is also written as a JSON document on stdout.
fn handle_error(error: &BiletoError, formatter: &OutputFormatter) {
    formatter.error(&error.to_string());
    if let Some(suggestion) = error.suggestion() {
        formatter.info(&format!("\nSuggestion: {suggestion}"));
    }

    if formatter.is_json() {
        let _ = formatter.print_json(&serde_json::json!({
            "status": "error",
            "error": error.to_string(),
            "suggestion": error.suggestion(),
        }));
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        eprintln!("\nDebug information:");
        eprintln!("{error:?}");
    }
}
