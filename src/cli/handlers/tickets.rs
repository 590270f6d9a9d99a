//! Ticket handlers
//!
//! Every handler loads the ticket through [`HandlerContext::ticket`], so a
//! ticket the session user may not see is reported as missing rather than
//! forbidden.

use super::common::HandlerContext;
use super::time::TimeSpentView;
use crate::accounting::ContractTimeAccounting;
use crate::auth::Scope;
use crate::auth::permission::{
    ORGA_UPDATE_TICKETS_ACTORS, ORGA_UPDATE_TICKETS_CONTRACTS, ORGA_UPDATE_TICKETS_LABELS,
    ORGA_UPDATE_TICKETS_ORGANIZATION, ORGA_UPDATE_TICKETS_PRIORITY, ORGA_UPDATE_TICKETS_STATUS,
    ORGA_UPDATE_TICKETS_TITLE, ORGA_UPDATE_TICKETS_TYPE,
};
use crate::cli::output::OutputFormatter;
use crate::core::validation::parse_list;
use crate::core::{Contract, Label, Level, MessageVia, Organization, Status, Team, Ticket, TicketType, User};
use crate::error::{BiletoError, Result};
use crate::search::{SavedSearches, TicketSearch, TicketSort};
use crate::service::{NewTicket, TicketDesk};
use crate::storage::{Lookups, Repository};
use chrono::Utc;

/// Parameters for `ticket new`
pub struct NewTicketParams<'a> {
    pub title: &'a str,
    pub content: Option<&'a str>,
    pub org: Option<&'a str>,
    pub requester: Option<&'a str>,
    pub assignee: Option<&'a str>,
    pub ticket_type: Option<&'a str>,
    pub urgency: Option<&'a str>,
    pub impact: Option<&'a str>,
    pub priority: Option<&'a str>,
}

/// Parameters for `ticket edit`
pub struct EditTicketParams<'a> {
    pub ticket: &'a str,
    pub title: Option<&'a str>,
    pub ticket_type: Option<&'a str>,
    pub urgency: Option<&'a str>,
    pub impact: Option<&'a str>,
    pub priority: Option<&'a str>,
    pub org: Option<&'a str>,
}

/// One-line summary of a ticket, used by listings
pub(super) fn ticket_line(ctx: &HandlerContext, ticket: &Ticket) -> String {
    let organization = ctx
        .storage
        .load::<Organization>(&ticket.organization_id)
        .map(|o| o.name)
        .unwrap_or_default();
    let assignee = ticket
        .assignee_id
        .as_ref()
        .map_or_else(|| "unassigned".to_string(), |id| ctx.email_of(id));
    format!(
        "{:>5} [{}] {:<6} {}  ({organization}, {assignee})",
        ticket.reference(),
        ticket.status,
        ticket.priority,
        ticket.title
    )
}

pub(super) fn print_tickets(ctx: &HandlerContext, tickets: &[Ticket], output: &OutputFormatter) -> Result<()> {
    if output.is_json() {
        return output.print_json(tickets);
    }
    if tickets.is_empty() {
        output.info("No tickets found");
        return Ok(());
    }
    for ticket in tickets {
        output.info(&ticket_line(ctx, ticket));
    }
    output.info(&format!("\n{} ticket(s)", tickets.len()));
    Ok(())
}

fn parse_opt<T: std::str::FromStr<Err = BiletoError>>(value: Option<&str>) -> Result<Option<T>> {
    value.map(str::parse).transpose()
}

fn team(ctx: &HandlerContext, name: &str) -> Result<Team> {
    ctx.storage
        .find_team_by_name(name)?
        .ok_or_else(|| BiletoError::not_found("Team", name))
}

fn label(ctx: &HandlerContext, name: &str) -> Result<Label> {
    ctx.storage
        .find_label_by_name(name)?
        .ok_or_else(|| BiletoError::not_found("Label", name))
}

/// Quote a qualifier value when it holds spaces
fn quote(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Handler for `ticket new`
///
/// The requester defaults to the session user and the organization to the
/// requester's own organization.
pub fn handle_ticket_new(ctx: &HandlerContext, params: NewTicketParams<'_>, output: &OutputFormatter) -> Result<()> {
    let user = ctx.session()?;
    let requester = match params.requester {
        Some(email) => ctx.user(email)?,
        None => user.clone(),
    };
    let organization = match (params.org, &requester.organization_id) {
        (Some(reference), _) => ctx.organization(reference)?,
        (None, Some(id)) => ctx.storage.load::<Organization>(id)?,
        (None, None) => {
            return Err(BiletoError::InvalidInput(format!(
                "{} belongs to no organization; use --org",
                requester.email
            )));
        },
    };
    let assignee = params.assignee.map(|email| ctx.user(email)).transpose()?;
    if let Some(assignee) = &assignee {
        if !ctx
            .authorizer
            .is_agent(&assignee.id, Scope::Organization(&organization.id))
        {
            return Err(BiletoError::Validation(format!(
                "{} is not an agent of {}",
                assignee.email, organization.name
            )));
        }
    }

    let mut new = NewTicket::new(
        organization.id.clone(),
        requester.id.clone(),
        params.title,
        params.content.unwrap_or_default(),
    );
    new.ticket_type = parse_opt::<TicketType>(params.ticket_type)?;
    new.urgency = parse_opt::<Level>(params.urgency)?;
    new.impact = parse_opt::<Level>(params.impact)?;
    new.priority = parse_opt::<Level>(params.priority)?;
    new.assignee_id = assignee.map(|a| a.id);
    let explicit_type = new.ticket_type.is_some();

    let desk = TicketDesk::new(&ctx.storage, &ctx.authorizer);
    let (mut ticket, message) = desk.open(&user.id, new)?;
    if !explicit_type && ticket.ticket_type != ctx.config.tickets.default_type {
        ticket.ticket_type = ctx.config.tickets.default_type;
        ctx.storage.save(&ticket)?;
    }
    let notification = ctx.notify_created(&ticket, message.as_ref());

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket,
            "notified": notification.map(|n| n.to),
        }))?;
    } else {
        output.success(&format!("Created ticket {}: {}", ticket.reference(), ticket.title));
        output.info(&format!("Organization: {}", organization.name));
        output.info(&format!("Type: {}  Priority: {}", ticket.ticket_type, ticket.priority));
        if !ticket.contract_ids.is_empty() {
            output.info("Attached to the ongoing contract of the organization");
        }
    }
    Ok(())
}

/// Handler for `ticket list`
///
/// Filters are turned into a search query; open tickets are listed unless
/// a status is given (`all` lifts the filter).
pub fn handle_ticket_list(
    ctx: &HandlerContext,
    status: Option<&str>,
    org: Option<&str>,
    assignee: Option<&str>,
    sort: Option<&str>,
    limit: Option<usize>,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;

    let mut query = Vec::new();
    match status {
        Some(s) if s.eq_ignore_ascii_case("all") => {},
        Some(s) => query.push(format!("status:{s}")),
        None => query.push("status:open".to_string()),
    }
    if let Some(org) = org {
        query.push(format!("org:{}", quote(org)));
    }
    if let Some(assignee) = assignee {
        query.push(format!("assignee:{assignee}"));
    }
    let sort = match sort {
        Some(s) => s.parse::<TicketSort>()?,
        None => ctx.config.search.default_sort,
    };

    let saved = SavedSearches::load(&ctx.data_dir)?;
    let tickets = TicketSearch::new(&ctx.storage, &ctx.authorizer, &saved, user.id.clone())
        .search(&query.join(" "), sort, limit)?;
    print_tickets(ctx, &tickets, output)
}

/// Handler for `ticket show`
pub fn handle_ticket_show(ctx: &HandlerContext, reference: &str, output: &OutputFormatter) -> Result<()> {
    let user = ctx.session()?;
    let ticket = ctx.ticket(&user, reference)?;
    let desk = TicketDesk::new(&ctx.storage, &ctx.authorizer);
    let messages = desk.visible_messages(&user.id, &ticket)?;
    let time_spent = TimeSpentView::of(ctx, &user, &ticket)?;

    let organization = ctx.storage.load::<Organization>(&ticket.organization_id)?;
    let team = ticket
        .team_id
        .as_ref()
        .and_then(|id| ctx.storage.load::<Team>(id).ok())
        .map(|t| t.name);
    let labels: Vec<String> = ticket
        .labels
        .iter()
        .filter_map(|id| ctx.storage.load::<Label>(id).ok())
        .map(|l| l.name)
        .collect();
    let contracts: Vec<String> = ticket
        .contract_ids
        .iter()
        .filter_map(|id| ctx.storage.load::<Contract>(id).ok())
        .map(|c| c.name)
        .collect();

    if output.is_json() {
        return output.print_json(&serde_json::json!({
            "ticket": ticket,
            "organization": organization.name,
            "requester": ctx.email_of(&ticket.requester_id),
            "assignee": ticket.assignee_id.as_ref().map(|id| ctx.email_of(id)),
            "team": team,
            "labels": labels,
            "contracts": contracts,
            "messages": messages,
            "time_spent": time_spent,
        }));
    }

    output.title(&format!("{} {}", ticket.reference(), ticket.title));
    output.field("Status", &ticket.status.to_string());
    output.field("Type", &ticket.ticket_type.to_string());
    output.field(
        "Priority",
        &format!("{} (urgency {}, impact {})", ticket.priority, ticket.urgency, ticket.impact),
    );
    output.field("Organization", &organization.name);
    output.field("Requester", &ctx.email_of(&ticket.requester_id));
    output.field(
        "Assignee",
        &ticket
            .assignee_id
            .as_ref()
            .map_or_else(|| "unassigned".to_string(), |id| ctx.email_of(id)),
    );
    if let Some(team) = &team {
        output.field("Team", team);
    }
    if !ticket.observers.is_empty() {
        let observers: Vec<String> = ticket.observers.iter().map(|id| ctx.email_of(id)).collect();
        output.field("Observers", &observers.join(", "));
    }
    if !labels.is_empty() {
        output.field("Labels", &labels.join(", "));
    }
    if !contracts.is_empty() {
        output.field("Contracts", &contracts.join(", "));
    }
    output.field("Created", &ticket.created_at.format("%Y-%m-%d %H:%M").to_string());
    output.field("Updated", &ticket.updated_at.format("%Y-%m-%d %H:%M").to_string());
    if let Some(time_spent) = &time_spent {
        time_spent.print(output);
    }

    for message in &messages {
        let mut tags = Vec::new();
        if message.is_confidential {
            tags.push("confidential");
        }
        if ticket.solution_id.as_ref() == Some(&message.id) {
            tags.push("solution");
        }
        if message.via == MessageVia::Email {
            tags.push("email");
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        output.info("");
        output.info(&format!(
            "--- {} on {}{tags}",
            ctx.email_of(&message.created_by),
            message.created_at.format("%Y-%m-%d %H:%M")
        ));
        output.info(&message.content);
    }
    Ok(())
}

/// Handler for `ticket edit`
///
/// Moving a ticket to another organization releases the contracts of the
/// former one and attaches the ongoing contract of the new one.
pub fn handle_ticket_edit(ctx: &HandlerContext, params: EditTicketParams<'_>, output: &OutputFormatter) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, params.ticket)?;

    let mut changes = Vec::new();
    if let Some(title) = params.title {
        ctx.require_on(&user, ORGA_UPDATE_TICKETS_TITLE, &ticket)?;
        ticket.set_title(title)?;
        changes.push("title");
    }
    if let Some(ticket_type) = parse_opt::<TicketType>(params.ticket_type)? {
        ctx.require_on(&user, ORGA_UPDATE_TICKETS_TYPE, &ticket)?;
        ticket.ticket_type = ticket_type;
        changes.push("type");
    }
    let urgency = parse_opt::<Level>(params.urgency)?;
    let impact = parse_opt::<Level>(params.impact)?;
    let priority = parse_opt::<Level>(params.priority)?;
    if urgency.is_some() || impact.is_some() || priority.is_some() {
        ctx.require_on(&user, ORGA_UPDATE_TICKETS_PRIORITY, &ticket)?;
        if urgency.is_some() || impact.is_some() {
            ticket.set_urgency_impact(urgency.unwrap_or(ticket.urgency), impact.unwrap_or(ticket.impact));
        }
        if let Some(priority) = priority {
            ticket.priority = priority;
        }
        changes.push("priority");
    }

    if let Some(reference) = params.org {
        let organization = ctx.organization(reference)?;
        if organization.id != ticket.organization_id {
            ctx.require_on(&user, ORGA_UPDATE_TICKETS_ORGANIZATION, &ticket)?;
            ctx.member(ORGA_UPDATE_TICKETS_ORGANIZATION, &organization)?;

            let accounting = ContractTimeAccounting::new(&ctx.storage);
            for contract_id in ticket.contract_ids.clone() {
                accounting.detach_contract(&mut ticket, &contract_id)?;
            }
            ticket.organization_id = organization.id.clone();
            if let Some(contract) = accounting.ongoing_contract(&organization.id, Utc::now().date_naive())? {
                accounting.attach_contract(&mut ticket, &contract)?;
            }
            changes.push("organization");
        }
    }

    if changes.is_empty() {
        output.warning("Nothing to update");
        return Ok(());
    }
    ticket.touch(&user.id);
    ctx.storage.save(&ticket)?;
    tracing::info!(ticket = %ticket.reference(), ?changes, "ticket updated");

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "updated": changes,
            "ticket": ticket,
        }))?;
    } else {
        output.success(&format!("Updated ticket {} ({})", ticket.reference(), changes.join(", ")));
    }
    Ok(())
}

/// Handler for `ticket assign`
pub fn handle_ticket_assign(
    ctx: &HandlerContext,
    reference: &str,
    assignee: Option<&str>,
    team_name: Option<&str>,
    unassign: bool,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    ctx.require_on(&user, ORGA_UPDATE_TICKETS_ACTORS, &ticket)?;

    if assignee.is_none() && team_name.is_none() && !unassign {
        return Err(BiletoError::InvalidInput(
            "Give a user, a team or --unassign".to_string(),
        ));
    }

    if let Some(name) = team_name {
        let team = team(ctx, name)?;
        ticket.team_id = Some(team.id);
    }
    if unassign {
        ticket.unassign();
        if team_name.is_none() {
            ticket.team_id = None;
        }
    } else if let Some(email) = assignee {
        let assignee = ctx.user(email)?;
        if !ctx
            .authorizer
            .is_agent(&assignee.id, Scope::Organization(&ticket.organization_id))
        {
            return Err(BiletoError::Validation(format!(
                "{} is not an agent of the ticket's organization",
                assignee.email
            )));
        }
        ticket.assign(assignee.id);
    }
    ticket.touch(&user.id);
    ctx.storage.save(&ticket)?;

    let assignee = ticket.assignee_id.as_ref().map(|id| ctx.email_of(id));
    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket.number,
            "assignee": assignee,
            "team": team_name,
        }))?;
    } else {
        match assignee {
            Some(email) => output.success(&format!("Assigned {} to {email}", ticket.reference())),
            None => output.success(&format!("Ticket {} is unassigned", ticket.reference())),
        }
        if let Some(team) = team_name {
            output.info(&format!("Team: {team}"));
        }
    }
    Ok(())
}

/// Handler for `ticket status`
pub fn handle_ticket_status(
    ctx: &HandlerContext,
    reference: &str,
    status: &str,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    ctx.require_on(&user, ORGA_UPDATE_TICKETS_STATUS, &ticket)?;
    let status: Status = status.parse()?;

    if status == Status::Resolved && ticket.solution_id.is_none() {
        return Err(BiletoError::InvalidInput(
            "A ticket is resolved with a solution; use `bileto ticket resolve`".to_string(),
        ));
    }
    let previous = ticket.status;
    ticket.set_status(status);
    ticket.touch(&user.id);
    ctx.storage.save(&ticket)?;
    tracing::info!(ticket = %ticket.reference(), from = %previous, to = %status, "status changed");

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket.number,
            "from": previous,
            "to": status,
        }))?;
    } else {
        output.success(&format!("Ticket {}: {previous} -> {status}", ticket.reference()));
    }
    Ok(())
}

/// Handler for `ticket resolve`: post the solution and resolve the ticket
pub fn handle_ticket_resolve(
    ctx: &HandlerContext,
    reference: &str,
    content: &str,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    ctx.require_on(&user, ORGA_UPDATE_TICKETS_STATUS, &ticket)?;
    ticket.ensure_accepts_messages()?;

    let desk = TicketDesk::new(&ctx.storage, &ctx.authorizer);
    let message = desk.answer(&user.id, &mut ticket, content, false, MessageVia::Webapp, None)?;
    ticket.resolve(&message)?;
    ctx.storage.save(&ticket)?;
    ctx.notify_message(&ticket, &message);

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket,
            "solution": message,
        }))?;
    } else {
        output.success(&format!("Resolved ticket {}", ticket.reference()));
        output.info("The requester can approve or refuse the solution");
    }
    Ok(())
}

/// The requester, or an agent allowed to change the status
fn require_requester_or_status(ctx: &HandlerContext, user: &User, ticket: &Ticket) -> Result<()> {
    if ticket.requester_id == user.id {
        return Ok(());
    }
    ctx.require_on(user, ORGA_UPDATE_TICKETS_STATUS, ticket)
}

/// Handler for `ticket approve`
pub fn handle_ticket_approve(ctx: &HandlerContext, reference: &str, output: &OutputFormatter) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    require_requester_or_status(ctx, &user, &ticket)?;

    ticket.approve_solution()?;
    ticket.touch(&user.id);
    ctx.storage.save(&ticket)?;

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket.number,
            "state": ticket.status,
        }))?;
    } else {
        output.success(&format!("Solution approved, ticket {} is closed", ticket.reference()));
    }
    Ok(())
}

/// Handler for `ticket refuse`, optionally explaining why
pub fn handle_ticket_refuse(
    ctx: &HandlerContext,
    reference: &str,
    content: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    require_requester_or_status(ctx, &user, &ticket)?;

    ticket.refuse_solution()?;
    ticket.touch(&user.id);
    ctx.storage.save(&ticket)?;

    let message = match content {
        Some(content) => {
            let desk = TicketDesk::new(&ctx.storage, &ctx.authorizer);
            let message = desk.answer(&user.id, &mut ticket, content, false, MessageVia::Webapp, None)?;
            ctx.notify_message(&ticket, &message);
            Some(message)
        },
        None => None,
    };

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket.number,
            "state": ticket.status,
            "message": message,
        }))?;
    } else {
        output.success(&format!("Solution refused, ticket {} is back in progress", ticket.reference()));
    }
    Ok(())
}

/// Handler for `ticket observe`
pub fn handle_ticket_observe(
    ctx: &HandlerContext,
    reference: &str,
    email: &str,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    ctx.require_on(&user, ORGA_UPDATE_TICKETS_ACTORS, &ticket)?;
    let observer = ctx.user(email)?;

    if !ticket.add_observer(observer.id.clone()) {
        output.warning(&format!("{} already observes {}", observer.email, ticket.reference()));
        return Ok(());
    }
    ticket.touch(&user.id);
    ctx.storage.save(&ticket)?;

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket.number,
            "observer": observer.email,
        }))?;
    } else {
        output.success(&format!("{} now observes {}", observer.email, ticket.reference()));
    }
    Ok(())
}

/// Handler for `ticket label`; both options take comma-separated names
pub fn handle_ticket_label(
    ctx: &HandlerContext,
    reference: &str,
    add: Option<&str>,
    remove: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    ctx.require_on(&user, ORGA_UPDATE_TICKETS_LABELS, &ticket)?;

    let mut added = Vec::new();
    for name in parse_list(add) {
        let label = label(ctx, &name)?;
        if ticket.add_label(label.id) {
            added.push(label.name);
        }
    }
    let mut removed = Vec::new();
    for name in parse_list(remove) {
        let label = label(ctx, &name)?;
        if ticket.remove_label(&label.id) {
            removed.push(label.name);
        }
    }

    if added.is_empty() && removed.is_empty() {
        output.warning("Labels unchanged");
        return Ok(());
    }
    ticket.touch(&user.id);
    ctx.storage.save(&ticket)?;

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket.number,
            "added": added,
            "removed": removed,
        }))?;
    } else {
        if !added.is_empty() {
            output.success(&format!("Added label(s): {}", added.join(", ")));
        }
        if !removed.is_empty() {
            output.success(&format!("Removed label(s): {}", removed.join(", ")));
        }
    }
    Ok(())
}

/// Handler for `ticket contract`
///
/// Attaching charges the time already spent on the ticket; detaching
/// releases it.
pub fn handle_ticket_contract(
    ctx: &HandlerContext,
    reference: &str,
    attach: Option<&str>,
    detach: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    ctx.require_on(&user, ORGA_UPDATE_TICKETS_CONTRACTS, &ticket)?;
    let accounting = ContractTimeAccounting::new(&ctx.storage);

    match (attach, detach) {
        (Some(reference), _) => {
            let contract = ctx.contract(reference)?;
            if ticket.contract_ids.contains(&contract.id) {
                output.warning(&format!("Contract '{}' is already attached", contract.name));
                return Ok(());
            }
            let accounted = accounting.attach_contract(&mut ticket, &contract)?;
            if output.is_json() {
                output.print_json(&serde_json::json!({
                    "status": "success",
                    "ticket": ticket.number,
                    "attached": contract.name,
                    "accounted_entries": accounted,
                }))?;
            } else {
                output.success(&format!("Attached contract '{}' to {}", contract.name, ticket.reference()));
                if accounted > 0 {
                    output.info(&format!("{accounted} time spent entr(y/ies) charged to the contract"));
                }
            }
        },
        (None, Some(reference)) => {
            let contract = ctx.contract(reference)?;
            if !ticket.contract_ids.contains(&contract.id) {
                return Err(BiletoError::not_found(
                    "Contract",
                    format!("{} on ticket {}", contract.name, ticket.reference()),
                ));
            }
            accounting.detach_contract(&mut ticket, &contract.id)?;
            if output.is_json() {
                output.print_json(&serde_json::json!({
                    "status": "success",
                    "ticket": ticket.number,
                    "detached": contract.name,
                }))?;
            } else {
                output.success(&format!("Detached contract '{}' from {}", contract.name, ticket.reference()));
            }
        },
        (None, None) => {
            return Err(BiletoError::InvalidInput(
                "Use --attach or --detach".to_string(),
            ));
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::handlers::handle_label_add;
    use crate::test_utils::TestProject;

    const ALIX: &str = "alix@acme.com";

    fn project() -> TestProject {
        let project = TestProject::new();
        project.add_organization("Acme", "acme.com");
        project.add_user(ALIX, None);
        project
    }

    fn reload(project: &TestProject, ticket: &Ticket) -> Ticket {
        project
            .context(None)
            .storage
            .load::<Ticket>(&ticket.id)
            .unwrap()
    }

    #[test]
    fn test_ticket_lifecycle() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Printer is broken");
        let reference = ticket.number.to_string();
        assert_eq!(ticket.status, Status::New);
        assert_eq!(ticket.requester_id, project.context(None).user(ALIX).unwrap().id);

        let admin = project.context(None);
        handle_ticket_assign(&admin, &reference, Some(TestProject::ADMIN), None, false, &project.output).unwrap();
        assert_eq!(reload(&project, &ticket).status, Status::InProgress);

        handle_ticket_resolve(&admin, &reference, "Restart the spooler", &project.output).unwrap();
        let resolved = reload(&project, &ticket);
        assert_eq!(resolved.status, Status::Resolved);
        assert!(resolved.solution_id.is_some());

        let alix = project.context(Some(ALIX));
        handle_ticket_approve(&alix, &reference, &project.output).unwrap();
        assert_eq!(reload(&project, &ticket).status, Status::Closed);
    }

    #[test]
    fn test_refused_solution_reopens_ticket() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "VPN drops");
        let reference = ticket.number.to_string();

        let admin = project.context(None);
        handle_ticket_resolve(&admin, &reference, "Update the client", &project.output).unwrap();

        let alix = project.context(Some(ALIX));
        handle_ticket_refuse(&alix, &reference, Some("Still dropping"), &project.output).unwrap();

        let refused = reload(&project, &ticket);
        assert_eq!(refused.status, Status::InProgress);
        assert!(refused.solution_id.is_none());
        assert_eq!(alix.storage.messages_of(&ticket.id).unwrap().len(), 3);
    }

    #[test]
    fn test_requester_cannot_change_status() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Screen flickers");

        let alix = project.context(Some(ALIX));
        let result = handle_ticket_status(&alix, &ticket.number.to_string(), "planned", &project.output);
        assert!(matches!(result, Err(BiletoError::PermissionDenied { .. })));
    }

    #[test]
    fn test_resolved_status_requires_solution() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Mail bounces");

        let admin = project.context(None);
        let result = handle_ticket_status(&admin, &ticket.number.to_string(), "resolved", &project.output);
        assert!(matches!(result, Err(BiletoError::InvalidInput(_))));
    }

    #[test]
    fn test_ticket_hidden_from_other_organizations() {
        let project = project();
        project.add_organization("Globex", "globex.com");
        project.add_user("bob@globex.com", None);
        let ticket = project.open_ticket(ALIX, "Badge reader");

        let bob = project.context(Some("bob@globex.com"));
        let result = handle_ticket_show(&bob, &ticket.number.to_string(), &project.output);
        assert!(matches!(result, Err(BiletoError::TicketNotFound { .. })));
    }

    #[test]
    fn test_new_ticket_needs_an_organization() {
        let project = project();
        let admin = project.context(None);
        let params = NewTicketParams {
            title: "Orphan",
            content: None,
            org: None,
            requester: None,
            assignee: None,
            ticket_type: None,
            urgency: None,
            impact: None,
            priority: None,
        };
        let result = handle_ticket_new(&admin, params, &project.output);
        assert!(matches!(result, Err(BiletoError::InvalidInput(_))));
    }

    #[test]
    fn test_ticket_labels() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Toner");
        let reference = ticket.number.to_string();

        let admin = project.context(None);
        handle_label_add(&admin, "printer", "blue", None, &project.output).unwrap();
        handle_ticket_label(&admin, &reference, Some("printer"), None, &project.output).unwrap();
        assert_eq!(reload(&project, &ticket).labels.len(), 1);

        handle_ticket_label(&admin, &reference, None, Some("printer"), &project.output).unwrap();
        assert!(reload(&project, &ticket).labels.is_empty());

        let result = handle_ticket_label(&admin, &reference, Some("unknown"), None, &project.output);
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("Acme"), "Acme");
        assert_eq!(quote("Acme Corp"), "\"Acme Corp\"");
    }
}
