//! Organization commands

use super::common::HandlerContext;
use crate::auth::Authorization;
use crate::auth::permission::{ADMIN_MANAGE_ORGANIZATIONS, ORGA_SEE};
use crate::cli::output::OutputFormatter;
use crate::core::validation::parse_list;
use crate::core::{Contract, Organization, Ticket, User};
use crate::error::{BiletoError, Result};
use crate::storage::{Lookups, Repository};
use dialoguer::Confirm;

/// Domains already owned by another organization
fn check_domains(ctx: &HandlerContext, organization: &Organization) -> Result<()> {
    for domain in &organization.domains {
        if let Some(owner) = ctx.storage.find_organization_by_domain(domain)? {
            if owner.id != organization.id {
                return Err(BiletoError::AlreadyExists {
                    kind: "Domain",
                    name: format!("{domain} (owned by {})", owner.name),
                });
            }
        }
    }
    Ok(())
}

fn check_name(ctx: &HandlerContext, organization: &Organization) -> Result<()> {
    match ctx.storage.find_organization_by_name(&organization.name)? {
        Some(other) if other.id != organization.id => Err(BiletoError::AlreadyExists {
            kind: "Organization",
            name: organization.name.clone(),
        }),
        _ => Ok(()),
    }
}

pub fn handle_org_add(
    ctx: &HandlerContext,
    name: &str,
    domains: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_ORGANIZATIONS)?;

    let mut organization = Organization::new(name)?;
    organization.set_domains(parse_list(domains))?;
    check_name(ctx, &organization)?;
    check_domains(ctx, &organization)?;
    ctx.storage.save(&organization)?;

    if output.is_json() {
        output.print_json(&organization)?;
    } else {
        output.success(&format!("Created organization '{}'", organization.name));
        if !organization.domains.is_empty() {
            output.info(&format!("Domains: {}", organization.domains.join(", ")));
        }
    }
    Ok(())
}

pub fn handle_org_list(ctx: &HandlerContext, output: &OutputFormatter) -> Result<()> {
    let user = ctx.session()?;
    let organizations = ctx.visible_organizations(&user)?;

    if output.is_json() {
        return output.print_json(&organizations);
    }
    if organizations.is_empty() {
        output.info("No organizations");
        return Ok(());
    }
    for organization in &organizations {
        let domains = if organization.domains.is_empty() {
            String::new()
        } else {
            format!(" ({})", organization.domains.join(", "))
        };
        output.info(&format!("{}{domains}", organization.name));
    }
    Ok(())
}

pub fn handle_org_show(ctx: &HandlerContext, reference: &str, output: &OutputFormatter) -> Result<()> {
    let organization = ctx.organization(reference)?;
    let user = ctx.session()?;
    let visible = ctx.visible_organizations(&user)?;
    if !visible.iter().any(|o| o.id == organization.id) {
        return Err(BiletoError::denied(ORGA_SEE));
    }

    let tickets = ctx
        .storage
        .find::<Ticket, _>(|t| t.organization_id == organization.id)?;
    let open = tickets.iter().filter(|t| t.status.is_open()).count();
    let users = ctx
        .storage
        .count::<User, _>(|u| u.organization_id.as_ref() == Some(&organization.id))?;
    let contracts = ctx
        .storage
        .find::<Contract, _>(|c| c.organization_id == organization.id)?;

    if output.is_json() {
        return output.print_json(&serde_json::json!({
            "organization": organization,
            "tickets": tickets.len(),
            "open_tickets": open,
            "users": users,
            "contracts": contracts.iter().map(|c| &c.name).collect::<Vec<_>>(),
        }));
    }

    output.title(&organization.name);
    output.field("ID", &organization.id.to_string());
    output.field("Domains", &organization.domains.join(", "));
    output.field("Tickets", &format!("{} ({open} open)", tickets.len()));
    output.field("Users", &users.to_string());
    output.field(
        "Contracts",
        &contracts.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "),
    );
    Ok(())
}

pub fn handle_org_edit(
    ctx: &HandlerContext,
    reference: &str,
    name: Option<&str>,
    domains: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_ORGANIZATIONS)?;
    let mut organization = ctx.organization(reference)?;

    if let Some(name) = name {
        organization.rename(name)?;
        check_name(ctx, &organization)?;
    }
    if domains.is_some() {
        organization.set_domains(parse_list(domains))?;
        check_domains(ctx, &organization)?;
    }
    ctx.storage.save(&organization)?;

    if output.is_json() {
        output.print_json(&organization)?;
    } else {
        output.success(&format!("Updated organization '{}'", organization.name));
    }
    Ok(())
}

/// Delete an organization
///
/// Organizations still holding tickets or contracts are kept.
pub fn handle_org_delete(
    ctx: &HandlerContext,
    reference: &str,
    force: bool,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_ORGANIZATIONS)?;
    let organization = ctx.organization(reference)?;

    let tickets = ctx
        .storage
        .count::<Ticket, _>(|t| t.organization_id == organization.id)?;
    let contracts = ctx
        .storage
        .count::<Contract, _>(|c| c.organization_id == organization.id)?;
    if tickets > 0 || contracts > 0 {
        return Err(BiletoError::Validation(format!(
            "Organization '{}' still has {tickets} ticket(s) and {contracts} contract(s)",
            organization.name
        )));
    }

    if !force
        && !Confirm::new()
            .with_prompt(format!("Delete organization '{}'?", organization.name))
            .default(false)
            .interact()?
    {
        output.info("Cancelled");
        return Ok(());
    }

    for mut user in ctx
        .storage
        .find::<User, _>(|u| u.organization_id.as_ref() == Some(&organization.id))?
    {
        user.organization_id = None;
        ctx.storage.save(&user)?;
    }
    for authorization in ctx
        .storage
        .find::<Authorization, _>(|a| a.organization_id.as_ref() == Some(&organization.id))?
    {
        ctx.storage.delete::<Authorization>(&authorization.id)?;
    }
    ctx.storage.delete::<Organization>(&organization.id)?;

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "deleted": organization.name,
        }))?;
    } else {
        output.success(&format!("Deleted organization '{}'", organization.name));
    }
    Ok(())
}
