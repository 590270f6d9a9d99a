//! Team and label commands

use super::common::HandlerContext;
use crate::auth::Scope;
use crate::auth::permission::{ADMIN_MANAGE_LABELS, ADMIN_MANAGE_TEAMS};
use crate::cli::output::OutputFormatter;
use crate::core::{Label, LabelColor, Team};
use crate::error::{BiletoError, Result};
use crate::storage::{Lookups, Repository};

pub fn handle_team_add(
    ctx: &HandlerContext,
    name: &str,
    responsible: bool,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_TEAMS)?;
    if ctx.storage.find_team_by_name(name)?.is_some() {
        return Err(BiletoError::AlreadyExists {
            kind: "Team",
            name: name.to_string(),
        });
    }

    let mut team = Team::new(name)?;
    team.is_responsible = responsible;
    ctx.storage.save(&team)?;

    if output.is_json() {
        output.print_json(&team)?;
    } else {
        output.success(&format!("Created team '{}'", team.name));
    }
    Ok(())
}

pub fn handle_team_list(ctx: &HandlerContext, output: &OutputFormatter) -> Result<()> {
    ctx.session()?;
    let mut teams = ctx.storage.load_all::<Team>()?;
    teams.sort_by(|a, b| a.name.cmp(&b.name));

    if output.is_json() {
        return output.print_json(&teams);
    }
    for team in &teams {
        let agents: Vec<String> = team.agents.iter().map(|id| ctx.email_of(id)).collect();
        let responsible = if team.is_responsible { " (responsible)" } else { "" };
        output.info(&format!("{}{responsible}: {}", team.name, agents.join(", ")));
    }
    Ok(())
}

/// Add an agent to a team; only users holding an agent role may join
pub fn handle_team_add_agent(
    ctx: &HandlerContext,
    team: &str,
    email: &str,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_TEAMS)?;
    let mut team = ctx
        .storage
        .find_team_by_name(team)?
        .ok_or_else(|| BiletoError::not_found("Team", team))?;
    let user = ctx.user(email)?;

    if !ctx.authorizer.is_agent(&user.id, Scope::Any) {
        return Err(BiletoError::Validation(format!("{} is not an agent", user.email)));
    }
    if !team.add_agent(user.id.clone()) {
        output.warning(&format!("{} is already in team '{}'", user.email, team.name));
        return Ok(());
    }
    ctx.storage.save(&team)?;

    if output.is_json() {
        output.print_json(&team)?;
    } else {
        output.success(&format!("Added {} to team '{}'", user.email, team.name));
    }
    Ok(())
}

pub fn handle_label_add(
    ctx: &HandlerContext,
    name: &str,
    color: &str,
    description: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_LABELS)?;
    if ctx.storage.find_label_by_name(name)?.is_some() {
        return Err(BiletoError::AlreadyExists {
            kind: "Label",
            name: name.to_string(),
        });
    }

    let color: LabelColor = color.parse()?;
    let mut label = Label::new(name, color)?;
    label.description = description.unwrap_or_default().to_string();
    ctx.storage.save(&label)?;

    if output.is_json() {
        output.print_json(&label)?;
    } else {
        output.success(&format!("Created label '{}' ({})", label.name, label.color));
    }
    Ok(())
}

pub fn handle_label_list(ctx: &HandlerContext, output: &OutputFormatter) -> Result<()> {
    ctx.session()?;
    let mut labels = ctx.storage.load_all::<Label>()?;
    labels.sort_by(|a, b| a.name.cmp(&b.name));

    if output.is_json() {
        return output.print_json(&labels);
    }
    for label in &labels {
        if label.description.is_empty() {
            output.info(&format!("{} ({})", label.name, label.color));
        } else {
            output.info(&format!("{} ({}): {}", label.name, label.color, label.description));
        }
    }
    Ok(())
}
