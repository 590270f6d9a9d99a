//! Time spent handlers
//!
//! Agents log the time they spend on tickets; the time is charged to the
//! ongoing contract attached to the ticket. Who may read the accounted and
//! the real durations is controlled by two distinct permissions.

use super::common::HandlerContext;
use crate::accounting::{ContractTimeAccounting, format_duration, parse_duration};
use crate::auth::Scope;
use crate::auth::permission::{
    ORGA_CREATE_TICKETS_TIME_SPENT, ORGA_SEE_TICKETS_TIME_SPENT_ACCOUNTED,
    ORGA_SEE_TICKETS_TIME_SPENT_REAL,
};
use crate::cli::output::OutputFormatter;
use crate::core::{Contract, Ticket, TimeSpent, User};
use crate::error::{BiletoError, Result};
use crate::storage::{Lookups, Repository};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(super) struct TimeSpentEntry {
    created_at: DateTime<Utc>,
    author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    real_time: Option<u32>,
    contract: Option<String>,
}

/// Time spent on a ticket as the user is allowed to see it
#[derive(Debug, Serialize)]
pub(super) struct TimeSpentView {
    #[serde(skip_serializing_if = "Option::is_none")]
    accounted: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    real: Option<u64>,
    entries: Vec<TimeSpentEntry>,
}

impl TimeSpentView {
    /// Build the view, or `None` when the user may see neither duration
    pub(super) fn of(ctx: &HandlerContext, user: &User, ticket: &Ticket) -> Result<Option<Self>> {
        let scope = Scope::Organization(&ticket.organization_id);
        let see_accounted = ctx
            .authorizer
            .is_granted(&user.id, ORGA_SEE_TICKETS_TIME_SPENT_ACCOUNTED, scope);
        let see_real = ctx
            .authorizer
            .is_granted(&user.id, ORGA_SEE_TICKETS_TIME_SPENT_REAL, scope);
        if !see_accounted && !see_real {
            return Ok(None);
        }

        let entries = ctx.storage.time_spents_of(&ticket.id)?;
        let accounted: u64 = entries.iter().map(|e| u64::from(e.time)).sum();
        let real: u64 = entries.iter().map(|e| u64::from(e.real_time)).sum();

        let entries = entries
            .iter()
            .map(|entry| TimeSpentEntry {
                created_at: entry.created_at,
                author: ctx.email_of(&entry.created_by),
                time: see_accounted.then_some(entry.time),
                real_time: see_real.then_some(entry.real_time),
                contract: entry.contract_id.as_ref().map(|id| {
                    ctx.storage
                        .load::<Contract>(id)
                        .map_or_else(|_| id.to_string(), |c| c.name)
                }),
            })
            .collect();

        Ok(Some(Self {
            accounted: see_accounted.then_some(accounted),
            real: see_real.then_some(real),
            entries,
        }))
    }

    pub(super) fn print(&self, output: &OutputFormatter) {
        if let Some(accounted) = self.accounted {
            output.field("Time spent", &format_duration(accounted));
        }
        if let Some(real) = self.real {
            output.field("Real time spent", &format_duration(real));
        }
    }
}

/// Describe freshly logged entries, e.g. `1h (Support 2024) + 30m (unaccounted)`
pub(super) fn describe_entries(ctx: &HandlerContext, entries: &[TimeSpent]) -> String {
    entries
        .iter()
        .map(|entry| {
            let contract = entry.contract_id.as_ref().map_or_else(
                || "unaccounted".to_string(),
                |id| {
                    ctx.storage
                        .load::<Contract>(id)
                        .map_or_else(|_| id.to_string(), |c| c.name)
                },
            );
            format!("{} ({contract})", format_duration(u64::from(entry.time)))
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Handler for `time add`
pub fn handle_time_add(
    ctx: &HandlerContext,
    ticket: &str,
    time: &str,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let ticket = ctx.ticket(&user, ticket)?;
    ctx.require_on(&user, ORGA_CREATE_TICKETS_TIME_SPENT, &ticket)?;
    let minutes = parse_duration(time)?;

    let entries = ContractTimeAccounting::new(&ctx.storage).log_time(&ticket, minutes, &user.id, None)?;
    tracing::info!(ticket = ticket.number, minutes, "time spent logged");

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket.number,
            "logged": minutes,
            "entries": entries,
        }))?;
    } else {
        output.success(&format!(
            "Logged {} on ticket {}",
            format_duration(u64::from(minutes)),
            ticket.reference()
        ));
        output.info(&format!("Charged: {}", describe_entries(ctx, &entries)));
    }
    Ok(())
}

/// Handler for `time report`
pub fn handle_time_report(ctx: &HandlerContext, ticket: &str, output: &OutputFormatter) -> Result<()> {
    let user = ctx.session()?;
    let ticket = ctx.ticket(&user, ticket)?;
    let view = TimeSpentView::of(ctx, &user, &ticket)?
        .ok_or_else(|| BiletoError::denied(ORGA_SEE_TICKETS_TIME_SPENT_ACCOUNTED))?;

    if output.is_json() {
        return output.print_json(&view);
    }

    output.title(&format!("Time spent on {} {}", ticket.reference(), ticket.title));
    if view.entries.is_empty() {
        output.info("No time spent logged");
        return Ok(());
    }
    for entry in &view.entries {
        let mut durations = Vec::new();
        if let Some(time) = entry.time {
            durations.push(format_duration(u64::from(time)));
        }
        if let Some(real) = entry.real_time {
            durations.push(format!("real {}", format_duration(u64::from(real))));
        }
        let contract = entry.contract.as_deref().unwrap_or("unaccounted");
        output.info(&format!(
            "{}  {}  {}  [{contract}]",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.author,
            durations.join(", ")
        ));
    }
    view.print(output);
    Ok(())
}
