//! Contract commands

use super::common::HandlerContext;
use crate::accounting::{ContractTimeAccounting, RenewOptions, build_report, export_time_spents_csv, format_duration, renew};
use crate::auth::permission::{ORGA_MANAGE_CONTRACTS, ORGA_SEE_CONTRACTS};
use crate::cli::output::OutputFormatter;
use crate::core::{Contract, ContractBuilder, Organization, Ticket};
use crate::error::{BiletoError, Result};
use crate::storage::{Lookups, Repository};
use chrono::{NaiveDate, Utc};
use std::fs::File;
use std::io;

/// Parameters for `contract add`
pub struct ContractParams<'a> {
    pub name: &'a str,
    pub org: &'a str,
    pub start: &'a str,
    pub end: &'a str,
    pub max_hours: u32,
    pub unit: u32,
    pub hours_alert: u32,
    pub date_alert: u32,
    pub notes: Option<&'a str>,
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        BiletoError::InvalidInput(format!("Invalid date: {value}. Use the YYYY-MM-DD format"))
    })
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Load a contract the user may see, with its organization
fn visible_contract(ctx: &HandlerContext, reference: &str, permission: &str) -> Result<(Contract, Organization)> {
    let contract = ctx.contract(reference)?;
    let organization = ctx.storage.load::<Organization>(&contract.organization_id)?;
    ctx.member(permission, &organization)?;
    Ok((contract, organization))
}

pub fn handle_contract_add(ctx: &HandlerContext, params: ContractParams<'_>, output: &OutputFormatter) -> Result<()> {
    let organization = ctx.organization(params.org)?;
    ctx.member(ORGA_MANAGE_CONTRACTS, &organization)?;

    let contract = ContractBuilder::new(organization.id.clone())
        .name(params.name.trim())
        .period(parse_date(params.start)?, parse_date(params.end)?)
        .max_hours(params.max_hours)
        .time_accounting_unit(params.unit)
        .hours_alert(params.hours_alert)
        .date_alert(params.date_alert)
        .notes(params.notes.unwrap_or_default())
        .build();
    contract.validate()?;
    ctx.storage.save(&contract)?;
    tracing::info!(contract = %contract.name, organization = %organization.name, "contract created");

    if output.is_json() {
        output.print_json(&contract)?;
    } else {
        output.success(&format!("Created contract '{}' for {}", contract.name, organization.name));
        output.info(&format!(
            "{} to {}, {}h",
            contract.start_at, contract.end_at, contract.max_hours
        ));
    }
    Ok(())
}

/// Handler for `contract list`, restricted to the organizations whose
/// contracts the user may see
pub fn handle_contract_list(ctx: &HandlerContext, org: Option<&str>, output: &OutputFormatter) -> Result<()> {
    let user = ctx.session()?;
    let organizations = match org {
        Some(reference) => {
            let organization = ctx.organization(reference)?;
            ctx.member(ORGA_SEE_CONTRACTS, &organization)?;
            vec![organization]
        },
        None => ctx
            .visible_organizations(&user)?
            .into_iter()
            .filter(|o| ctx.member(ORGA_SEE_CONTRACTS, o).is_ok())
            .collect(),
    };

    let accounting = ContractTimeAccounting::new(&ctx.storage);
    let today = today();
    let mut rows = Vec::new();
    for organization in &organizations {
        for contract in ctx.storage.contracts_of(organization)? {
            let consumed = accounting.consumed(&contract.id)?;
            rows.push((organization.name.clone(), contract, consumed));
        }
    }

    if output.is_json() {
        let contracts: Vec<_> = rows
            .iter()
            .map(|(organization, contract, consumed)| {
                serde_json::json!({
                    "organization": organization,
                    "contract": contract,
                    "status": contract.status(today, *consumed),
                    "consumed_minutes": consumed,
                })
            })
            .collect();
        return output.print_json(&contracts);
    }
    if rows.is_empty() {
        output.info("No contracts");
        return Ok(());
    }
    for (organization, contract, consumed) in &rows {
        output.info(&format!(
            "{} ({organization}) [{}] {} to {}, {} / {}h",
            contract.name,
            contract.status(today, *consumed),
            contract.start_at,
            contract.end_at,
            format_duration(*consumed),
            contract.max_hours
        ));
    }
    Ok(())
}

pub fn handle_contract_show(ctx: &HandlerContext, reference: &str, output: &OutputFormatter) -> Result<()> {
    let (contract, organization) = visible_contract(ctx, reference, ORGA_SEE_CONTRACTS)?;
    let report = build_report(&ctx.storage, &contract, today())?;

    if output.is_json() {
        return output.print_json(&serde_json::json!({
            "organization": organization.name,
            "contract": contract,
            "report": report,
        }));
    }

    output.title(&format!("{} ({})", contract.name, organization.name));
    output.field("Status", &report.status.to_string());
    output.field("Period", &format!("{} to {}", contract.start_at, contract.end_at));
    output.field(
        "Consumed",
        &format!(
            "{} / {}h ({:.0}%)",
            format_duration(report.consumed_minutes),
            contract.max_hours,
            report.consumption_percent
        ),
    );
    output.field("Remaining", &format_duration(report.remaining_minutes));
    if contract.time_accounting_unit > 0 {
        output.field("Accounting unit", &format!("{}m", contract.time_accounting_unit));
    }
    if report.alerts.hours {
        output.warning(&format!("More than {}% of the hours are consumed", contract.hours_alert));
    }
    if report.alerts.date {
        output.warning(&format!("The contract ends in less than {} day(s)", contract.date_alert));
    }
    if !contract.notes.is_empty() {
        output.field("Notes", &contract.notes);
    }
    for usage in &report.tickets {
        output.info(&format!(
            "  #{} {}: {} (real {})",
            usage.number,
            usage.title,
            format_duration(usage.accounted_minutes),
            format_duration(usage.real_minutes)
        ));
    }
    Ok(())
}

/// Handler for `contract renew`
///
/// With `--attach-open-tickets` the open tickets of the former contract are
/// moved to the new one.
pub fn handle_contract_renew(
    ctx: &HandlerContext,
    reference: &str,
    name: Option<&str>,
    max_hours: Option<u32>,
    end: Option<&str>,
    attach_open_tickets: bool,
    output: &OutputFormatter,
) -> Result<()> {
    let (contract, organization) = visible_contract(ctx, reference, ORGA_MANAGE_CONTRACTS)?;

    let renewed = renew(
        &contract,
        RenewOptions {
            name: name.map(str::to_string),
            max_hours,
            end_at: end.map(parse_date).transpose()?,
        },
    )?;
    ctx.storage.save(&renewed)?;

    let mut attached = Vec::new();
    if attach_open_tickets {
        let accounting = ContractTimeAccounting::new(&ctx.storage);
        let tickets = ctx
            .storage
            .find::<Ticket, _>(|t| t.is_open() && t.contract_ids.contains(&contract.id))?;
        for mut ticket in tickets {
            accounting.attach_contract(&mut ticket, &renewed)?;
            attached.push(ticket.number);
        }
    }
    attached.sort_unstable();
    tracing::info!(from = %contract.name, to = %renewed.name, tickets = attached.len(), "contract renewed");

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "contract": renewed,
            "attached_tickets": attached,
        }))?;
    } else {
        output.success(&format!(
            "Renewed '{}' as '{}' for {}",
            contract.name, renewed.name, organization.name
        ));
        output.info(&format!(
            "{} to {}, {}h",
            renewed.start_at, renewed.end_at, renewed.max_hours
        ));
        if !attached.is_empty() {
            output.info(&format!("Attached {} open ticket(s)", attached.len()));
        }
    }
    Ok(())
}

/// Handler for `contract export`: time spent as CSV, to a file or stdout
pub fn handle_contract_export(
    ctx: &HandlerContext,
    reference: &str,
    path: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let (contract, _) = visible_contract(ctx, reference, ORGA_SEE_CONTRACTS)?;

    match path {
        Some(path) => {
            let rows = export_time_spents_csv(&ctx.storage, &contract, File::create(path)?)?;
            if output.is_json() {
                output.print_json(&serde_json::json!({
                    "status": "success",
                    "contract": contract.name,
                    "rows": rows,
                    "path": path,
                }))?;
            } else {
                output.success(&format!("Exported {rows} time spent entr(y/ies) to {path}"));
            }
        },
        None => {
            export_time_spents_csv(&ctx.storage, &contract, io::stdout().lock())?;
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::handlers::handle_time_add;
    use crate::test_utils::TestProject;
    use chrono::Duration;

    const ALIX: &str = "alix@acme.com";

    fn day(offset: i64) -> String {
        (today() + Duration::days(offset)).format("%Y-%m-%d").to_string()
    }

    fn params<'a>(start: &'a str, end: &'a str) -> ContractParams<'a> {
        ContractParams {
            name: "Support",
            org: "Acme",
            start,
            end,
            max_hours: 10,
            unit: 15,
            hours_alert: 80,
            date_alert: 0,
            notes: Some("Business hours only"),
        }
    }

    fn project() -> TestProject {
        let project = TestProject::new();
        project.add_organization("Acme", "acme.com");
        project.add_user(ALIX, None);
        let (start, end) = (day(-10), day(20));
        handle_contract_add(&project.context(None), params(&start, &end), &project.output).unwrap();
        project
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(matches!(parse_date("01/03/2024"), Err(BiletoError::InvalidInput(_))));
    }

    #[test]
    fn test_requester_cannot_add_contracts() {
        let project = project();
        let alix = project.context(Some(ALIX));
        let (start, end) = (day(0), day(30));
        let result = handle_contract_add(&alix, params(&start, &end), &project.output);
        assert!(matches!(result, Err(BiletoError::PermissionDenied { .. })));
    }

    #[test]
    fn test_contract_end_must_follow_start() {
        let project = project();
        let (start, end) = (day(5), day(1));
        let result = handle_contract_add(&project.context(None), params(&start, &end), &project.output);
        assert!(matches!(result, Err(BiletoError::Validation(_))));
    }

    #[test]
    fn test_renew_attaches_open_tickets() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Server room");
        assert_eq!(ticket.contract_ids.len(), 1);

        let admin = project.context(None);
        handle_contract_renew(&admin, "Support", Some("Support next"), None, None, true, &project.output).unwrap();

        let renewed = admin.contract("Support next").unwrap();
        assert_eq!(renewed.start_at, today() + Duration::days(21));
        assert_eq!(renewed.max_hours, 10);
        let ticket = admin.storage.load::<Ticket>(&ticket.id).unwrap();
        assert!(ticket.contract_ids.contains(&renewed.id));
    }

    #[test]
    fn test_export_time_spent() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Backup failed");
        let admin = project.context(None);
        handle_time_add(&admin, &ticket.number.to_string(), "10m", &project.output).unwrap();

        let path = project.project_root.join("support.csv");
        handle_contract_export(&admin, "Support", path.to_str(), &project.output).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("date,ticket,title,author,real_time,time"));
        let row = lines.next().unwrap();
        assert!(row.contains("Backup failed"));
        assert!(row.ends_with(",10,15"));
    }
}
