use super::consumed_minutes;
use crate::core::{Contract, ContractAlerts, ContractStatus, Ticket, TimeSpent, User};
use crate::error::Result;
use crate::storage::Repository;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

/// Time charged on a contract by one ticket
#[derive(Debug, Clone, Serialize)]
pub struct TicketUsage {
    pub number: u64,
    pub title: String,
    pub accounted_minutes: u64,
    pub real_minutes: u64,
}

/// Consumption summary of a contract
#[derive(Debug, Clone, Serialize)]
pub struct ContractReport {
    pub name: String,
    pub status: ContractStatus,
    pub start_at: NaiveDate,
    pub end_at: NaiveDate,
    pub max_minutes: u64,
    pub consumed_minutes: u64,
    pub remaining_minutes: u64,
    pub consumption_percent: f64,
    pub alerts: ContractAlerts,
    pub tickets: Vec<TicketUsage>,
}

/// Summarize the time charged on a contract, ticket by ticket
pub fn build_report<R: Repository>(repo: &R, contract: &Contract, today: NaiveDate) -> Result<ContractReport> {
    let entries = repo.find::<TimeSpent, _>(|t| t.contract_id.as_ref() == Some(&contract.id))?;
    let consumed = consumed_minutes(&contract.id, &entries);

    let mut per_ticket: HashMap<_, (u64, u64)> = HashMap::new();
    for entry in &entries {
        let usage = per_ticket.entry(entry.ticket_id.clone()).or_default();
        usage.0 += u64::from(entry.time);
        usage.1 += u64::from(entry.real_time);
    }

    let mut tickets: Vec<TicketUsage> = repo
        .find::<Ticket, _>(|t| per_ticket.contains_key(&t.id))?
        .into_iter()
        .map(|ticket| {
            let (accounted, real) = per_ticket.get(&ticket.id).copied().unwrap_or_default();
            TicketUsage {
                number: ticket.number,
                title: ticket.title,
                accounted_minutes: accounted,
                real_minutes: real,
            }
        })
        .collect();
    tickets.sort_by_key(|t| t.number);

    Ok(ContractReport {
        name: contract.name.clone(),
        status: contract.status(today, consumed),
        start_at: contract.start_at,
        end_at: contract.end_at,
        max_minutes: contract.max_minutes(),
        consumed_minutes: consumed,
        remaining_minutes: contract.remaining_minutes(consumed),
        consumption_percent: contract.consumption_percent(consumed),
        alerts: contract.alerts(today, consumed),
        tickets,
    })
}

/// Write the time spent charged on a contract as CSV, oldest first
///
/// Returns the number of rows written.
pub fn export_time_spents_csv<R: Repository, W: Write>(
    repo: &R,
    contract: &Contract,
    writer: W,
) -> Result<usize> {
    let mut entries = repo.find::<TimeSpent, _>(|t| t.contract_id.as_ref() == Some(&contract.id))?;
    entries.sort_by_key(|t| t.created_at);

    let tickets: HashMap<_, _> = repo
        .load_all::<Ticket>()?
        .into_iter()
        .map(|t| (t.id.clone(), t))
        .collect();
    let users: HashMap<_, _> = repo
        .load_all::<User>()?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["date", "ticket", "title", "author", "real_time", "time"])?;
    for entry in &entries {
        let ticket = tickets.get(&entry.ticket_id);
        csv.write_record([
            entry.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ticket.map(|t| t.reference()).unwrap_or_default(),
            ticket.map(|t| t.title.clone()).unwrap_or_default(),
            users
                .get(&entry.created_by)
                .map(|u| u.email.clone())
                .unwrap_or_default(),
            entry.real_time.to_string(),
            entry.time.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(entries.len())
}
