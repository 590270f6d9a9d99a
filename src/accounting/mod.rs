//! Contract time accounting
//!
//! Time spent on a ticket is charged to the ongoing contract of the ticket,
//! rounded up to the contract's accounting unit. When a contract cannot
//! absorb the whole rounded time, the entry is split between the contract
//! and an unaccounted remainder.

mod duration;
mod report;

pub use duration::{MAX_DURATION_MINUTES, format_duration, parse_duration};
pub use report::{ContractReport, TicketUsage, build_report, export_time_spents_csv};

use crate::core::{Contract, ContractId, MessageId, OrganizationId, Ticket, TicketId, TimeSpent, UserId};
use crate::error::{BiletoError, Result};
use crate::storage::{Lookups, Repository};
use chrono::{Datelike, Days, Months, NaiveDate, Utc};

/// Round minutes up to a multiple of the accounting unit (0 = no rounding)
///
/// Saturates at `u32::MAX` when the rounded value does not fit.
pub const fn round_time(minutes: u32, unit: u32) -> u32 {
    if unit == 0 {
        return minutes;
    }
    match minutes.div_ceil(unit).checked_mul(unit) {
        Some(rounded) => rounded,
        None => u32::MAX,
    }
}

/// Account `real_minutes` of work on a contract which already consumed
/// `consumed` minutes.
///
/// Returns one accounted entry, or an accounted entry followed by an
/// unaccounted remainder when the contract runs out of time. When nothing is
/// left on the contract, a single unaccounted entry is returned.
pub fn account(
    contract: &Contract,
    consumed: u64,
    ticket_id: &TicketId,
    real_minutes: u32,
    author: &UserId,
) -> Vec<TimeSpent> {
    let rounded = round_time(real_minutes, contract.time_accounting_unit);
    let remaining = u32::try_from(contract.remaining_minutes(consumed)).unwrap_or(u32::MAX);

    if remaining == 0 {
        return vec![TimeSpent::new(ticket_id.clone(), real_minutes, author.clone())];
    }

    let mut accounted = TimeSpent::new(ticket_id.clone(), real_minutes, author.clone());
    accounted.contract_id = Some(contract.id.clone());

    if rounded <= remaining {
        accounted.time = rounded;
        return vec![accounted];
    }

    let accounted_real = real_minutes.min(remaining);
    accounted.real_time = accounted_real;
    accounted.time = remaining;

    let rest_real = real_minutes - accounted_real;
    if rest_real == 0 {
        return vec![accounted];
    }
    let rest = TimeSpent::new(ticket_id.clone(), rest_real, author.clone());
    vec![accounted, rest]
}

/// Charge unaccounted entries to the contract, oldest first, while they fit.
///
/// Returns the number of entries accounted.
pub fn account_existing(contract: &Contract, consumed: u64, entries: &mut [TimeSpent]) -> usize {
    entries.sort_by_key(|e| e.created_at);
    let mut remaining = contract.remaining_minutes(consumed);
    let mut count = 0;
    for entry in entries.iter_mut().filter(|e| !e.is_accounted()) {
        let rounded = round_time(entry.real_time, contract.time_accounting_unit);
        if u64::from(rounded) > remaining {
            break;
        }
        entry.contract_id = Some(contract.id.clone());
        entry.time = rounded;
        remaining -= u64::from(rounded);
        count += 1;
    }
    count
}

/// Detach an entry from its contract
pub fn unaccount(entry: &mut TimeSpent) {
    entry.contract_id = None;
    entry.time = entry.real_time;
}

/// Minutes consumed on a contract by the given entries
pub fn consumed_minutes<'a>(contract_id: &ContractId, entries: impl IntoIterator<Item = &'a TimeSpent>) -> u64 {
    entries
        .into_iter()
        .filter(|e| e.contract_id.as_ref() == Some(contract_id))
        .map(|e| u64::from(e.time))
        .sum()
}

/// Overrides applied when renewing a contract
#[derive(Debug, Default, Clone)]
pub struct RenewOptions {
    pub name: Option<String>,
    pub max_hours: Option<u32>,
    pub end_at: Option<NaiveDate>,
}

/// Build the contract following `contract`: it starts the day after the end
/// date, lasts as long and keeps the same limits unless overridden.
pub fn renew(contract: &Contract, options: RenewOptions) -> Result<Contract> {
    let out_of_range =
        || BiletoError::Validation(format!("Contract '{}' cannot be renewed past the last supported date", contract.name));
    let start_at = contract.end_at.checked_add_days(Days::new(1)).ok_or_else(out_of_range)?;
    let end_at = match options.end_at {
        Some(end_at) => end_at,
        None => renewed_end(contract, start_at).ok_or_else(out_of_range)?,
    };
    let name = options
        .name
        .unwrap_or_else(|| renewed_name(&contract.name, contract.start_at.year(), start_at.year()));

    let renewed = Contract {
        id: ContractId::new(),
        organization_id: contract.organization_id.clone(),
        name,
        start_at,
        end_at,
        max_hours: options.max_hours.unwrap_or(contract.max_hours),
        time_accounting_unit: contract.time_accounting_unit,
        hours_alert: contract.hours_alert,
        date_alert: contract.date_alert,
        notes: contract.notes.clone(),
        created_at: Utc::now(),
    };
    renewed.validate()?;
    Ok(renewed)
}

/// End of the renewed period: whole months are kept as whole months,
/// otherwise the period keeps its length in days
fn renewed_end(contract: &Contract, start_at: NaiveDate) -> Option<NaiveDate> {
    let old_start = contract.start_at;
    let months = (start_at.year() - old_start.year()) * 12 + start_at.month() as i32
        - old_start.month() as i32;
    if start_at.day() == old_start.day() && months > 0 {
        if let Some(next) = start_at.checked_add_months(Months::new(months.unsigned_abs())) {
            return next.checked_sub_days(Days::new(1));
        }
    }
    let days = u64::try_from(contract.duration_days()).ok()?;
    start_at.checked_add_days(Days::new(days))
}

/// "Support 2024" becomes "Support 2025" when the new period starts in 2025
fn renewed_name(name: &str, old_year: i32, new_year: i32) -> String {
    if old_year != new_year && name.contains(&old_year.to_string()) {
        name.replace(&old_year.to_string(), &new_year.to_string())
    } else {
        name.to_string()
    }
}

/// Accounting operations against the store
pub struct ContractTimeAccounting<'a, R: Repository> {
    repo: &'a R,
}

impl<'a, R: Repository> ContractTimeAccounting<'a, R> {
    pub const fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Minutes already charged on a contract
    pub fn consumed(&self, contract_id: &ContractId) -> Result<u64> {
        let entries = self
            .repo
            .find::<TimeSpent, _>(|t| t.contract_id.as_ref() == Some(contract_id))?;
        Ok(consumed_minutes(contract_id, &entries))
    }

    /// The ongoing contract of an organization, the one ending first if several
    pub fn ongoing_contract(
        &self,
        organization_id: &OrganizationId,
        today: NaiveDate,
    ) -> Result<Option<Contract>> {
        let contracts = self
            .repo
            .find::<Contract, _>(|c| c.organization_id == *organization_id)?;
        self.first_ongoing(contracts, today)
    }

    /// The ongoing contract among those attached to the ticket
    pub fn ticket_contract(&self, ticket: &Ticket, today: NaiveDate) -> Result<Option<Contract>> {
        let contracts = self
            .repo
            .find::<Contract, _>(|c| ticket.contract_ids.contains(&c.id))?;
        self.first_ongoing(contracts, today)
    }

    fn first_ongoing(&self, mut contracts: Vec<Contract>, today: NaiveDate) -> Result<Option<Contract>> {
        contracts.sort_by_key(|c| c.end_at);
        for contract in contracts {
            let consumed = self.consumed(&contract.id)?;
            if contract.is_ongoing(today, consumed) {
                return Ok(Some(contract));
            }
        }
        Ok(None)
    }

    /// Record time spent on a ticket, charging its ongoing contract if any
    pub fn log_time(
        &self,
        ticket: &Ticket,
        real_minutes: u32,
        author: &UserId,
        message_id: Option<MessageId>,
    ) -> Result<Vec<TimeSpent>> {
        if real_minutes == 0 {
            return Err(BiletoError::InvalidInput(
                "Time spent must be greater than zero".to_string(),
            ));
        }

        let today = Utc::now().date_naive();
        let mut entries = match self.ticket_contract(ticket, today)? {
            Some(contract) => {
                let consumed = self.consumed(&contract.id)?;
                let entries = account(&contract, consumed, &ticket.id, real_minutes, author);
                if entries.len() > 1 {
                    tracing::info!(
                        contract = %contract.name,
                        ticket = ticket.number,
                        "contract exhausted, time spent split"
                    );
                }
                entries
            },
            None => vec![TimeSpent::new(ticket.id.clone(), real_minutes, author.clone())],
        };

        for entry in &mut entries {
            entry.message_id.clone_from(&message_id);
            self.repo.save(entry)?;
        }
        Ok(entries)
    }

    /// Attach a contract to a ticket and charge its unaccounted time spent
    pub fn attach_contract(&self, ticket: &mut Ticket, contract: &Contract) -> Result<usize> {
        if contract.organization_id != ticket.organization_id {
            return Err(BiletoError::Validation(format!(
                "Contract '{}' does not belong to the organization of ticket #{}",
                contract.name, ticket.number
            )));
        }
        ticket.attach_contract(contract.id.clone());
        self.repo.save(ticket)?;

        let consumed = self.consumed(&contract.id)?;
        let mut entries = self.repo.time_spents_of(&ticket.id)?;
        let count = account_existing(contract, consumed, &mut entries);
        for entry in entries.iter().filter(|e| e.contract_id.as_ref() == Some(&contract.id)) {
            self.repo.save(entry)?;
        }
        tracing::debug!(ticket = ticket.number, count, "accounted existing time spent");
        Ok(count)
    }

    /// Detach a contract from a ticket, releasing the time charged on it
    pub fn detach_contract(&self, ticket: &mut Ticket, contract_id: &ContractId) -> Result<()> {
        ticket.contract_ids.retain(|c| c != contract_id);
        self.repo.save(ticket)?;
        for mut entry in self.repo.time_spents_of(&ticket.id)? {
            if entry.contract_id.as_ref() == Some(contract_id) {
                unaccount(&mut entry);
                self.repo.save(&entry)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContractBuilder, ContractStatus, TicketBuilder};
    use crate::storage::FileStorage;
    use chrono::Duration;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn contract(max_hours: u32, unit: u32) -> Contract {
        ContractBuilder::new(OrganizationId::new())
            .name("Support 2024")
            .period(date("2024-01-01"), date("2024-12-31"))
            .max_hours(max_hours)
            .time_accounting_unit(unit)
            .build()
    }

    #[test]
    fn test_round_time() {
        assert_eq!(round_time(10, 0), 10);
        assert_eq!(round_time(10, 30), 30);
        assert_eq!(round_time(30, 30), 30);
        assert_eq!(round_time(31, 30), 60);
        assert_eq!(round_time(1, 15), 15);
    }

    #[test]
    fn test_round_time_saturates() {
        assert_eq!(round_time(u32::MAX, 30), u32::MAX);
        assert_eq!(round_time(u32::MAX - 1, 2), u32::MAX - 1);
        assert_eq!(round_time(u32::MAX, 0), u32::MAX);
    }

    #[test]
    fn test_account_rounds_up() {
        let contract = contract(10, 30);
        let entries = account(&contract, 0, &TicketId::new(), 20, &UserId::new());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].real_time, 20);
        assert_eq!(entries[0].time, 30);
        assert_eq!(entries[0].contract_id, Some(contract.id.clone()));
    }

    #[test]
    fn test_account_splits_when_contract_runs_out() {
        let contract = contract(1, 30);
        let entries = account(&contract, 30, &TicketId::new(), 50, &UserId::new());
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].real_time, entries[0].time), (30, 30));
        assert!(entries[0].is_accounted());
        assert_eq!((entries[1].real_time, entries[1].time), (20, 20));
        assert!(!entries[1].is_accounted());
    }

    #[test]
    fn test_account_rounding_overflow_without_remainder() {
        let contract = contract(1, 30);
        let entries = account(&contract, 40, &TicketId::new(), 10, &UserId::new());
        assert_eq!(entries.len(), 1);
        assert_eq!((entries[0].real_time, entries[0].time), (10, 20));
    }

    #[test]
    fn test_account_on_exhausted_contract() {
        let contract = contract(1, 0);
        let entries = account(&contract, 60, &TicketId::new(), 15, &UserId::new());
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_accounted());
        assert_eq!(entries[0].time, 15);
    }

    #[test]
    fn test_account_existing_stops_when_full() {
        let contract = contract(1, 15);
        let ticket = TicketId::new();
        let author = UserId::new();
        let now = Utc::now();
        let mut entries: Vec<TimeSpent> = [10, 40, 5]
            .iter()
            .enumerate()
            .map(|(i, minutes)| {
                let mut entry = TimeSpent::new(ticket.clone(), *minutes, author.clone());
                entry.created_at = now + Duration::minutes(i64::try_from(i).unwrap());
                entry
            })
            .collect();
        entries.reverse();

        let count = account_existing(&contract, 10, &mut entries);
        assert_eq!(count, 1);
        assert_eq!(entries[0].time, 15);
        assert!(entries[0].is_accounted());
        assert!(!entries[1].is_accounted());
        assert!(!entries[2].is_accounted());
    }

    #[test]
    fn test_unaccount() {
        let contract = contract(10, 30);
        let mut entry = account(&contract, 0, &TicketId::new(), 20, &UserId::new()).remove(0);
        unaccount(&mut entry);
        assert!(!entry.is_accounted());
        assert_eq!(entry.time, 20);
    }

    #[test]
    fn test_renew() {
        let mut contract = contract(10, 30);
        contract.hours_alert = 80;
        let renewed = renew(&contract, RenewOptions::default()).unwrap();
        assert_eq!(renewed.start_at, date("2025-01-01"));
        assert_eq!(renewed.end_at, date("2025-12-31"));
        assert_eq!(renewed.name, "Support 2025");
        assert_eq!(renewed.max_hours, 10);
        assert_eq!(renewed.hours_alert, 80);
        assert_ne!(renewed.id, contract.id);

        let renewed = renew(
            &contract,
            RenewOptions {
                name: Some("Premium".to_string()),
                max_hours: Some(40),
                end_at: Some(date("2025-06-30")),
            },
        )
        .unwrap();
        assert_eq!(renewed.name, "Premium");
        assert_eq!(renewed.max_hours, 40);
        assert_eq!(renewed.end_at, date("2025-06-30"));

        let invalid = renew(
            &contract,
            RenewOptions {
                end_at: Some(date("2024-06-30")),
                ..RenewOptions::default()
            },
        );
        assert!(invalid.is_err());
    }

    #[test]
    fn test_renewal_leaves_no_gap() {
        let contract = contract(10, 0);
        let renewed = renew(&contract, RenewOptions::default()).unwrap();

        for day in ["2024-12-30", "2024-12-31", "2025-01-01", "2025-12-31"] {
            let ongoing = [&contract, &renewed]
                .iter()
                .filter(|c| c.is_ongoing(date(day), 0))
                .count();
            assert_eq!(ongoing, 1, "exactly one contract covers {day}");
        }
        assert_eq!(contract.status(date("2024-12-31"), 0), ContractStatus::Ongoing);
        assert_eq!(renewed.status(date("2024-12-31"), 0), ContractStatus::Coming);
        assert_eq!(renewed.status(date("2026-01-01"), 0), ContractStatus::Finished);
    }

    #[test]
    fn test_renew_keeps_length_in_days() {
        let contract = ContractBuilder::new(OrganizationId::new())
            .name("Trial")
            .period(date("2024-03-05"), date("2024-03-14"))
            .max_hours(2)
            .build();
        let renewed = renew(&contract, RenewOptions::default()).unwrap();
        assert_eq!(renewed.start_at, date("2024-03-15"));
        assert_eq!(renewed.end_at, date("2024-03-24"));
    }

    #[test]
    fn test_renew_at_the_last_date() {
        let contract = ContractBuilder::new(OrganizationId::new())
            .name("Forever")
            .period(NaiveDate::MAX - Duration::days(30), NaiveDate::MAX)
            .max_hours(2)
            .build();
        assert!(matches!(
            renew(&contract, RenewOptions::default()),
            Err(BiletoError::Validation(_))
        ));
    }

    #[test]
    fn test_log_time_and_attach_contract() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        let accounting = ContractTimeAccounting::new(&storage);

        let today = Utc::now().date_naive();
        let organization = OrganizationId::new();
        let contract = ContractBuilder::new(organization.clone())
            .name("Support")
            .period(today - Duration::days(10), today + Duration::days(10))
            .max_hours(1)
            .time_accounting_unit(30)
            .build();
        storage.save(&contract).unwrap();

        let agent = UserId::new();
        let mut ticket = TicketBuilder::new(organization.clone(), UserId::new())
            .number(1)
            .title("Slow network")
            .build();
        storage.save(&ticket).unwrap();

        // Without contract, time is not accounted
        let entries = accounting.log_time(&ticket, 20, &agent, None).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_accounted());

        assert_eq!(
            accounting.ongoing_contract(&organization, today).unwrap().map(|c| c.id),
            Some(contract.id.clone())
        );

        let count = accounting.attach_contract(&mut ticket, &contract).unwrap();
        assert_eq!(count, 1);
        assert_eq!(accounting.consumed(&contract.id).unwrap(), 30);

        let entries = accounting.log_time(&ticket, 45, &agent, None).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(accounting.consumed(&contract.id).unwrap(), 60);
        assert!(accounting.ticket_contract(&ticket, today).unwrap().is_none());

        accounting.detach_contract(&mut ticket, &contract.id).unwrap();
        assert_eq!(accounting.consumed(&contract.id).unwrap(), 0);
        assert!(ticket.contract_ids.is_empty());
        assert!(accounting.log_time(&ticket, 0, &agent, None).is_err());
    }

    #[test]
    fn test_attach_contract_of_other_organization_fails() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        let accounting = ContractTimeAccounting::new(&storage);
        let contract = contract(10, 0);
        let mut ticket = TicketBuilder::new(OrganizationId::new(), UserId::new())
            .title("Other")
            .build();
        assert!(accounting.attach_contract(&mut ticket, &contract).is_err());
    }
}
