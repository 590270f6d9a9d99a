use super::validation::validate_name;
use super::{ContractId, MessageId, OrganizationId, TicketId, TimeSpentId, UserId};
use crate::error::{BiletoError, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a contract relative to a date and its consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Coming,
    Ongoing,
    Finished,
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coming => write!(f, "coming"),
            Self::Ongoing => write!(f, "ongoing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Alerts raised when a contract nears its limits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContractAlerts {
    pub hours: bool,
    pub date: bool,
}

impl ContractAlerts {
    pub const fn any(&self) -> bool {
        self.hours || self.date
    }
}

/// Upper bound of `date_alert`, in days
pub const MAX_DATE_ALERT_DAYS: u32 = 3660;

/// A prepaid support contract giving an organization a number of hours
///
/// `start_at` and `end_at` are both covered by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub start_at: NaiveDate,
    pub end_at: NaiveDate,
    pub max_hours: u32,
    /// Time spent is rounded up to a multiple of this many minutes (0 disables)
    #[serde(default)]
    pub time_accounting_unit: u32,
    /// Consumption percentage triggering an alert (0 disables)
    #[serde(default)]
    pub hours_alert: u32,
    /// Days before the end date triggering an alert (0 disables)
    #[serde(default)]
    pub date_alert: u32,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// Check the invariants of a contract
    pub fn validate(&self) -> Result<()> {
        validate_name("Contract name", &self.name)?;
        if self.start_at >= self.end_at {
            return Err(BiletoError::Validation(
                "The end date must be after the start date".to_string(),
            ));
        }
        if self.max_hours == 0 {
            return Err(BiletoError::Validation(
                "The maximum hours must be greater than zero".to_string(),
            ));
        }
        if self.hours_alert > 100 {
            return Err(BiletoError::Validation(
                "The hours alert must be a percentage between 0 and 100".to_string(),
            ));
        }
        if self.date_alert > MAX_DATE_ALERT_DAYS {
            return Err(BiletoError::Validation(format!(
                "The date alert must be at most {MAX_DATE_ALERT_DAYS} days"
            )));
        }
        Ok(())
    }

    pub const fn max_minutes(&self) -> u64 {
        self.max_hours as u64 * 60
    }

    /// Minutes still available given the consumed minutes
    pub const fn remaining_minutes(&self, consumed: u64) -> u64 {
        self.max_minutes().saturating_sub(consumed)
    }

    /// Consumption as a percentage of the maximum, capped at 100
    pub fn consumption_percent(&self, consumed: u64) -> f64 {
        let max = self.max_minutes();
        if max == 0 {
            return 100.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let percent = consumed as f64 * 100.0 / max as f64;
        percent.min(100.0)
    }

    /// `Finished` the day after `end_at`, or once every hour is consumed
    pub fn status(&self, today: NaiveDate, consumed: u64) -> ContractStatus {
        if today < self.start_at {
            ContractStatus::Coming
        } else if today > self.end_at || consumed >= self.max_minutes() {
            ContractStatus::Finished
        } else {
            ContractStatus::Ongoing
        }
    }

    /// Whether the contract covers the date and still has time available
    pub fn is_ongoing(&self, today: NaiveDate, consumed: u64) -> bool {
        self.status(today, consumed) == ContractStatus::Ongoing
    }

    pub fn alerts(&self, today: NaiveDate, consumed: u64) -> ContractAlerts {
        let hours = self.hours_alert > 0
            && consumed * 100 >= self.max_minutes() * u64::from(self.hours_alert);
        // A threshold before the first representable date is always reached
        let date = self.date_alert > 0
            && self
                .end_at
                .checked_sub_days(Days::new(u64::from(self.date_alert)))
                .is_none_or(|threshold| today >= threshold);
        ContractAlerts { hours, date }
    }

    /// Length of the contract in days
    pub fn duration_days(&self) -> i64 {
        (self.end_at - self.start_at).num_days()
    }
}

/// Time worked on a ticket, possibly charged to a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpent {
    pub id: TimeSpentId,
    pub ticket_id: TicketId,
    pub contract_id: Option<ContractId>,
    /// Minutes actually worked
    pub real_time: u32,
    /// Minutes accounted, after rounding
    pub time: u32,
    pub message_id: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

impl TimeSpent {
    /// Unaccounted time spent: accounted time equals real time
    pub fn new(ticket_id: TicketId, real_time: u32, created_by: UserId) -> Self {
        Self {
            id: TimeSpentId::new(),
            ticket_id,
            contract_id: None,
            real_time,
            time: real_time,
            message_id: None,
            created_at: Utc::now(),
            created_by,
        }
    }

    pub const fn is_accounted(&self) -> bool {
        self.contract_id.is_some()
    }
}
