use crate::core::Ticket;
use crate::error::{BiletoError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Order of search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TicketSort {
    #[default]
    CreatedDesc,
    CreatedAsc,
    UpdatedDesc,
    UpdatedAsc,
    PriorityDesc,
    PriorityAsc,
    NumberAsc,
    NumberDesc,
}

impl TicketSort {
    pub const ALL: [Self; 8] = [
        Self::CreatedDesc,
        Self::CreatedAsc,
        Self::UpdatedDesc,
        Self::UpdatedAsc,
        Self::PriorityDesc,
        Self::PriorityAsc,
        Self::NumberAsc,
        Self::NumberDesc,
    ];

    fn compare(self, a: &Ticket, b: &Ticket) -> Ordering {
        let ordering = match self {
            Self::CreatedDesc => b.created_at.cmp(&a.created_at),
            Self::CreatedAsc => a.created_at.cmp(&b.created_at),
            Self::UpdatedDesc => b.updated_at.cmp(&a.updated_at),
            Self::UpdatedAsc => a.updated_at.cmp(&b.updated_at),
            Self::PriorityDesc => b.priority.cmp(&a.priority),
            Self::PriorityAsc => a.priority.cmp(&b.priority),
            Self::NumberAsc => a.number.cmp(&b.number),
            Self::NumberDesc => b.number.cmp(&a.number),
        };
        // Newest tickets first among equals
        ordering.then_with(|| b.number.cmp(&a.number))
    }

    pub fn sort(self, tickets: &mut [Ticket]) {
        tickets.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for TicketSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreatedDesc => "created-desc",
            Self::CreatedAsc => "created-asc",
            Self::UpdatedDesc => "updated-desc",
            Self::UpdatedAsc => "updated-asc",
            Self::PriorityDesc => "priority-desc",
            Self::PriorityAsc => "priority-asc",
            Self::NumberAsc => "number-asc",
            Self::NumberDesc => "number-desc",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TicketSort {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|sort| sort.to_string() == normalized)
            .ok_or_else(|| {
                let valid: Vec<_> = Self::ALL.iter().map(ToString::to_string).collect();
                BiletoError::InvalidInput(format!(
                    "Invalid sort: {s}. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Level, OrganizationId, TicketBuilder, UserId};
    use chrono::{Duration, Utc};

    fn tickets() -> Vec<Ticket> {
        let now = Utc::now();
        let organization = OrganizationId::new();
        let requester = UserId::new();
        vec![
            TicketBuilder::new(organization.clone(), requester.clone())
                .number(1)
                .priority(Level::Low)
                .created_at(now - Duration::days(3))
                .updated_at(now)
                .build(),
            TicketBuilder::new(organization.clone(), requester.clone())
                .number(2)
                .priority(Level::High)
                .created_at(now - Duration::days(2))
                .updated_at(now - Duration::days(2))
                .build(),
            TicketBuilder::new(organization, requester)
                .number(3)
                .priority(Level::Low)
                .created_at(now - Duration::days(1))
                .updated_at(now - Duration::days(1))
                .build(),
        ]
    }

    fn numbers(sort: TicketSort) -> Vec<u64> {
        let mut tickets = tickets();
        sort.sort(&mut tickets);
        tickets.iter().map(|t| t.number).collect()
    }

    #[test]
    fn test_sorts() {
        assert_eq!(numbers(TicketSort::default()), vec![3, 2, 1]);
        assert_eq!(numbers(TicketSort::CreatedAsc), vec![1, 2, 3]);
        assert_eq!(numbers(TicketSort::UpdatedDesc), vec![1, 3, 2]);
        assert_eq!(numbers(TicketSort::UpdatedAsc), vec![2, 3, 1]);
        assert_eq!(numbers(TicketSort::PriorityDesc), vec![2, 3, 1]);
        assert_eq!(numbers(TicketSort::PriorityAsc), vec![3, 1, 2]);
        assert_eq!(numbers(TicketSort::NumberDesc), vec![3, 2, 1]);
    }

    #[test]
    fn test_parse() {
        assert_eq!("priority-desc".parse::<TicketSort>().unwrap(), TicketSort::PriorityDesc);
        assert_eq!("Number_Asc".parse::<TicketSort>().unwrap(), TicketSort::NumberAsc);
        assert!("random".parse::<TicketSort>().is_err());
    }
}
