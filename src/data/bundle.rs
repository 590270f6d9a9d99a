use crate::auth::{Authorization, Role};
use crate::core::{Contract, Label, Message, Organization, Team, Ticket, TimeSpent, User};
use crate::error::Result;
use crate::storage::Repository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BUNDLE_VERSION: u32 = 1;

/// Every record of a project, as exported and imported
///
/// The mailbox and the outbox are transient and not part of a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub authorizations: Vec<Authorization>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub contracts: Vec<Contract>,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub time_spents: Vec<TimeSpent>,
}

impl Default for Bundle {
    fn default() -> Self {
        Self {
            version: BUNDLE_VERSION,
            exported_at: Utc::now(),
            organizations: Vec::new(),
            roles: Vec::new(),
            users: Vec::new(),
            authorizations: Vec::new(),
            teams: Vec::new(),
            labels: Vec::new(),
            contracts: Vec::new(),
            tickets: Vec::new(),
            messages: Vec::new(),
            time_spents: Vec::new(),
        }
    }
}

impl Bundle {
    /// Gather all the records of a repository
    pub fn export<R: Repository>(repo: &R) -> Result<Self> {
        let mut tickets: Vec<Ticket> = repo.load_all()?;
        tickets.sort_by_key(|t| t.number);
        let mut messages: Vec<Message> = repo.load_all()?;
        messages.sort_by_key(|m| m.created_at);

        Ok(Self {
            organizations: repo.load_all()?,
            roles: repo.load_all()?,
            users: repo.load_all()?,
            authorizations: repo.load_all()?,
            teams: repo.load_all()?,
            labels: repo.load_all()?,
            contracts: repo.load_all()?,
            tickets,
            messages,
            time_spents: repo.load_all()?,
            ..Self::default()
        })
    }

    /// Number of records in the bundle
    pub fn len(&self) -> usize {
        self.organizations.len()
            + self.roles.len()
            + self.users.len()
            + self.authorizations.len()
            + self.teams.len()
            + self.labels.len()
            + self.contracts.len()
            + self.tickets.len()
            + self.messages.len()
            + self.time_spents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
