use super::validation::validate_name;
use super::{ContractId, LabelId, Message, MessageId, OrganizationId, TeamId, TicketId, UserId};
use crate::error::{BiletoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    New,
    InProgress,
    Planned,
    Pending,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::InProgress,
        Self::Planned,
        Self::Pending,
        Self::Resolved,
        Self::Closed,
    ];

    /// Statuses grouped under the virtual "open" status
    pub const OPEN: [Self; 4] = [Self::New, Self::InProgress, Self::Planned, Self::Pending];

    /// Statuses grouped under the virtual "finished" status
    pub const FINISHED: [Self; 2] = [Self::Resolved, Self::Closed];

    pub const fn is_open(self) -> bool {
        matches!(
            self,
            Self::New | Self::InProgress | Self::Planned | Self::Pending
        )
    }

    pub const fn is_finished(self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Planned => "planned",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Status {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "planned" => Ok(Self::Planned),
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            _ => Err(BiletoError::InvalidInput(format!(
                "Invalid status: {s}. Must be one of: new, in_progress, planned, pending, resolved, closed"
            ))),
        }
    }
}

/// Kind of ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    #[default]
    Request,
    Incident,
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Incident => write!(f, "incident"),
        }
    }
}

impl FromStr for TicketType {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "request" => Ok(Self::Request),
            "incident" => Ok(Self::Incident),
            _ => Err(BiletoError::InvalidInput(format!(
                "Invalid type: {s}. Must be one of: request, incident"
            ))),
        }
    }
}

/// Level used for urgency, impact and priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    /// Priority deduced from urgency and impact
    pub const fn from_matrix(urgency: Self, impact: Self) -> Self {
        match (urgency, impact) {
            (Self::Low, Self::Low | Self::Medium) | (Self::Medium, Self::Low) => Self::Low,
            (Self::Low, Self::High) | (Self::Medium, Self::Medium) | (Self::High, Self::Low) => {
                Self::Medium
            },
            (Self::Medium | Self::High, Self::High) | (Self::High, Self::Medium) => Self::High,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Level {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(BiletoError::InvalidInput(format!(
                "Invalid level: {s}. Must be one of: low, medium, high"
            ))),
        }
    }
}

/// A support request or incident reported by a requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    /// Project-wide sequential number, displayed as `#42`
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub updated_at: DateTime<Utc>,
    pub updated_by: UserId,
    #[serde(rename = "type", default)]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub status: Status,
    pub title: String,
    #[serde(default)]
    pub urgency: Level,
    #[serde(default)]
    pub impact: Level,
    #[serde(default)]
    pub priority: Level,
    pub requester_id: UserId,
    pub assignee_id: Option<UserId>,
    pub team_id: Option<TeamId>,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub observers: Vec<UserId>,
    #[serde(default)]
    pub labels: Vec<LabelId>,
    pub solution_id: Option<MessageId>,
    #[serde(default)]
    pub contract_ids: Vec<ContractId>,
}

impl Ticket {
    /// Create a new ticket with medium urgency and impact
    pub fn new(
        number: u64,
        title: impl Into<String>,
        organization_id: OrganizationId,
        requester_id: UserId,
        created_by: UserId,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        validate_name("Ticket title", &title)?;
        let now = Utc::now();
        Ok(Self {
            id: TicketId::new(),
            number,
            created_at: now,
            created_by: created_by.clone(),
            updated_at: now,
            updated_by: created_by,
            ticket_type: TicketType::default(),
            status: Status::New,
            title,
            urgency: Level::Medium,
            impact: Level::Medium,
            priority: Level::Medium,
            requester_id,
            assignee_id: None,
            team_id: None,
            organization_id,
            observers: Vec::new(),
            labels: Vec::new(),
            solution_id: None,
            contract_ids: Vec::new(),
        })
    }

    /// Record who changed the ticket and when
    pub fn touch(&mut self, user: &UserId) {
        self.updated_at = Utc::now();
        self.updated_by = user.clone();
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into().trim().to_string();
        validate_name("Ticket title", &title)?;
        self.title = title;
        Ok(())
    }

    /// Set urgency and impact, recomputing the priority from the matrix
    pub fn set_urgency_impact(&mut self, urgency: Level, impact: Level) {
        self.urgency = urgency;
        self.impact = impact;
        self.priority = Level::from_matrix(urgency, impact);
    }

    pub const fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub const fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub const fn is_closed(&self) -> bool {
        matches!(self.status, Status::Closed)
    }

    /// Whether the user is the requester, the assignee or an observer
    pub fn involves(&self, user_id: &UserId) -> bool {
        self.requester_id == *user_id
            || self.assignee_id.as_ref() == Some(user_id)
            || self.observers.contains(user_id)
    }

    /// Assign the ticket; a new ticket becomes in progress
    pub fn assign(&mut self, user_id: UserId) {
        self.assignee_id = Some(user_id);
        if self.status == Status::New {
            self.status = Status::InProgress;
        }
    }

    pub fn unassign(&mut self) {
        self.assignee_id = None;
    }

    /// Explicit status change by an agent
    pub fn set_status(&mut self, status: Status) {
        if self.status == Status::Resolved && status != Status::Closed {
            self.solution_id = None;
        }
        self.status = status;
    }

    /// Mark the ticket as resolved by the given message
    pub fn resolve(&mut self, message: &Message) -> Result<()> {
        if self.is_closed() {
            return Err(BiletoError::InvalidInput(format!(
                "Ticket #{} is closed",
                self.number
            )));
        }
        if message.ticket_id != self.id {
            return Err(BiletoError::InvalidInput(
                "The solution must be a message of this ticket".to_string(),
            ));
        }
        if message.is_confidential {
            return Err(BiletoError::InvalidInput(
                "A confidential message cannot be the solution".to_string(),
            ));
        }
        self.solution_id = Some(message.id.clone());
        self.status = Status::Resolved;
        Ok(())
    }

    /// The requester accepts the solution; the ticket is closed
    pub fn approve_solution(&mut self) -> Result<()> {
        if self.status != Status::Resolved {
            return Err(BiletoError::InvalidInput(format!(
                "Ticket #{} has no solution to approve",
                self.number
            )));
        }
        self.status = Status::Closed;
        Ok(())
    }

    /// The requester refuses the solution; the ticket goes back in progress
    pub fn refuse_solution(&mut self) -> Result<()> {
        if self.status != Status::Resolved {
            return Err(BiletoError::InvalidInput(format!(
                "Ticket #{} has no solution to refuse",
                self.number
            )));
        }
        self.solution_id = None;
        self.status = Status::InProgress;
        Ok(())
    }

    /// Fail if the ticket cannot receive new messages
    pub fn ensure_accepts_messages(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BiletoError::InvalidInput(format!(
                "Ticket #{} is closed and cannot be answered",
                self.number
            )));
        }
        Ok(())
    }

    /// A message from the requester reopens a pending ticket
    pub fn on_requester_answer(&mut self) {
        if self.status == Status::Pending {
            self.status = Status::InProgress;
        }
    }

    /// Add an observer; returns false if already involved
    pub fn add_observer(&mut self, user_id: UserId) -> bool {
        if self.observers.contains(&user_id) {
            return false;
        }
        self.observers.push(user_id);
        true
    }

    pub fn add_label(&mut self, label_id: LabelId) -> bool {
        if self.labels.contains(&label_id) {
            return false;
        }
        self.labels.push(label_id);
        true
    }

    pub fn remove_label(&mut self, label_id: &LabelId) -> bool {
        let before = self.labels.len();
        self.labels.retain(|l| l != label_id);
        before != self.labels.len()
    }

    pub fn attach_contract(&mut self, contract_id: ContractId) -> bool {
        if self.contract_ids.contains(&contract_id) {
            return false;
        }
        self.contract_ids.push(contract_id);
        true
    }

    /// Display reference such as `#42`
    pub fn reference(&self) -> String {
        format!("#{}", self.number)
    }
}
