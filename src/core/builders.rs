use super::{
    Contract, ContractId, LabelId, Level, OrganizationId, Status, TeamId, Ticket, TicketId,
    TicketType, UserId,
};
use chrono::{DateTime, Months, NaiveDate, Utc};

/// Builder for creating Ticket instances
pub struct TicketBuilder {
    id: Option<TicketId>,
    number: u64,
    title: Option<String>,
    ticket_type: TicketType,
    status: Status,
    urgency: Level,
    impact: Level,
    priority: Option<Level>,
    organization_id: OrganizationId,
    requester_id: UserId,
    created_by: Option<UserId>,
    assignee_id: Option<UserId>,
    team_id: Option<TeamId>,
    observers: Vec<UserId>,
    labels: Vec<LabelId>,
    contract_ids: Vec<ContractId>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TicketBuilder {
    /// Create a new ticket builder for a requester in an organization
    #[must_use]
    pub const fn new(organization_id: OrganizationId, requester_id: UserId) -> Self {
        Self {
            id: None,
            number: 0,
            title: None,
            ticket_type: TicketType::Request,
            status: Status::New,
            urgency: Level::Medium,
            impact: Level::Medium,
            priority: None,
            organization_id,
            requester_id,
            created_by: None,
            assignee_id: None,
            team_id: None,
            observers: Vec::new(),
            labels: Vec::new(),
            contract_ids: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the ticket ID
    #[must_use]
    pub fn id(mut self, id: TicketId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the ticket number
    #[must_use]
    pub const fn number(mut self, number: u64) -> Self {
        self.number = number;
        self
    }

    /// Set the title
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub const fn ticket_type(mut self, ticket_type: TicketType) -> Self {
        self.ticket_type = ticket_type;
        self
    }

    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub const fn urgency(mut self, urgency: Level) -> Self {
        self.urgency = urgency;
        self
    }

    #[must_use]
    pub const fn impact(mut self, impact: Level) -> Self {
        self.impact = impact;
        self
    }

    /// Force the priority instead of deducing it from urgency and impact
    #[must_use]
    pub const fn priority(mut self, priority: Level) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    #[must_use]
    pub fn assignee(mut self, user_id: UserId) -> Self {
        self.assignee_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn team(mut self, team_id: TeamId) -> Self {
        self.team_id = Some(team_id);
        self
    }

    #[must_use]
    pub fn observer(mut self, user_id: UserId) -> Self {
        self.observers.push(user_id);
        self
    }

    #[must_use]
    pub fn label(mut self, label_id: LabelId) -> Self {
        self.labels.push(label_id);
        self
    }

    #[must_use]
    pub fn contract(mut self, contract_id: ContractId) -> Self {
        self.contract_ids.push(contract_id);
        self
    }

    /// Set `created_at` timestamp
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Set `updated_at` timestamp
    #[must_use]
    pub const fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Build the ticket
    pub fn build(self) -> Ticket {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        let created_by = self.created_by.unwrap_or_else(|| self.requester_id.clone());
        Ticket {
            id: self.id.unwrap_or_default(),
            number: self.number,
            created_at,
            created_by: created_by.clone(),
            updated_at: self.updated_at.unwrap_or(created_at),
            updated_by: created_by,
            ticket_type: self.ticket_type,
            status: self.status,
            title: self.title.unwrap_or_default(),
            urgency: self.urgency,
            impact: self.impact,
            priority: self
                .priority
                .unwrap_or_else(|| Level::from_matrix(self.urgency, self.impact)),
            requester_id: self.requester_id,
            assignee_id: self.assignee_id,
            team_id: self.team_id,
            organization_id: self.organization_id,
            observers: self.observers,
            labels: self.labels,
            solution_id: None,
            contract_ids: self.contract_ids,
        }
    }
}

/// Builder for creating Contract instances
pub struct ContractBuilder {
    organization_id: OrganizationId,
    name: Option<String>,
    start_at: Option<NaiveDate>,
    end_at: Option<NaiveDate>,
    max_hours: u32,
    time_accounting_unit: u32,
    hours_alert: u32,
    date_alert: u32,
    notes: String,
}

impl ContractBuilder {
    /// Create a new contract builder for an organization
    #[must_use]
    pub const fn new(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            name: None,
            start_at: None,
            end_at: None,
            max_hours: 10,
            time_accounting_unit: 0,
            hours_alert: 0,
            date_alert: 0,
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the start and end dates
    #[must_use]
    pub const fn period(mut self, start_at: NaiveDate, end_at: NaiveDate) -> Self {
        self.start_at = Some(start_at);
        self.end_at = Some(end_at);
        self
    }

    #[must_use]
    pub const fn max_hours(mut self, max_hours: u32) -> Self {
        self.max_hours = max_hours;
        self
    }

    #[must_use]
    pub const fn time_accounting_unit(mut self, minutes: u32) -> Self {
        self.time_accounting_unit = minutes;
        self
    }

    #[must_use]
    pub const fn hours_alert(mut self, percent: u32) -> Self {
        self.hours_alert = percent;
        self
    }

    #[must_use]
    pub const fn date_alert(mut self, days: u32) -> Self {
        self.date_alert = days;
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Build the contract; the period defaults to the year starting today
    pub fn build(self) -> Contract {
        let start_at = self.start_at.unwrap_or_else(|| Utc::now().date_naive());
        let end_at = self.end_at.unwrap_or_else(|| {
            start_at
                .checked_add_months(Months::new(12))
                .and_then(|d| d.pred_opt())
                .unwrap_or(NaiveDate::MAX)
        });
        Contract {
            id: ContractId::new(),
            organization_id: self.organization_id,
            name: self.name.unwrap_or_default(),
            start_at,
            end_at,
            max_hours: self.max_hours,
            time_accounting_unit: self.time_accounting_unit,
            hours_alert: self.hours_alert,
            date_alert: self.date_alert,
            notes: self.notes,
            created_at: Utc::now(),
        }
    }
}
