use super::DateRange;
use super::query::{Actor, ActorRole, Condition, DateField, Expr, Missing, Query, Reference};
use crate::core::{
    Contract, ContractId, Label, LabelId, Level, Organization, OrganizationId, Status, Team,
    TeamId, Ticket, TicketType, User, UserId,
};
use crate::error::Result;
use crate::storage::{Entity, Repository};
use chrono::{NaiveDate, Utc};

/// What a query needs to resolve its references
pub struct SearchContext {
    pub user_id: UserId,
    pub today: NaiveDate,
    users: Vec<User>,
    organizations: Vec<Organization>,
    teams: Vec<Team>,
    labels: Vec<Label>,
    contracts: Vec<Contract>,
}

impl SearchContext {
    pub fn load<R: Repository>(repo: &R, user_id: UserId) -> Result<Self> {
        Ok(Self {
            user_id,
            today: Utc::now().date_naive(),
            users: repo.load_all()?,
            organizations: repo.load_all()?,
            teams: repo.load_all()?,
            labels: repo.load_all()?,
            contracts: repo.load_all()?,
        })
    }

    fn resolve_actor(&self, actor: &Actor) -> Option<UserId> {
        match actor {
            Actor::Me => Some(self.user_id.clone()),
            Actor::Email(email) => self
                .users
                .iter()
                .find(|u| u.has_email(email))
                .map(|u| u.id.clone()),
        }
    }

    /// Ids of the entities whose name or id is `value`
    fn resolve<E>(items: &[E], value: &str, name: fn(&E) -> &str) -> Vec<E::Id>
    where
        E: Entity,
        E::Id: Clone,
    {
        items
            .iter()
            .filter(|item| {
                name(item).eq_ignore_ascii_case(value.trim()) || item.id().to_string() == value
            })
            .map(|item| item.id().clone())
            .collect()
    }
}

/// References resolved to ids; an empty list matches nothing
#[derive(Debug, Clone)]
enum Predicate {
    Text(String),
    Number(u64),
    Status(Vec<Status>),
    Type(Vec<TicketType>),
    Priority(Vec<Level>),
    Urgency(Vec<Level>),
    Impact(Vec<Level>),
    Actor(ActorRole, Vec<UserId>),
    Organization(Vec<OrganizationId>),
    Team(Vec<TeamId>),
    Label(Vec<LabelId>),
    Contract(Vec<ContractId>),
    Missing(Vec<Missing>),
    Date(DateField, Vec<DateRange>),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

/// A query ready to be evaluated against tickets
#[derive(Debug, Clone, Default)]
pub struct CompiledQuery {
    predicate: Option<Predicate>,
}

impl CompiledQuery {
    pub fn compile(query: &Query, context: &SearchContext) -> Self {
        Self {
            predicate: query.expr.as_ref().map(|e| compile_expr(e, context)),
        }
    }

    /// Whether text terms appear in the query, meaning messages are needed
    pub fn uses_text(&self) -> bool {
        self.predicate.as_ref().is_some_and(Predicate::uses_text)
    }

    /// Evaluate the query on a ticket
    ///
    /// `text` is the lowercased searchable content of the ticket: its title
    /// and the messages the searching user may read.
    pub fn matches(&self, ticket: &Ticket, text: &str) -> bool {
        self.predicate
            .as_ref()
            .is_none_or(|p| p.matches(ticket, text))
    }
}

fn compile_expr(expr: &Expr, context: &SearchContext) -> Predicate {
    match expr {
        Expr::Condition(condition) => compile_condition(condition, context),
        Expr::Not(inner) => Predicate::Not(Box::new(compile_expr(inner, context))),
        Expr::And(a, b) => Predicate::And(
            Box::new(compile_expr(a, context)),
            Box::new(compile_expr(b, context)),
        ),
        Expr::Or(a, b) => Predicate::Or(
            Box::new(compile_expr(a, context)),
            Box::new(compile_expr(b, context)),
        ),
    }
}

fn compile_condition(condition: &Condition, context: &SearchContext) -> Predicate {
    match condition {
        Condition::Text(text) => Predicate::Text(text.to_lowercase()),
        Condition::Number(number) => Predicate::Number(*number),
        Condition::Status(statuses) => Predicate::Status(statuses.clone()),
        Condition::Type(types) => Predicate::Type(types.clone()),
        Condition::Priority(levels) => Predicate::Priority(levels.clone()),
        Condition::Urgency(levels) => Predicate::Urgency(levels.clone()),
        Condition::Impact(levels) => Predicate::Impact(levels.clone()),
        Condition::Actor(role, actors) => Predicate::Actor(
            *role,
            actors
                .iter()
                .filter_map(|a| context.resolve_actor(a))
                .collect(),
        ),
        Condition::Reference(reference, values) => {
            let ids = values.iter();
            match reference {
                Reference::Organization => Predicate::Organization(
                    ids.flat_map(|v| {
                        SearchContext::resolve(&context.organizations, v, |o| o.name.as_str())
                    })
                    .collect(),
                ),
                Reference::Team => Predicate::Team(
                    ids.flat_map(|v| {
                        SearchContext::resolve(&context.teams, v, |t| t.name.as_str())
                    })
                    .collect(),
                ),
                Reference::Label => Predicate::Label(
                    ids.flat_map(|v| {
                        SearchContext::resolve(&context.labels, v, |l| l.name.as_str())
                    })
                    .collect(),
                ),
                Reference::Contract => Predicate::Contract(
                    ids.flat_map(|v| {
                        SearchContext::resolve(&context.contracts, v, |c| c.name.as_str())
                    })
                    .collect(),
                ),
            }
        },
        Condition::Missing(missing) => Predicate::Missing(missing.clone()),
        Condition::Date(field, filters) => Predicate::Date(
            *field,
            filters
                .iter()
                .filter_map(|f| DateRange::parse(f, context.today))
                .collect(),
        ),
    }
}

impl Predicate {
    fn uses_text(&self) -> bool {
        match self {
            Self::Text(_) => true,
            Self::Not(inner) => inner.uses_text(),
            Self::And(a, b) | Self::Or(a, b) => a.uses_text() || b.uses_text(),
            _ => false,
        }
    }

    fn matches(&self, ticket: &Ticket, text: &str) -> bool {
        match self {
            Self::Text(term) => text.contains(term.as_str()),
            Self::Number(number) => ticket.number == *number,
            Self::Status(statuses) => statuses.contains(&ticket.status),
            Self::Type(types) => types.contains(&ticket.ticket_type),
            Self::Priority(levels) => levels.contains(&ticket.priority),
            Self::Urgency(levels) => levels.contains(&ticket.urgency),
            Self::Impact(levels) => levels.contains(&ticket.impact),
            Self::Actor(role, users) => users.iter().any(|user| match role {
                ActorRole::Assignee => ticket.assignee_id.as_ref() == Some(user),
                ActorRole::Requester => ticket.requester_id == *user,
                ActorRole::Involves => ticket.involves(user),
            }),
            Self::Organization(ids) => ids.contains(&ticket.organization_id),
            Self::Team(ids) => ticket.team_id.as_ref().is_some_and(|t| ids.contains(t)),
            Self::Label(ids) => ticket.labels.iter().any(|l| ids.contains(l)),
            Self::Contract(ids) => ticket.contract_ids.iter().any(|c| ids.contains(c)),
            Self::Missing(missing) => missing.iter().any(|m| match m {
                Missing::Assignee => ticket.assignee_id.is_none(),
                Missing::Team => ticket.team_id.is_none(),
                Missing::Label => ticket.labels.is_empty(),
                Missing::Contract => ticket.contract_ids.is_empty(),
                Missing::Solution => ticket.solution_id.is_none(),
            }),
            Self::Date(field, ranges) => {
                let date = match field {
                    DateField::Created => &ticket.created_at,
                    DateField::Updated => &ticket.updated_at,
                };
                ranges.iter().any(|r| r.contains(date))
            },
            Self::Not(inner) => !inner.matches(ticket, text),
            Self::And(a, b) => a.matches(ticket, text) && b.matches(ticket, text),
            Self::Or(a, b) => a.matches(ticket, text) || b.matches(ticket, text),
        }
    }
}
