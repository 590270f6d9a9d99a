use crate::accounting::ContractTimeAccounting;
use crate::auth::permission::{
    ORGA_CREATE_TICKETS, ORGA_CREATE_TICKETS_MESSAGES, ORGA_CREATE_TICKETS_MESSAGES_CONFIDENTIAL,
    ORGA_UPDATE_TICKETS_ACTORS, ORGA_UPDATE_TICKETS_PRIORITY, ORGA_UPDATE_TICKETS_TYPE,
};
use crate::auth::{Authorizer, Scope};
use crate::core::{Level, Message, MessageVia, OrganizationId, Ticket, TicketType, UserId};
use crate::error::{BiletoError, Result};
use crate::storage::Repository;
use chrono::Utc;

/// Everything needed to open a ticket
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub organization_id: OrganizationId,
    pub requester_id: UserId,
    pub title: String,
    pub content: String,
    pub ticket_type: Option<TicketType>,
    pub urgency: Option<Level>,
    pub impact: Option<Level>,
    pub priority: Option<Level>,
    pub assignee_id: Option<UserId>,
    pub via: MessageVia,
    pub email_id: Option<String>,
}

impl NewTicket {
    pub fn new(
        organization_id: OrganizationId,
        requester_id: UserId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            organization_id,
            requester_id,
            title: title.into(),
            content: content.into(),
            ticket_type: None,
            urgency: None,
            impact: None,
            priority: None,
            assignee_id: None,
            via: MessageVia::Webapp,
            email_id: None,
        }
    }
}

/// Opens tickets and adds messages on behalf of a user
pub struct TicketDesk<'a, R: Repository> {
    repo: &'a R,
    authorizer: &'a Authorizer,
}

impl<'a, R: Repository> TicketDesk<'a, R> {
    pub const fn new(repo: &'a R, authorizer: &'a Authorizer) -> Self {
        Self { repo, authorizer }
    }

    /// Open a ticket with its first message
    ///
    /// The ticket is attached to the ongoing contract of its organization.
    /// The first message is skipped when the content is blank.
    pub fn open(&self, author: &UserId, new: NewTicket) -> Result<(Ticket, Option<Message>)> {
        let scope = Scope::Organization(&new.organization_id);
        self.authorizer.require(author, ORGA_CREATE_TICKETS, scope)?;
        if new.requester_id != *author || new.assignee_id.is_some() {
            self.authorizer.require(author, ORGA_UPDATE_TICKETS_ACTORS, scope)?;
        }
        if new.ticket_type.is_some() {
            self.authorizer.require(author, ORGA_UPDATE_TICKETS_TYPE, scope)?;
        }
        if new.urgency.is_some() || new.impact.is_some() || new.priority.is_some() {
            self.authorizer.require(author, ORGA_UPDATE_TICKETS_PRIORITY, scope)?;
        }

        let mut ticket = Ticket::new(
            0,
            new.title,
            new.organization_id,
            new.requester_id,
            author.clone(),
        )?;
        if let Some(ticket_type) = new.ticket_type {
            ticket.ticket_type = ticket_type;
        }
        ticket.set_urgency_impact(
            new.urgency.unwrap_or(Level::Medium),
            new.impact.unwrap_or(Level::Medium),
        );
        if let Some(priority) = new.priority {
            ticket.priority = priority;
        }
        if let Some(assignee) = new.assignee_id {
            ticket.assign(assignee);
        }

        let accounting = ContractTimeAccounting::new(self.repo);
        if let Some(contract) =
            accounting.ongoing_contract(&ticket.organization_id, Utc::now().date_naive())?
        {
            ticket.attach_contract(contract.id);
        }
        // Numbers are only taken by tickets that get saved
        ticket.number = self.repo.next_ticket_number()?;
        self.repo.save(&ticket)?;

        let message = if new.content.trim().is_empty() {
            None
        } else {
            let mut message = Message::new(
                ticket.id.clone(),
                author.clone(),
                new.content,
                false,
                new.via,
            );
            message.email_id = new.email_id;
            self.repo.save(&message)?;
            Some(message)
        };

        tracing::info!(ticket = %ticket.reference(), title = %ticket.title, "ticket opened");
        Ok((ticket, message))
    }

    /// Answer a ticket
    ///
    /// A requester answer reopens a pending ticket.
    pub fn answer(
        &self,
        author: &UserId,
        ticket: &mut Ticket,
        content: &str,
        is_confidential: bool,
        via: MessageVia,
        email_id: Option<String>,
    ) -> Result<Message> {
        if !self.authorizer.can_see_ticket(author, ticket) {
            return Err(BiletoError::TicketNotFound {
                id: ticket.reference(),
            });
        }
        let scope = Scope::Organization(&ticket.organization_id);
        self.authorizer.require(author, ORGA_CREATE_TICKETS_MESSAGES, scope)?;
        if is_confidential {
            self.authorizer
                .require(author, ORGA_CREATE_TICKETS_MESSAGES_CONFIDENTIAL, scope)?;
        }
        ticket.ensure_accepts_messages()?;
        if content.trim().is_empty() {
            return Err(BiletoError::Validation("Message cannot be empty".to_string()));
        }

        let mut message = Message::new(ticket.id.clone(), author.clone(), content, is_confidential, via);
        message.email_id = email_id;

        if ticket.requester_id == *author {
            ticket.on_requester_answer();
        }
        ticket.touch(author);
        self.repo.save(&message)?;
        self.repo.save(ticket)?;
        tracing::debug!(ticket = %ticket.reference(), confidential = is_confidential, "message added");
        Ok(message)
    }

    /// Load a ticket by number, hiding the ones the user may not see
    pub fn visible_ticket(&self, user_id: &UserId, number: u64) -> Result<Ticket> {
        self.repo
            .find::<Ticket, _>(|t| t.number == number)?
            .into_iter()
            .find(|t| self.authorizer.can_see_ticket(user_id, t))
            .ok_or_else(|| BiletoError::TicketNotFound {
                id: format!("#{number}"),
            })
    }

    /// Messages of a ticket readable by the user
    pub fn visible_messages(&self, user_id: &UserId, ticket: &Ticket) -> Result<Vec<Message>> {
        let mut messages = self.repo.find::<Message, _>(|m| {
            m.ticket_id == ticket.id && self.authorizer.can_see_message(user_id, ticket, m)
        })?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authorization, Role, RoleType, permission};
    use crate::core::{ContractBuilder, Organization, Status, User};
    use crate::storage::{FileStorage, Lookups, ProjectState};
    use chrono::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        storage: FileStorage,
        authorizer: Authorizer,
        acme: Organization,
        agent: User,
        requester: User,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        storage.ensure_directories().unwrap();
        storage.save_state(&ProjectState::new("Support", None)).unwrap();

        let acme = Organization::new("Acme").unwrap();
        let agent = User::new("agent@example.com", "Agent").unwrap();
        let requester = User::new("requester@acme.example", "Requester").unwrap();
        storage.save(&acme).unwrap();
        storage.save(&agent).unwrap();
        storage.save(&requester).unwrap();

        let agent_role = Role::new(
            "Technician",
            RoleType::Agent,
            permission::AGENT_PERMISSIONS.iter().copied(),
        )
        .unwrap();
        let user_role = Role::new(
            "Requester",
            RoleType::User,
            [permission::ORGA_CREATE_TICKETS, permission::ORGA_CREATE_TICKETS_MESSAGES],
        )
        .unwrap();
        let authorizer = Authorizer::new(
            vec![agent_role.clone(), user_role.clone()],
            vec![
                Authorization::new(agent.id.clone(), &agent_role, None).unwrap(),
                Authorization::new(requester.id.clone(), &user_role, Some(acme.id.clone())).unwrap(),
            ],
        );

        Fixture {
            _temp_dir: temp_dir,
            storage,
            authorizer,
            acme,
            agent,
            requester,
        }
    }

    #[test]
    fn test_open_ticket_numbers_and_contract() {
        let f = fixture();
        let today = Utc::now().date_naive();
        let contract = ContractBuilder::new(f.acme.id.clone())
            .period(today - Duration::days(5), today + Duration::days(5))
            .build();
        f.storage.save(&contract).unwrap();

        let desk = TicketDesk::new(&f.storage, &f.authorizer);
        let new = NewTicket::new(
            f.acme.id.clone(),
            f.requester.id.clone(),
            "Printer jammed",
            "Paper everywhere",
        );
        let (first, message) = desk.open(&f.requester.id, new.clone()).unwrap();
        let (second, _) = desk.open(&f.requester.id, new).unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(first.contract_ids, vec![contract.id]);
        assert_eq!(message.unwrap().content, "Paper everywhere");
    }

    #[test]
    fn test_rejected_title_keeps_the_number() {
        let f = fixture();
        let desk = TicketDesk::new(&f.storage, &f.authorizer);

        let blank = NewTicket::new(f.acme.id.clone(), f.requester.id.clone(), "   ", "Help");
        assert!(matches!(
            desk.open(&f.requester.id, blank),
            Err(BiletoError::Validation(_))
        ));
        let too_long = NewTicket::new(f.acme.id.clone(), f.requester.id.clone(), "x".repeat(256), "");
        assert!(desk.open(&f.requester.id, too_long).is_err());
        assert_eq!(f.storage.load_state().unwrap().ticket_counter, 0);

        let new = NewTicket::new(f.acme.id.clone(), f.requester.id.clone(), "VPN", "");
        let (ticket, _) = desk.open(&f.requester.id, new).unwrap();
        assert_eq!(ticket.number, 1);
        assert_eq!(f.storage.find_ticket_by_number(1).unwrap().unwrap().id, ticket.id);
    }

    #[test]
    fn test_open_ticket_permissions() {
        let f = fixture();
        let desk = TicketDesk::new(&f.storage, &f.authorizer);

        // A requester cannot open tickets for someone else or set the priority
        let mut new = NewTicket::new(f.acme.id.clone(), f.agent.id.clone(), "VPN", "");
        assert!(matches!(
            desk.open(&f.requester.id, new.clone()),
            Err(BiletoError::PermissionDenied { .. })
        ));
        new.requester_id = f.requester.id.clone();
        new.priority = Some(Level::High);
        assert!(desk.open(&f.requester.id, new.clone()).is_err());

        new.requester_id = f.requester.id.clone();
        new.assignee_id = Some(f.agent.id.clone());
        let (ticket, message) = desk.open(&f.agent.id, new).unwrap();
        assert_eq!(ticket.status, Status::InProgress);
        assert_eq!(ticket.priority, Level::High);
        assert!(message.is_none());
    }

    #[test]
    fn test_answer_rules() {
        let f = fixture();
        let desk = TicketDesk::new(&f.storage, &f.authorizer);
        let new = NewTicket::new(f.acme.id.clone(), f.requester.id.clone(), "VPN", "Down");
        let (mut ticket, _) = desk.open(&f.requester.id, new).unwrap();

        ticket.set_status(Status::Pending);
        desk.answer(&f.requester.id, &mut ticket, "Still down", false, MessageVia::Webapp, None)
            .unwrap();
        assert_eq!(ticket.status, Status::InProgress);

        assert!(
            desk.answer(&f.requester.id, &mut ticket, "Secret", true, MessageVia::Webapp, None)
                .is_err()
        );
        let note = desk
            .answer(&f.agent.id, &mut ticket, "Router reboot", true, MessageVia::Webapp, None)
            .unwrap();
        assert!(note.is_confidential);
        assert_eq!(desk.visible_messages(&f.requester.id, &ticket).unwrap().len(), 2);
        assert_eq!(desk.visible_messages(&f.agent.id, &ticket).unwrap().len(), 3);

        ticket.set_status(Status::Closed);
        assert!(
            desk.answer(&f.agent.id, &mut ticket, "Too late", false, MessageVia::Webapp, None)
                .is_err()
        );
    }

    #[test]
    fn test_visible_ticket() {
        let f = fixture();
        let desk = TicketDesk::new(&f.storage, &f.authorizer);
        let new = NewTicket::new(f.acme.id.clone(), f.agent.id.clone(), "Internal", "");
        desk.open(&f.agent.id, new).unwrap();

        assert!(desk.visible_ticket(&f.agent.id, 1).is_ok());
        assert!(desk.visible_ticket(&f.requester.id, 1).unwrap_err().is_not_found());
        assert!(desk.visible_ticket(&f.agent.id, 9).is_err());
    }
}
