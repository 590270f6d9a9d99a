//! Outgoing mail
//!
//! Notifications are rendered with tera and stored in the project outbox as
//! [`OutgoingEmail`] documents. Delivering them is left to an external
//! mailer watching `.bileto/outbox/`.

mod templates;

pub use templates::{ANSWER, RECEIPT, TemplateData, Templates};

use crate::auth::{Authorizer, Scope};
use crate::core::validation::email_domain;
use crate::core::{Message, Organization, OutgoingEmailId, Ticket, TicketId, User, UserId};
use crate::error::Result;
use crate::storage::{Lookups, Repository};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An email waiting in the outbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub id: OutgoingEmailId,
    pub ticket_id: TicketId,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Message-ID header of this email
    pub message_id: String,
    pub in_reply_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Subject of every email about a ticket
pub fn ticket_subject(ticket: &Ticket) -> String {
    format!("[{}] {}", ticket.reference(), ticket.title)
}

/// Unwrap a queued notification, logging a failure instead of returning it
///
/// Notifications follow a change that is already saved, so they never undo it.
pub fn log_failure(ticket: &Ticket, queued: Result<Option<OutgoingEmail>>) -> Option<OutgoingEmail> {
    match queued {
        Ok(email) => email,
        Err(e) => {
            tracing::warn!(ticket = %ticket.reference(), error = %e, "notification not queued");
            None
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub from: String,
}

impl NotificationSettings {
    /// Host part of the generated Message-IDs
    pub fn host(&self) -> &str {
        email_domain(&self.from).unwrap_or("localhost")
    }
}

/// Renders notifications for ticket events and queues them in the outbox
pub struct Notifier<'a, R: Repository> {
    repo: &'a R,
    authorizer: &'a Authorizer,
    settings: NotificationSettings,
    templates: Templates,
}

impl<'a, R: Repository> Notifier<'a, R> {
    pub fn new(repo: &'a R, authorizer: &'a Authorizer, settings: NotificationSettings) -> Result<Self> {
        Ok(Self {
            repo,
            authorizer,
            settings,
            templates: Templates::new()?,
        })
    }

    /// Message-ID of the first message of a ticket, the root of the mail thread
    fn thread_root(&self, ticket: &Ticket) -> Result<Option<String>> {
        Ok(self
            .repo
            .messages_of(&ticket.id)?
            .first()
            .map(|m| m.outgoing_email_id(self.settings.host())))
    }

    fn organization_name(&self, ticket: &Ticket) -> String {
        self.repo
            .load::<Organization>(&ticket.organization_id)
            .map(|o| o.name)
            .unwrap_or_default()
    }

    /// Users to notify about a message: the ticket actors minus its author
    ///
    /// Confidential messages are only sent to agents.
    pub fn recipients(&self, ticket: &Ticket, message: &Message) -> Result<Vec<User>> {
        let mut ids: Vec<&UserId> = vec![&ticket.requester_id];
        ids.extend(ticket.assignee_id.as_ref());
        ids.extend(ticket.observers.iter());

        let mut recipients: Vec<User> = Vec::new();
        for id in ids {
            if *id == message.created_by || recipients.iter().any(|u| u.id == *id) {
                continue;
            }
            if message.is_confidential
                && !self
                    .authorizer
                    .is_agent(id, Scope::Organization(&ticket.organization_id))
            {
                continue;
            }
            match self.repo.load::<User>(id) {
                Ok(user) => recipients.push(user),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(user = %id, ticket = %ticket.reference(), "recipient does not exist");
                },
                Err(e) => return Err(e),
            }
        }
        Ok(recipients)
    }

    fn queue(
        &self,
        ticket: &Ticket,
        to: Vec<String>,
        body: String,
        message_id: String,
        in_reply_to: Option<String>,
    ) -> Result<OutgoingEmail> {
        let email = OutgoingEmail {
            id: OutgoingEmailId::new(),
            ticket_id: ticket.id.clone(),
            from: self.settings.from.clone(),
            to,
            subject: ticket_subject(ticket),
            body,
            message_id,
            in_reply_to,
            created_at: Utc::now(),
        };
        self.repo.save(&email)?;
        tracing::info!(ticket = %ticket.reference(), to = ?email.to, "notification queued");
        Ok(email)
    }

    /// Acknowledge a new ticket to its requester
    pub fn ticket_created(&self, ticket: &Ticket, message: Option<&Message>) -> Result<Option<OutgoingEmail>> {
        if !self.settings.enabled {
            return Ok(None);
        }

        let requester = self.repo.load::<User>(&ticket.requester_id)?;
        let organization = self.organization_name(ticket);
        let body = self.templates.render(
            RECEIPT,
            &TemplateData {
                recipient: requester.display_name(),
                author: requester.display_name(),
                reference: ticket.reference(),
                title: &ticket.title,
                organization: &organization,
                status: ticket.status.to_string(),
                content: message.map_or("", |m| m.content.as_str()),
                confidential: false,
            },
        )?;

        let message_id = format!("<receipt-{}@{}>", ticket.id, self.settings.host());
        let in_reply_to = self.thread_root(ticket)?;
        self.queue(ticket, vec![requester.email], body, message_id, in_reply_to)
            .map(Some)
    }

    /// Send a new message of a ticket to the other actors
    pub fn message_added(&self, ticket: &Ticket, message: &Message) -> Result<Option<OutgoingEmail>> {
        if !self.settings.enabled {
            return Ok(None);
        }

        let recipients = self.recipients(ticket, message)?;
        if recipients.is_empty() {
            tracing::debug!(ticket = %ticket.reference(), "no one to notify");
            return Ok(None);
        }

        let author = self.repo.load::<User>(&message.created_by)?;
        let organization = self.organization_name(ticket);
        let recipient = if recipients.len() == 1 {
            recipients[0].display_name().to_string()
        } else {
            "all".to_string()
        };
        let body = self.templates.render(
            ANSWER,
            &TemplateData {
                recipient: &recipient,
                author: author.display_name(),
                reference: ticket.reference(),
                title: &ticket.title,
                organization: &organization,
                status: ticket.status.to_string(),
                content: &message.content,
                confidential: message.is_confidential,
            },
        )?;

        let message_id = message.outgoing_email_id(self.settings.host());
        let in_reply_to = self.thread_root(ticket)?.filter(|root| *root != message_id);
        let to = recipients.into_iter().map(|u| u.email).collect();
        self.queue(ticket, to, body, message_id, in_reply_to).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authorization, Role, RoleType, permission};
    use crate::core::{MessageVia, TicketBuilder};
    use crate::storage::FileStorage;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        storage: FileStorage,
        authorizer: Authorizer,
        requester: User,
        agent: User,
        observer: User,
        ticket: Ticket,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        storage.ensure_directories().unwrap();

        let acme = Organization::new("Acme").unwrap();
        let requester = User::new("requester@acme.example", "Requester").unwrap();
        let agent = User::new("agent@example.com", "Agent").unwrap();
        let observer = User::new("observer@acme.example", "Observer").unwrap();
        for user in [&requester, &agent, &observer] {
            storage.save(user).unwrap();
        }
        storage.save(&acme).unwrap();

        let agent_role = Role::new("Technician", RoleType::Agent, [permission::ORGA_SEE]).unwrap();
        let authorizer = Authorizer::new(
            vec![agent_role.clone()],
            vec![Authorization::new(agent.id.clone(), &agent_role, None).unwrap()],
        );

        let ticket = TicketBuilder::new(acme.id.clone(), requester.id.clone())
            .number(12)
            .title("Printer jammed")
            .assignee(agent.id.clone())
            .observer(observer.id.clone())
            .build();
        storage.save(&ticket).unwrap();

        Fixture {
            _temp_dir: temp_dir,
            storage,
            authorizer,
            requester,
            agent,
            observer,
            ticket,
        }
    }

    fn settings() -> NotificationSettings {
        NotificationSettings {
            enabled: true,
            from: "support@helpdesk.example".to_string(),
        }
    }

    #[test]
    fn test_receipt_goes_to_requester() {
        let f = fixture();
        let notifier = Notifier::new(&f.storage, &f.authorizer, settings()).unwrap();
        let first = Message::new(
            f.ticket.id.clone(),
            f.requester.id.clone(),
            "It is stuck",
            false,
            MessageVia::Email,
        )
        .with_email_id("<abc@acme.example>");
        f.storage.save(&first).unwrap();

        let email = notifier.ticket_created(&f.ticket, Some(&first)).unwrap().unwrap();
        assert_eq!(email.to, vec!["requester@acme.example".to_string()]);
        assert_eq!(email.subject, "[#12] Printer jammed");
        assert_eq!(email.in_reply_to.as_deref(), Some("<abc@acme.example>"));
        assert!(email.message_id.ends_with("@helpdesk.example>"));
        assert!(email.body.contains("It is stuck"));

        let queued = f.storage.load_all::<OutgoingEmail>().unwrap();
        assert_eq!(queued, vec![email]);
    }

    #[test]
    fn test_answer_recipients() {
        let f = fixture();
        let notifier = Notifier::new(&f.storage, &f.authorizer, settings()).unwrap();

        let answer = Message::new(
            f.ticket.id.clone(),
            f.agent.id.clone(),
            "Try again",
            false,
            MessageVia::Webapp,
        );
        let recipients: Vec<_> = notifier
            .recipients(&f.ticket, &answer)
            .unwrap()
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(recipients, vec![f.requester.email.clone(), f.observer.email.clone()]);

        let note = Message::new(
            f.ticket.id.clone(),
            f.requester.id.clone(),
            "Internal",
            true,
            MessageVia::Webapp,
        );
        let recipients = notifier.recipients(&f.ticket, &note).unwrap();
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].id, f.agent.id);

        let email = notifier.message_added(&f.ticket, &answer).unwrap().unwrap();
        assert_eq!(email.message_id, answer.outgoing_email_id("helpdesk.example"));
        assert!(email.body.contains("Agent answered ticket #12"));
    }

    #[test]
    fn test_disabled_notifications() {
        let f = fixture();
        let notifier = Notifier::new(
            &f.storage,
            &f.authorizer,
            NotificationSettings {
                enabled: false,
                ..settings()
            },
        )
        .unwrap();

        assert!(notifier.ticket_created(&f.ticket, None).unwrap().is_none());
        assert!(f.storage.load_all::<OutgoingEmail>().unwrap().is_empty());
    }
}
