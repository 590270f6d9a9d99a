use super::{IncomingEmail, MailSource, MailboxEmail};
use crate::auth::{Authorizer, Scope};
use crate::auth::permission::ORGA_CREATE_TICKETS;
use crate::core::validation::{MAX_NAME_LENGTH, email_domain};
use crate::core::{Message, MessageVia, Organization, OrganizationId, Ticket, TicketId, User};
use crate::error::{BiletoError, Result};
use crate::notifications::{NotificationSettings, Notifier, OutgoingEmail, log_failure};
use crate::service::{Directory, NewTicket, TicketDesk};
use crate::storage::{Lookups, Repository};
use serde::Serialize;
use std::fmt;

const NO_SUBJECT: &str = "(no subject)";

/// What became of an e-mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    TicketCreated { number: u64 },
    Answered { number: u64 },
    Discarded { reason: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TicketCreated { number } => write!(f, "ticket #{number} created"),
            Self::Answered { number } => write!(f, "answer added to ticket #{number}"),
            Self::Discarded { reason } => write!(f, "discarded ({reason})"),
        }
    }
}

/// Summary of a mailbox collection
#[derive(Debug, Default, Clone, Serialize)]
pub struct CollectReport {
    pub fetched: usize,
    pub created: usize,
    pub answered: usize,
    pub discarded: usize,
    pub failed: usize,
    /// Failing e-mails no longer retried
    pub skipped: usize,
}

/// Turns incoming e-mails into tickets and messages
pub struct MailboxProcessor<'a, R: Repository> {
    repo: &'a R,
    authorizer: Authorizer,
    notifications: NotificationSettings,
    max_attempts: u32,
}

impl<'a, R: Repository> MailboxProcessor<'a, R> {
    pub fn new(repo: &'a R, notifications: NotificationSettings, max_attempts: u32) -> Result<Self> {
        Ok(Self {
            repo,
            authorizer: Authorizer::load(repo)?,
            notifications,
            max_attempts,
        })
    }

    /// Fetch the new e-mails of the source, then process every pending e-mail
    pub fn collect(&mut self, source: &mut dyn MailSource) -> Result<CollectReport> {
        let mut report = CollectReport::default();
        for email in source.fetch()? {
            self.repo.save(&MailboxEmail::new(email))?;
            report.fetched += 1;
        }

        let mut pending = self.repo.load_all::<MailboxEmail>()?;
        pending.sort_by_key(|p| p.created_at);

        for mut pending in pending {
            if pending.attempts >= self.max_attempts {
                report.skipped += 1;
                continue;
            }

            match self.process(&pending.email) {
                Ok(outcome) => {
                    tracing::info!(message_id = %pending.email.message_id, %outcome, "e-mail processed");
                    match outcome {
                        Outcome::TicketCreated { .. } => report.created += 1,
                        Outcome::Answered { .. } => report.answered += 1,
                        Outcome::Discarded { .. } => report.discarded += 1,
                    }
                    self.repo.delete::<MailboxEmail>(&pending.id)?;
                },
                Err(e) => {
                    tracing::warn!(message_id = %pending.email.message_id, error = %e, "e-mail processing failed");
                    pending.fail(&e);
                    self.repo.save(&pending)?;
                    report.failed += 1;
                },
            }
        }

        Ok(report)
    }

    /// E-mails that failed at least once, oldest first
    pub fn failed(&self) -> Result<Vec<MailboxEmail>> {
        let mut failed = self
            .repo
            .find::<MailboxEmail, _>(|p| p.last_error.is_some())?;
        failed.sort_by_key(|p| p.created_at);
        Ok(failed)
    }

    /// Process a single e-mail
    pub fn process(&mut self, email: &IncomingEmail) -> Result<Outcome> {
        if email.is_auto_submitted() {
            return Ok(Outcome::Discarded {
                reason: "auto-submitted".to_string(),
            });
        }
        let already_imported = self
            .repo
            .count::<Message, _>(|m| m.email_id.as_deref() == Some(email.message_id.as_str()))?
            > 0;
        if already_imported {
            return Ok(Outcome::Discarded {
                reason: "already imported".to_string(),
            });
        }

        let sender = self.sender(email)?;
        match self.replied_ticket(email)? {
            Some(ticket) => self.answer(&sender, ticket, email),
            None => self.open(&sender, email),
        }
    }

    /// The sender, created when their domain belongs to an organization
    fn sender(&mut self, email: &IncomingEmail) -> Result<User> {
        let (address, name) = email.sender()?;
        if let Some(user) = self.repo.find_user_by_email(&address)? {
            return Ok(user);
        }

        let organization = match email_domain(&address) {
            Some(domain) => self.repo.find_organization_by_domain(domain)?,
            None => None,
        };
        let Some(organization) = organization else {
            return Err(BiletoError::custom(format!("unknown sender: {address}")));
        };

        let (user, authorization) =
            Directory::new(self.repo).register(&address, &name, Some(organization.id))?;
        if let Some(authorization) = authorization {
            self.authorizer.add_authorization(authorization);
        }
        Ok(user)
    }

    /// The ticket the e-mail replies to, from its headers or its subject tag
    fn replied_ticket(&self, email: &IncomingEmail) -> Result<Option<Ticket>> {
        let replied = email.replied_ids();
        if !replied.is_empty() {
            let host = self.notifications.host();
            let messages = self.repo.load_all::<Message>()?;
            let by_message = replied.iter().find_map(|id| {
                messages
                    .iter()
                    .find(|m| m.outgoing_email_id(host) == *id)
                    .map(|m| m.ticket_id.clone())
            });
            let ticket_id: Option<TicketId> = match by_message {
                Some(id) => Some(id),
                None => {
                    let outbox = self.repo.load_all::<OutgoingEmail>()?;
                    replied.iter().find_map(|id| {
                        outbox
                            .iter()
                            .find(|o| o.message_id == *id)
                            .map(|o| o.ticket_id.clone())
                    })
                },
            };
            if let Some(ticket_id) = ticket_id {
                return match self.repo.load::<Ticket>(&ticket_id) {
                    Ok(ticket) => Ok(Some(ticket)),
                    Err(e) if e.is_not_found() => Ok(None),
                    Err(e) => Err(e),
                };
            }
        }

        match email.ticket_tag() {
            Some(number) => self.repo.find_ticket_by_number(number),
            None => Ok(None),
        }
    }

    fn notifier(&self) -> Result<Notifier<'_, R>> {
        Notifier::new(self.repo, &self.authorizer, self.notifications.clone())
    }

    fn answer(&self, sender: &User, mut ticket: Ticket, email: &IncomingEmail) -> Result<Outcome> {
        let desk = TicketDesk::new(self.repo, &self.authorizer);
        let message = desk.answer(
            &sender.id,
            &mut ticket,
            &email.body,
            false,
            MessageVia::Email,
            Some(email.message_id.clone()),
        )?;

        let queued = self.notifier().and_then(|n| n.message_added(&ticket, &message));
        log_failure(&ticket, queued);
        Ok(Outcome::Answered {
            number: ticket.number,
        })
    }

    /// Organization in which the sender opens tickets
    fn organization_for(&self, sender: &User) -> Result<OrganizationId> {
        if let Some(default) = &sender.organization_id {
            if self
                .authorizer
                .is_granted(&sender.id, ORGA_CREATE_TICKETS, Scope::Organization(default))
            {
                return Ok(default.clone());
            }
        }

        let mut organizations = self.repo.load_all::<Organization>()?;
        organizations.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        let candidates: Vec<OrganizationId> = organizations.into_iter().map(|o| o.id).collect();
        self.authorizer
            .granted_organizations(&sender.id, ORGA_CREATE_TICKETS, &candidates)
            .first()
            .map(|id| (*id).clone())
            .ok_or_else(|| BiletoError::denied(ORGA_CREATE_TICKETS))
    }

    fn open(&self, sender: &User, email: &IncomingEmail) -> Result<Outcome> {
        let organization_id = self.organization_for(sender)?;
        let subject = email.subject.trim();
        let title: String = if subject.is_empty() {
            NO_SUBJECT.to_string()
        } else {
            subject.chars().take(MAX_NAME_LENGTH).collect()
        };

        let mut new = NewTicket::new(organization_id, sender.id.clone(), title, email.body.clone());
        new.via = MessageVia::Email;
        new.email_id = Some(email.message_id.clone());

        let desk = TicketDesk::new(self.repo, &self.authorizer);
        let (ticket, message) = desk.open(&sender.id, new)?;
        let queued = self.notifier().and_then(|n| n.ticket_created(&ticket, message.as_ref()));
        log_failure(&ticket, queued);
        Ok(Outcome::TicketCreated {
            number: ticket.number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authorization, Role, RoleType, permission};
    use crate::core::{ContractBuilder, Status};
    use crate::mailbox::MockMailSource;
    use crate::storage::{FileStorage, ProjectState};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        storage: FileStorage,
        acme: Organization,
        agent: User,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        storage.ensure_directories().unwrap();
        storage.save_state(&ProjectState::new("Support", None)).unwrap();

        let mut acme = Organization::new("Acme").unwrap();
        acme.set_domains(["acme.example"]).unwrap();
        storage.save(&acme).unwrap();

        let mut requester_role = Role::new(
            "Requester",
            RoleType::User,
            [permission::ORGA_CREATE_TICKETS, permission::ORGA_CREATE_TICKETS_MESSAGES],
        )
        .unwrap();
        Directory::new(&storage)
            .set_default_role(&mut requester_role)
            .unwrap();

        let agent_role = Role::new(
            "Technician",
            RoleType::Agent,
            permission::AGENT_PERMISSIONS.iter().copied(),
        )
        .unwrap();
        storage.save(&agent_role).unwrap();
        let agent = User::new("agent@helpdesk.example", "Agent").unwrap();
        storage.save(&agent).unwrap();
        storage
            .save(&Authorization::new(agent.id.clone(), &agent_role, None).unwrap())
            .unwrap();

        Fixture {
            _temp_dir: temp_dir,
            storage,
            acme,
            agent,
        }
    }

    fn settings() -> NotificationSettings {
        NotificationSettings {
            enabled: true,
            from: "support@helpdesk.example".to_string(),
        }
    }

    fn email(id: &str, from: &str, subject: &str, body: &str) -> IncomingEmail {
        IncomingEmail {
            message_id: id.to_string(),
            from: from.to_string(),
            to: vec!["support@helpdesk.example".to_string()],
            subject: subject.to_string(),
            body: body.to_string(),
            in_reply_to: None,
            references: Vec::new(),
            auto_submitted: None,
            date: None,
        }
    }

    fn processor(storage: &FileStorage) -> MailboxProcessor<'_, FileStorage> {
        MailboxProcessor::new(storage, settings(), 3).unwrap()
    }

    #[test]
    fn test_new_sender_opens_ticket() {
        let f = fixture();
        let today = Utc::now().date_naive();
        let contract = ContractBuilder::new(f.acme.id.clone())
            .period(today - Duration::days(1), today + Duration::days(30))
            .build();
        f.storage.save(&contract).unwrap();

        let outcome = processor(&f.storage)
            .process(&email("<1@acme.example>", "Alix <alix@acme.example>", "Printer jammed", "Help"))
            .unwrap();
        assert_eq!(outcome, Outcome::TicketCreated { number: 1 });

        let user = f.storage.find_user_by_email("alix@acme.example").unwrap().unwrap();
        assert_eq!(user.name, "Alix");
        let ticket = f.storage.find_ticket_by_number(1).unwrap().unwrap();
        assert_eq!(ticket.title, "Printer jammed");
        assert_eq!(ticket.organization_id, f.acme.id);
        assert_eq!(ticket.contract_ids, vec![contract.id]);

        let receipts = f.storage.load_all::<OutgoingEmail>().unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].to, vec!["alix@acme.example".to_string()]);
        assert_eq!(receipts[0].in_reply_to.as_deref(), Some("<1@acme.example>"));
    }

    #[test]
    fn test_unknown_sender_and_auto_submitted() {
        let f = fixture();
        let mut processor = processor(&f.storage);

        let err = processor
            .process(&email("<1@x.example>", "someone@elsewhere.example", "Hi", ""))
            .unwrap_err();
        assert!(err.to_string().contains("unknown sender"));

        let mut auto = email("<2@x.example>", "someone@elsewhere.example", "Away", "");
        auto.auto_submitted = Some("auto-replied".to_string());
        assert!(matches!(processor.process(&auto).unwrap(), Outcome::Discarded { .. }));
    }

    #[test]
    fn test_answers_thread_by_headers_and_subject() {
        let f = fixture();
        let mut processor = processor(&f.storage);
        processor
            .process(&email("<1@acme.example>", "alix@acme.example", "", "VPN down"))
            .unwrap();
        let mut ticket = f.storage.find_ticket_by_number(1).unwrap().unwrap();
        assert_eq!(ticket.title, NO_SUBJECT);

        // Agent asks for details, the ticket waits for the requester
        ticket.set_status(Status::Pending);
        f.storage.save(&ticket).unwrap();

        let receipt = f.storage.load_all::<OutgoingEmail>().unwrap().remove(0);
        let mut reply = email("<2@acme.example>", "alix@acme.example", "Re: whatever", "Still down");
        reply.in_reply_to = Some(receipt.message_id);
        assert_eq!(processor.process(&reply).unwrap(), Outcome::Answered { number: 1 });
        let ticket = f.storage.find_ticket_by_number(1).unwrap().unwrap();
        assert_eq!(ticket.status, Status::InProgress);

        let tagged = email("<3@helpdesk.example>", "agent@helpdesk.example", "Re: [#1] VPN", "Rebooted");
        assert_eq!(processor.process(&tagged).unwrap(), Outcome::Answered { number: 1 });
        let messages = f.storage.messages_of(&ticket.id).unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].created_by, f.agent.id);

        // Same e-mail twice
        assert!(matches!(processor.process(&tagged).unwrap(), Outcome::Discarded { .. }));
    }

    #[test]
    fn test_unwritable_outbox_keeps_emails_processed() {
        let f = fixture();
        // A plain file where the outbox directory should be
        std::fs::write(f.storage.root().join("outbox"), "").unwrap();

        let mut processor = processor(&f.storage);
        let opened = processor
            .process(&email("<1@acme.example>", "alix@acme.example", "VPN", "Down"))
            .unwrap();
        assert_eq!(opened, Outcome::TicketCreated { number: 1 });

        let mut source = MockMailSource::new();
        source.expect_fetch().times(1).returning(|| {
            Ok(vec![email("<2@acme.example>", "alix@acme.example", "Re: [#1] VPN", "Still down")])
        });
        let report = processor.collect(&mut source).unwrap();
        assert_eq!(report.answered, 1);
        assert_eq!(report.failed, 0);
        assert!(processor.failed().unwrap().is_empty());

        let ticket = f.storage.find_ticket_by_number(1).unwrap().unwrap();
        assert_eq!(f.storage.messages_of(&ticket.id).unwrap().len(), 2);
    }

    #[test]
    fn test_closed_ticket_rejects_answers() {
        let f = fixture();
        let mut processor = processor(&f.storage);
        processor
            .process(&email("<1@acme.example>", "alix@acme.example", "VPN", "Down"))
            .unwrap();
        let mut ticket = f.storage.find_ticket_by_number(1).unwrap().unwrap();
        ticket.set_status(Status::Closed);
        f.storage.save(&ticket).unwrap();

        let reply = email("<2@acme.example>", "alix@acme.example", "Re: [#1] VPN", "Thanks");
        assert!(processor.process(&reply).is_err());
    }

    #[test]
    fn test_collect_records_failures_and_retries() {
        let f = fixture();
        let mut source = MockMailSource::new();
        let mut batches = vec![vec![
            email("<1@acme.example>", "alix@acme.example", "Printer", "Jammed"),
            email("<2@x.example>", "nobody@elsewhere.example", "Spam", "Buy"),
        ]]
        .into_iter();
        source
            .expect_fetch()
            .times(4)
            .returning(move || Ok(batches.next().unwrap_or_default()));

        let mut processor = processor(&f.storage);
        let report = processor.collect(&mut source).unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.created, 1);
        assert_eq!(report.failed, 1);

        let failed = processor.failed().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].attempts, 1);
        assert!(failed[0].last_error.as_deref().unwrap().contains("unknown sender"));

        processor.collect(&mut source).unwrap();
        let report = processor.collect(&mut source).unwrap();
        assert_eq!(report.failed, 1);
        let report = processor.collect(&mut source).unwrap();
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(processor.failed().unwrap()[0].attempts, 3);
    }
}
