//! Ticket search
//!
//! Queries are parsed into a [`Query`], compiled against the data of the
//! project into a [`CompiledQuery`], then evaluated on the tickets the
//! searching user is allowed to see.

mod dates;
mod matcher;
mod query;
mod saved;
mod sort;
mod tokenizer;

pub use dates::DateRange;
pub use matcher::{CompiledQuery, SearchContext};
pub use query::{Actor, ActorRole, Condition, DateField, Expr, Missing, Query, Reference};
pub use saved::{BUILTIN_SEARCHES, SavedSearch, SavedSearches};
pub use sort::TicketSort;
pub use tokenizer::{Token, TokenKind, tokenize};

use crate::auth::Authorizer;
use crate::core::{Message, Ticket, UserId};
use crate::error::Result;
use crate::storage::Repository;
use std::collections::HashMap;

/// Runs queries on behalf of a user
pub struct TicketSearch<'a, R: Repository> {
    repo: &'a R,
    authorizer: &'a Authorizer,
    saved: &'a SavedSearches,
    user_id: UserId,
}

impl<'a, R: Repository> TicketSearch<'a, R> {
    pub const fn new(
        repo: &'a R,
        authorizer: &'a Authorizer,
        saved: &'a SavedSearches,
        user_id: UserId,
    ) -> Self {
        Self {
            repo,
            authorizer,
            saved,
            user_id,
        }
    }

    /// Search the tickets visible to the user
    pub fn search(&self, query: &str, sort: TicketSort, limit: Option<usize>) -> Result<Vec<Ticket>> {
        let expanded = self.saved.expand(query)?;
        let query = Query::parse(&expanded)?;
        let context = SearchContext::load(self.repo, self.user_id.clone())?;
        let compiled = CompiledQuery::compile(&query, &context);

        let visible: Vec<Ticket> = self
            .repo
            .load_all::<Ticket>()?
            .into_iter()
            .filter(|t| self.authorizer.can_see_ticket(&self.user_id, t))
            .collect();

        let mut messages: HashMap<_, Vec<Message>> = HashMap::new();
        if compiled.uses_text() {
            for message in self.repo.load_all::<Message>()? {
                messages
                    .entry(message.ticket_id.clone())
                    .or_default()
                    .push(message);
            }
        }

        let mut results: Vec<Ticket> = visible
            .into_iter()
            .filter(|ticket| {
                let text = if compiled.uses_text() {
                    self.searchable_text(ticket, messages.get(&ticket.id).map(Vec::as_slice))
                } else {
                    String::new()
                };
                compiled.matches(ticket, &text)
            })
            .collect();

        sort.sort(&mut results);
        if let Some(limit) = limit {
            results.truncate(limit);
        }

        tracing::debug!(query = %expanded, results = results.len(), "ticket search");
        Ok(results)
    }

    /// Title and readable messages of a ticket, lowercased
    fn searchable_text(&self, ticket: &Ticket, messages: Option<&[Message]>) -> String {
        let mut text = ticket.title.to_lowercase();
        for message in messages.unwrap_or_default() {
            if self.authorizer.can_see_message(&self.user_id, ticket, message) {
                text.push('\n');
                text.push_str(&message.content.to_lowercase());
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Authorization, Role, RoleType, permission};
    use crate::core::{MessageVia, Organization, TicketBuilder, User};
    use crate::storage::FileStorage;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        storage: FileStorage,
        authorizer: Authorizer,
        agent: User,
        requester: User,
    }

    /// An agent and a requester in one organization with three tickets
    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join(".bileto"));
        storage.ensure_directories().unwrap();

        let acme = Organization::new("Acme").unwrap();
        let agent = User::new("agent@example.com", "Agent").unwrap();
        let requester = User::new("requester@example.com", "Requester").unwrap();
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
            [permission::ORGA_SEE, permission::ORGA_CREATE_TICKETS],
        )
        .unwrap();
        let authorizations = vec![
            Authorization::new(agent.id.clone(), &agent_role, Some(acme.id.clone())).unwrap(),
            Authorization::new(requester.id.clone(), &user_role, Some(acme.id.clone())).unwrap(),
        ];
        let authorizer = Authorizer::new(vec![agent_role, user_role], authorizations);

        let printer = TicketBuilder::new(acme.id.clone(), requester.id.clone())
            .number(1)
            .title("Printer jammed")
            .build();
        let vpn = TicketBuilder::new(acme.id.clone(), agent.id.clone())
            .number(2)
            .title("VPN certificate")
            .assignee(agent.id.clone())
            .build();
        let mail = TicketBuilder::new(acme.id.clone(), requester.id.clone())
            .number(3)
            .title("Mailbox full")
            .assignee(agent.id.clone())
            .build();
        for ticket in [&printer, &vpn, &mail] {
            storage.save(ticket).unwrap();
        }

        let public = Message::new(
            printer.id.clone(),
            requester.id.clone(),
            "The paper tray is stuck",
            false,
            MessageVia::Webapp,
        );
        let confidential = Message::new(
            mail.id.clone(),
            agent.id.clone(),
            "Quota raised on the exchange server",
            true,
            MessageVia::Webapp,
        );
        storage.save(&public).unwrap();
        storage.save(&confidential).unwrap();

        Fixture {
            _temp_dir: temp_dir,
            storage,
            authorizer,
            agent,
            requester,
        }
    }

    fn search(f: &Fixture, user: &User, query: &str) -> Vec<u64> {
        let saved = SavedSearches::default();
        TicketSearch::new(&f.storage, &f.authorizer, &saved, user.id.clone())
            .search(query, TicketSort::NumberAsc, None)
            .unwrap()
            .iter()
            .map(|t| t.number)
            .collect()
    }

    #[test]
    fn test_visibility() {
        let f = fixture();
        assert_eq!(search(&f, &f.agent, ""), vec![1, 2, 3]);
        // The requester only sees the tickets they are involved in
        assert_eq!(search(&f, &f.requester, ""), vec![1, 3]);
    }

    #[test]
    fn test_text_searches_visible_messages() {
        let f = fixture();
        assert_eq!(search(&f, &f.agent, "paper"), vec![1]);
        assert_eq!(search(&f, &f.agent, "exchange"), vec![3]);
        assert_eq!(search(&f, &f.requester, "exchange"), Vec::<u64>::new());
    }

    #[test]
    fn test_builtin_views() {
        let f = fixture();
        assert_eq!(search(&f, &f.agent, "@owned"), vec![2, 3]);
        assert_eq!(search(&f, &f.agent, "@unassigned"), vec![1]);
        assert_eq!(search(&f, &f.requester, "@involved -mailbox"), vec![1]);
    }

    #[test]
    fn test_limit_and_errors() {
        let f = fixture();
        let saved = SavedSearches::default();
        let search = TicketSearch::new(&f.storage, &f.authorizer, &saved, f.agent.id.clone());

        let results = search.search("status:new", TicketSort::NumberDesc, Some(2)).unwrap();
        assert_eq!(results.iter().map(|t| t.number).collect::<Vec<_>>(), vec![3, 2]);

        assert!(search.search("status:", TicketSort::default(), None).is_err());
        assert!(search.search("@missing", TicketSort::default(), None).is_err());
    }
}
