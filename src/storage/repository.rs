use crate::core::{
    Contract, Label, Message, Organization, Team, Ticket, TicketId, TimeSpent, User,
};
use crate::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;

/// A record persisted in its own collection
pub trait Entity: Serialize + DeserializeOwned {
    /// Identifier type of the record
    type Id: Display;

    /// Directory name of the collection
    const COLLECTION: &'static str;

    /// Human readable kind, used in error messages
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;
}

/// Repository trait for record storage operations
///
/// This trait defines the interface for storing and retrieving records of
/// any [`Entity`] kind, allowing for different storage implementations.
pub trait Repository {
    /// Saves a record, replacing any previous version
    fn save<E: Entity>(&self, entity: &E) -> Result<()>;

    /// Loads a record by ID
    fn load<E: Entity>(&self, id: &E::Id) -> Result<E>;

    /// Loads all records of a collection
    fn load_all<E: Entity>(&self) -> Result<Vec<E>>;

    /// Deletes a record by ID
    fn delete<E: Entity>(&self, id: &E::Id) -> Result<()>;

    /// Reserves the next ticket number of the project
    fn next_ticket_number(&self) -> Result<u64>;

    /// Makes sure numbers up to `number` are never handed out again
    fn reserve_ticket_numbers(&self, number: u64) -> Result<()>;

    /// Checks if a record exists by ID
    fn exists<E: Entity>(&self, id: &E::Id) -> Result<bool> {
        match self.load::<E>(id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Finds records matching a predicate
    fn find<E, F>(&self, predicate: F) -> Result<Vec<E>>
    where
        E: Entity,
        F: Fn(&E) -> bool,
    {
        Ok(self.load_all::<E>()?.into_iter().filter(predicate).collect())
    }

    /// Counts records matching a predicate
    fn count<E, F>(&self, predicate: F) -> Result<usize>
    where
        E: Entity,
        F: Fn(&E) -> bool,
    {
        Ok(self.load_all::<E>()?.iter().filter(|e| predicate(e)).count())
    }
}

/// Lookups shared by the services, available on every repository
pub trait Lookups: Repository {
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .find::<User, _>(|u| u.has_email(email))?
            .into_iter()
            .next())
    }

    fn find_organization_by_name(&self, name: &str) -> Result<Option<Organization>> {
        Ok(self
            .find::<Organization, _>(|o| o.name.eq_ignore_ascii_case(name.trim()))?
            .into_iter()
            .next())
    }

    fn find_organization_by_domain(&self, domain: &str) -> Result<Option<Organization>> {
        Ok(self
            .find::<Organization, _>(|o| o.owns_domain(domain))?
            .into_iter()
            .next())
    }

    fn find_team_by_name(&self, name: &str) -> Result<Option<Team>> {
        Ok(self
            .find::<Team, _>(|t| t.name.eq_ignore_ascii_case(name.trim()))?
            .into_iter()
            .next())
    }

    fn find_label_by_name(&self, name: &str) -> Result<Option<Label>> {
        Ok(self
            .find::<Label, _>(|l| l.name.eq_ignore_ascii_case(name.trim()))?
            .into_iter()
            .next())
    }

    fn find_ticket_by_number(&self, number: u64) -> Result<Option<Ticket>> {
        Ok(self
            .find::<Ticket, _>(|t| t.number == number)?
            .into_iter()
            .next())
    }

    /// Messages of a ticket in chronological order
    fn messages_of(&self, ticket_id: &TicketId) -> Result<Vec<Message>> {
        let mut messages = self.find::<Message, _>(|m| m.ticket_id == *ticket_id)?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    /// Time spent on a ticket in chronological order
    fn time_spents_of(&self, ticket_id: &TicketId) -> Result<Vec<TimeSpent>> {
        let mut entries = self.find::<TimeSpent, _>(|t| t.ticket_id == *ticket_id)?;
        entries.sort_by_key(|t| t.created_at);
        Ok(entries)
    }

    /// Contracts of an organization, most recent first
    fn contracts_of(&self, organization: &Organization) -> Result<Vec<Contract>> {
        let mut contracts =
            self.find::<Contract, _>(|c| c.organization_id == organization.id)?;
        contracts.sort_by(|a, b| b.start_at.cmp(&a.start_at));
        Ok(contracts)
    }
}

/// Implementation of Lookups for every repository
impl<T> Lookups for T where T: Repository {}
