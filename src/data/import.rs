use super::Bundle;
use crate::auth::Role;
use crate::core::{
    Contract, ContractId, Label, LabelId, Organization, OrganizationId, RoleId, Team, TeamId,
    Ticket, TicketId, User, UserId,
};
use crate::error::{BiletoError, Result};
use crate::storage::{Entity, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;

/// Records written by an import
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportSummary {
    pub organizations: usize,
    pub roles: usize,
    pub users: usize,
    pub authorizations: usize,
    pub teams: usize,
    pub labels: usize,
    pub contracts: usize,
    pub tickets: usize,
    pub messages: usize,
    pub time_spents: usize,
}

/// Ids of the records in store and in the bundle
struct KnownIds<I> {
    ids: HashSet<I>,
}

impl<I: Eq + Hash + Clone> KnownIds<I> {
    fn new<E, R>(repo: &R, imported: &[E]) -> Result<Self>
    where
        E: Entity<Id = I>,
        R: Repository,
    {
        let mut ids: HashSet<I> = repo.load_all::<E>()?.iter().map(|e| e.id().clone()).collect();
        ids.extend(imported.iter().map(|e| e.id().clone()));
        Ok(Self { ids })
    }

    fn contains(&self, id: &I) -> bool {
        self.ids.contains(id)
    }
}

/// Loads a [`Bundle`] into a repository
///
/// The whole bundle is validated first: nothing is written when any record
/// is invalid.
pub struct Importer<'a, R: Repository> {
    repo: &'a R,
    show_progress: bool,
}

impl<'a, R: Repository> Importer<'a, R> {
    pub const fn new(repo: &'a R) -> Self {
        Self {
            repo,
            show_progress: false,
        }
    }

    #[must_use]
    pub const fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Every problem found in the bundle
    pub fn validate(&self, bundle: &Bundle) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        self.check_duplicates(bundle, &mut errors)?;

        let organizations = KnownIds::<OrganizationId>::new::<Organization, _>(self.repo, &bundle.organizations)?;
        let roles = KnownIds::<RoleId>::new::<Role, _>(self.repo, &bundle.roles)?;
        let users = KnownIds::<UserId>::new::<User, _>(self.repo, &bundle.users)?;
        let teams = KnownIds::<TeamId>::new::<Team, _>(self.repo, &bundle.teams)?;
        let labels = KnownIds::<LabelId>::new::<Label, _>(self.repo, &bundle.labels)?;
        let contracts = KnownIds::<ContractId>::new::<Contract, _>(self.repo, &bundle.contracts)?;
        let tickets = KnownIds::<TicketId>::new::<Ticket, _>(self.repo, &bundle.tickets)?;

        let mut missing = |what: String, kind: &str, id: &dyn std::fmt::Display| {
            errors.push(format!("{what} references an unknown {kind} {id}"));
        };

        for user in &bundle.users {
            if let Some(organization) = &user.organization_id {
                if !organizations.contains(organization) {
                    missing(format!("User {}", user.email), "organization", organization);
                }
            }
        }
        for authorization in &bundle.authorizations {
            let what = format!("Authorization {}", authorization.id);
            if !users.contains(&authorization.user_id) {
                missing(what.clone(), "user", &authorization.user_id);
            }
            if !roles.contains(&authorization.role_id) {
                missing(what.clone(), "role", &authorization.role_id);
            }
            if let Some(organization) = &authorization.organization_id {
                if !organizations.contains(organization) {
                    missing(what, "organization", organization);
                }
            }
        }
        for team in &bundle.teams {
            for agent in team.agents.iter().filter(|a| !users.contains(a)) {
                missing(format!("Team {}", team.name), "user", agent);
            }
        }
        for contract in &bundle.contracts {
            if !organizations.contains(&contract.organization_id) {
                missing(format!("Contract {}", contract.name), "organization", &contract.organization_id);
            }
        }
        for ticket in &bundle.tickets {
            let what = format!("Ticket {}", ticket.reference());
            if !organizations.contains(&ticket.organization_id) {
                missing(what.clone(), "organization", &ticket.organization_id);
            }
            let actors = std::iter::once(&ticket.requester_id)
                .chain(ticket.assignee_id.iter())
                .chain(ticket.observers.iter());
            for user in actors.filter(|u| !users.contains(u)) {
                missing(what.clone(), "user", user);
            }
            if let Some(team) = ticket.team_id.as_ref().filter(|t| !teams.contains(t)) {
                missing(what.clone(), "team", team);
            }
            for label in ticket.labels.iter().filter(|l| !labels.contains(l)) {
                missing(what.clone(), "label", label);
            }
            for contract in ticket.contract_ids.iter().filter(|c| !contracts.contains(c)) {
                missing(what.clone(), "contract", contract);
            }
        }
        for message in &bundle.messages {
            let what = format!("Message {}", message.id);
            if !tickets.contains(&message.ticket_id) {
                missing(what.clone(), "ticket", &message.ticket_id);
            }
            if !users.contains(&message.created_by) {
                missing(what, "user", &message.created_by);
            }
        }
        for entry in &bundle.time_spents {
            let what = format!("Time spent {}", entry.id);
            if !tickets.contains(&entry.ticket_id) {
                missing(what.clone(), "ticket", &entry.ticket_id);
            }
            if let Some(contract) = entry.contract_id.as_ref().filter(|c| !contracts.contains(c)) {
                missing(what, "contract", contract);
            }
        }

        for contract in &bundle.contracts {
            if let Err(e) = contract.validate() {
                errors.push(format!("Contract {}: {e}", contract.name));
            }
        }
        Ok(errors)
    }

    /// Duplicate e-mails, organization names and ticket numbers
    fn check_duplicates(&self, bundle: &Bundle, errors: &mut Vec<String>) -> Result<()> {
        let existing_users = self.repo.load_all::<User>()?;
        let mut emails: HashSet<String> = HashSet::new();
        for user in &bundle.users {
            let email = user.email.to_lowercase();
            let taken = existing_users
                .iter()
                .any(|u| u.has_email(&email) && u.id != user.id);
            if taken || !emails.insert(email) {
                errors.push(format!("Duplicate user e-mail: {}", user.email));
            }
        }

        let existing_organizations = self.repo.load_all::<Organization>()?;
        let mut names: HashSet<String> = HashSet::new();
        for organization in &bundle.organizations {
            let name = organization.name.to_lowercase();
            let taken = existing_organizations
                .iter()
                .any(|o| o.name.to_lowercase() == name && o.id != organization.id);
            if taken || !names.insert(name) {
                errors.push(format!("Duplicate organization name: {}", organization.name));
            }
        }

        let existing_tickets = self.repo.load_all::<Ticket>()?;
        let mut numbers: HashSet<u64> = HashSet::new();
        for ticket in &bundle.tickets {
            let taken = existing_tickets
                .iter()
                .any(|t| t.number == ticket.number && t.id != ticket.id);
            if ticket.number == 0 || taken || !numbers.insert(ticket.number) {
                errors.push(format!("Duplicate or invalid ticket number: {}", ticket.reference()));
            }
        }
        Ok(())
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar
    }

    fn save_all<E: Entity>(&self, records: &[E], bar: &ProgressBar) -> Result<usize> {
        bar.set_message(E::COLLECTION);
        for record in records {
            self.repo.save(record)?;
            bar.inc(1);
        }
        Ok(records.len())
    }

    /// Validate then write the bundle
    pub fn import(&self, bundle: &Bundle) -> Result<ImportSummary> {
        let errors = self.validate(bundle)?;
        if !errors.is_empty() {
            for error in &errors {
                tracing::warn!("{error}");
            }
            return Err(BiletoError::Validation(format!(
                "{} problem(s) found, nothing imported:\n  - {}",
                errors.len(),
                errors.join("\n  - ")
            )));
        }

        let bar = self.progress_bar(bundle.len());
        let summary = ImportSummary {
            organizations: self.save_all(&bundle.organizations, &bar)?,
            roles: self.save_all(&bundle.roles, &bar)?,
            users: self.save_all(&bundle.users, &bar)?,
            authorizations: self.save_all(&bundle.authorizations, &bar)?,
            teams: self.save_all(&bundle.teams, &bar)?,
            labels: self.save_all(&bundle.labels, &bar)?,
            contracts: self.save_all(&bundle.contracts, &bar)?,
            tickets: self.save_all(&bundle.tickets, &bar)?,
            messages: self.save_all(&bundle.messages, &bar)?,
            time_spents: self.save_all(&bundle.time_spents, &bar)?,
        };
        bar.finish_and_clear();

        if let Some(last) = bundle.tickets.iter().map(|t| t.number).max() {
            self.repo.reserve_ticket_numbers(last)?;
        }
        tracing::info!(records = bundle.len(), "bundle imported");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Message, MessageVia, TicketBuilder};
    use crate::data::DataFormat;
    use crate::storage::{FileStorage, ProjectState};
    use tempfile::TempDir;

    fn storage(temp_dir: &TempDir, name: &str) -> FileStorage {
        let storage = FileStorage::new(temp_dir.path().join(name));
        storage.ensure_directories().unwrap();
        storage.save_state(&ProjectState::new(name, None)).unwrap();
        storage
    }

    fn sample_bundle() -> Bundle {
        let acme = Organization::new("Acme").unwrap();
        let alix = User::new("alix@acme.example", "Alix").unwrap();
        let ticket = TicketBuilder::new(acme.id.clone(), alix.id.clone())
            .number(7)
            .title("Printer")
            .build();
        let message = Message::new(ticket.id.clone(), alix.id.clone(), "Jammed", false, MessageVia::Webapp);
        Bundle {
            organizations: vec![acme],
            users: vec![alix],
            tickets: vec![ticket],
            messages: vec![message],
            ..Bundle::default()
        }
    }

    #[test]
    fn test_export_then_import_into_another_project() {
        let temp_dir = TempDir::new().unwrap();
        let source = storage(&temp_dir, "source");
        let bundle = sample_bundle();
        Importer::new(&source).import(&bundle).unwrap();

        let exported = DataFormat::Yaml
            .serialize(&Bundle::export(&source).unwrap())
            .unwrap();
        let format = DataFormat::detect(&exported).unwrap();
        let parsed: Bundle = format.deserialize(&exported).unwrap();
        assert_eq!(parsed.len(), 4);

        let target = storage(&temp_dir, "target");
        let summary = Importer::new(&target).import(&parsed).unwrap();
        assert_eq!(summary.tickets, 1);
        assert_eq!(summary.messages, 1);
        assert_eq!(target.next_ticket_number().unwrap(), 8);
    }

    #[test]
    fn test_reports_all_errors_and_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let target = storage(&temp_dir, "target");

        let mut bundle = sample_bundle();
        bundle.users.push(User::new("ALIX@acme.example", "Twin").unwrap());
        bundle.organizations.push(Organization::new("acme").unwrap());
        bundle.tickets[0].assignee_id = Some(UserId::new());
        bundle.messages[0].ticket_id = TicketId::new();

        let errors = Importer::new(&target).validate(&bundle).unwrap();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("Duplicate user e-mail")));
        assert!(errors.iter().any(|e| e.contains("Duplicate organization name")));
        assert!(errors.iter().any(|e| e.contains("unknown user")));
        assert!(errors.iter().any(|e| e.contains("unknown ticket")));

        assert!(matches!(
            Importer::new(&target).import(&bundle),
            Err(BiletoError::Validation(_))
        ));
        assert!(target.load_all::<User>().unwrap().is_empty());
    }

    #[test]
    fn test_reimport_conflicts_with_existing_records() {
        let temp_dir = TempDir::new().unwrap();
        let target = storage(&temp_dir, "target");
        Importer::new(&target).import(&sample_bundle()).unwrap();

        // Same names and numbers, new ids
        let errors = Importer::new(&target).validate(&sample_bundle()).unwrap();
        assert_eq!(errors.len(), 3, "{errors:?}");
    }
}
