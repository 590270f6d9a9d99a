use crate::auth::permission::{ADMIN_SEE, ORGA_SEE};
use crate::auth::{Authorizer, Role, Scope};
use crate::cli::utils::{find_project_root, parse_ticket_number};
use crate::config::Config;
use crate::core::{Contract, Message, Organization, Ticket, User, UserId};
use crate::error::{BiletoError, Result};
use crate::notifications::{Notifier, OutgoingEmail, log_failure};
use crate::storage::{DATA_DIR, FileStorage, Lookups, Repository};
use std::path::PathBuf;

/// Common context for all handler operations
///
/// Holds the project storage, its configuration and the permissions loaded
/// from the store. The session user is resolved lazily so that commands
/// which do not act on domain data work without one.
pub struct HandlerContext {
    pub data_dir: PathBuf,
    pub storage: FileStorage,
    pub config: Config,
    pub authorizer: Authorizer,
    session_email: Option<String>,
}

impl HandlerContext {
    /// Open the project found from `project_dir`
    pub fn new(project_dir: Option<&str>, as_user: Option<&str>) -> Result<Self> {
        let project_root = find_project_root(project_dir)?;
        let data_dir = project_root.join(DATA_DIR);
        let storage = FileStorage::new(&data_dir);
        if !storage.is_initialized() {
            return Err(BiletoError::ProjectNotInitialized);
        }

        let config = Config::load(Some(&data_dir))?;
        let authorizer = Authorizer::load(&storage)?;
        let session_email = as_user
            .map(str::to_string)
            .or_else(|| config.session.user.clone());

        Ok(Self {
            data_dir,
            storage,
            config,
            authorizer,
            session_email,
        })
    }

    /// The user the command runs as
    pub fn session(&self) -> Result<User> {
        let email = self.session_email.as_deref().ok_or(BiletoError::NoSession)?;
        self.storage
            .find_user_by_email(email)?
            .ok_or_else(|| BiletoError::not_found("User", email))
    }

    /// The session user, provided they hold an admin permission
    pub fn admin(&self, permission: &str) -> Result<User> {
        let user = self.session()?;
        self.authorizer.require(&user.id, permission, Scope::Global)?;
        Ok(user)
    }

    /// The session user, provided they hold `permission` in the organization
    pub fn member(&self, permission: &str, organization: &Organization) -> Result<User> {
        let user = self.session()?;
        self.authorizer
            .require(&user.id, permission, Scope::Organization(&organization.id))?;
        Ok(user)
    }

    /// Find an organization by name or ID
    pub fn organization(&self, reference: &str) -> Result<Organization> {
        if let Some(organization) = self.storage.find_organization_by_name(reference)? {
            return Ok(organization);
        }
        self.storage
            .find::<Organization, _>(|o| o.id.to_string() == reference.trim())?
            .into_iter()
            .next()
            .ok_or_else(|| BiletoError::not_found("Organization", reference))
    }

    pub fn user(&self, email: &str) -> Result<User> {
        self.storage
            .find_user_by_email(email)?
            .ok_or_else(|| BiletoError::not_found("User", email))
    }

    /// Find a role by name or ID
    pub fn role(&self, reference: &str) -> Result<Role> {
        let reference = reference.trim();
        self.storage
            .find::<Role, _>(|r| r.name.eq_ignore_ascii_case(reference) || r.id.to_string() == reference)?
            .into_iter()
            .next()
            .ok_or_else(|| BiletoError::not_found("Role", reference))
    }

    /// Find a contract by name or ID
    pub fn contract(&self, reference: &str) -> Result<Contract> {
        let reference = reference.trim();
        self.storage
            .find::<Contract, _>(|c| c.name.eq_ignore_ascii_case(reference) || c.id.to_string() == reference)?
            .into_iter()
            .next()
            .ok_or_else(|| BiletoError::not_found("Contract", reference))
    }

    /// Load a ticket by number, hiding it when the user may not see it
    pub fn ticket(&self, user: &User, reference: &str) -> Result<Ticket> {
        let number = parse_ticket_number(reference)?;
        self.storage
            .find_ticket_by_number(number)?
            .filter(|t| self.authorizer.can_see_ticket(&user.id, t))
            .ok_or_else(|| BiletoError::TicketNotFound {
                id: format!("#{number}"),
            })
    }

    /// Require a permission in the organization of a ticket
    pub fn require_on(&self, user: &User, permission: &str, ticket: &Ticket) -> Result<()> {
        self.authorizer
            .require(&user.id, permission, Scope::Organization(&ticket.organization_id))
    }

    /// Organizations the user may see, sorted by name
    pub fn visible_organizations(&self, user: &User) -> Result<Vec<Organization>> {
        let mut organizations = self.storage.load_all::<Organization>()?;
        if !self.authorizer.is_granted(&user.id, ADMIN_SEE, Scope::Global) {
            organizations.retain(|o| {
                self.authorizer
                    .is_granted(&user.id, ORGA_SEE, Scope::Organization(&o.id))
            });
        }
        organizations.sort_by_key(|o| o.name.to_lowercase());
        Ok(organizations)
    }

    /// E-mail of a user, or a placeholder when the user is gone
    pub fn email_of(&self, user_id: &UserId) -> String {
        self.storage
            .load::<User>(user_id)
            .map(|u| u.email)
            .unwrap_or_else(|_| "(unknown)".to_string())
    }

    fn notifier(&self) -> Result<Notifier<'_, FileStorage>> {
        Notifier::new(&self.storage, &self.authorizer, self.config.notification_settings())
    }

    /// Acknowledge a new ticket to its requester
    ///
    /// A notification that cannot be queued never undoes the change that
    /// triggered it, so failures are only logged.
    pub fn notify_created(&self, ticket: &Ticket, message: Option<&Message>) -> Option<OutgoingEmail> {
        let queued = self.notifier().and_then(|n| n.ticket_created(ticket, message));
        log_failure(ticket, queued)
    }

    pub fn notify_message(&self, ticket: &Ticket, message: &Message) -> Option<OutgoingEmail> {
        let queued = self.notifier().and_then(|n| n.message_added(ticket, message));
        log_failure(ticket, queued)
    }
}
