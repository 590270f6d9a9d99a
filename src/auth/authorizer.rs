use super::permission::{
    ORGA_SEE, ORGA_SEE_TICKETS_ALL, ORGA_SEE_TICKETS_MESSAGES_CONFIDENTIAL, is_admin_permission,
};
use super::role::{Authorization, Role, RoleType};
use crate::core::{Message, OrganizationId, RoleId, Ticket, UserId};
use crate::error::{BiletoError, Result};
use crate::storage::Repository;
use std::collections::HashMap;

/// Where a permission is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// Outside of any organization (admin permissions)
    Global,
    /// Within one organization
    Organization(&'a OrganizationId),
    /// In at least one organization
    Any,
}

/// Answers permission questions from the roles and authorizations in store
pub struct Authorizer {
    roles: HashMap<RoleId, Role>,
    authorizations: Vec<Authorization>,
}

impl Authorizer {
    pub fn new(roles: Vec<Role>, authorizations: Vec<Authorization>) -> Self {
        let roles = roles.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            roles,
            authorizations,
        }
    }

    /// Build an authorizer from the roles and authorizations in store
    pub fn load<R: Repository>(repo: &R) -> Result<Self> {
        Ok(Self::new(repo.load_all()?, repo.load_all()?))
    }

    /// Take a new authorization into account
    pub fn add_authorization(&mut self, authorization: Authorization) {
        self.authorizations.push(authorization);
    }

    /// Roles of the user with the organization each one is scoped to
    fn grants<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> impl Iterator<Item = (&'a Role, Option<&'a OrganizationId>)> + 'a {
        self.authorizations
            .iter()
            .filter(move |a| a.user_id == *user_id)
            .filter_map(move |a| {
                self.roles
                    .get(&a.role_id)
                    .map(|role| (role, a.organization_id.as_ref()))
            })
    }

    pub fn is_granted(&self, user_id: &UserId, permission: &str, scope: Scope<'_>) -> bool {
        if is_admin_permission(permission) {
            return self
                .grants(user_id)
                .any(|(role, _)| role.role_type.is_admin() && role.has_permission(permission));
        }

        self.grants(user_id)
            .filter(|(role, _)| !role.role_type.is_admin())
            .filter(|(_, organization)| match (scope, organization) {
                (Scope::Any, _) | (_, None) => true,
                (Scope::Organization(scope), Some(organization)) => scope == *organization,
                (Scope::Global, Some(_)) => false,
            })
            .any(|(role, _)| role.has_permission(permission))
    }

    /// Fail with `PermissionDenied` unless the permission is granted
    pub fn require(&self, user_id: &UserId, permission: &str, scope: Scope<'_>) -> Result<()> {
        if self.is_granted(user_id, permission, scope) {
            Ok(())
        } else {
            tracing::debug!(user = %user_id, permission, "permission denied");
            Err(BiletoError::denied(permission))
        }
    }

    /// Whether the user acts as an agent in the scope
    pub fn is_agent(&self, user_id: &UserId, scope: Scope<'_>) -> bool {
        self.grants(user_id)
            .filter(|(role, _)| role.role_type == RoleType::Agent)
            .any(|(_, organization)| match (scope, organization) {
                (Scope::Any, _) | (_, None) => true,
                (Scope::Organization(scope), Some(organization)) => scope == organization,
                (Scope::Global, Some(_)) => false,
            })
    }

    /// Organizations among `candidates` in which the permission is granted
    pub fn granted_organizations<'a>(
        &self,
        user_id: &UserId,
        permission: &str,
        candidates: &'a [OrganizationId],
    ) -> Vec<&'a OrganizationId> {
        candidates
            .iter()
            .filter(|id| self.is_granted(user_id, permission, Scope::Organization(id)))
            .collect()
    }

    pub fn can_see_ticket(&self, user_id: &UserId, ticket: &Ticket) -> bool {
        let scope = Scope::Organization(&ticket.organization_id);
        self.is_granted(user_id, ORGA_SEE_TICKETS_ALL, scope)
            || (ticket.involves(user_id) && self.is_granted(user_id, ORGA_SEE, scope))
    }

    pub fn can_see_message(&self, user_id: &UserId, ticket: &Ticket, message: &Message) -> bool {
        if !message.is_confidential {
            return true;
        }
        self.is_granted(
            user_id,
            ORGA_SEE_TICKETS_MESSAGES_CONFIDENTIAL,
            Scope::Organization(&ticket.organization_id),
        )
    }

    /// Authorizations of a user
    pub fn authorizations_of<'a>(&'a self, user_id: &'a UserId) -> impl Iterator<Item = &'a Authorization> + 'a {
        self.authorizations.iter().filter(move |a| a.user_id == *user_id)
    }

    pub fn role(&self, role_id: &RoleId) -> Option<&Role> {
        self.roles.get(role_id)
    }
}
