use crate::auth::{Authorization, Role, RoleType};
use crate::core::validation::{email_domain, normalize_email};
use crate::core::{OrganizationId, User, UserId};
use crate::error::{BiletoError, Result};
use crate::storage::{Lookups, Repository};

/// Users and the roles granted to them
pub struct Directory<'a, R: Repository> {
    repo: &'a R,
}

impl<'a, R: Repository> Directory<'a, R> {
    pub const fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// The role given to users created implicitly
    pub fn default_role(&self) -> Result<Option<Role>> {
        Ok(self
            .repo
            .find::<Role, _>(|r| r.is_default && r.role_type == RoleType::User)?
            .into_iter()
            .next())
    }

    /// Make `role` the only default role
    pub fn set_default_role(&self, role: &mut Role) -> Result<()> {
        if role.role_type != RoleType::User {
            return Err(BiletoError::Validation(format!(
                "Only user roles can be the default role, '{}' is a {} role",
                role.name, role.role_type
            )));
        }
        for mut other in self.repo.find::<Role, _>(|r| r.is_default && r.id != role.id)? {
            other.is_default = false;
            self.repo.save(&other)?;
        }
        role.is_default = true;
        self.repo.save(role)
    }

    /// Create a user
    ///
    /// Without an explicit organization, the user joins the organization
    /// owning the domain of their e-mail, if any. When the user ends up in an
    /// organization, the default role is granted to them there.
    pub fn register(
        &self,
        email: &str,
        name: &str,
        organization_id: Option<OrganizationId>,
    ) -> Result<(User, Option<Authorization>)> {
        let email = normalize_email(email)?;
        if self.repo.find_user_by_email(&email)?.is_some() {
            return Err(BiletoError::AlreadyExists {
                kind: "User",
                name: email,
            });
        }

        let organization_id = match organization_id {
            Some(id) => Some(id),
            None => match email_domain(&email) {
                Some(domain) => self.repo.find_organization_by_domain(domain)?.map(|o| o.id),
                None => None,
            },
        };

        let mut user = User::new(&email, name)?;
        user.organization_id = organization_id.clone();
        self.repo.save(&user)?;
        tracing::info!(email = %user.email, "user created");

        let authorization = match (organization_id, self.default_role()?) {
            (Some(organization_id), Some(role)) => {
                Some(self.grant(&user.id, &role, Some(organization_id))?)
            },
            _ => None,
        };
        Ok((user, authorization))
    }

    /// Grant a role to a user, globally or in one organization
    pub fn grant(
        &self,
        user_id: &UserId,
        role: &Role,
        organization_id: Option<OrganizationId>,
    ) -> Result<Authorization> {
        let duplicate = self.repo.count::<Authorization, _>(|a| {
            a.user_id == *user_id && a.role_id == role.id && a.organization_id == organization_id
        })? > 0;
        if duplicate {
            return Err(BiletoError::AlreadyExists {
                kind: "Authorization",
                name: role.name.clone(),
            });
        }

        let authorization = Authorization::new(user_id.clone(), role, organization_id)?;
        self.repo.save(&authorization)?;
        Ok(authorization)
    }

    /// Remove the authorizations of a user for a role; returns how many were removed
    pub fn revoke(
        &self,
        user_id: &UserId,
        role: &Role,
        organization_id: Option<&OrganizationId>,
    ) -> Result<usize> {
        let authorizations = self.repo.find::<Authorization, _>(|a| {
            a.user_id == *user_id
                && a.role_id == role.id
                && (organization_id.is_none() || a.organization_id.as_ref() == organization_id)
        })?;
        for authorization in &authorizations {
            self.repo.delete::<Authorization>(&authorization.id)?;
        }
        Ok(authorizations.len())
    }
}
