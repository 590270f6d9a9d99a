use super::permission::{
    ADMIN_ALL, ADMIN_PERMISSIONS, AGENT_PERMISSIONS, ORGA_SEE, USER_PERMISSIONS,
    is_admin_permission,
};
use crate::core::validation::validate_name;
use crate::core::{AuthorizationId, OrganizationId, RoleId, UserId};
use crate::error::{BiletoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Family of a role; decides which permissions it may carry and its scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    Super,
    Admin,
    Agent,
    User,
}

impl RoleType {
    /// Admin-like roles are always global
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Super | Self::Admin)
    }

    const fn allowed_permissions(self) -> &'static [&'static str] {
        match self {
            Self::Super | Self::Admin => ADMIN_PERMISSIONS,
            Self::Agent => AGENT_PERMISSIONS,
            Self::User => USER_PERMISSIONS,
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Super => "super",
            Self::Admin => "admin",
            Self::Agent => "agent",
            Self::User => "user",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RoleType {
    type Err = BiletoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "super" => Ok(Self::Super),
            "admin" => Ok(Self::Admin),
            "agent" => Ok(Self::Agent),
            "user" => Ok(Self::User),
            _ => Err(BiletoError::InvalidInput(format!(
                "Invalid role type: {s}. Must be one of: super, admin, agent, user"
            ))),
        }
    }
}

/// A named set of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub role_type: RoleType,
    pub permissions: Vec<String>,
    /// Given to users created implicitly (user roles only)
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Create a role, keeping only the permissions its type allows
    pub fn new<I, S>(name: impl Into<String>, role_type: RoleType, permissions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into().trim().to_string();
        validate_name("Role name", &name)?;
        let mut role = Self {
            id: RoleId::new(),
            name,
            description: String::new(),
            role_type,
            permissions: Vec::new(),
            is_default: false,
            created_at: Utc::now(),
        };
        role.set_permissions(permissions);
        Ok(role)
    }

    /// The role granting every admin permission
    pub fn super_admin() -> Self {
        Self {
            id: RoleId::new(),
            name: "Super-admin".to_string(),
            description: "Has all the admin permissions".to_string(),
            role_type: RoleType::Super,
            permissions: vec![ADMIN_ALL.to_string()],
            is_default: false,
            created_at: Utc::now(),
        }
    }

    /// Replace the permissions, dropping the ones not allowed for the type
    pub fn set_permissions<I, S>(&mut self, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.role_type == RoleType::Super {
            self.permissions = vec![ADMIN_ALL.to_string()];
            return;
        }

        let allowed = self.role_type.allowed_permissions();
        let mut sanitized: Vec<String> = Vec::new();
        if !self.role_type.is_admin() {
            sanitized.push(ORGA_SEE.to_string());
        }
        for permission in permissions {
            let permission = permission.as_ref().trim();
            if allowed.contains(&permission) && !sanitized.iter().any(|p| p == permission) {
                sanitized.push(permission.to_string());
            }
        }
        sanitized.sort();
        self.permissions = sanitized;
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| {
            p == permission || (p == ADMIN_ALL && is_admin_permission(permission))
        })
    }
}

/// Grants a role to a user, globally or within one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub id: AuthorizationId,
    pub user_id: UserId,
    pub role_id: RoleId,
    /// `None` for global authorizations
    pub organization_id: Option<OrganizationId>,
    pub created_at: DateTime<Utc>,
}

impl Authorization {
    /// Create an authorization, enforcing that admin roles are global
    pub fn new(user_id: UserId, role: &Role, organization_id: Option<OrganizationId>) -> Result<Self> {
        if role.role_type.is_admin() && organization_id.is_some() {
            return Err(BiletoError::Validation(format!(
                "The {} role '{}' cannot be scoped to an organization",
                role.role_type, role.name
            )));
        }
        Ok(Self {
            id: AuthorizationId::new(),
            user_id,
            role_id: role.id.clone(),
            organization_id,
            created_at: Utc::now(),
        })
    }
}
