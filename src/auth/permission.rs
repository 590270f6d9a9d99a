//! Permission strings and the sets each role type may hold

/// Grants every admin permission
pub const ADMIN_ALL: &str = "admin:*";

pub const ADMIN_SEE: &str = "admin:see";
pub const ADMIN_MANAGE_ORGANIZATIONS: &str = "admin:manage:organizations";
pub const ADMIN_MANAGE_USERS: &str = "admin:manage:users";
pub const ADMIN_MANAGE_ROLES: &str = "admin:manage:roles";
pub const ADMIN_MANAGE_TEAMS: &str = "admin:manage:teams";
pub const ADMIN_MANAGE_LABELS: &str = "admin:manage:labels";
pub const ADMIN_MANAGE_CONTRACTS: &str = "admin:manage:contracts";
pub const ADMIN_MANAGE_MAILBOXES: &str = "admin:manage:mailboxes";

pub const ORGA_SEE: &str = "orga:see";
pub const ORGA_CREATE_TICKETS: &str = "orga:create:tickets";
pub const ORGA_CREATE_TICKETS_MESSAGES: &str = "orga:create:tickets:messages";
pub const ORGA_CREATE_TICKETS_MESSAGES_CONFIDENTIAL: &str =
    "orga:create:tickets:messages:confidential";
pub const ORGA_CREATE_TICKETS_TIME_SPENT: &str = "orga:create:tickets:time_spent";
pub const ORGA_MANAGE_CONTRACTS: &str = "orga:manage:contracts";
pub const ORGA_SEE_CONTRACTS: &str = "orga:see:contracts";
pub const ORGA_SEE_TICKETS_ALL: &str = "orga:see:tickets:all";
pub const ORGA_SEE_TICKETS_CONTRACTS: &str = "orga:see:tickets:contracts";
pub const ORGA_SEE_TICKETS_MESSAGES_CONFIDENTIAL: &str = "orga:see:tickets:messages:confidential";
pub const ORGA_SEE_TICKETS_TIME_SPENT_ACCOUNTED: &str = "orga:see:tickets:time_spent:accounted";
pub const ORGA_SEE_TICKETS_TIME_SPENT_REAL: &str = "orga:see:tickets:time_spent:real";
pub const ORGA_UPDATE_TICKETS_ACTORS: &str = "orga:update:tickets:actors";
pub const ORGA_UPDATE_TICKETS_CONTRACTS: &str = "orga:update:tickets:contracts";
pub const ORGA_UPDATE_TICKETS_LABELS: &str = "orga:update:tickets:labels";
pub const ORGA_UPDATE_TICKETS_ORGANIZATION: &str = "orga:update:tickets:organization";
pub const ORGA_UPDATE_TICKETS_PRIORITY: &str = "orga:update:tickets:priority";
pub const ORGA_UPDATE_TICKETS_STATUS: &str = "orga:update:tickets:status";
pub const ORGA_UPDATE_TICKETS_TITLE: &str = "orga:update:tickets:title";
pub const ORGA_UPDATE_TICKETS_TYPE: &str = "orga:update:tickets:type";

/// Permissions an admin role may hold
pub const ADMIN_PERMISSIONS: &[&str] = &[
    ADMIN_ALL,
    ADMIN_SEE,
    ADMIN_MANAGE_ORGANIZATIONS,
    ADMIN_MANAGE_USERS,
    ADMIN_MANAGE_ROLES,
    ADMIN_MANAGE_TEAMS,
    ADMIN_MANAGE_LABELS,
    ADMIN_MANAGE_CONTRACTS,
    ADMIN_MANAGE_MAILBOXES,
];

/// Permissions an agent role may hold
pub const AGENT_PERMISSIONS: &[&str] = &[
    ORGA_SEE,
    ORGA_CREATE_TICKETS,
    ORGA_CREATE_TICKETS_MESSAGES,
    ORGA_CREATE_TICKETS_MESSAGES_CONFIDENTIAL,
    ORGA_CREATE_TICKETS_TIME_SPENT,
    ORGA_MANAGE_CONTRACTS,
    ORGA_SEE_CONTRACTS,
    ORGA_SEE_TICKETS_ALL,
    ORGA_SEE_TICKETS_CONTRACTS,
    ORGA_SEE_TICKETS_MESSAGES_CONFIDENTIAL,
    ORGA_SEE_TICKETS_TIME_SPENT_ACCOUNTED,
    ORGA_SEE_TICKETS_TIME_SPENT_REAL,
    ORGA_UPDATE_TICKETS_ACTORS,
    ORGA_UPDATE_TICKETS_CONTRACTS,
    ORGA_UPDATE_TICKETS_LABELS,
    ORGA_UPDATE_TICKETS_ORGANIZATION,
    ORGA_UPDATE_TICKETS_PRIORITY,
    ORGA_UPDATE_TICKETS_STATUS,
    ORGA_UPDATE_TICKETS_TITLE,
    ORGA_UPDATE_TICKETS_TYPE,
];

/// Permissions a user (requester) role may hold
pub const USER_PERMISSIONS: &[&str] = &[
    ORGA_SEE,
    ORGA_CREATE_TICKETS,
    ORGA_CREATE_TICKETS_MESSAGES,
    ORGA_SEE_CONTRACTS,
    ORGA_SEE_TICKETS_ALL,
    ORGA_SEE_TICKETS_CONTRACTS,
    ORGA_SEE_TICKETS_TIME_SPENT_ACCOUNTED,
    ORGA_UPDATE_TICKETS_TITLE,
    ORGA_UPDATE_TICKETS_TYPE,
];

/// Whether the permission belongs to the admin family
pub fn is_admin_permission(permission: &str) -> bool {
    permission.starts_with("admin:")
}

/// Whether the permission belongs to the organization family
pub fn is_orga_permission(permission: &str) -> bool {
    permission.starts_with("orga:")
}
