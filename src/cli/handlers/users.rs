//! User and role commands

use super::common::HandlerContext;
use crate::auth::permission::{ADMIN_MANAGE_ROLES, ADMIN_MANAGE_USERS, ADMIN_SEE};
use crate::auth::{Authorization, Role, RoleType};
use crate::cli::output::OutputFormatter;
use crate::core::validation::parse_list;
use crate::core::{Locale, Organization, User};
use crate::error::{BiletoError, Result};
use crate::service::Directory;
use crate::storage::Repository;
use serde::Serialize;

/// An authorization with its role and organization resolved
#[derive(Debug, Serialize)]
struct AuthorizationView {
    role: String,
    role_type: RoleType,
    organization: Option<String>,
}

fn authorization_view(ctx: &HandlerContext, authorization: &Authorization) -> AuthorizationView {
    let role = ctx.authorizer.role(&authorization.role_id);
    AuthorizationView {
        role: role.map_or_else(|| authorization.role_id.to_string(), |r| r.name.clone()),
        role_type: role.map_or(RoleType::User, |r| r.role_type),
        organization: authorization.organization_id.as_ref().map(|id| {
            ctx.storage
                .load::<Organization>(id)
                .map_or_else(|_| id.to_string(), |o| o.name)
        }),
    }
}

pub fn handle_user_add(
    ctx: &HandlerContext,
    email: &str,
    name: Option<&str>,
    org: Option<&str>,
    locale: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_USERS)?;

    let organization_id = org.map(|o| ctx.organization(o)).transpose()?.map(|o| o.id);
    let locale = locale.map(str::parse::<Locale>).transpose()?;

    let directory = Directory::new(&ctx.storage);
    let (mut user, authorization) = directory.register(email, name.unwrap_or_default(), organization_id)?;
    if let Some(locale) = locale {
        user.locale = locale;
        ctx.storage.save(&user)?;
    }

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "user": user,
            "authorization": authorization.as_ref().map(|a| authorization_view(ctx, a)),
        }))?;
    } else {
        output.success(&format!("Created user {}", user.email));
        if let Some(authorization) = &authorization {
            let view = authorization_view(ctx, authorization);
            output.info(&format!(
                "Granted role '{}' in {}",
                view.role,
                view.organization.unwrap_or_default()
            ));
        }
    }
    Ok(())
}

pub fn handle_user_list(ctx: &HandlerContext, output: &OutputFormatter) -> Result<()> {
    ctx.admin(ADMIN_SEE)?;
    let mut users = ctx.storage.load_all::<User>()?;
    users.sort_by(|a, b| a.email.cmp(&b.email));

    if output.is_json() {
        return output.print_json(&users);
    }
    for user in &users {
        let organization = user
            .organization_id
            .as_ref()
            .and_then(|id| ctx.storage.load::<Organization>(id).ok())
            .map(|o| format!(" [{}]", o.name))
            .unwrap_or_default();
        output.info(&format!("{} <{}>{organization}", user.display_name(), user.email));
    }
    Ok(())
}

pub fn handle_user_show(ctx: &HandlerContext, email: &str, output: &OutputFormatter) -> Result<()> {
    let session = ctx.session()?;
    let user = ctx.user(email)?;
    if session.id != user.id {
        ctx.admin(ADMIN_SEE)?;
    }

    let authorizations: Vec<AuthorizationView> = ctx
        .authorizer
        .authorizations_of(&user.id)
        .map(|a| authorization_view(ctx, a))
        .collect();

    if output.is_json() {
        return output.print_json(&serde_json::json!({
            "user": user,
            "authorizations": authorizations,
        }));
    }

    output.title(&format!("{} <{}>", user.display_name(), user.email));
    output.field("ID", &user.id.to_string());
    output.field("Locale", &user.locale.to_string());
    if let Some(organization) = user
        .organization_id
        .as_ref()
        .and_then(|id| ctx.storage.load::<Organization>(id).ok())
    {
        output.field("Organization", &organization.name);
    }
    for view in &authorizations {
        let scope = view.organization.as_deref().unwrap_or("global");
        output.field("Role", &format!("{} ({}, {scope})", view.role, view.role_type));
    }
    Ok(())
}

pub fn handle_user_grant(
    ctx: &HandlerContext,
    email: &str,
    role: &str,
    org: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_USERS)?;
    let user = ctx.user(email)?;
    let role = ctx.role(role)?;
    let organization = org.map(|o| ctx.organization(o)).transpose()?;

    let authorization =
        Directory::new(&ctx.storage).grant(&user.id, &role, organization.as_ref().map(|o| o.id.clone()))?;

    if output.is_json() {
        output.print_json(&authorization_view(ctx, &authorization))?;
    } else {
        let scope = organization.map_or_else(|| "globally".to_string(), |o| format!("in {}", o.name));
        output.success(&format!("Granted role '{}' to {} {scope}", role.name, user.email));
    }
    Ok(())
}

pub fn handle_user_revoke(
    ctx: &HandlerContext,
    email: &str,
    role: &str,
    org: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let admin = ctx.admin(ADMIN_MANAGE_USERS)?;
    let user = ctx.user(email)?;
    let role = ctx.role(role)?;
    let organization = org.map(|o| ctx.organization(o)).transpose()?;

    if admin.id == user.id && role.role_type == RoleType::Super {
        return Err(BiletoError::Validation(
            "You cannot revoke your own super-admin role".to_string(),
        ));
    }

    let removed = Directory::new(&ctx.storage).revoke(&user.id, &role, organization.as_ref().map(|o| &o.id))?;
    if removed == 0 {
        return Err(BiletoError::not_found(
            "Authorization",
            format!("{} for {}", role.name, user.email),
        ));
    }

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "revoked": removed,
        }))?;
    } else {
        output.success(&format!("Revoked role '{}' from {} ({removed})", role.name, user.email));
    }
    Ok(())
}

pub fn handle_role_add(
    ctx: &HandlerContext,
    name: &str,
    role_type: &str,
    permissions: Option<&str>,
    description: Option<&str>,
    default: bool,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_ROLES)?;
    let role_type: RoleType = role_type.parse()?;
    if role_type == RoleType::Super {
        return Err(BiletoError::InvalidInput(
            "The super-admin role is created with the project".to_string(),
        ));
    }
    if ctx.role(name).is_ok() {
        return Err(BiletoError::AlreadyExists {
            kind: "Role",
            name: name.to_string(),
        });
    }

    let requested = parse_list(permissions);
    let mut role = Role::new(name, role_type, &requested)?;
    role.description = description.unwrap_or_default().to_string();

    let dropped: Vec<&String> = requested.iter().filter(|p| !role.permissions.contains(p)).collect();
    if !dropped.is_empty() {
        output.warning(&format!(
            "Ignored permissions not allowed for {} roles: {}",
            role.role_type,
            dropped.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
        ));
    }

    if default {
        Directory::new(&ctx.storage).set_default_role(&mut role)?;
    } else {
        ctx.storage.save(&role)?;
    }

    if output.is_json() {
        output.print_json(&role)?;
    } else {
        output.success(&format!("Created {} role '{}'", role.role_type, role.name));
        output.info(&format!("Permissions: {}", role.permissions.join(", ")));
    }
    Ok(())
}

pub fn handle_role_list(ctx: &HandlerContext, output: &OutputFormatter) -> Result<()> {
    ctx.admin(ADMIN_SEE)?;
    let mut roles = ctx.storage.load_all::<Role>()?;
    roles.sort_by(|a, b| a.name.cmp(&b.name));

    if output.is_json() {
        return output.print_json(&roles);
    }
    for role in &roles {
        let default = if role.is_default { " (default)" } else { "" };
        output.info(&format!("{} [{}]{default}", role.name, role.role_type));
    }
    Ok(())
}

pub fn handle_role_show(ctx: &HandlerContext, reference: &str, output: &OutputFormatter) -> Result<()> {
    ctx.admin(ADMIN_SEE)?;
    let role = ctx.role(reference)?;

    if output.is_json() {
        return output.print_json(&role);
    }
    output.title(&role.name);
    output.field("Type", &role.role_type.to_string());
    if !role.description.is_empty() {
        output.field("Description", &role.description);
    }
    output.field("Default", &role.is_default.to_string());
    for permission in &role.permissions {
        output.info(&format!("  - {permission}"));
    }
    Ok(())
}
