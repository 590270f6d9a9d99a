//! Test utilities for Bileto
//!
//! This module provides a project fixture so handler tests can run
//! commands against a real `.bileto` directory.

#![cfg(test)]

use crate::cli::OutputFormatter;
use crate::cli::handlers::{
    HandlerContext, NewTicketParams, handle_init, handle_org_add, handle_ticket_new, handle_user_add,
};
use crate::core::{Organization, Ticket, User};
use crate::storage::Repository;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture for an initialized project
pub struct TestProject {
    pub temp_dir: TempDir,
    pub project_root: PathBuf,
    pub output: OutputFormatter,
}

impl TestProject {
    /// E-mail of the administrator created with the project
    pub const ADMIN: &'static str = "admin@example.com";

    /// Create a new test project with its administrator
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let project_root = temp_dir.path().to_path_buf();
        let output = OutputFormatter::new(true, true);

        handle_init(
            Some("test"),
            Self::ADMIN,
            Some("Admin"),
            false,
            project_root.to_str(),
            &output,
        )
        .expect("Failed to initialize project");

        Self {
            temp_dir,
            project_root,
            output,
        }
    }

    /// Open the project as the given user, the administrator by default
    pub fn context(&self, as_user: Option<&str>) -> HandlerContext {
        HandlerContext::new(self.project_root.to_str(), Some(as_user.unwrap_or(Self::ADMIN)))
            .expect("Failed to open project")
    }

    pub fn add_organization(&self, name: &str, domains: &str) -> Organization {
        let ctx = self.context(None);
        handle_org_add(&ctx, name, Some(domains), &self.output).expect("Failed to add organization");
        ctx.organization(name).expect("Organization was not saved")
    }

    /// Create a user; they get the default role in their organization
    pub fn add_user(&self, email: &str, org: Option<&str>) -> User {
        let ctx = self.context(None);
        handle_user_add(&ctx, email, None, org, None, &self.output).expect("Failed to add user");
        ctx.user(email).expect("User was not saved")
    }

    /// Open a ticket as `as_user` in their own organization
    pub fn open_ticket(&self, as_user: &str, title: &str) -> Ticket {
        let ctx = self.context(Some(as_user));
        handle_ticket_new(
            &ctx,
            NewTicketParams {
                title,
                content: Some("It does not work"),
                org: None,
                requester: None,
                assignee: None,
                ticket_type: None,
                urgency: None,
                impact: None,
                priority: None,
            },
            &self.output,
        )
        .expect("Failed to open ticket");

        ctx.storage
            .find::<Ticket, _>(|t| t.title == title)
            .expect("Failed to load tickets")
            .into_iter()
            .max_by_key(|t| t.number)
            .expect("Ticket was not saved")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
