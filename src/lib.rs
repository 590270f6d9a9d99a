//! Bileto - multi-tenant IT-support ticketing
//!
//! This crate provides the ticketing engine behind the `bileto` command:
//! - Organizations, users and role-based permissions scoped per organization
//! - Tickets with their lifecycle, messages, labels, teams and observers
//! - Contracts with time accounting and consumption reports
//! - A search query language with saved searches
//! - Mail ingestion and outgoing notifications
//! - Export and import of whole projects

// Allow missing error documentation for internal implementations
#![allow(clippy::missing_errors_doc)]
// Allow some pedantic lints that don't improve code quality
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_self)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::fn_params_excessive_bools)]
#![allow(clippy::map_unwrap_or)]

//! # Storage
//!
//! Every record is a YAML document under `.bileto/`, one directory per
//! collection. Commands open the project, check the permissions of the
//! session user, then read and write records through the
//! [`storage::Repository`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use bileto::storage::{FileStorage, Lookups};
//!
//! let storage = FileStorage::new(".bileto");
//! let ticket = storage.find_ticket_by_number(42)?;
//! ```

pub mod accounting;
pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod mailbox;
pub mod notifications;
pub mod search;
pub mod service;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use error::{BiletoError, Result};
