//! Role-based authorization
//!
//! Users receive [`Role`]s through [`Authorization`]s. Admin roles are
//! global and carry `admin:` permissions; agent and user roles carry `orga:`
//! permissions, either globally or within a single organization. The
//! [`Authorizer`] answers "is this user granted this permission here?".

mod authorizer;
pub mod permission;
mod role;

pub use authorizer::{Authorizer, Scope};
pub use role::{Authorization, Role, RoleType};
