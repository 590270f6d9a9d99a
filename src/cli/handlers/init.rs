//! Handler for the `init` command

use crate::auth::permission::{AGENT_PERMISSIONS, USER_PERMISSIONS};
use crate::auth::{Authorization, Role, RoleType};
use crate::cli::output::OutputFormatter;
use crate::config::Config;
use crate::core::User;
use crate::error::{BiletoError, Result};
use crate::storage::{DATA_DIR, FileStorage, ProjectState, Repository};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Handler for the `init` command
///
/// Creates the `.bileto` directory with the built-in roles and a first
/// administrator, who becomes the session user of the project.
///
/// # Errors
///
/// Returns an error if:
/// - The project is already initialized and `force` is not set
/// - The administrator e-mail is invalid
/// - File I/O operations fail
pub fn handle_init(
    name: Option<&str>,
    admin_email: &str,
    admin_name: Option<&str>,
    force: bool,
    project_dir: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let project_root = match project_dir {
        Some(dir) => PathBuf::from(dir),
        None => env::current_dir()?,
    };
    let data_dir = project_root.join(DATA_DIR);
    let storage = FileStorage::new(&data_dir);

    if storage.is_initialized() {
        if !force {
            return Err(BiletoError::ProjectAlreadyInitialized {
                path: data_dir.display().to_string(),
            });
        }
        fs::remove_dir_all(&data_dir)?;
    }

    let admin = User::new(admin_email, admin_name.unwrap_or_default())?;

    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        project_root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("bileto")
            .to_string()
    });

    storage.ensure_directories()?;
    storage.save_state(&ProjectState::new(&project_name, None))?;

    let super_admin = Role::super_admin();
    let mut technician = Role::new("Technician", RoleType::Agent, AGENT_PERMISSIONS.iter().copied())?;
    technician.description = "Handles the tickets of every organization".to_string();
    let mut requester = Role::new("User", RoleType::User, USER_PERMISSIONS.iter().copied())?;
    requester.description = "Opens and follows their tickets".to_string();
    requester.is_default = true;
    for role in [&super_admin, &technician, &requester] {
        storage.save(role)?;
    }

    storage.save(&admin)?;
    storage.save(&Authorization::new(admin.id.clone(), &super_admin, None)?)?;
    storage.save(&Authorization::new(admin.id.clone(), &technician, None)?)?;

    let mut config = Config::default();
    config.session.user = Some(admin.email.clone());
    config.write_project(&data_dir)?;
    fs::create_dir_all(config.spool_dir(&data_dir))?;

    tracing::info!(project = %project_name, admin = %admin.email, "project initialized");

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "project": project_name,
            "path": data_dir.display().to_string(),
            "admin": admin.email,
        }))?;
    } else {
        output.success(&format!("Initialized Bileto project '{project_name}'"));
        output.info(&format!("Data directory: {}", data_dir.display()));
        output.info(&format!("Administrator: {} (session user)", admin.email));
        output.info("Next: bileto org add <name> --domains <domain>");
    }
    Ok(())
}
