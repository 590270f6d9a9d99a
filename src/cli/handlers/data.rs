//! Data export and import handlers

use super::common::HandlerContext;
use crate::auth::permission::ADMIN_ALL;
use crate::cli::output::OutputFormatter;
use crate::core::{Organization, User};
use crate::data::{Bundle, DataFormat, Importer, tickets_to_csv};
use crate::error::{BiletoError, Result};
use crate::search::{SavedSearches, TicketSearch, TicketSort};
use crate::storage::Repository;
use std::fs;

/// Write exported content to a file, or stdout when no path is given
fn write_out(content: &str, path: Option<&str>, what: &str, output: &OutputFormatter) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content)?;
            if output.is_json() {
                output.print_json(&serde_json::json!({
                    "status": "success",
                    "path": path,
                }))?;
            } else {
                output.success(&format!("Exported {what} to {path}"));
            }
        },
        None => print!("{content}"),
    }
    Ok(())
}

/// Handler for `data export`
pub fn handle_data_export(
    ctx: &HandlerContext,
    format: &str,
    path: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.admin(ADMIN_ALL)?;
    let format: DataFormat = format.parse()?;
    let bundle = Bundle::export(&ctx.storage)?;
    let content = format.serialize(&bundle)?;
    tracing::info!(records = bundle.len(), %format, "project exported");
    write_out(&content, path, &format!("{} record(s)", bundle.len()), output)
}

/// Handler for `data import`
///
/// The format is detected from the content. Nothing is written when the
/// bundle holds any invalid record.
pub fn handle_data_import(ctx: &HandlerContext, path: &str, dry_run: bool, output: &OutputFormatter) -> Result<()> {
    ctx.admin(ADMIN_ALL)?;
    let content = fs::read_to_string(path)?;
    let format = DataFormat::detect(&content)?;
    let bundle: Bundle = format.deserialize(&content)?;
    if bundle.is_empty() {
        return Err(BiletoError::InvalidInput(format!("{path} holds no records")));
    }

    let importer = Importer::new(&ctx.storage).with_progress(!output.is_json());
    if dry_run {
        let errors = importer.validate(&bundle)?;
        if output.is_json() {
            return output.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "records": bundle.len(),
                "errors": errors,
            }));
        }
        if errors.is_empty() {
            output.success(&format!("{} record(s) can be imported", bundle.len()));
        } else {
            output.warning(&format!("{} problem(s) found:", errors.len()));
            for error in &errors {
                output.info(&format!("  - {error}"));
            }
        }
        return Ok(());
    }

    let summary = importer.import(&bundle)?;
    if output.is_json() {
        output.print_json(&summary)?;
    } else {
        output.success(&format!("Imported {} record(s) from {path}", bundle.len()));
        output.info(&format!(
            "Organizations: {}, users: {}, tickets: {}, messages: {}",
            summary.organizations, summary.users, summary.tickets, summary.messages
        ));
    }
    Ok(())
}

/// Handler for `data csv`: the tickets visible to the session user
pub fn handle_data_csv(ctx: &HandlerContext, path: Option<&str>, output: &OutputFormatter) -> Result<()> {
    let user = ctx.session()?;
    let saved = SavedSearches::load(&ctx.data_dir)?;
    let tickets = TicketSearch::new(&ctx.storage, &ctx.authorizer, &saved, user.id)
        .search("", TicketSort::NumberAsc, None)?;

    let organizations = ctx.storage.load_all::<Organization>()?;
    let users = ctx.storage.load_all::<User>()?;
    let content = tickets_to_csv(&tickets, &organizations, &users)?;
    write_out(&content, path, &format!("{} ticket(s)", tickets.len()), output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestProject;

    #[test]
    fn test_export_then_validate() {
        let project = TestProject::new();
        project.add_organization("Acme", "acme.com");
        project.add_user("alix@acme.com", None);
        project.open_ticket("alix@acme.com", "VPN access");
        let ctx = project.context(None);

        let path = project.project_root.join("export.yaml");
        handle_data_export(&ctx, "yaml", path.to_str(), &project.output).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(DataFormat::detect(&content).unwrap(), DataFormat::Yaml);
        let bundle: Bundle = DataFormat::Yaml.deserialize(&content).unwrap();
        assert_eq!(bundle.organizations.len(), 1);
        assert_eq!(bundle.tickets.len(), 1);

        let path = path.to_string_lossy();
        handle_data_import(&ctx, &path, true, &project.output).unwrap();
    }

    #[test]
    fn test_import_rejects_empty_bundle() {
        let project = TestProject::new();
        let ctx = project.context(None);

        let path = project.project_root.join("empty.yaml");
        fs::write(&path, "version: 1\nexported_at: 2024-01-01T00:00:00Z\n").unwrap();

        let result = handle_data_import(&ctx, &path.to_string_lossy(), false, &project.output);
        assert!(matches!(result, Err(BiletoError::InvalidInput(_))));
    }

    #[test]
    fn test_csv_lists_visible_tickets() {
        let project = TestProject::new();
        project.add_organization("Acme", "acme.com");
        project.add_user("alix@acme.com", None);
        project.open_ticket("alix@acme.com", "Mailbox full");
        let ctx = project.context(None);

        let path = project.project_root.join("tickets.csv");
        handle_data_csv(&ctx, path.to_str(), &project.output).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("Mailbox full"));
    }
}
