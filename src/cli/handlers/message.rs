use super::common::HandlerContext;
use super::time::describe_entries;
use crate::accounting::{ContractTimeAccounting, parse_duration};
use crate::auth::permission::ORGA_CREATE_TICKETS_TIME_SPENT;
use crate::cli::output::OutputFormatter;
use crate::core::MessageVia;
use crate::error::Result;
use crate::service::TicketDesk;

/// Handler for `message add`
///
/// Time spent given with `--time` is linked to the new message. It is
/// checked before anything is written so a refused time entry never leaves
/// a dangling message.
pub fn handle_message_add(
    ctx: &HandlerContext,
    reference: &str,
    content: &str,
    confidential: bool,
    time: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let mut ticket = ctx.ticket(&user, reference)?;
    let minutes = match time {
        Some(time) => {
            ctx.require_on(&user, ORGA_CREATE_TICKETS_TIME_SPENT, &ticket)?;
            Some(parse_duration(time)?)
        },
        None => None,
    };

    let desk = TicketDesk::new(&ctx.storage, &ctx.authorizer);
    let message = desk.answer(&user.id, &mut ticket, content, confidential, MessageVia::Webapp, None)?;
    let entries = match minutes {
        Some(minutes) => ContractTimeAccounting::new(&ctx.storage).log_time(
            &ticket,
            minutes,
            &user.id,
            Some(message.id.clone()),
        )?,
        None => Vec::new(),
    };
    let notification = ctx.notify_message(&ticket, &message);

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "ticket": ticket.number,
            "message": message,
            "time_spent": entries,
            "notified": notification.map(|n| n.to),
        }))?;
    } else {
        let kind = if confidential { "confidential message" } else { "message" };
        output.success(&format!("Added {kind} to ticket {}", ticket.reference()));
        if !entries.is_empty() {
            output.info(&format!("Time spent: {}", describe_entries(ctx, &entries)));
        }
        if let Some(notification) = notification {
            output.info(&format!("Notified: {}", notification.to.join(", ")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::handlers::handle_ticket_status;
    use crate::core::{Status, Ticket};
    use crate::error::BiletoError;
    use crate::storage::{Lookups, Repository};
    use crate::test_utils::TestProject;

    const ALIX: &str = "alix@acme.com";

    fn project() -> TestProject {
        let project = TestProject::new();
        project.add_organization("Acme", "acme.com");
        project.add_user(ALIX, None);
        project
    }

    #[test]
    fn test_message_with_time_spent() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Slow network");
        let admin = project.context(None);

        handle_message_add(&admin, &ticket.number.to_string(), "Checking the switch", false, Some("1h"), &project.output)
            .unwrap();

        let messages = admin.storage.messages_of(&ticket.id).unwrap();
        assert_eq!(messages.len(), 2);
        let entries = admin.storage.time_spents_of(&ticket.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].real_time, 60);
        let answer = messages.iter().find(|m| m.content == "Checking the switch").unwrap();
        assert_eq!(entries[0].message_id.as_ref(), Some(&answer.id));
    }

    #[test]
    fn test_requester_answer_reopens_pending_ticket() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Password reset");
        let admin = project.context(None);
        handle_ticket_status(&admin, &ticket.number.to_string(), "pending", &project.output)
            .unwrap();

        let alix = project.context(Some(ALIX));
        handle_message_add(&alix, &ticket.number.to_string(), "Here is the info", false, None, &project.output)
            .unwrap();
        let ticket = alix.storage.load::<Ticket>(&ticket.id).unwrap();
        assert_eq!(ticket.status, Status::InProgress);
    }

    #[test]
    fn test_requester_cannot_post_confidential_messages() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Wifi");

        let alix = project.context(Some(ALIX));
        let result = handle_message_add(&alix, &ticket.number.to_string(), "Secret", true, None, &project.output);
        assert!(matches!(result, Err(BiletoError::PermissionDenied { .. })));
        assert_eq!(alix.storage.messages_of(&ticket.id).unwrap().len(), 1);
    }

    #[test]
    fn test_time_is_checked_before_posting() {
        let project = project();
        let ticket = project.open_ticket(ALIX, "Printer jam");

        let alix = project.context(Some(ALIX));
        let result = handle_message_add(&alix, &ticket.number.to_string(), "Done", false, Some("10m"), &project.output);
        assert!(result.is_err());
        assert_eq!(alix.storage.messages_of(&ticket.id).unwrap().len(), 1);
    }
}
