use crate::core::{Organization, Ticket, User};
use crate::error::{BiletoError, Result};
use csv::Writer;
use std::collections::HashMap;

const HEADER: [&str; 9] = [
    "number",
    "title",
    "status",
    "type",
    "priority",
    "organization",
    "requester",
    "assignee",
    "created_at",
];

/// Export tickets to CSV
///
/// Organizations are written by name and users by e-mail. References to
/// records missing from `organizations` or `users` are left blank.
pub fn tickets_to_csv(
    tickets: &[Ticket],
    organizations: &[Organization],
    users: &[User],
) -> Result<String> {
    let organizations: HashMap<_, _> = organizations
        .iter()
        .map(|o| (&o.id, o.name.as_str()))
        .collect();
    let emails: HashMap<_, _> = users.iter().map(|u| (&u.id, u.email.as_str())).collect();

    let mut writer = Writer::from_writer(vec![]);
    writer.write_record(HEADER)?;

    for ticket in tickets {
        writer.write_record([
            ticket.number.to_string(),
            ticket.title.clone(),
            ticket.status.to_string(),
            ticket.ticket_type.to_string(),
            ticket.priority.to_string(),
            organizations
                .get(&ticket.organization_id)
                .copied()
                .unwrap_or_default()
                .to_string(),
            emails
                .get(&ticket.requester_id)
                .copied()
                .unwrap_or_default()
                .to_string(),
            ticket
                .assignee_id
                .as_ref()
                .and_then(|id| emails.get(id).copied())
                .unwrap_or_default()
                .to_string(),
            ticket.created_at.to_rfc3339(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| BiletoError::custom(format!("Failed to get CSV data: {e}")))?;
    String::from_utf8(bytes).map_err(|e| BiletoError::custom(format!("Invalid UTF-8 in CSV: {e}")))
}
