use super::common::HandlerContext;
use crate::auth::permission::ADMIN_MANAGE_MAILBOXES;
use crate::cli::output::OutputFormatter;
use crate::error::Result;
use crate::mailbox::{DirectorySource, MailboxProcessor};
use std::path::PathBuf;

/// Handler for `mailbox collect`
///
/// Reads the spool directory (the configured one unless `--dir` is given)
/// and processes every pending e-mail, including the ones that failed on a
/// previous run.
pub fn handle_mailbox_collect(ctx: &HandlerContext, dir: Option<&str>, output: &OutputFormatter) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_MAILBOXES)?;
    let spool = dir.map_or_else(|| ctx.config.spool_dir(&ctx.data_dir), PathBuf::from);

    let mut processor = MailboxProcessor::new(
        &ctx.storage,
        ctx.config.notification_settings(),
        ctx.config.mailbox.max_attempts,
    )?;
    let mut source = DirectorySource::new(&spool);
    let report = processor.collect(&mut source)?;

    if output.is_json() {
        return output.print_json(&report);
    }
    output.success(&format!("Collected {} e-mail(s) from {}", report.fetched, spool.display()));
    output.info(&format!(
        "Tickets created: {}, answers: {}, discarded: {}",
        report.created, report.answered, report.discarded
    ));
    if report.failed > 0 {
        output.warning(&format!(
            "{} e-mail(s) failed; see `bileto mailbox failed`",
            report.failed
        ));
    }
    if report.skipped > 0 {
        output.warning(&format!(
            "{} e-mail(s) skipped after {} attempts",
            report.skipped, ctx.config.mailbox.max_attempts
        ));
    }
    Ok(())
}

pub fn handle_mailbox_failed(ctx: &HandlerContext, output: &OutputFormatter) -> Result<()> {
    ctx.admin(ADMIN_MANAGE_MAILBOXES)?;
    let processor = MailboxProcessor::new(
        &ctx.storage,
        ctx.config.notification_settings(),
        ctx.config.mailbox.max_attempts,
    )?;
    let failed = processor.failed()?;

    if output.is_json() {
        return output.print_json(&failed);
    }
    if failed.is_empty() {
        output.info("No failing e-mails");
        return Ok(());
    }
    for pending in &failed {
        output.title(&format!("{} ({})", pending.email.subject, pending.email.from));
        output.field("Message-ID", &pending.email.message_id);
        output.field("Attempts", &pending.attempts.to_string());
        output.field("Error", pending.last_error.as_deref().unwrap_or_default());
    }
    Ok(())
}
