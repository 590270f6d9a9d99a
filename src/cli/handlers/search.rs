//! Search handlers
//!
//! A query is a list of qualifiers (`status:open org:Acme`), free text,
//! `OR` alternatives and `@name` references to saved searches.

use super::common::HandlerContext;
use super::tickets::print_tickets;
use crate::cli::output::OutputFormatter;
use crate::error::Result;
use crate::search::{SavedSearches, TicketSearch, TicketSort};

pub fn handle_search(
    ctx: &HandlerContext,
    query: Option<&str>,
    sort: Option<&str>,
    limit: Option<usize>,
    output: &OutputFormatter,
) -> Result<()> {
    let user = ctx.session()?;
    let sort = match sort {
        Some(s) => s.parse::<TicketSort>()?,
        None => ctx.config.search.default_sort,
    };
    let saved = SavedSearches::load(&ctx.data_dir)?;
    let tickets = TicketSearch::new(&ctx.storage, &ctx.authorizer, &saved, user.id)
        .search(query.unwrap_or_default(), sort, limit)?;
    print_tickets(ctx, &tickets, output)
}

/// Save a named query; it must parse before it is stored
pub fn handle_search_save(
    ctx: &HandlerContext,
    name: &str,
    query: &str,
    description: Option<&str>,
    output: &OutputFormatter,
) -> Result<()> {
    ctx.session()?;
    let mut saved = SavedSearches::load(&ctx.data_dir)?;
    let search = saved.add(name, query, description.map(str::to_string))?.clone();
    saved.save(&ctx.data_dir)?;

    if output.is_json() {
        output.print_json(&search)?;
    } else {
        output.success(&format!("Saved search '@{}'", search.name));
        output.info(&format!("Query: {}", search.query));
    }
    Ok(())
}

pub fn handle_search_list(ctx: &HandlerContext, output: &OutputFormatter) -> Result<()> {
    let saved = SavedSearches::load(&ctx.data_dir)?;
    let searches = saved.all();

    if output.is_json() {
        let searches: Vec<_> = searches
            .iter()
            .map(|(name, query, builtin)| {
                serde_json::json!({
                    "name": name,
                    "query": query,
                    "builtin": builtin,
                })
            })
            .collect();
        return output.print_json(&searches);
    }
    for (name, query, builtin) in searches {
        let marker = if builtin { " (built-in)" } else { "" };
        let query = if query.is_empty() { "(everything)" } else { query };
        output.info(&format!("@{name}{marker}: {query}"));
    }
    Ok(())
}

pub fn handle_search_delete(ctx: &HandlerContext, name: &str, output: &OutputFormatter) -> Result<()> {
    ctx.session()?;
    let mut saved = SavedSearches::load(&ctx.data_dir)?;
    let removed = saved.remove(name)?;
    saved.save(&ctx.data_dir)?;

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "status": "success",
            "deleted": removed.name,
        }))?;
    } else {
        output.success(&format!("Deleted saved search '@{}'", removed.name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BiletoError;
    use crate::test_utils::TestProject;

    #[test]
    fn test_saved_search_lifecycle() {
        let project = TestProject::new();
        let ctx = project.context(None);

        handle_search_save(&ctx, "urgent", "status:open priority:high", None, &project.output).unwrap();
        let saved = SavedSearches::load(&ctx.data_dir).unwrap();
        assert_eq!(saved.get("urgent"), Some("status:open priority:high"));

        handle_search_delete(&ctx, "@urgent", &project.output).unwrap();
        let saved = SavedSearches::load(&ctx.data_dir).unwrap();
        assert!(saved.get("urgent").is_none());
    }

    #[test]
    fn test_invalid_query_is_not_saved() {
        let project = TestProject::new();
        let ctx = project.context(None);

        let result = handle_search_save(&ctx, "broken", "status:bogus", None, &project.output);
        assert!(result.is_err());
        assert!(SavedSearches::load(&ctx.data_dir).unwrap().get("broken").is_none());
    }

    #[test]
    fn test_search_reports_query_errors() {
        let project = TestProject::new();
        let ctx = project.context(None);

        let result = handle_search(&ctx, Some("(status:open"), None, None, &project.output);
        assert!(matches!(result, Err(BiletoError::Query { .. })));

        let result = handle_search(&ctx, Some("created:last-100000000"), None, None, &project.output);
        assert!(matches!(result, Err(BiletoError::Query { .. })));
    }
}
