use super::lines_output;
use crate::error::CommandError;
use crate::filters::{FilterExpr, FilterField, apply_filters, parse_filter_words};
use crate::models::StatusFlag;
use crate::shell::context::ShellContext;
use crate::shell::dispatcher::{CommandHandler, CommandResult};
use crate::store::ConversationFilter;
use crate::vfs::path::CHATS;

/// Query conversations: `find tag:rust is:starred lifetimes`
pub struct Find;

impl CommandHandler for Find {
    fn name(&self) -> &'static str {
        "find"
    }

    fn summary(&self) -> &'static str {
        "Find conversations by tag:, source:, model:, since:, before:, is:, title: and fuzzy title words"
    }

    fn usage(&self) -> &'static str {
        "find <query...>"
    }

    fn execute(
        &self,
        args: &[String],
        _stdin: Option<&str>,
        ctx: &mut ShellContext,
    ) -> Result<CommandResult, CommandError> {
        let query = parse_filter_words(args)
            .map_err(|e| CommandError::usage(format!("find: {:#}", e)))?;
        if query.is_empty() {
            return Err(CommandError::usage("find: empty query (try `find tag:rust`)"));
        }

        let mut summaries = ctx.navigator.store().list_conversations(&ConversationFilter::all())?;
        if !asks_for_archived(&query) {
            summaries.retain(|s| !s.has_flag(StatusFlag::Archived));
        }

        let found = apply_filters(summaries, &query);
        Ok(CommandResult::success(lines_output(
            found.iter().map(|s| format!("/{}/{}  {}", CHATS, s.id, s.title)),
        )))
    }
}

/// Archived conversations only show up when the query names the flag
fn asks_for_archived(query: &FilterExpr) -> bool {
    query.filters.iter().any(|f| {
        f.field == FilterField::Is && f.value.parse::<StatusFlag>() == Ok(StatusFlag::Archived)
    })
}
