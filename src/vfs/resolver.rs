use super::navigator::Navigator;
use super::path::VfsPath;
use crate::error::{AmbiguousMatch, VfsError};

/// Shortest prefix accepted for id lookup
pub const MIN_PREFIX_LEN: usize = 3;

/// Matches listed in an ambiguity error
pub const MAX_EXAMPLES: usize = 5;

/// Resolve a partial conversation id against the listing of `context`.
///
/// Never guesses: one match resolves, none is `NotFound`, several is `Ambiguous` with up to
/// five examples and a count of the rest. Prefixes shorter than [`MIN_PREFIX_LEN`] are rejected
/// outright instead of being widened.
pub fn resolve_prefix(
    navigator: &mut Navigator,
    prefix: &str,
    context: &VfsPath,
) -> Result<String, VfsError> {
    if prefix.chars().count() < MIN_PREFIX_LEN {
        return Err(VfsError::PrefixTooShort { prefix: prefix.to_string(), min: MIN_PREFIX_LEN });
    }

    let entries = navigator.list_directory(context)?;
    let mut matches: Vec<String> = entries
        .into_iter()
        .filter(|entry| entry.is_conversation())
        .filter_map(|entry| entry.conversation_id)
        .filter(|id| id.starts_with(prefix))
        .collect();
    matches.dedup();

    match matches.len() {
        0 => Err(VfsError::NotFound(format!("{}: no conversation matches '{}'", context, prefix))),
        1 => Ok(matches.remove(0)),
        total => {
            let examples: Vec<String> = matches.into_iter().take(MAX_EXAMPLES).collect();
            let remaining = total - examples.len();
            Err(VfsError::Ambiguous(AmbiguousMatch {
                prefix: prefix.to_string(),
                examples,
                remaining,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::store::MemoryStore;
    use crate::tree::ConversationTree;
    use crate::vfs::path::normalize;

    fn navigator(ids: &[&str]) -> Navigator {
        let trees = ids.iter().map(|id| ConversationTree::new(*id, *id, Utc::now()));
        Navigator::new(Box::new(MemoryStore::from_conversations(trees)))
    }

    fn chats() -> VfsPath {
        normalize("/chats", &VfsPath::root()).unwrap()
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let mut nav = navigator(&["abc123def", "abc999xyz"]);
        assert_eq!(resolve_prefix(&mut nav, "abc1", &chats()).unwrap(), "abc123def");
    }

    #[test]
    fn test_ambiguous_prefix_lists_both() {
        let mut nav = navigator(&["abc123def", "abc999xyz"]);
        match resolve_prefix(&mut nav, "abc", &chats()).unwrap_err() {
            VfsError::Ambiguous(found) => {
                let mut examples = found.examples.clone();
                examples.sort();
                assert_eq!(examples, vec!["abc123def", "abc999xyz"]);
                assert_eq!(found.remaining, 0);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_short_prefix_is_distinct_from_not_found() {
        let mut nav = navigator(&["abc123def"]);
        assert!(matches!(
            resolve_prefix(&mut nav, "xy", &chats()),
            Err(VfsError::PrefixTooShort { min: 3, .. })
        ));
        assert!(matches!(resolve_prefix(&mut nav, "xyz", &chats()), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_ambiguity_caps_examples() {
        let ids: Vec<String> = (0..8).map(|i| format!("abc{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut nav = navigator(&refs);
        match resolve_prefix(&mut nav, "abc", &chats()).unwrap_err() {
            VfsError::Ambiguous(found) => {
                assert_eq!(found.examples.len(), 5);
                assert_eq!(found.remaining, 3);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_only_current_directory_is_searched() {
        let mut nav = navigator(&["abc123def"]);
        let starred = normalize("/starred", &VfsPath::root()).unwrap();
        assert!(matches!(resolve_prefix(&mut nav, "abc", &starred), Err(VfsError::NotFound(_))));
    }
}
