use super::ConversationTree;
use crate::models::Message;

/// Lazy pre-order enumeration of every root-to-leaf path.
///
/// Created by [`ConversationTree::all_paths`]. Holds only borrowed state, so dropping it early
/// has no side effects; calling `all_paths` again restarts from the first root.
pub struct AllPaths<'a> {
    tree: &'a ConversationTree,
    // (message id, depth) still to visit; top of stack is visited next
    stack: Vec<(&'a str, usize)>,
    current: Vec<&'a Message>,
}

impl<'a> AllPaths<'a> {
    pub(super) fn new(tree: &'a ConversationTree) -> Self {
        let stack = tree.root_message_ids().iter().rev().map(|id| (id.as_str(), 0)).collect();
        Self { tree, stack, current: Vec::new() }
    }
}

impl<'a> Iterator for AllPaths<'a> {
    type Item = Vec<&'a Message>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, depth)) = self.stack.pop() {
            let Some(message) = self.tree.get(id) else {
                continue;
            };

            self.current.truncate(depth);
            self.current.push(message);

            let children = self.tree.child_ids(Some(id));
            if children.is_empty() {
                return Some(self.current.clone());
            }
            for child in children.iter().rev() {
                self.stack.push((child.as_str(), depth + 1));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::models::Role;

    fn ids(path: &[&Message]) -> Vec<String> {
        path.iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_paths_are_preorder_and_restartable() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut tree = ConversationTree::new("conv", "Test", start);
        let at = |mins| start + Duration::minutes(mins);

        tree.add_message(Message::new(Role::User, "q", at(0)).with_id("a")).unwrap();
        tree.add_message(Message::new(Role::Assistant, "r1", at(1)).with_id("b").with_parent("a"))
            .unwrap();
        tree.add_message(Message::new(Role::Assistant, "r2", at(2)).with_id("c").with_parent("a"))
            .unwrap();

        let first: Vec<Vec<String>> = tree.all_paths().map(|p| ids(&p)).collect();
        assert_eq!(first, vec![vec!["a", "b"], vec!["a", "c"]]);

        let second: Vec<Vec<String>> = tree.all_paths().map(|p| ids(&p)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_abandoning_iterator_early() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut tree = ConversationTree::new("conv", "Test", start);
        tree.add_message(Message::new(Role::User, "one", start).with_id("a")).unwrap();
        tree.add_message(Message::new(Role::User, "two", start).with_id("b")).unwrap();

        let mut paths = tree.all_paths();
        assert_eq!(ids(&paths.next().unwrap()), vec!["a"]);
        drop(paths);

        assert_eq!(tree.all_paths().count(), 2);
    }

    #[test]
    fn test_empty_tree_has_no_paths() {
        let tree = ConversationTree::new("conv", "Empty", Utc::now());
        assert_eq!(tree.all_paths().count(), 0);
    }
}
