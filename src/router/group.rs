//! Byte-keyed prefix trie resolving which middleware groups apply to a path.
//!
//! Groups are keyed by their full URL prefix, byte by byte, not by path
//! segment. Looking up a path walks the same bytes and collects every group
//! list found on the way, root first, which gives the onion order: global
//! middlewares, then outer groups, then inner groups.
//!
//! Because keys are raw bytes, a group registered at `/api` also covers
//! `/apix`. Prefixes are plain strings; there are no wildcards here.

use std::collections::HashMap;

use tracing::warn;

struct GroupNode<T> {
    middlewares: Option<Vec<T>>,
    children: HashMap<u8, GroupNode<T>>,
}

impl<T> GroupNode<T> {
    fn new() -> Self {
        Self {
            middlewares: None,
            children: HashMap::new(),
        }
    }
}

/// Prefix trie from group prefix to that group's own middleware list.
pub struct GroupTrie<T> {
    root: GroupNode<T>,
}

impl<T: Clone> Default for GroupTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> GroupTrie<T> {
    /// Create a trie whose root (the empty prefix) is already a group with
    /// no middlewares.
    #[must_use]
    pub fn new() -> Self {
        let mut root = GroupNode::new();
        root.middlewares = Some(Vec::new());
        Self { root }
    }

    fn node_mut(&mut self, prefix: &str) -> &mut GroupNode<T> {
        let mut cur = &mut self.root;
        for b in prefix.bytes() {
            cur = cur.children.entry(b).or_insert_with(GroupNode::new);
        }
        cur
    }

    /// Declare a group at `prefix` owning `middlewares`.
    ///
    /// Groups are expected to be declared once. Declaring the same prefix
    /// again replaces the earlier list and logs a warning. Returns `true` when
    /// an existing group was replaced.
    pub fn insert(&mut self, prefix: &str, middlewares: Vec<T>) -> bool {
        let node = self.node_mut(prefix);
        let replaced = node.middlewares.is_some();
        if replaced {
            warn!(prefix = %prefix, "Group declared twice, replacing its middlewares");
        }
        node.middlewares = Some(middlewares);
        replaced
    }

    /// Append middlewares to the group at `prefix`, declaring it if needed.
    pub fn append<I>(&mut self, prefix: &str, middlewares: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.node_mut(prefix)
            .middlewares
            .get_or_insert_with(Vec::new)
            .extend(middlewares);
    }

    /// Whether a group is declared at exactly `prefix`.
    #[must_use]
    pub fn contains(&self, prefix: &str) -> bool {
        let mut cur = &self.root;
        for b in prefix.bytes() {
            match cur.children.get(&b) {
                Some(next) => cur = next,
                None => return false,
            }
        }
        cur.middlewares.is_some()
    }

    /// Every middleware that applies to `path`, outermost group first.
    #[must_use]
    pub fn search(&self, path: &str) -> Vec<T> {
        let mut out = Vec::new();
        let mut cur = &self.root;
        if let Some(list) = &cur.middlewares {
            out.extend(list.iter().cloned());
        }
        for b in path.bytes() {
            match cur.children.get(&b) {
                Some(next) => cur = next,
                None => break,
            }
            if let Some(list) = &cur.middlewares {
                out.extend(list.iter().cloned());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_groups_compose_in_order() {
        let mut trie = GroupTrie::new();
        trie.append("", ["m0"]);
        trie.insert("/g1", vec!["m1"]);
        trie.insert("/g1/g2", vec!["m2"]);
        assert_eq!(trie.search("/g1/g2/x"), vec!["m0", "m1", "m2"]);
        assert_eq!(trie.search("/g1/x"), vec!["m0", "m1"]);
    }

    #[test]
    fn test_path_outside_groups_gets_root_only() {
        let mut trie = GroupTrie::new();
        trie.append("", ["global"]);
        trie.insert("/api", vec!["auth"]);
        assert_eq!(trie.search("/public/index.html"), vec!["global"]);
        assert_eq!(trie.search("/"), vec!["global"]);
        assert_eq!(trie.search(""), vec!["global"]);
    }

    #[test]
    fn test_prefix_matching_is_bytewise() {
        let mut trie = GroupTrie::new();
        trie.insert("/api", vec!["auth"]);
        assert_eq!(trie.search("/apix"), vec!["auth"]);
        assert!(trie.search("/ap").is_empty());
    }

    #[test]
    fn test_group_keeps_declaration_order_of_its_middlewares() {
        let mut trie = GroupTrie::new();
        trie.insert("/g", vec!["a"]);
        trie.append("/g", ["b", "c"]);
        assert_eq!(trie.search("/g/x"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_redeclaring_replaces() {
        let mut trie = GroupTrie::new();
        assert!(!trie.insert("/g", vec!["old"]));
        assert!(trie.insert("/g", vec!["new"]));
        assert_eq!(trie.search("/g"), vec!["new"]);
    }

    #[test]
    fn test_contains() {
        let mut trie: GroupTrie<&str> = GroupTrie::new();
        trie.insert("/a/b", vec![]);
        assert!(trie.contains(""));
        assert!(trie.contains("/a/b"));
        assert!(!trie.contains("/a"));
        assert!(!trie.contains("/a/b/c"));
    }
}
