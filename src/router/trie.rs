//! Segment trie for route matching
//!
//! Each node of the trie stands for one path segment and owns three kinds of
//! outgoing edges:
//!
//! - **Literal children** keyed by the exact segment text (`users`)
//! - **One parameter child** shared by every `:name` segment at that position
//! - **One catch-all child** shared by every `*name` segment at that position
//!
//! A node carries a [`Route`] when some pattern ends there. The names bound by
//! the pattern live on the route (not on the shared parameter node), so
//! `/users/:id` and `/users/:uid/posts` can share a node and still report
//! their own parameter names.
//!
//! ## Lookup order
//!
//! Lookup is breadth-first. At every depth the frontier expands into both the
//! literal child and the parameter child of each candidate, in that order, so
//! overlapping patterns do not need backtracking. Every catch-all edge seen on
//! the way is remembered.
//!
//! 1. After the last segment, the first frontier node owning a route wins.
//!    Literal branches come before parameter branches, so `/a/b` beats `/a/:p`
//!    for the path `/a/b`.
//! 2. Otherwise the remembered catch-alls are tried from the deepest back to
//!    the shallowest: `/a/b/*y` shadows `/a/*x` for `/a/b/c`.
//!
//! ## Performance
//!
//! - Insertion: O(s) where s is the number of pattern segments
//! - Lookup: O(s × f) where f is the frontier width (literal + parameter per
//!   level, small in practice)

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use super::core::ParamVec;
use super::pattern::{Pattern, Segment};

/// A name bound by a pattern, keyed by the segment position it captures.
#[derive(Debug, Clone)]
struct ParamKey {
    index: usize,
    name: Arc<str>,
    catch_all: bool,
}

/// A registered route stored on a terminal trie node.
#[derive(Debug)]
pub struct Route<T> {
    /// Value registered for the pattern (the handler, for the router)
    pub value: T,
    /// Pattern text as registered
    pub pattern: Arc<str>,
    keys: Vec<ParamKey>,
}

impl<T> Route<T> {
    /// Replay this route's parameter bindings against a concrete path.
    ///
    /// A catch-all binding receives every segment from its position onward,
    /// joined with `/`.
    fn bind(&self, segments: &[&str]) -> ParamVec {
        self.keys
            .iter()
            .map(|key| {
                let value = if key.catch_all {
                    segments.get(key.index..).map(|rest| rest.join("/"))
                } else {
                    segments.get(key.index).map(|s| (*s).to_string())
                };
                (Arc::clone(&key.name), value.unwrap_or_default())
            })
            .collect()
    }
}

/// A successful lookup: the route and the parameters bound for this path.
#[derive(Debug)]
pub struct RouteHit<'a, T> {
    pub route: &'a Route<T>,
    pub params: ParamVec,
}

struct TrieNode<T> {
    route: Option<Route<T>>,
    children: HashMap<String, TrieNode<T>>,
    param_child: Option<Box<TrieNode<T>>>,
    catch_all_child: Option<Box<TrieNode<T>>>,
}

impl<T> TrieNode<T> {
    fn new() -> Self {
        Self {
            route: None,
            children: HashMap::new(),
            param_child: None,
            catch_all_child: None,
        }
    }

    fn collect_routes<'a>(&'a self, out: &mut Vec<&'a Route<T>>) {
        if let Some(route) = &self.route {
            out.push(route);
        }
        for child in self.children.values() {
            child.collect_routes(out);
        }
        if let Some(child) = &self.param_child {
            child.collect_routes(out);
        }
        if let Some(child) = &self.catch_all_child {
            child.collect_routes(out);
        }
    }
}

/// Prefix trie over path segments for a single HTTP method.
pub struct RouteTrie<T> {
    root: TrieNode<T>,
    len: usize,
}

impl<T> Default for RouteTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTrie<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            len: 0,
        }
    }

    /// Number of patterns registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a pattern.
    ///
    /// A literal segment never reuses a parameter or catch-all edge, and a
    /// parameter segment never reuses a catch-all edge: each kind walks its
    /// own edge.
    ///
    /// # Errors
    ///
    /// When the pattern ends on a node that already owns a route, the trie is
    /// left untouched and the pattern of the existing route is returned.
    pub fn insert(&mut self, pattern: &Pattern, value: T) -> Result<(), Arc<str>> {
        let mut cur = &mut self.root;
        let mut keys = Vec::new();

        for (index, segment) in pattern.segments().iter().enumerate() {
            cur = match segment {
                Segment::Literal(text) => cur
                    .children
                    .entry(text.clone())
                    .or_insert_with(TrieNode::new),
                Segment::Param(name) => {
                    keys.push(ParamKey {
                        index,
                        name: Arc::from(name.as_str()),
                        catch_all: false,
                    });
                    &mut **cur
                        .param_child
                        .get_or_insert_with(|| Box::new(TrieNode::new()))
                }
                Segment::CatchAll(name) => {
                    keys.push(ParamKey {
                        index,
                        name: Arc::from(name.as_str()),
                        catch_all: true,
                    });
                    &mut **cur
                        .catch_all_child
                        .get_or_insert_with(|| Box::new(TrieNode::new()))
                }
            };
        }

        if let Some(existing) = &cur.route {
            return Err(Arc::clone(&existing.pattern));
        }

        cur.route = Some(Route {
            value,
            pattern: Arc::from(pattern.as_str()),
            keys,
        });
        self.len += 1;
        Ok(())
    }

    /// Find the route for a concrete path.
    ///
    /// See the module documentation for the precedence rules.
    #[must_use]
    pub fn search<'a>(&'a self, segments: &[&str]) -> Option<RouteHit<'a, T>> {
        let mut frontier: SmallVec<[&TrieNode<T>; 4]> = SmallVec::new();
        frontier.push(&self.root);
        let mut catch_alls: SmallVec<[&TrieNode<T>; 4]> = SmallVec::new();

        for segment in segments {
            let mut next: SmallVec<[&TrieNode<T>; 4]> = SmallVec::new();
            for node in &frontier {
                if let Some(child) = node.catch_all_child.as_deref() {
                    catch_alls.push(child);
                }
                if let Some(child) = node.children.get(*segment) {
                    next.push(child);
                }
                if let Some(child) = node.param_child.as_deref() {
                    next.push(child);
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        // A non-empty frontier means every segment was consumed.
        let route = frontier
            .iter()
            .find_map(|node| node.route.as_ref())
            .or_else(|| {
                catch_alls
                    .iter()
                    .rev()
                    .find_map(|node| node.route.as_ref())
            })?;

        Some(RouteHit {
            route,
            params: route.bind(segments),
        })
    }

    /// Every registered route, in no particular order.
    #[must_use]
    pub fn routes(&self) -> Vec<&Route<T>> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect_routes(&mut out);
        out
    }
}
