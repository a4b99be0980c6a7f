//! Radix tree of route patterns.
//!
//! ```text
//!            +-------------+
//!            | root /user  |
//!            +-------------+
//!             /           \
//!     +---------+       +--------+
//!     | /       |       | a      |
//!     | (leaf)  |       | (leaf) |
//!     +---------+       +--------+
//! ```
//!
//! Every leaf owns an [`OutcomeTracker`] that records the responses of the
//! requests routed through it.
//!
//! # Design Decisions
//! - Nodes own their children, no parent links (lookup is top-down only)
//! - A node has either one wildcard child or indexed static children
//! - Insertion and lookup are loops, never recursion
//! - The tree is only mutated while it is built; a published tree is
//!   read-only

use std::sync::Arc;

use thiserror::Error;

use crate::resilience::timeline::{OutcomeSnapshot, OutcomeTracker, TimelineConfig};
use crate::routing::method::{Method, MethodSet};

/// Errors raised while registering a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("path must begin with '/': {0:?}")]
    InvalidPath(String),

    #[error("no HTTP method given for route {0:?}")]
    NoMethods(String),

    #[error("wildcard in {path:?} must be named with a non-empty name")]
    UnnamedWildcard { path: String },

    #[error("only one wildcard per path segment is allowed, {path:?} has {segment:?}")]
    MultipleWildcards { path: String, segment: String },

    #[error("catch-all is only allowed at the end of the path in {0:?}")]
    CatchAllNotLast(String),

    #[error("catch-all must directly follow a '/' in {0:?}")]
    CatchAllWithoutSlash(String),

    #[error("{path:?} conflicts with existing wildcard {existing:?}")]
    WildcardConflict { path: String, existing: String },

    #[error("wildcard in {0:?} conflicts with existing static routes")]
    ConflictsWithStatic(String),
}

/// Node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeKind {
    #[default]
    Static,
    Root,
    /// `:name`
    Param,
    /// `*name`
    CatchAll,
}

/// Per-route admission settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutePolicy {
    /// Failure ratio above which requests are rejected.
    pub ratio: Option<f64>,
    /// Body returned with a 429 rejection.
    pub fallback: Option<Arc<str>>,
}

/// Data attached to a routable node.
#[derive(Debug)]
pub struct Leaf {
    pattern: Arc<str>,
    methods: MethodSet,
    policy: RoutePolicy,
    tracker: Arc<OutcomeTracker>,
}

impl Leaf {
    /// The pattern this leaf was registered with.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn methods(&self) -> MethodSet {
        self.methods
    }

    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(method)
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    pub fn tracker(&self) -> &OutcomeTracker {
        &self.tracker
    }

    /// An owned handle for recording the outcome after the request completes.
    pub fn handle(&self) -> RouteHandle {
        RouteHandle {
            pattern: self.pattern.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

/// Owned reference to a leaf's tracker, valid after the tree is replaced.
#[derive(Debug, Clone)]
pub struct RouteHandle {
    pattern: Arc<str>,
    tracker: Arc<OutcomeTracker>,
}

impl RouteHandle {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Feed a response status back; untracked codes are ignored.
    pub fn record(&self, status: u16) -> bool {
        self.tracker.record(status)
    }

    pub fn snapshot(&self) -> OutcomeSnapshot {
        self.tracker.snapshot()
    }
}

/// Result of a path lookup.
#[derive(Debug)]
pub enum Match<'a> {
    Found(&'a Leaf),
    /// The path differs from a registered route by one trailing slash.
    TrailingSlashRedirect,
    NotFound,
}

impl Match<'_> {
    pub fn is_found(&self) -> bool {
        matches!(self, Match::Found(_))
    }

    pub fn needs_redirect(&self) -> bool {
        matches!(self, Match::TrailingSlashRedirect)
    }
}

/// What to attach to the leaf of a registered path.
pub(crate) struct NewRoute<'a> {
    pub pattern: &'a str,
    pub methods: MethodSet,
    pub policy: RoutePolicy,
    pub timeline: TimelineConfig,
}

/// One node of the routing tree.
#[derive(Debug, Default)]
pub struct Node {
    path: Vec<u8>,
    kind: NodeKind,
    wild_child: bool,
    indices: Vec<u8>,
    children: Vec<Node>,
    leaf: Option<Leaf>,
}

impl Node {
    pub fn segment(&self) -> &[u8] {
        &self.path
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    pub fn leaf(&self) -> Option<&Leaf> {
        self.leaf.as_ref()
    }

    /// Methods accepted here, empty on non-leaf nodes.
    pub fn methods(&self) -> MethodSet {
        self.leaf.as_ref().map(Leaf::methods).unwrap_or_default()
    }

    pub fn has_wild_child(&self) -> bool {
        self.wild_child
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// True when this node matches a path ending exactly at its segment.
    fn accepts_own_path(&self) -> bool {
        self.leaf.is_some()
            || (self.wild_child
                && self.children[0].kind == NodeKind::CatchAll
                && self.path.ends_with(b"/"))
    }

    fn set_leaf(&mut self, route: &NewRoute<'_>) {
        if let Some(leaf) = self.leaf.as_mut() {
            leaf.methods = leaf.methods.union(route.methods);
            leaf.policy = route.policy.clone();
            return;
        }
        self.leaf = Some(Leaf {
            pattern: Arc::from(route.pattern),
            methods: route.methods,
            policy: route.policy.clone(),
            tracker: Arc::new(OutcomeTracker::new(route.timeline)),
        });
    }

    /// Insert a route, splitting nodes along the way.
    pub(crate) fn add_route(&mut self, route: &NewRoute<'_>) -> Result<(), RouteError> {
        validate_pattern(route.pattern)?;
        let full = route.pattern.as_bytes();

        // Empty tree
        if self.path.is_empty() && self.children.is_empty() && self.leaf.is_none() {
            self.insert_child(full, route)?;
            self.kind = NodeKind::Root;
            return Ok(());
        }

        let mut n = self;
        let mut path = full;

        loop {
            let i = common_prefix(path, &n.path);

            // Split the edge
            if i < n.path.len() {
                let child = Node {
                    path: n.path[i..].to_vec(),
                    kind: NodeKind::Static,
                    wild_child: n.wild_child,
                    indices: std::mem::take(&mut n.indices),
                    children: std::mem::take(&mut n.children),
                    leaf: n.leaf.take(),
                };
                n.indices = vec![n.path[i]];
                n.children = vec![child];
                n.path.truncate(i);
                n.wild_child = false;
            }

            if i == path.len() {
                n.set_leaf(route);
                return Ok(());
            }

            path = &path[i..];

            if n.wild_child {
                let wild = &n.children[0];
                let len = wild.path.len();
                // a catch-all only matches itself, since it must end the pattern
                let same_wildcard = if wild.kind == NodeKind::CatchAll {
                    wild.path[..] == path[..]
                } else {
                    path.len() >= len
                        && wild.path[..] == path[..len]
                        && (len == path.len() || path[len] == b'/')
                };
                if !same_wildcard {
                    return Err(RouteError::WildcardConflict {
                        path: route.pattern.to_string(),
                        existing: String::from_utf8_lossy(&wild.path).into_owned(),
                    });
                }
                n = &mut n.children[0];
                continue;
            }

            let c = path[0];

            // '/' after a param
            if n.kind == NodeKind::Param && c == b'/' && n.children.len() == 1 {
                n = &mut n.children[0];
                continue;
            }

            if let Some(pos) = n.indices.iter().position(|&b| b == c) {
                n = &mut n.children[pos];
                continue;
            }

            if c != b':' && c != b'*' {
                if n.kind != NodeKind::Param {
                    n.indices.push(c);
                }
                let idx = n.children.len();
                n.children.push(Node::default());
                n = &mut n.children[idx];
            }
            return n.insert_child(path, route);
        }
    }

    /// Lay out `path` below this node, which has no matching children yet.
    fn insert_child(&mut self, path: &[u8], route: &NewRoute<'_>) -> Result<(), RouteError> {
        let mut n = self;
        let mut path = path;

        while let Some((start, end)) = find_wildcard(path, route.pattern)? {
            if !n.children.is_empty() {
                return Err(RouteError::ConflictsWithStatic(route.pattern.to_string()));
            }

            let wildcard = path[start..end].to_vec();
            if start > 0 {
                n.path = path[..start].to_vec();
            }
            n.wild_child = true;

            if wildcard[0] == b':' {
                n.children = vec![Node {
                    path: wildcard,
                    kind: NodeKind::Param,
                    ..Node::default()
                }];
                n = &mut n.children[0];
                path = &path[end..];

                if path.is_empty() {
                    n.set_leaf(route);
                    return Ok(());
                }
                n.children = vec![Node::default()];
                n = &mut n.children[0];
                continue;
            }

            // catch-all
            if end != path.len() {
                return Err(RouteError::CatchAllNotLast(route.pattern.to_string()));
            }
            let before = if start > 0 {
                path.get(start - 1).copied()
            } else {
                n.path.last().copied()
            };
            if before != Some(b'/') {
                return Err(RouteError::CatchAllWithoutSlash(route.pattern.to_string()));
            }

            let mut child = Node {
                path: wildcard,
                kind: NodeKind::CatchAll,
                ..Node::default()
            };
            child.set_leaf(route);
            n.children = vec![child];
            return Ok(());
        }

        n.path = path.to_vec();
        n.set_leaf(route);
        Ok(())
    }

    /// Walk the tree for `path`.
    pub fn lookup(&self, path: &[u8]) -> Match<'_> {
        let mut n = self;
        let mut path = path;
        // Set once a leaf was seen with only a trailing '/' left to match.
        let mut slash_redirect = false;
        let miss = |redirect: bool| {
            if redirect {
                Match::TrailingSlashRedirect
            } else {
                Match::NotFound
            }
        };

        loop {
            let prefix = &n.path[..];

            if path.len() > prefix.len() && path.starts_with(prefix) {
                path = &path[prefix.len()..];

                if !n.wild_child {
                    if path == b"/" && n.leaf.is_some() {
                        slash_redirect = true;
                    }
                    match n.indices.iter().position(|&c| c == path[0]) {
                        Some(i) => {
                            n = &n.children[i];
                            continue;
                        }
                        None => return miss(slash_redirect),
                    }
                }

                n = &n.children[0];
                match n.kind {
                    NodeKind::Param => {
                        let end = path.iter().position(|&c| c == b'/').unwrap_or(path.len());
                        if end == 0 {
                            return miss(slash_redirect);
                        }

                        if end < path.len() {
                            let only_slash_left = path.len() == end + 1;
                            if let Some(child) = n.children.first() {
                                if only_slash_left && n.leaf.is_some() {
                                    slash_redirect = true;
                                }
                                path = &path[end..];
                                n = child;
                                continue;
                            }
                            return miss(only_slash_left && n.leaf.is_some());
                        }

                        if let Some(leaf) = &n.leaf {
                            return Match::Found(leaf);
                        }
                        let slash_child = n
                            .children
                            .first()
                            .is_some_and(|c| c.path == b"/" && c.accepts_own_path());
                        return miss(slash_child);
                    }
                    NodeKind::CatchAll => {
                        return match &n.leaf {
                            Some(leaf) => Match::Found(leaf),
                            None => Match::NotFound,
                        };
                    }
                    NodeKind::Static | NodeKind::Root => {
                        unreachable!("wildcard child must be a param or catch-all node")
                    }
                }
            }

            if path == prefix {
                if let Some(leaf) = &n.leaf {
                    return Match::Found(leaf);
                }
                if n.wild_child && n.children[0].kind == NodeKind::CatchAll && prefix.ends_with(b"/")
                {
                    if let Some(leaf) = &n.children[0].leaf {
                        return Match::Found(leaf);
                    }
                }
                let slash_child = n
                    .indices
                    .iter()
                    .position(|&c| c == b'/')
                    .is_some_and(|i| {
                        let child = &n.children[i];
                        child.path == b"/" && child.accepts_own_path()
                    });
                return miss(slash_redirect || slash_child);
            }

            // Path is shorter or diverges
            let missing_slash = prefix.len() == path.len() + 1
                && prefix[path.len()] == b'/'
                && prefix.starts_with(path)
                && n.accepts_own_path();
            return miss(slash_redirect || missing_slash);
        }
    }

    /// All leaves, depth first.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(n) = stack.pop() {
            if let Some(leaf) = &n.leaf {
                out.push(leaf);
            }
            stack.extend(n.children.iter().rev());
        }
        out
    }
}

/// Syntax checks that do not depend on the existing tree.
fn validate_pattern(pattern: &str) -> Result<(), RouteError> {
    let bytes = pattern.as_bytes();
    if bytes.first() != Some(&b'/') {
        return Err(RouteError::InvalidPath(pattern.to_string()));
    }

    let mut rest = bytes;
    let mut offset = 0;
    while let Some((start, end)) = find_wildcard(rest, pattern)? {
        if rest[start] == b'*' {
            if offset + end != bytes.len() {
                return Err(RouteError::CatchAllNotLast(pattern.to_string()));
            }
            if bytes[offset + start - 1] != b'/' {
                return Err(RouteError::CatchAllWithoutSlash(pattern.to_string()));
            }
        }
        offset += end;
        rest = &rest[end..];
    }
    Ok(())
}

/// Find the first wildcard segment, as `(start, end)` byte offsets.
fn find_wildcard(path: &[u8], pattern: &str) -> Result<Option<(usize, usize)>, RouteError> {
    let Some(start) = path.iter().position(|&c| c == b':' || c == b'*') else {
        return Ok(None);
    };

    let mut end = start + 1;
    while end < path.len() && path[end] != b'/' {
        if path[end] == b':' || path[end] == b'*' {
            let seg_end = path[end..]
                .iter()
                .position(|&c| c == b'/')
                .map_or(path.len(), |p| end + p);
            return Err(RouteError::MultipleWildcards {
                path: pattern.to_string(),
                segment: String::from_utf8_lossy(&path[start..seg_end]).into_owned(),
            });
        }
        end += 1;
    }

    if end - start < 2 {
        return Err(RouteError::UnnamedWildcard {
            path: pattern.to_string(),
        });
    }
    Ok(Some((start, end)))
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route<'a>(pattern: &'a str, methods: &[Method]) -> NewRoute<'a> {
        NewRoute {
            pattern,
            methods: methods.iter().copied().collect(),
            policy: RoutePolicy::default(),
            timeline: TimelineConfig::default(),
        }
    }

    fn add(n: &mut Node, pattern: &str, methods: &[Method]) {
        n.add_route(&route(pattern, methods)).unwrap();
    }

    fn add_err(n: &mut Node, pattern: &str) -> RouteError {
        n.add_route(&route(pattern, &[Method::Get])).unwrap_err()
    }

    #[allow(clippy::too_many_arguments)]
    fn check(
        n: &Node,
        path: &str,
        kind: NodeKind,
        methods: MethodSet,
        wild_child: bool,
        indices_empty: bool,
        children: usize,
        is_leaf: bool,
    ) {
        assert_eq!(n.path, path.as_bytes(), "path of {:?}", n);
        assert_eq!(n.kind, kind, "kind of {:?}", n);
        assert_eq!(n.methods(), methods, "methods of {:?}", n);
        assert_eq!(n.wild_child, wild_child, "wild_child of {:?}", n);
        assert_eq!(n.indices.is_empty(), indices_empty, "indices of {:?}", n);
        assert_eq!(n.children.len(), children, "children of {:?}", n);
        assert_eq!(n.is_leaf(), is_leaf, "leaf of {:?}", n);
    }

    fn set(methods: &[Method]) -> MethodSet {
        methods.iter().copied().collect()
    }

    fn found<'a>(m: Match<'a>) -> &'a Leaf {
        match m {
            Match::Found(leaf) => leaf,
            other => panic!("expected a leaf, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_param() {
        let mut n = Node::default();
        add(&mut n, "/:name", &[Method::Get]);

        check(&n, "/", NodeKind::Root, MethodSet::EMPTY, true, true, 1, false);
        let name = &n.children[0];
        check(name, ":name", NodeKind::Param, set(&[Method::Get]), false, true, 0, true);
    }

    #[test]
    fn test_insert_dual_param() {
        let mut n = Node::default();
        add(&mut n, "/:name/:card", &[Method::Post]);

        let name = &n.children[0];
        let slash = &name.children[0];
        let card = &slash.children[0];
        check(&n, "/", NodeKind::Root, MethodSet::EMPTY, true, true, 1, false);
        check(name, ":name", NodeKind::Param, MethodSet::EMPTY, false, true, 1, false);
        check(slash, "/", NodeKind::Static, MethodSet::EMPTY, true, true, 1, false);
        check(card, ":card", NodeKind::Param, set(&[Method::Post]), false, true, 0, true);
    }

    #[test]
    fn test_insert_catch_all() {
        let mut n = Node::default();
        add(&mut n, "/user/*name", &[Method::Post]);

        check(&n, "/user/", NodeKind::Root, MethodSet::EMPTY, true, true, 1, false);
        let all = &n.children[0];
        check(all, "*name", NodeKind::CatchAll, set(&[Method::Post]), false, true, 0, true);
    }

    #[test]
    fn test_bad_patterns() {
        let mut n = Node::default();
        assert!(matches!(
            add_err(&mut n, "/user/:name:this/there"),
            RouteError::MultipleWildcards { .. }
        ));
        assert!(matches!(
            add_err(&mut n, "/user/:/there"),
            RouteError::UnnamedWildcard { .. }
        ));
        assert!(matches!(
            add_err(&mut n, "/*name/:haha"),
            RouteError::CatchAllNotLast(_)
        ));
        assert!(matches!(
            add_err(&mut n, "/user*name"),
            RouteError::CatchAllWithoutSlash(_)
        ));
        assert!(matches!(add_err(&mut n, "user"), RouteError::InvalidPath(_)));
        // Nothing was inserted by the failed attempts.
        assert!(n.path.is_empty() && n.children.is_empty());
    }

    #[test]
    fn test_add_route_split() {
        let mut n = Node::default();
        add(&mut n, "/user/hello", &[Method::Get, Method::Post]);
        check(
            &n,
            "/user/hello",
            NodeKind::Root,
            set(&[Method::Get, Method::Post]),
            false,
            true,
            0,
            true,
        );

        add(&mut n, "/user/world", &[Method::Delete]);
        check(&n, "/user/", NodeKind::Root, MethodSet::EMPTY, false, false, 2, false);

        let hello = &n.children[0];
        let world = &n.children[1];
        check(
            hello,
            "hello",
            NodeKind::Static,
            set(&[Method::Get, Method::Post]),
            false,
            true,
            0,
            true,
        );
        check(world, "world", NodeKind::Static, set(&[Method::Delete]), false, true, 0, true);
    }

    #[test]
    fn test_add_route_wild_child() {
        let mut n = Node::default();
        add(&mut n, "/user/:name/hello", &[Method::Get]);
        check(&n, "/user/", NodeKind::Root, MethodSet::EMPTY, true, true, 1, false);

        let name = &n.children[0];
        check(name, ":name", NodeKind::Param, MethodSet::EMPTY, false, true, 1, false);

        let hello = &name.children[0];
        check(hello, "/hello", NodeKind::Static, set(&[Method::Get]), false, true, 0, true);
    }

    #[test]
    fn test_add_route_dual_wild_child() {
        let mut n = Node::default();
        add(&mut n, "/user/:name/hello", &[Method::Get]);
        add(&mut n, "/user/:name/hello/:card", &[Method::Get]);
        check(&n, "/user/", NodeKind::Root, MethodSet::EMPTY, true, true, 1, false);

        let name = &n.children[0];
        check(name, ":name", NodeKind::Param, MethodSet::EMPTY, false, true, 1, false);

        let slash_hello = &name.children[0];
        check(
            slash_hello,
            "/hello",
            NodeKind::Static,
            set(&[Method::Get]),
            false,
            false,
            1,
            true,
        );

        let slash = &slash_hello.children[0];
        check(slash, "/", NodeKind::Static, MethodSet::EMPTY, true, true, 1, false);

        let card = &slash.children[0];
        check(card, ":card", NodeKind::Param, set(&[Method::Get]), false, true, 0, true);
    }

    #[test]
    fn test_wildcard_conflicts() {
        let mut n = Node::default();
        add(&mut n, "/user/:name/hello/world", &[Method::Get]);
        assert!(matches!(
            add_err(&mut n, "/user/*whoever"),
            RouteError::WildcardConflict { .. }
        ));
        assert!(matches!(
            add_err(&mut n, "/user/:id"),
            RouteError::WildcardConflict { .. }
        ));
        assert!(matches!(
            add_err(&mut n, "/user/:namex"),
            RouteError::WildcardConflict { .. }
        ));
        assert!(matches!(
            add_err(&mut n, "/user/static"),
            RouteError::WildcardConflict { .. }
        ));

        let mut n = Node::default();
        add(&mut n, "/src/a", &[Method::Get]);
        add(&mut n, "/src/b", &[Method::Get]);
        assert!(matches!(
            add_err(&mut n, "/src/:file"),
            RouteError::ConflictsWithStatic(_)
        ));
    }

    #[test]
    fn test_add_route_multi_indices() {
        let mut n = Node::default();
        for p in [
            "/user/:name/hello/world",
            "/use/this",
            "/usea/this",
            "/useb/that",
            "/usea/that",
        ] {
            add(&mut n, p, &[Method::Get]);
        }
        check(&n, "/use", NodeKind::Root, MethodSet::EMPTY, false, false, 4, false);

        for p in ["/use/this", "/usea/this", "/useb/that", "/usea/that"] {
            assert_eq!(found(n.lookup(p.as_bytes())).pattern(), p);
        }
        assert_eq!(
            found(n.lookup(b"/user/jhon/hello/world")).pattern(),
            "/user/:name/hello/world"
        );
    }

    #[test]
    fn test_add_route_same_path_extends_methods() {
        let mut n = Node::default();
        add(&mut n, "/user/hello", &[Method::Get, Method::Post]);
        add(&mut n, "/user/hello", &[Method::Delete]);
        check(
            &n,
            "/user/hello",
            NodeKind::Root,
            set(&[Method::Get, Method::Post, Method::Delete]),
            false,
            true,
            0,
            true,
        );
        assert_eq!(n.leaves().len(), 1);
    }

    #[test]
    fn test_add_catch_all_again_extends_methods() {
        let mut n = Node::default();
        add(&mut n, "/static/*file", &[Method::Get]);
        add(&mut n, "/static/*file", &[Method::Head]);
        assert_eq!(n.leaves().len(), 1);

        let leaf = found(n.lookup(b"/static/css/site.css"));
        assert_eq!(leaf.pattern(), "/static/*file");
        assert_eq!(leaf.methods(), set(&[Method::Get, Method::Head]));

        // a different name for the same catch-all still conflicts
        assert!(matches!(
            add_err(&mut n, "/static/*other"),
            RouteError::WildcardConflict { .. }
        ));
    }

    #[test]
    fn test_lookup_static() {
        let mut n = Node::default();
        add(&mut n, "/user", &[Method::Get, Method::Delete]);

        assert_eq!(found(n.lookup(b"/user")).pattern(), "/user");
        assert!(n.lookup(b"/user/").needs_redirect());
        assert!(matches!(n.lookup(b"/what???"), Match::NotFound));

        let mut n = Node::default();
        add(&mut n, "/user/", &[Method::Get, Method::Delete]);
        add(&mut n, "/usera", &[Method::Get, Method::Delete]);
        check(&n, "/user", NodeKind::Root, MethodSet::EMPTY, false, false, 2, false);
        assert!(n.lookup(b"/user").needs_redirect());
        assert!(n.lookup(b"/user/").is_found());
        assert!(n.lookup(b"/usera").is_found());
        assert!(n.lookup(b"/usera/").needs_redirect());
    }

    #[test]
    fn test_lookup_with_wild_child() {
        let mut n = Node::default();
        add(&mut n, "/user/:name/hello", &[Method::Get, Method::Delete]);
        add(&mut n, "/use/:this/that", &[Method::Get, Method::Delete]);
        check(&n, "/use", NodeKind::Root, MethodSet::EMPTY, false, false, 2, false);

        assert!(matches!(n.lookup(b"/user/jhon"), Match::NotFound));
        assert!(matches!(n.lookup(b"/user/jhon/"), Match::NotFound));
        assert!(n.lookup(b"/user/jhon/hello/").needs_redirect());
        assert_eq!(
            found(n.lookup(b"/use/x/that")).pattern(),
            "/use/:this/that"
        );
    }

    #[test]
    fn test_lookup_param_and_catch_all() {
        let mut n = Node::default();
        add(&mut n, "/user/:name", &[Method::Get, Method::Delete]);
        assert_eq!(found(n.lookup(b"/user/jhon")).pattern(), "/user/:name");
        assert!(n.lookup(b"/user/jhon/").needs_redirect());
        assert!(matches!(n.lookup(b"/user/"), Match::NotFound));
        assert!(matches!(n.lookup(b"/user/jhon/x"), Match::NotFound));

        let mut n = Node::default();
        add(&mut n, "/user/*name", &[Method::Get, Method::Delete]);
        assert_eq!(found(n.lookup(b"/user/jhon")).pattern(), "/user/*name");
        assert_eq!(found(n.lookup(b"/user/a/b/c/")).pattern(), "/user/*name");
        assert!(n.lookup(b"/user/").is_found());
        assert!(n.lookup(b"/user").needs_redirect());
    }

    #[test]
    fn test_lookup_param_with_slash_child() {
        let mut n = Node::default();
        add(&mut n, "/src/:world/", &[Method::Post]);
        assert!(n.lookup(b"/src/this/").is_found());
        assert!(n.lookup(b"/src/this").needs_redirect());

        let mut n = Node::default();
        add(&mut n, "/user/:name", &[Method::Get]);
        add(&mut n, "/user/:name/card", &[Method::Get]);
        assert!(n.lookup(b"/user/jhon/").needs_redirect());
        assert!(n.lookup(b"/user/jhon/card").is_found());
    }

    #[test]
    fn test_lookup_redirect_through_static_child() {
        let mut n = Node::default();
        add(&mut n, "/user/jhon", &[Method::Post]);
        add(&mut n, "/user/jhon/card/", &[Method::Post]);

        assert!(n.lookup(b"/user/jhon/").needs_redirect());
        assert!(n.lookup(b"/user/jhon/card").needs_redirect());
        assert!(matches!(n.lookup(b"/user/what/"), Match::NotFound));
    }

    #[test]
    fn test_lookup_empty_tree() {
        let n = Node::default();
        assert!(matches!(n.lookup(b"/"), Match::NotFound));
        assert!(matches!(n.lookup(b"/anything"), Match::NotFound));
    }

    #[test]
    fn test_registered_paths_all_match() {
        let patterns = [
            "/",
            "/cmd/:tool/:sub",
            "/cmd/:tool/",
            "/src/*filepath",
            "/search/",
            "/search/:query",
            "/user_:name",
            "/user_:name/about",
            "/files/:dir/*filepath",
            "/doc/",
            "/doc/go_faq.html",
            "/doc/go1.html",
            "/info/:user/public",
            "/info/:user/project/:project",
        ];
        let mut n = Node::default();
        for p in patterns {
            add(&mut n, p, &[Method::Get]);
        }

        let requests = [
            ("/", "/"),
            ("/cmd/test/", "/cmd/:tool/"),
            ("/cmd/test/3", "/cmd/:tool/:sub"),
            ("/src/some/file.png", "/src/*filepath"),
            ("/search/", "/search/"),
            ("/search/someth!ng+in+ünìcodé", "/search/:query"),
            ("/user_gopher", "/user_:name"),
            ("/user_gopher/about", "/user_:name/about"),
            ("/files/js/inc/framework.js", "/files/:dir/*filepath"),
            ("/doc/go1.html", "/doc/go1.html"),
            ("/info/gordon/public", "/info/:user/public"),
            ("/info/gordon/project/go", "/info/:user/project/:project"),
        ];
        for (path, pattern) in requests {
            assert_eq!(found(n.lookup(path.as_bytes())).pattern(), pattern, "{}", path);
        }

        assert!(n.lookup(b"/cmd/test").needs_redirect());
        assert!(n.lookup(b"/doc").needs_redirect());
        assert!(n.lookup("/search/someth!ng+in+ünìcodé/".as_bytes()).needs_redirect());
        assert!(matches!(n.lookup(b"/cmd/test/3/x"), Match::NotFound));
    }

    #[test]
    fn test_leaves_lists_every_route() {
        let mut n = Node::default();
        for p in ["/a", "/a/b", "/c/:d", "/e/*f"] {
            add(&mut n, p, &[Method::Get]);
        }
        let mut patterns: Vec<&str> = n.leaves().iter().map(|l| l.pattern()).collect();
        patterns.sort();
        assert_eq!(patterns, vec!["/a", "/a/b", "/c/:d", "/e/*f"]);
    }

    #[test]
    fn test_handle_records_into_leaf_tracker() {
        let mut n = Node::default();
        add(&mut n, "/user", &[Method::Get]);
        let leaf = found(n.lookup(b"/user"));
        let handle = leaf.handle();

        assert!(handle.record(502));
        assert!(!handle.record(404));
        assert_eq!(leaf.tracker().snapshot().upstream_error, 1);
    }
}
