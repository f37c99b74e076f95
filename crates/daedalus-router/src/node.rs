//! Compressed radix tree node.
//!
//! Every node below the root owns one edge of the tree:
//!
//! - a **static** node owns literal text, which may span several path
//!   segments. Sibling static nodes never share a first character.
//! - a **param** node captures one non-empty segment.
//! - a **wildcard** node captures the rest of the path and is always a leaf.
//!
//! A node has at most one param child and at most one wildcard child.
//! Lookup tries the static child, then the param child, then the wildcard
//! child, backtracking when a branch dead-ends.

use std::sync::Arc;

use crate::params::Params;
use crate::pattern::Token;

/// A registered route: the original pattern text and its value.
#[derive(Debug, Clone)]
pub struct Endpoint<T> {
    pattern: Arc<str>,
    value: T,
}

impl<T> Endpoint<T> {
    pub(crate) fn new(pattern: &str, value: T) -> Self {
        Self {
            pattern: Arc::from(pattern),
            value,
        }
    }

    /// Returns the pattern exactly as it was registered.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns a shared handle to the pattern text.
    #[must_use]
    pub fn pattern_arc(&self) -> Arc<str> {
        Arc::clone(&self.pattern)
    }

    /// Returns the value stored for this route.
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Why an insert was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InsertFailure {
    Duplicate,
    Conflict { segment: String, existing: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Static,
    Param(Arc<str>),
    Wildcard(Arc<str>),
}

#[derive(Debug)]
pub(crate) struct Node<T> {
    prefix: String,
    kind: Kind,
    /// Number of endpoints in this subtree.
    priority: u32,
    static_children: Vec<Node<T>>,
    param: Option<Box<Node<T>>>,
    wildcard: Option<Box<Node<T>>>,
    endpoint: Option<Endpoint<T>>,
}

impl<T> Node<T> {
    pub(crate) fn root() -> Self {
        Self::with_kind(String::new(), Kind::Static)
    }

    fn with_kind(prefix: String, kind: Kind) -> Self {
        Self {
            prefix,
            kind,
            priority: 0,
            static_children: Vec::new(),
            param: None,
            wildcard: None,
            endpoint: None,
        }
    }

    /// Returns true if no route has been inserted below this node.
    pub(crate) fn is_empty(&self) -> bool {
        self.priority == 0
    }

    /// Inserts the tokens of a parsed pattern below this node.
    ///
    /// On failure the tree is left untouched: failures are only detected on
    /// existing branches, which are never split on the way down.
    pub(crate) fn insert(
        &mut self,
        tokens: &[Token],
        endpoint: Endpoint<T>,
    ) -> Result<(), InsertFailure> {
        self.insert_at("", tokens, endpoint)
    }

    fn insert_at(
        &mut self,
        leading: &str,
        tokens: &[Token],
        endpoint: Endpoint<T>,
    ) -> Result<(), InsertFailure> {
        if !leading.is_empty() {
            return self.insert_static(leading, tokens, endpoint);
        }

        let Some((head, rest)) = tokens.split_first() else {
            if self.endpoint.is_some() {
                return Err(InsertFailure::Duplicate);
            }
            self.endpoint = Some(endpoint);
            self.priority += 1;
            return Ok(());
        };

        match head {
            Token::Static(text) if text.is_empty() => self.insert_at("", rest, endpoint),
            Token::Static(text) => self.insert_static(text, rest, endpoint),
            Token::Param(name) => self.insert_param(name, rest, endpoint),
            Token::Wildcard(name) => self.insert_wildcard(name, endpoint),
        }
    }

    fn insert_static(
        &mut self,
        text: &str,
        rest: &[Token],
        endpoint: Endpoint<T>,
    ) -> Result<(), InsertFailure> {
        let first = text.chars().next();
        let existing = self
            .static_children
            .iter()
            .position(|child| child.prefix.chars().next() == first);

        match existing {
            Some(i) => {
                let child = &mut self.static_children[i];
                let common = common_prefix_len(&child.prefix, text);
                if common < child.prefix.len() {
                    child.split(common);
                }
                child.insert_at(&text[common..], rest, endpoint)?;
            }
            None => {
                let mut child = Self::with_kind(text.to_owned(), Kind::Static);
                child.insert_at("", rest, endpoint)?;
                self.static_children.push(child);
            }
        }

        self.priority += 1;
        self.static_children.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(())
    }

    fn insert_param(
        &mut self,
        name: &Arc<str>,
        rest: &[Token],
        endpoint: Endpoint<T>,
    ) -> Result<(), InsertFailure> {
        if let Some(child) = &self.param {
            if let Kind::Param(existing) = &child.kind {
                if existing != name {
                    return Err(InsertFailure::Conflict {
                        segment: format!(":{name}"),
                        existing: format!(":{existing}"),
                    });
                }
            }
        }

        let child = self.param.get_or_insert_with(|| {
            Box::new(Self::with_kind(String::new(), Kind::Param(Arc::clone(name))))
        });
        child.insert_at("", rest, endpoint)?;
        self.priority += 1;
        Ok(())
    }

    fn insert_wildcard(
        &mut self,
        name: &Arc<str>,
        endpoint: Endpoint<T>,
    ) -> Result<(), InsertFailure> {
        if let Some(child) = &self.wildcard {
            return match &child.kind {
                Kind::Wildcard(existing) if existing != name => Err(InsertFailure::Conflict {
                    segment: format!("*{name}"),
                    existing: format!("*{existing}"),
                }),
                _ => Err(InsertFailure::Duplicate),
            };
        }

        let mut child = Self::with_kind(String::new(), Kind::Wildcard(Arc::clone(name)));
        child.endpoint = Some(endpoint);
        child.priority = 1;
        self.wildcard = Some(Box::new(child));
        self.priority += 1;
        Ok(())
    }

    /// Splits this static node so that it keeps only `prefix[..at]`; the
    /// remainder becomes its single child and inherits everything below.
    fn split(&mut self, at: usize) {
        let suffix = self.prefix.split_off(at);
        let child = Self {
            prefix: suffix,
            kind: Kind::Static,
            priority: self.priority,
            static_children: std::mem::take(&mut self.static_children),
            param: self.param.take(),
            wildcard: self.wildcard.take(),
            endpoint: self.endpoint.take(),
        };
        self.static_children.push(child);
    }

    /// Resolves `path`, the part of the request path below this node.
    ///
    /// Captures are appended to `params`; captures from abandoned branches
    /// are removed again before returning.
    pub(crate) fn find<'n>(&'n self, path: &str, params: &mut Params) -> Option<&'n Endpoint<T>> {
        if path.is_empty() {
            if let Some(endpoint) = &self.endpoint {
                return Some(endpoint);
            }
        }

        let first = path.chars().next();
        if let Some(child) = self
            .static_children
            .iter()
            .find(|child| child.prefix.chars().next() == first)
        {
            if let Some(rest) = path.strip_prefix(child.prefix.as_str()) {
                if let Some(found) = child.find(rest, params) {
                    return Some(found);
                }
            }
        }

        if let Some(child) = &self.param {
            let end = path.find('/').unwrap_or(path.len());
            if end > 0 {
                if let Kind::Param(name) = &child.kind {
                    let mark = params.len();
                    params.push(Arc::clone(name), &path[..end]);
                    if let Some(found) = child.find(&path[end..], params) {
                        return Some(found);
                    }
                    params.truncate(mark);
                }
            }
        }

        if let Some(child) = &self.wildcard {
            if let (Kind::Wildcard(name), Some(endpoint)) = (&child.kind, &child.endpoint) {
                params.push(Arc::clone(name), path);
                return Some(endpoint);
            }
        }

        None
    }

    /// Resolves `path` ignoring ASCII case in static text.
    ///
    /// On success the route's canonical spelling of the path is appended to
    /// `out`: static text as registered, captured segments as requested.
    pub(crate) fn find_case_insensitive(&self, path: &str, out: &mut String) -> bool {
        if path.is_empty() && self.endpoint.is_some() {
            return true;
        }

        let mark = out.len();

        for child in &self.static_children {
            let n = child.prefix.len();
            let (Some(head), Some(rest)) = (path.get(..n), path.get(n..)) else {
                continue;
            };
            if head.eq_ignore_ascii_case(&child.prefix) {
                out.push_str(&child.prefix);
                if child.find_case_insensitive(rest, out) {
                    return true;
                }
                out.truncate(mark);
            }
        }

        if let Some(child) = &self.param {
            let end = path.find('/').unwrap_or(path.len());
            if end > 0 {
                out.push_str(&path[..end]);
                if child.find_case_insensitive(&path[end..], out) {
                    return true;
                }
                out.truncate(mark);
            }
        }

        if self.wildcard.is_some() {
            out.push_str(path);
            return true;
        }

        false
    }
}

/// Length in bytes of the longest common prefix, on a character boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}
