//! Recorded data for a single timed scope

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Index of a [`Context`] inside its engine's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextId(pub(crate) usize);

impl ContextId {
    /// Id of the context at `index` in registry order.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position in registry (creation) order.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The logical thing being timed: a function or a manually named block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Site {
    /// Function or block name
    pub name: String,
    /// Source file the scope was opened in
    pub file: String,
    /// Source line the scope was opened at
    pub line: u32,
}

impl Site {
    /// Create a new site.
    pub fn new(name: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} - {}", self.file, self.line, self.name)
    }
}

/// One opened scope: identity, display arguments, timing and nested scopes.
///
/// Contexts are only created by [`Engine::enter`](crate::Engine::enter), which
/// links them into the tree. Once closed, a context never changes again.
#[derive(Debug, Clone)]
pub struct Context {
    site: Site,
    arguments: Vec<String>,
    start: Timestamp,
    duration: Option<Duration>,
    root: bool,
    children: Vec<ContextId>,
}

impl Context {
    pub(crate) fn new(site: Site, root: bool, arguments: Vec<String>, start: Timestamp) -> Self {
        Self {
            site,
            arguments,
            start,
            duration: None,
            root,
            children: Vec::new(),
        }
    }

    /// Stamp the elapsed time. Only the first call has any effect.
    pub(crate) fn mark_end(&mut self, now: Timestamp) {
        if self.duration.is_none() {
            self.duration = Some(now.saturating_duration_since(self.start));
        }
    }

    pub(crate) fn push_child(&mut self, child: ContextId) {
        self.children.push(child);
    }

    /// Identifying site.
    #[inline]
    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Function or block name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.site.name
    }

    /// Source file.
    #[inline]
    pub fn file(&self) -> &str {
        &self.site.file
    }

    /// Source line.
    #[inline]
    pub fn line(&self) -> u32 {
        self.site.line
    }

    /// When the scope was opened.
    #[inline]
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Elapsed time, or zero while the scope is still open.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration.unwrap_or(Duration::ZERO)
    }

    /// Whether the scope has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.duration.is_some()
    }

    /// Whether no other scope was open when this one started.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Captured argument strings, in call order.
    #[inline]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Arguments joined with `", "`.
    pub fn argument_string(&self) -> String {
        self.arguments.join(", ")
    }

    /// Directly nested scopes, in creation order.
    #[inline]
    pub fn children(&self) -> &[ContextId] {
        &self.children
    }
}
