//! Scope recording engine
//!
//! An [`Engine`] owns every [`Context`] it has created in a single arena, and
//! tracks the currently open scopes on a stack of arena indices. Opening a
//! scope links it under the top of that stack, so the recorded tree mirrors
//! lexical nesting, recursion included.
//!
//! # Example
//!
//! ```rust
//! use prof::{Engine, Site};
//!
//! let engine = Engine::new();
//! {
//!     let _outer = engine.enter(Site::new("load", file!(), line!()), Vec::new());
//!     let _inner = engine.enter(Site::new("parse", file!(), line!()), vec!["42".to_string()]);
//! }
//!
//! let mut out = Vec::new();
//! engine.report(&mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
//! ```

use crate::clock::{Clock, MonotonicClock};
use crate::context::{Context, ContextId, Site};
use crate::error::ProfResult;
use crate::report::{self, ContextNode, ProfileExport, ReportConfig, SummaryEntry};
use std::cell::RefCell;
use std::io::Write;

/// Records nested scopes and renders reports from them.
///
/// The engine is single-threaded: it uses interior mutability so that guards
/// can borrow it shared while further scopes are opened.
#[derive(Debug)]
pub struct Engine<C: Clock = MonotonicClock> {
    clock: C,
    config: ReportConfig,
    /// Open scopes, innermost last
    active: RefCell<Vec<ContextId>>,
    /// Every scope ever opened, in creation order
    records: RefCell<Vec<Context>>,
}

impl Engine<MonotonicClock> {
    /// Create an engine using the monotonic system clock.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for Engine<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Engine<C> {
    /// Create an engine reading time from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            config: ReportConfig::default(),
            active: RefCell::new(Vec::new()),
            records: RefCell::new(Vec::new()),
        }
    }

    /// Replace the report configuration.
    pub fn with_config(mut self, config: ReportConfig) -> Self {
        self.config = config;
        self
    }

    /// Current report configuration.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// The clock this engine reads.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Open a scope.
    ///
    /// The scope becomes a child of the innermost open scope, or a root if
    /// none is open. It stays open until the returned guard is dropped.
    pub fn enter(&self, site: Site, arguments: Vec<String>) -> ScopeGuard<'_, C> {
        let start = self.clock.now();
        let mut records = self.records.borrow_mut();
        let mut active = self.active.borrow_mut();

        let id = ContextId(records.len());
        let parent = active.last().copied();
        if let Some(parent) = parent {
            records[parent.index()].push_child(id);
        }

        tracing::trace!(
            target: "prof",
            id = id.index(),
            name = %site.name,
            depth = active.len(),
            "scope entered"
        );

        records.push(Context::new(site, parent.is_none(), arguments, start));
        active.push(id);

        ScopeGuard { engine: self, id }
    }

    fn exit(&self, id: ContextId) {
        let now = self.clock.now();
        let popped = self.active.borrow_mut().pop();
        if let Some(ctx) = self.records.borrow_mut().get_mut(id.index()) {
            ctx.mark_end(now);
        }

        tracing::trace!(target: "prof", id = id.index(), "scope exited");

        if popped != Some(id) {
            tracing::error!(
                target: "prof",
                expected = id.index(),
                popped = ?popped.map(ContextId::index),
                "scope closed out of order"
            );
            // Never panic while already unwinding: that would abort.
            if cfg!(debug_assertions) && !std::thread::panicking() {
                panic!(
                    "scope {} closed out of order (top of stack was {:?})",
                    id.index(),
                    popped.map(ContextId::index)
                );
            }
        }
    }

    /// Close every root that is still open, stamping it with the current time.
    fn close_roots(&self) {
        let now = self.clock.now();
        for ctx in self.records.borrow_mut().iter_mut().filter(|c| c.is_root()) {
            ctx.mark_end(now);
        }
    }

    /// Ids of all root scopes in creation order.
    pub fn roots(&self) -> Vec<ContextId> {
        self.records
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, ctx)| ctx.is_root())
            .map(|(idx, _)| ContextId(idx))
            .collect()
    }

    /// A copy of one recorded scope.
    pub fn context(&self, id: ContextId) -> Option<Context> {
        self.records.borrow().get(id.index()).cloned()
    }

    /// Ids of the currently open scopes, outermost first.
    pub fn active_ids(&self) -> Vec<ContextId> {
        self.active.borrow().clone()
    }

    /// Number of currently open scopes.
    pub fn depth(&self) -> usize {
        self.active.borrow().len()
    }

    /// Number of scopes ever opened.
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Whether no scope has been opened yet.
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Render the full scope tree.
    ///
    /// Open roots are closed first. Each line reads
    /// `<indent><file>:<line> - <name>(<args>) - <seconds>.<nanos>`.
    pub fn render_report(&self) -> String {
        self.close_roots();
        let roots = self.roots();
        report::render_tree(&self.records.borrow(), &roots, &self.config)
    }

    /// Write the full scope tree to `out`.
    pub fn report<W: Write>(&self, out: &mut W) -> ProfResult<()> {
        let text = self.render_report();
        tracing::debug!(target: "prof", bytes = text.len(), "writing scope report");
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Per-key totals, largest first.
    ///
    /// Open roots are closed first. A recursive occurrence of a key below an
    /// occurrence of the same key contributes nothing.
    pub fn summary(&self) -> Vec<SummaryEntry> {
        self.close_roots();
        let roots = self.roots();
        report::summarize(&self.records.borrow(), &roots, self.config.summary_key)
    }

    /// Render the summary as `<key> - <seconds>.<nanos>` lines.
    pub fn render_summary(&self) -> String {
        report::render_summary(&self.summary())
    }

    /// Write the summary to `out`.
    pub fn summary_report<W: Write>(&self, out: &mut W) -> ProfResult<()> {
        let text = self.render_summary();
        tracing::debug!(target: "prof", bytes = text.len(), "writing summary report");
        out.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Owned copy of every root tree, without closing anything.
    pub fn snapshot(&self) -> Vec<ContextNode> {
        let roots = self.roots();
        let records = self.records.borrow();
        roots
            .into_iter()
            .map(|root| report::build_node(&records, root))
            .collect()
    }

    /// Export the tree and summary as pretty-printed JSON.
    pub fn export_json(&self) -> ProfResult<String> {
        let summary = self.summary();
        let export = ProfileExport {
            roots: self.snapshot(),
            summary,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}

/// Keeps a scope open until dropped.
///
/// Dropping the guard closes the scope on every exit path, early returns and
/// unwinding included. Guards must be dropped in reverse order of creation.
#[derive(Debug)]
#[must_use = "the scope closes as soon as the guard is dropped; bind it with `let _guard = ...`"]
pub struct ScopeGuard<'a, C: Clock = MonotonicClock> {
    engine: &'a Engine<C>,
    id: ContextId,
}

impl<C: Clock> ScopeGuard<'_, C> {
    /// Id of the guarded scope.
    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Close the scope now.
    pub fn exit(self) {
        drop(self);
    }
}

impl<C: Clock> Drop for ScopeGuard<'_, C> {
    fn drop(&mut self) {
        self.engine.exit(self.id);
    }
}
