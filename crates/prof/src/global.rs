//! Per-thread engine behind the `prof_enter!` macro

use crate::context::Site;
use crate::engine::{Engine, ScopeGuard};
use crate::error::ProfResult;
use std::io::Write;

thread_local! {
    // Leaked so guards can borrow it for `'static`; records live as long as the thread.
    static ENGINE: &'static Engine = Box::leak(Box::new(Engine::new()));
}

/// The calling thread's engine.
///
/// Each thread records into its own engine, so scopes never nest across
/// threads. The engine is created on first use and is never freed, even
/// after its thread exits: every thread that reaches a `prof_enter!` marker
/// keeps its engine and records alive for the rest of the process. Place
/// markers on long-lived threads; for short-lived workers, record into an
/// explicit [`Engine`] that is dropped with the work instead.
pub fn engine() -> &'static Engine {
    ENGINE.with(|engine| *engine)
}

/// Open a scope on the calling thread's engine.
///
/// This is what [`prof_enter!`](crate::prof_enter) expands to.
pub fn enter(site: Site, arguments: Vec<String>) -> ScopeGuard<'static> {
    engine().enter(site, arguments)
}

/// Print the calling thread's scope tree to stdout.
///
/// Output is best effort: a failed write is logged and otherwise ignored.
pub fn report() {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = engine().report(&mut out).and_then(|_| flush(&mut out)) {
        tracing::warn!(target: "prof", error = %err, "failed to write scope report");
    }
}

/// Print the calling thread's per-site totals to stdout.
///
/// Output is best effort: a failed write is logged and otherwise ignored.
pub fn summary_report() {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = engine().summary_report(&mut out).and_then(|_| flush(&mut out)) {
        tracing::warn!(target: "prof", error = %err, "failed to write summary report");
    }
}

fn flush<W: Write>(out: &mut W) -> ProfResult<()> {
    out.flush()?;
    Ok(())
}
