//! Nested Scope Profiling
//!
//! This crate measures how long nested, named regions of code take and
//! rebuilds the call hierarchy they ran in:
//! - RAII scope guards that record into a per-thread or explicit [`Engine`]
//! - A tree report of every recorded scope with its arguments and duration
//! - A summary of total time per site, with recursive calls counted once
//!
//! # Feature Flags
//!
//! - `profiling` (default): `prof_enter!` records scopes. Without it every
//!   marker expands to nothing and its arguments are never evaluated.
//!
//! # Threads
//!
//! `prof_enter!` records into a per-thread engine that lives until the
//! process exits (see [`engine()`]). Markers are meant for long-lived threads;
//! a program that spawns many short-lived threads should record into an
//! explicit [`Engine`] instead.
//!
//! # Example
//!
//! ```rust
//! use prof::prof_enter;
//!
//! fn work(n: u32) {
//!     prof_enter!(work, n);
//!     if n > 0 {
//!         work(n - 1);
//!     }
//! }
//!
//! {
//!     prof_enter!(main);
//!     work(3);
//! }
//!
//! prof::report();
//! prof::summary_report();
//! ```

mod clock;
mod context;
mod engine;
mod error;
mod global;
mod report;

pub use clock::*;
pub use context::*;
pub use engine::*;
pub use error::*;
pub use global::*;
pub use report::*;

/// Re-export for convenience
pub use std::time::Duration;

/// Open a scope on the calling thread's engine until the end of the block.
///
/// The first argument names the scope, either as a bare identifier or a
/// string literal. Any further arguments are captured through their
/// `Display` implementation and shown in the tree report.
///
/// # Example
///
/// ```rust
/// use prof::prof_enter;
///
/// fn load(path: &str, retries: u8) {
///     prof_enter!(load, path, retries);
///     // ... loading ...
/// } // Scope closes here
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! prof_enter {
    ($name:ident $(, $arg:expr)* $(,)?) => {
        let _prof_guard = $crate::enter(
            $crate::Site::new(::core::stringify!($name), ::core::file!(), ::core::line!()),
            ::std::vec![$(::std::string::ToString::to_string(&$arg)),*],
        );
    };
    ($name:literal $(, $arg:expr)* $(,)?) => {
        let _prof_guard = $crate::enter(
            $crate::Site::new($name, ::core::file!(), ::core::line!()),
            ::std::vec![$(::std::string::ToString::to_string(&$arg)),*],
        );
    };
}

/// Open a scope (compiled out: the `profiling` feature is disabled).
#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! prof_enter {
    ($($tokens:tt)*) => {};
}
