//! Testing utilities for the recast workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

pub mod harness;
pub mod rules;
pub mod text;

pub use harness::RefactorTest;
pub use rules::{
    always_fails, append_always, append_line, delete_matching, generate_once, panicking, replace,
    uppercase, Chain, Probe, ProbeCounts,
};
pub use text::{render, render_opt, text_source, text_tree, TextContent, TextKind, TextTree};

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `warn`)
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
