//! Pausable reasoning-session engine.
//!
//! A session walks an ordered step catalog. Ordinary steps complete on their own
//! after a simulated thinking time; intervention points pause the session until
//! a human approves, modifies, or rejects the recommendation. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic transitions (scheduler ticks, the
//!   intervention gate, invariants, the audit log). No I/O, no clocks.
//! - **[`io`]**: Side-effecting pieces (timers, catalog and config files,
//!   audit export). Isolated so tests can substitute them.
//!
//! [`controller`] composes the two into the public session API, and [`driver`]
//! runs it as a single-consumer event loop for hosts that want timers to fire
//! on their own.

pub mod controller;
pub mod core;
pub mod driver;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
