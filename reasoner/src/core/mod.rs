//! Deterministic, pure logic of the session engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! session values and return deterministic outputs suitable for tests; time
//! enters only as an explicit argument.

pub mod audit;
pub mod error;
pub mod gate;
pub mod invariants;
pub mod scheduler;
pub mod session;
pub mod types;
