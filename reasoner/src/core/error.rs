//! Typed errors returned by engine operations.

use thiserror::Error;

/// Every engine operation returns either a new session or one of these.
///
/// A failed operation never changes the session it was given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The operation is not valid for the session's current status.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    /// A `Modify` was confirmed without a matching staged alternative, or an
    /// unknown alternative was staged.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("step catalog is empty")]
    EmptyCatalog,
    #[error("invalid step catalog: {}", .0.join("; "))]
    InvalidCatalog(Vec<String>),
    /// A serialized session does not describe a reachable state.
    #[error("invalid session: {}", .0.join("; "))]
    InvalidSession(Vec<String>),
    /// The decision arrived twice or out of order.
    #[error("decision not accepted: {0}")]
    DecisionNotAccepted(String),
}
