//! Audit log export for display or archival.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::core::audit::AuditLog;
use crate::core::session::Session;
use crate::core::types::SessionStatus;

/// Serialized export: which session, how it ended, and every resolved decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuditExport<'a> {
    pub session_id: &'a str,
    pub context: &'a str,
    pub status: SessionStatus,
    pub final_recommendation_value: Option<&'a str>,
    pub exported_at: DateTime<Utc>,
    pub interventions: &'a AuditLog,
}

impl<'a> AuditExport<'a> {
    pub fn from_session(session: &'a Session, exported_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id(),
            context: session.context(),
            status: session.status(),
            final_recommendation_value: session.final_recommendation_value(),
            exported_at,
            interventions: session.interventions(),
        }
    }
}

/// Atomically write the session's audit trail as pretty JSON.
pub fn export_audit(path: &Path, session: &Session) -> Result<()> {
    debug!(
        path = %path.display(),
        session_id = session.id(),
        records = session.interventions().len(),
        "exporting audit log"
    );
    let export = AuditExport::from_session(session, Utc::now());
    let mut buf = serde_json::to_string_pretty(&export).context("serialize audit log")?;
    buf.push('\n');
    super::write_atomic(path, &buf).with_context(|| format!("export audit {}", path.display()))
}
