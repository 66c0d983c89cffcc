//! Engine configuration stored as TOML (default `reasoner.toml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::scheduler::Pacing;

/// Engine configuration (TOML).
///
/// Meant to be edited by humans. Missing fields default to the pacing the
/// wizard ships with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Thinking time per character of reasoning text, in milliseconds.
    pub ms_per_char: u64,

    /// Cap on a single step's thinking time, in milliseconds.
    pub max_thinking_ms: u64,

    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuditConfig {
    /// Where to export the audit log when a session ends. Unset disables export.
    pub export_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let pacing = Pacing::default();
        Self {
            ms_per_char: pacing.ms_per_char,
            max_thinking_ms: pacing.max_thinking_ms,
            audit: AuditConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ms_per_char == 0 {
            return Err(anyhow!("ms_per_char must be > 0"));
        }
        if self.max_thinking_ms == 0 {
            return Err(anyhow!("max_thinking_ms must be > 0"));
        }
        if let Some(path) = &self.audit.export_path {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("audit.export_path must be non-empty when set"));
            }
        }
        Ok(())
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            ms_per_char: self.ms_per_char,
            max_thinking_ms: self.max_thinking_ms,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EngineConfig::default()`.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        let cfg = EngineConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EngineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &EngineConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
