//! Step catalog load/save with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::EngineError;
use crate::core::invariants::validate_catalog;
use crate::core::session::Session;
use crate::core::types::{Alternative, Recommendation, StepDefinition};

pub const CATALOG_SCHEMA: &str = include_str!("../../schemas/step_catalog.schema.json");

/// Ordered step definitions plus the opaque context tag a session carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub context: String,
    pub steps: Vec<StepDefinition>,
}

impl Catalog {
    /// Build an `Idle` session over this catalog.
    pub fn into_session(self, session_id: impl Into<String>) -> Result<Session, EngineError> {
        Session::new(session_id, self.context, self.steps)
    }
}

/// Parse and validate a catalog: schema conformance, non-empty, semantic invariants.
pub fn parse_catalog(raw: &str) -> Result<Catalog> {
    let value: Value = serde_json::from_str(raw).context("parse catalog json")?;
    validate_schema(&value)?;
    let catalog: Catalog = serde_json::from_value(value).context("deserialize catalog")?;
    if catalog.steps.is_empty() {
        return Err(EngineError::EmptyCatalog.into());
    }
    let errors = validate_catalog(&catalog.steps);
    if !errors.is_empty() {
        return Err(anyhow!("catalog invariants failed:\n- {}", errors.join("\n- ")));
    }
    Ok(catalog)
}

/// Load and validate a catalog from disk.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read catalog {}", path.display()))?;
    parse_catalog(&raw).with_context(|| format!("load catalog {}", path.display()))
}

/// Write a catalog as pretty-printed JSON with trailing newline.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(catalog).context("serialize catalog")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(CATALOG_SCHEMA).context("parse catalog schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "catalog schema validation failed:\n- {}",
            messages.join("\n- ")
        ));
    }
    Ok(())
}

/// Demo pipeline written by `reasoner init`.
pub fn sample_catalog() -> Catalog {
    fn alt(id: &str, label: &str, description: &str) -> Alternative {
        Alternative {
            id: id.to_string(),
            label: label.to_string(),
            description: description.to_string(),
        }
    }

    Catalog {
        context: "signal-analysis".to_string(),
        steps: vec![
            StepDefinition {
                id: "inspect".to_string(),
                title: "Inspect input quality".to_string(),
                reasoning_text: "Scanning channels for dropouts, clipping and line noise.".to_string(),
                evidence_refs: vec!["channel-summary".to_string()],
                conclusion_text: Some("Line noise present on 3 of 8 channels.".to_string()),
                confidence: Some(88),
                is_intervention_point: false,
                recommendation: None,
            },
            StepDefinition {
                id: "filter".to_string(),
                title: "Choose preprocessing filter".to_string(),
                reasoning_text: "Line noise dominates at 50 Hz; a band-pass keeps the band of interest while removing drift.".to_string(),
                evidence_refs: vec!["spectrum".to_string(), "noise-floor".to_string()],
                conclusion_text: Some("Band-pass 0.5-40 Hz recommended.".to_string()),
                confidence: Some(74),
                is_intervention_point: true,
                recommendation: Some(Recommendation {
                    value: "bandpass-0.5-40".to_string(),
                    alternatives: vec![
                        alt("notch-50", "Notch 50 Hz", "Remove line noise only."),
                        alt("highpass-1", "High-pass 1 Hz", "Remove drift only."),
                    ],
                }),
            },
            StepDefinition {
                id: "features".to_string(),
                title: "Extract features".to_string(),
                reasoning_text: "Computing band power and variance per window.".to_string(),
                evidence_refs: Vec::new(),
                conclusion_text: None,
                confidence: None,
                is_intervention_point: false,
                recommendation: Some(Recommendation {
                    value: "band-power".to_string(),
                    alternatives: Vec::new(),
                }),
            },
            StepDefinition {
                id: "model".to_string(),
                title: "Select model".to_string(),
                reasoning_text: "Small labelled set with mixed feature scales favours an ensemble of shallow trees.".to_string(),
                evidence_refs: vec!["cv-scores".to_string()],
                conclusion_text: Some("Random forest leads cross-validation.".to_string()),
                confidence: Some(81),
                is_intervention_point: true,
                recommendation: Some(Recommendation {
                    value: "random-forest".to_string(),
                    alternatives: vec![
                        alt("svm", "SVM", "Linear kernel, scaled features."),
                        alt("gboost", "Gradient boosting", "Slower, slightly less stable."),
                    ],
                }),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_catalog_round_trips_through_disk() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("catalog.json");
        write_catalog(&path, &sample_catalog()).expect("write");
        let loaded = load_catalog(&path).expect("load");
        assert_eq!(loaded, sample_catalog());
    }

    #[test]
    fn schema_rejects_unknown_fields() {
        let raw = r#"{"steps":[{"id":"a","title":"A","colour":"red"}]}"#;
        let err = parse_catalog(raw).expect_err("expected error");
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let err = parse_catalog(r#"{"context":"x","steps":[]}"#).expect_err("expected error");
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::EmptyCatalog)
        );
    }

    #[test]
    fn invariant_violations_are_listed() {
        let raw = r#"{"steps":[
            {"id":"a","title":"A"},
            {"id":"a","title":"B","is_intervention_point":true}
        ]}"#;
        let err = parse_catalog(raw).expect_err("expected error");
        let msg = format!("{err:#}");
        assert!(msg.contains("duplicate step id 'a'"));
        assert!(msg.contains("requires a recommendation"));
    }

    #[test]
    fn minimal_step_uses_defaults() {
        let catalog = parse_catalog(r#"{"steps":[{"id":"a","title":"A"}]}"#).expect("parse");
        let step = &catalog.steps[0];
        assert!(!step.is_intervention_point);
        assert!(step.reasoning_text.is_empty());
        assert_eq!(catalog.context, "");
    }
}
