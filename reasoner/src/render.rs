//! Plain-text rendering of session snapshots for the terminal host.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::session::Session;
use crate::core::types::{SessionStatus, Step, StepStatus};

const SNAPSHOT_TEMPLATE: &str = include_str!("templates/snapshot.txt");

#[derive(Debug, Clone, Serialize)]
struct StepRow<'a> {
    marker: &'static str,
    title: &'a str,
    resolved_value: Option<&'a str>,
}

impl<'a> StepRow<'a> {
    fn from_step(step: &'a Step) -> Self {
        let marker = match step.status {
            StepStatus::Pending => "[ ]",
            StepStatus::Processing => "[~]",
            StepStatus::Intervention => "[?]",
            StepStatus::Complete => "[x]",
        };
        Self {
            marker,
            title: step.title(),
            resolved_value: step.resolved_value.as_deref(),
        }
    }
}

/// Template engine wrapper around minijinja.
pub struct SnapshotRenderer {
    env: Environment<'static>,
}

impl SnapshotRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("snapshot", SNAPSHOT_TEMPLATE)
            .context("load snapshot template")?;
        Ok(Self { env })
    }

    pub fn render(&self, session: &Session) -> Result<String> {
        let template = self.env.get_template("snapshot")?;
        let current = match session.status() {
            SessionStatus::Running | SessionStatus::Paused => {
                Some(&session.current_step().definition)
            }
            SessionStatus::Idle | SessionStatus::Complete => None,
        };
        let rendered = template
            .render(context! {
                status => session.status().as_str(),
                context => session.context(),
                progress => (session.progress() * 100.0).round() as u32,
                steps => session.steps().iter().map(StepRow::from_step).collect::<Vec<_>>(),
                current => current,
                staged => session.staged_alternative(),
                final_value => session.final_recommendation_value(),
            })
            .context("render snapshot")?;
        Ok(rendered)
    }
}
