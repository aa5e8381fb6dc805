// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Fetch,
    Parse,
    Normalize,
    Persist,
    Analyze,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildEvent {
    pub stage: BuildStage,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Structured event log for one pipeline step. Events are kept in order
/// and attached to the step's result so callers and tests can assert on
/// what actually happened.
#[derive(Debug, Default, Clone)]
pub struct BuildLog {
    events: Vec<BuildEvent>,
}

impl BuildLog {
    pub fn emit(
        &mut self,
        stage: BuildStage,
        name: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) {
        let event = BuildEvent {
            stage,
            name: name.into(),
            fields,
        };
        tracing::debug!(name = %event.name, "build event");
        self.events.push(event);
    }

    pub fn emit_count(&mut self, stage: BuildStage, name: impl Into<String>, count: u64) {
        let mut fields = BTreeMap::new();
        fields.insert("count".to_string(), count.to_string());
        self.emit(stage, name, fields);
    }

    #[must_use]
    pub fn events(&self) -> &[BuildEvent] {
        &self.events
    }
}
