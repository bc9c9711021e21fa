//! Declarative description of a schedule trigger

use crate::ids::FactorySelector;
use crate::recurrence::Recurrence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pipeline fired by the trigger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTarget {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl PipelineTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Desired state of one schedule trigger
///
/// Immutable input to a single reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredTrigger {
    pub name: String,
    pub factory: FactorySelector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub pipeline: PipelineTarget,
    #[serde(default)]
    pub annotations: Vec<String>,
    #[serde(default)]
    pub activated: bool,
}

impl DesiredTrigger {
    pub fn new(
        name: impl Into<String>,
        factory: FactorySelector,
        pipeline: PipelineTarget,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            description: None,
            recurrence: Recurrence::default(),
            pipeline,
            annotations: Vec::new(),
            activated: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = recurrence;
        self
    }

    pub fn with_annotations<I, S>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.annotations = annotations.into_iter().map(Into::into).collect();
        self
    }

    pub fn activated(mut self, activated: bool) -> Self {
        self.activated = activated;
        self
    }
}
