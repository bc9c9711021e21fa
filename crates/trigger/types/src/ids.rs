//! Composite identifiers for data factories and their triggers
//!
//! Remote objects are addressed by ARM-style paths. Both identifiers render to
//! and parse from that path form without losing information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";
const PROVIDER_NAMESPACE: &str = "Microsoft.DataFactory";
const FACTORIES: &str = "factories";
const TRIGGERS: &str = "triggers";

/// Errors raised while parsing or resolving an identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityParseError {
    #[error("identifier must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    #[error("expected segment {expected:?} at position {position} in {input:?}")]
    UnexpectedSegment {
        input: String,
        position: usize,
        expected: &'static str,
    },

    #[error("segment {segment:?} has an empty value in {input:?}")]
    EmptyValue { input: String, segment: &'static str },

    #[error("identifier has {actual} segments, expected {expected}: {input:?}")]
    SegmentCount {
        input: String,
        expected: usize,
        actual: usize,
    },

    #[error("one of `data_factory_id` or `data_factory_name` must be set")]
    MissingSelector,

    #[error("`{0}` must not be empty")]
    EmptyComponent(&'static str),
}

/// Identifier of a data factory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FactoryId {
    pub subscription_id: String,
    pub resource_group: String,
    pub factory_name: String,
}

impl FactoryId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        factory_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            factory_name: factory_name.into(),
        }
    }

    /// Identity of a trigger living in this factory
    pub fn trigger(&self, trigger_name: impl Into<String>) -> TriggerIdentity {
        TriggerIdentity::from_factory_id(self, trigger_name)
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{SUBSCRIPTIONS}/{}/{RESOURCE_GROUPS}/{}/{PROVIDERS}/{PROVIDER_NAMESPACE}/{FACTORIES}/{}",
            self.subscription_id, self.resource_group, self.factory_name
        )
    }
}

impl FromStr for FactoryId {
    type Err = IdentityParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let values = parse_segments(input, &FACTORY_LAYOUT)?;
        Ok(Self {
            subscription_id: values[0].to_string(),
            resource_group: values[1].to_string(),
            factory_name: values[2].to_string(),
        })
    }
}

impl TryFrom<String> for FactoryId {
    type Error = IdentityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FactoryId> for String {
    fn from(id: FactoryId) -> Self {
        id.to_string()
    }
}

/// Fully resolved address of a schedule trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerIdentity {
    pub subscription_id: String,
    pub resource_group: String,
    pub factory_name: String,
    pub trigger_name: String,
}

impl TriggerIdentity {
    /// Build an identity from its four components (factory-name selector path)
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        factory_name: impl Into<String>,
        trigger_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            factory_name: factory_name.into(),
            trigger_name: trigger_name.into(),
        }
    }

    /// Build an identity below a parsed factory identifier
    pub fn from_factory_id(factory: &FactoryId, trigger_name: impl Into<String>) -> Self {
        Self::new(
            factory.subscription_id.clone(),
            factory.resource_group.clone(),
            factory.factory_name.clone(),
            trigger_name,
        )
    }

    /// Identifier of the owning factory
    pub fn factory_id(&self) -> FactoryId {
        FactoryId::new(
            self.subscription_id.clone(),
            self.resource_group.clone(),
            self.factory_name.clone(),
        )
    }

    /// Canonical remote path of this trigger
    pub fn address_path(&self) -> String {
        self.to_string()
    }

    /// Equality that tolerates the remote API lower-casing the resource group
    pub fn same_resource_group(&self, other: &TriggerIdentity) -> bool {
        self.resource_group.eq_ignore_ascii_case(&other.resource_group)
    }

    /// True when every component except the resource group case matches
    pub fn matches_ignoring_group_case(&self, other: &TriggerIdentity) -> bool {
        self.subscription_id == other.subscription_id
            && self.same_resource_group(other)
            && self.factory_name == other.factory_name
            && self.trigger_name == other.trigger_name
    }

    /// Reject identities with blank components
    pub fn ensure_complete(&self) -> Result<(), IdentityParseError> {
        let components = [
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("factory_name", &self.factory_name),
            ("trigger_name", &self.trigger_name),
        ];
        for (name, value) in components {
            if value.trim().is_empty() {
                return Err(IdentityParseError::EmptyComponent(name));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TriggerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{TRIGGERS}/{}", self.factory_id(), self.trigger_name)
    }
}

impl FromStr for TriggerIdentity {
    type Err = IdentityParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let values = parse_segments(input, &TRIGGER_LAYOUT)?;
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

/// How a trigger's owning factory was named in the declarative input
///
/// The factory can be given either by name inside a resource group or by a
/// full factory identifier. The two forms are resolved once, at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum FactorySelector {
    Name {
        resource_group: String,
        factory_name: String,
    },
    Id {
        factory_id: FactoryId,
    },
}

impl FactorySelector {
    /// Collapse the two deprecated optional fields into a selector
    ///
    /// The explicit factory identifier wins when both are populated.
    pub fn from_legacy_fields(
        resource_group: Option<&str>,
        factory_name: Option<&str>,
        factory_id: Option<&str>,
    ) -> Result<Self, IdentityParseError> {
        if let Some(id) = factory_id.filter(|v| !v.is_empty()) {
            return Ok(Self::Id {
                factory_id: id.parse()?,
            });
        }

        match (resource_group, factory_name) {
            (Some(group), Some(name)) if !group.is_empty() && !name.is_empty() => Ok(Self::Name {
                resource_group: group.to_string(),
                factory_name: name.to_string(),
            }),
            _ => Err(IdentityParseError::MissingSelector),
        }
    }

    /// Produce the canonical identity of `trigger_name` under this selector
    pub fn resolve(&self, subscription_id: &str, trigger_name: &str) -> TriggerIdentity {
        match self {
            Self::Name {
                resource_group,
                factory_name,
            } => TriggerIdentity::new(subscription_id, resource_group, factory_name, trigger_name),
            Self::Id { factory_id } => factory_id.trigger(trigger_name),
        }
    }
}

const FACTORY_LAYOUT: [&str; 4] = [SUBSCRIPTIONS, RESOURCE_GROUPS, PROVIDERS, FACTORIES];
const TRIGGER_LAYOUT: [&str; 5] = [SUBSCRIPTIONS, RESOURCE_GROUPS, PROVIDERS, FACTORIES, TRIGGERS];

/// Walk `/key/value/...` pairs and return the values of every key except
/// `providers`, whose value must be the data factory namespace.
fn parse_segments<'a>(
    input: &'a str,
    layout: &[&'static str],
) -> Result<Vec<&'a str>, IdentityParseError> {
    let rest = input
        .strip_prefix('/')
        .ok_or_else(|| IdentityParseError::MissingLeadingSlash(input.to_string()))?;

    let segments: Vec<&str> = rest.split('/').collect();
    let expected = layout.len() * 2;
    if segments.len() != expected {
        return Err(IdentityParseError::SegmentCount {
            input: input.to_string(),
            expected,
            actual: segments.len(),
        });
    }

    let mut values = Vec::with_capacity(layout.len() - 1);
    for (index, &key) in layout.iter().enumerate() {
        let position = index * 2;
        if segments[position] != key {
            return Err(IdentityParseError::UnexpectedSegment {
                input: input.to_string(),
                position,
                expected: key,
            });
        }

        let value = segments[position + 1];
        if value.is_empty() {
            return Err(IdentityParseError::EmptyValue {
                input: input.to_string(),
                segment: key,
            });
        }

        if key == PROVIDERS {
            if value != PROVIDER_NAMESPACE {
                return Err(IdentityParseError::UnexpectedSegment {
                    input: input.to_string(),
                    position: position + 1,
                    expected: PROVIDER_NAMESPACE,
                });
            }
            continue;
        }

        values.push(value);
    }

    Ok(values)
}
