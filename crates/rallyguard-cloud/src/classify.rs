//! Ownership classification by name prefix

use crate::error::{CloudError, Result};
use crate::resource::{OwnershipClass, Resource};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCENARIO_PREFIX: &str = "s_rally_";
pub const DEFAULT_CONTEXT_PREFIX: &str = "c_rally_";

/// The two naming prefixes that mark test-tool resources
///
/// Constructed through [`OwnershipPrefixes::new`], which guarantees both
/// prefixes are non-empty and that no name can match both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipPrefixes {
    scenario: String,
    context: String,
}

impl OwnershipPrefixes {
    pub fn new(scenario: impl Into<String>, context: impl Into<String>) -> Result<Self> {
        let scenario = scenario.into();
        let context = context.into();

        if scenario.is_empty() || context.is_empty() {
            return Err(CloudError::InvalidConfig(
                "ownership prefixes must not be empty".to_string(),
            ));
        }

        if scenario.starts_with(&context) || context.starts_with(&scenario) {
            return Err(CloudError::InvalidConfig(format!(
                "ownership prefixes overlap: scenario '{}', context '{}'",
                scenario, context
            )));
        }

        Ok(Self { scenario, context })
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

impl Default for OwnershipPrefixes {
    fn default() -> Self {
        Self {
            scenario: DEFAULT_SCENARIO_PREFIX.to_string(),
            context: DEFAULT_CONTEXT_PREFIX.to_string(),
        }
    }
}

/// Pure, total classifier from resource name to [`OwnershipClass`]
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    prefixes: OwnershipPrefixes,
}

impl Classifier {
    pub fn new(prefixes: OwnershipPrefixes) -> Self {
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &OwnershipPrefixes {
        &self.prefixes
    }

    pub fn classify(&self, resource: &Resource) -> OwnershipClass {
        self.classify_name(resource.name.as_deref())
    }

    /// Case-sensitive prefix match anchored at the start of the name
    pub fn classify_name(&self, name: Option<&str>) -> OwnershipClass {
        match name {
            Some(n) if n.starts_with(&self.prefixes.scenario) => OwnershipClass::ScenarioOwned,
            Some(n) if n.starts_with(&self.prefixes.context) => OwnershipClass::ContextOwned,
            _ => OwnershipClass::Unrelated,
        }
    }
}
