//! Cloud resource data model
//!
//! Resources are owned by the cloud platform. rallyguard only observes them
//! and, on explicit request, deletes them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cloud service domain a resource type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Compute,
    Storage,
    Network,
    Image,
    Identity,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Compute,
        Domain::Storage,
        Domain::Network,
        Domain::Image,
        Domain::Identity,
    ];

    /// OpenStack service label used by the metrics exporter
    pub fn service_name(&self) -> &'static str {
        match self {
            Domain::Compute => "nova",
            Domain::Storage => "cinder",
            Domain::Network => "neutron",
            Domain::Image => "glance",
            Domain::Identity => "keystone",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Compute => write!(f, "compute"),
            Domain::Storage => write!(f, "storage"),
            Domain::Network => write!(f, "network"),
            Domain::Image => write!(f, "image"),
            Domain::Identity => write!(f, "identity"),
        }
    }
}

/// Kind of cloud resource
///
/// Variants are declared in purge dependency order and the derived `Ord`
/// follows that order. A later type may reference an earlier one, never the
/// reverse. New types must be inserted at their position in
/// [`ResourceType::PURGE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Server,
    Volume,
    Router,
    SecurityGroup,
    Network,
    Image,
    User,
    Project,
}

impl ResourceType {
    /// Total deletion order across all resource types
    pub const PURGE_ORDER: [ResourceType; 8] = [
        ResourceType::Server,
        ResourceType::Volume,
        ResourceType::Router,
        ResourceType::SecurityGroup,
        ResourceType::Network,
        ResourceType::Image,
        ResourceType::User,
        ResourceType::Project,
    ];

    pub fn domain(&self) -> Domain {
        match self {
            ResourceType::Server => Domain::Compute,
            ResourceType::Volume => Domain::Storage,
            ResourceType::Router | ResourceType::SecurityGroup | ResourceType::Network => {
                Domain::Network
            }
            ResourceType::Image => Domain::Image,
            ResourceType::User | ResourceType::Project => Domain::Identity,
        }
    }

    /// Plural key used in the exporter metrics file (e.g. "security_groups")
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceType::Server => "servers",
            ResourceType::Volume => "volumes",
            ResourceType::Router => "routers",
            ResourceType::SecurityGroup => "security_groups",
            ResourceType::Network => "networks",
            ResourceType::Image => "images",
            ResourceType::User => "users",
            ResourceType::Project => "projects",
        }
    }

    /// Whether listings must span all projects to see every orphan
    pub fn is_project_scoped(&self) -> bool {
        matches!(self, ResourceType::Server | ResourceType::Volume)
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Server => write!(f, "server"),
            ResourceType::Volume => write!(f, "volume"),
            ResourceType::Router => write!(f, "router"),
            ResourceType::SecurityGroup => write!(f, "security group"),
            ResourceType::Network => write!(f, "network"),
            ResourceType::Image => write!(f, "image"),
            ResourceType::User => write!(f, "user"),
            ResourceType::Project => write!(f, "project"),
        }
    }
}

/// A cloud-managed object as returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Platform-assigned identifier
    pub id: String,

    /// Display name; only used for classification
    pub name: Option<String>,

    pub resource_type: ResourceType,
}

impl Resource {
    pub fn new(
        resource_type: ResourceType,
        id: impl Into<String>,
        name: Option<impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.map(Into::into),
            resource_type,
        }
    }

    /// Shorthand for a resource that has a name
    pub fn named(resource_type: ResourceType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(resource_type, id, Some(name))
    }

    pub fn domain(&self) -> Domain {
        self.resource_type.domain()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Ownership derived from a resource name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipClass {
    /// Created by a scenario's workload steps
    ScenarioOwned,
    /// Created by shared test context setup
    ContextOwned,
    Unrelated,
}

impl OwnershipClass {
    /// Both scenario- and context-owned resources are purge targets
    pub fn is_purge_target(&self) -> bool {
        !matches!(self, OwnershipClass::Unrelated)
    }
}

impl std::fmt::Display for OwnershipClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnershipClass::ScenarioOwned => write!(f, "scenario-owned"),
            OwnershipClass::ContextOwned => write!(f, "context-owned"),
            OwnershipClass::Unrelated => write!(f, "unrelated"),
        }
    }
}

/// Result of scanning one resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInventory {
    pub resources: Vec<Resource>,

    /// False when the listing failed or timed out and `resources` is a
    /// substituted empty list
    pub ok: bool,
}

impl TypeInventory {
    pub fn ok(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            ok: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            resources: Vec::new(),
            ok: false,
        }
    }
}

/// Point-in-time view of the cloud, one entry per scanned resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub entries: BTreeMap<ResourceType, TypeInventory>,
}

impl InventorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource_type: ResourceType, inventory: TypeInventory) {
        self.entries.insert(resource_type, inventory);
    }

    pub fn get(&self, resource_type: ResourceType) -> Option<&TypeInventory> {
        self.entries.get(&resource_type)
    }

    /// Resources of one type; empty when the type was never scanned
    pub fn resources(&self, resource_type: ResourceType) -> &[Resource] {
        self.entries
            .get(&resource_type)
            .map(|inv| inv.resources.as_slice())
            .unwrap_or(&[])
    }

    /// True when every scanned type listed successfully
    pub fn is_complete(&self) -> bool {
        ResourceType::PURGE_ORDER
            .iter()
            .all(|t| self.entries.get(t).is_some_and(|inv| inv.ok))
    }

    pub fn total(&self) -> usize {
        self.entries.values().map(|inv| inv.resources.len()).sum()
    }
}
