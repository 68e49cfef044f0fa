//! Cloud provider trait definition

use crate::error::Result;
use crate::resource::{Resource, ResourceType};
use async_trait::async_trait;

/// Capabilities the reconciliation core consumes from a cloud backend
///
/// Listing calls must be read-only. Deletion and router teardown calls
/// report only whether the platform accepted the request.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "openstack")
    fn name(&self) -> &str;

    /// List every resource of a type. `all_projects` widens project-scoped
    /// listings beyond the caller's own project.
    async fn list(&self, resource_type: ResourceType, all_projects: bool) -> Result<Vec<Resource>>;

    /// Request deletion of a single resource
    async fn delete(&self, resource_type: ResourceType, id: &str) -> Result<()>;

    /// Subnet IDs attached to a router through interfaces
    async fn router_subnets(&self, router_id: &str) -> Result<Vec<String>>;

    /// Detach a subnet interface from a router
    async fn detach_subnet(&self, router_id: &str, subnet_id: &str) -> Result<()>;

    /// Clear the router's external gateway
    async fn clear_gateway(&self, router_id: &str) -> Result<()>;
}
