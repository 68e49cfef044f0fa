//! OpenStack provider implementation

use crate::cli::{DEFAULT_BINARY, OpenStackCli};
use async_trait::async_trait;
use rallyguard_cloud::{CloudProvider, Resource, ResourceType};

/// CLI noun for a resource type
fn command_noun(resource_type: ResourceType) -> &'static [&'static str] {
    match resource_type {
        ResourceType::Server => &["server"],
        ResourceType::Volume => &["volume"],
        ResourceType::Router => &["router"],
        ResourceType::SecurityGroup => &["security", "group"],
        ResourceType::Network => &["network"],
        ResourceType::Image => &["image"],
        ResourceType::User => &["user"],
        ResourceType::Project => &["project"],
    }
}

/// OpenStack provider backed by the `openstack` CLI
pub struct OpenStackProvider {
    cli: OpenStackCli,
}

impl OpenStackProvider {
    pub fn new(cloud: Option<String>) -> Self {
        Self::with_binary(DEFAULT_BINARY, cloud)
    }

    pub fn with_binary(binary: impl Into<String>, cloud: Option<String>) -> Self {
        Self {
            cli: OpenStackCli::new(binary, cloud),
        }
    }
}

#[async_trait]
impl CloudProvider for OpenStackProvider {
    fn name(&self) -> &str {
        "openstack"
    }

    async fn list(
        &self,
        resource_type: ResourceType,
        all_projects: bool,
    ) -> rallyguard_cloud::Result<Vec<Resource>> {
        let rows = self
            .cli
            .list(command_noun(resource_type), all_projects)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Resource::new(resource_type, row.id, row.name))
            .collect())
    }

    async fn delete(&self, resource_type: ResourceType, id: &str) -> rallyguard_cloud::Result<()> {
        tracing::info!("Deleting {} {}", resource_type, id);
        self.cli.delete(command_noun(resource_type), id).await?;
        Ok(())
    }

    async fn router_subnets(&self, router_id: &str) -> rallyguard_cloud::Result<Vec<String>> {
        let router = self.cli.show_router(router_id).await?;
        Ok(router.subnet_ids()?)
    }

    async fn detach_subnet(&self, router_id: &str, subnet_id: &str) -> rallyguard_cloud::Result<()> {
        tracing::info!("Removing subnet {} from router {}", subnet_id, router_id);
        self.cli.remove_router_subnet(router_id, subnet_id).await?;
        Ok(())
    }

    async fn clear_gateway(&self, router_id: &str) -> rallyguard_cloud::Result<()> {
        tracing::info!("Clearing external gateway of router {}", router_id);
        self.cli.unset_router_gateway(router_id).await?;
        Ok(())
    }
}
