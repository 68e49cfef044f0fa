use async_trait::async_trait;
use rallyguard_cloud::{CloudError, CloudProvider, Resource, ResourceType, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Provider calls as observed by the fake, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(ResourceType, bool),
    Delete(ResourceType, String),
    RouterSubnets(String),
    DetachSubnet(String, String),
    ClearGateway(String),
}

/// In-memory cloud that records every call
#[derive(Default)]
pub struct FakeCloud {
    inventory: Mutex<Vec<Resource>>,
    calls: Mutex<Vec<Call>>,
    failing_lists: HashSet<ResourceType>,
    slow_lists: HashSet<ResourceType>,
    failing_deletes: HashSet<String>,
    slow_deletes: HashSet<String>,
    failing_teardown: HashSet<String>,
    failing_gateways: HashSet<String>,
    router_subnets: HashMap<String, Vec<String>>,
}

#[allow(dead_code)]
impl FakeCloud {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            inventory: Mutex::new(resources),
            ..Default::default()
        }
    }

    pub fn fail_list(mut self, resource_type: ResourceType) -> Self {
        self.failing_lists.insert(resource_type);
        self
    }

    pub fn slow_list(mut self, resource_type: ResourceType) -> Self {
        self.slow_lists.insert(resource_type);
        self
    }

    pub fn fail_delete(mut self, id: &str) -> Self {
        self.failing_deletes.insert(id.to_string());
        self
    }

    pub fn slow_delete(mut self, id: &str) -> Self {
        self.slow_deletes.insert(id.to_string());
        self
    }

    /// Make every teardown sub-step of a router fail
    pub fn fail_teardown(mut self, router_id: &str) -> Self {
        self.failing_teardown.insert(router_id.to_string());
        self
    }

    pub fn fail_gateway(mut self, router_id: &str) -> Self {
        self.failing_gateways.insert(router_id.to_string());
        self
    }

    pub fn with_router_subnets(mut self, router_id: &str, subnets: &[&str]) -> Self {
        self.router_subnets.insert(
            router_id.to_string(),
            subnets.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Delete(..)))
            .collect()
    }

    pub fn remaining(&self) -> Vec<Resource> {
        self.inventory.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn teardown_result(&self, router_id: &str) -> Result<()> {
        if self.failing_teardown.contains(router_id) {
            Err(CloudError::Api(format!("router {} is busy", router_id)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CloudProvider for FakeCloud {
    fn name(&self) -> &str {
        "fake"
    }

    async fn list(&self, resource_type: ResourceType, all_projects: bool) -> Result<Vec<Resource>> {
        self.record(Call::List(resource_type, all_projects));
        if self.slow_lists.contains(&resource_type) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing_lists.contains(&resource_type) {
            return Err(CloudError::Api("service unavailable".to_string()));
        }
        Ok(self
            .inventory
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .cloned()
            .collect())
    }

    async fn delete(&self, resource_type: ResourceType, id: &str) -> Result<()> {
        self.record(Call::Delete(resource_type, id.to_string()));
        if self.slow_deletes.contains(id) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing_deletes.contains(id) {
            return Err(CloudError::CommandFailed(format!("cannot delete {}", id)));
        }
        self.inventory
            .lock()
            .unwrap()
            .retain(|r| !(r.resource_type == resource_type && r.id == id));
        Ok(())
    }

    async fn router_subnets(&self, router_id: &str) -> Result<Vec<String>> {
        self.record(Call::RouterSubnets(router_id.to_string()));
        self.teardown_result(router_id)?;
        Ok(self
            .router_subnets
            .get(router_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn detach_subnet(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        self.record(Call::DetachSubnet(
            router_id.to_string(),
            subnet_id.to_string(),
        ));
        self.teardown_result(router_id)
    }

    async fn clear_gateway(&self, router_id: &str) -> Result<()> {
        self.record(Call::ClearGateway(router_id.to_string()));
        if self.failing_gateways.contains(router_id) {
            return Err(CloudError::Api(format!("router {} gateway in use", router_id)));
        }
        self.teardown_result(router_id)
    }
}
