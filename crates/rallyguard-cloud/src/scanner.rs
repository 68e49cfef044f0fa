//! Inventory scanner
//!
//! Lists resources through a [`CloudProvider`]. A failed or timed-out
//! listing is substituted with an empty list so a broken scan can never
//! drive a purge, and is flagged with `ok = false` so it stays
//! distinguishable from "nothing found".

use crate::provider::CloudProvider;
use crate::resource::{InventorySnapshot, ResourceType, TypeInventory};
use std::time::Duration;

pub struct Scanner<'a> {
    provider: &'a dyn CloudProvider,
    call_timeout: Duration,
}

impl<'a> Scanner<'a> {
    pub fn new(provider: &'a dyn CloudProvider, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// Scan one resource type
    pub async fn scan(&self, resource_type: ResourceType) -> TypeInventory {
        let all_projects = resource_type.is_project_scoped();
        let call = self.provider.list(resource_type, all_projects);

        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(resources)) => {
                tracing::debug!(
                    provider = self.provider.name(),
                    %resource_type,
                    count = resources.len(),
                    "Listed resources"
                );
                TypeInventory::ok(resources)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    %resource_type,
                    error = %e,
                    "Listing failed, treating as empty"
                );
                TypeInventory::failed()
            }
            Err(_) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    %resource_type,
                    timeout_secs = self.call_timeout.as_secs(),
                    "Listing timed out, treating as empty"
                );
                TypeInventory::failed()
            }
        }
    }

    /// Scan every resource type, one call at a time
    pub async fn scan_all(&self) -> InventorySnapshot {
        let mut snapshot = InventorySnapshot::new();
        for resource_type in ResourceType::PURGE_ORDER {
            let inventory = self.scan(resource_type).await;
            snapshot.insert(resource_type, inventory);
        }
        tracing::info!(
            total = snapshot.total(),
            complete = snapshot.is_complete(),
            "Inventory scan finished"
        );
        snapshot
    }
}
