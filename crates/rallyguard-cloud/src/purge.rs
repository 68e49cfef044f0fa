//! Dependency-ordered purge planning and execution
//!
//! Deletion is fire-and-forget: a resource counts as deleted once the
//! platform accepts the delete request. Asynchronous platform teardown is not
//! polled, so a deleted resource may still appear on the next scan.

use crate::classify::Classifier;
use crate::provider::CloudProvider;
use crate::resource::{InventorySnapshot, OwnershipClass, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};

/// Purge invocation mode; dry-run unless confirmation is explicit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeMode {
    #[default]
    DryRun,
    Confirm,
}

impl std::fmt::Display for PurgeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurgeMode::DryRun => write!(f, "dry-run"),
            PurgeMode::Confirm => write!(f, "confirm"),
        }
    }
}

/// States of a single purge invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgePhase {
    Idle,
    Scanning,
    Classifying,
    DryRunReporting,
    Deleting,
    Reconciling,
}

impl std::fmt::Display for PurgePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurgePhase::Idle => write!(f, "idle"),
            PurgePhase::Scanning => write!(f, "scanning"),
            PurgePhase::Classifying => write!(f, "classifying"),
            PurgePhase::DryRunReporting => write!(f, "dry-run-reporting"),
            PurgePhase::Deleting => write!(f, "deleting"),
            PurgePhase::Reconciling => write!(f, "reconciling"),
        }
    }
}

/// A resource selected for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeTarget {
    pub resource_type: ResourceType,
    pub id: String,
    pub name: String,
    pub class: OwnershipClass,
}

/// All targets of one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeBatch {
    pub resource_type: ResourceType,
    pub targets: Vec<PurgeTarget>,
}

/// Deletion batches in [`ResourceType::PURGE_ORDER`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgePlan {
    pub batches: Vec<PurgeBatch>,
}

impl PurgePlan {
    /// Select scenario- and context-owned resources from a snapshot
    pub fn build(snapshot: &InventorySnapshot, classifier: &Classifier) -> Self {
        let batches = ResourceType::PURGE_ORDER
            .iter()
            .map(|resource_type| {
                let targets = snapshot
                    .resources(*resource_type)
                    .iter()
                    .filter_map(|resource| {
                        let class = classifier.classify(resource);
                        class.is_purge_target().then(|| PurgeTarget {
                            resource_type: *resource_type,
                            id: resource.id.clone(),
                            name: resource.display_name().to_string(),
                            class,
                        })
                    })
                    .collect();
                PurgeBatch {
                    resource_type: *resource_type,
                    targets,
                }
            })
            .collect();

        Self { batches }
    }

    pub fn total(&self) -> usize {
        self.batches.iter().map(|b| b.targets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn targets(&self) -> impl Iterator<Item = &PurgeTarget> {
        self.batches.iter().flat_map(|b| b.targets.iter())
    }
}

/// Step of the purge that a failure belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeStep {
    ListInterfaces,
    DetachSubnet(String),
    ClearGateway,
    Delete,
}

impl std::fmt::Display for PurgeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PurgeStep::ListInterfaces => write!(f, "list interfaces"),
            PurgeStep::DetachSubnet(subnet) => write!(f, "detach subnet {}", subnet),
            PurgeStep::ClearGateway => write!(f, "clear gateway"),
            PurgeStep::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeFailure {
    pub resource_type: ResourceType,
    pub id: String,
    pub name: String,
    pub step: PurgeStep,
    pub error: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOutcome {
    pub found: usize,
    pub deleted: usize,
}

/// Result of one purge run
///
/// A gap between `found` and `deleted` in confirm mode means some requests
/// failed; `failures` carries the details that were also logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    pub mode: PurgeMode,
    pub found: usize,
    pub deleted: usize,
    pub per_type: BTreeMap<ResourceType, TypeOutcome>,
    pub targets: Vec<PurgeTarget>,
    pub failures: Vec<PurgeFailure>,

    /// Routers for which every teardown sub-step and the delete failed
    pub stuck_routers: Vec<String>,

    pub duration_ms: u64,
}

impl PurgeOutcome {
    pub fn new(mode: PurgeMode) -> Self {
        Self {
            mode,
            found: 0,
            deleted: 0,
            per_type: ResourceType::PURGE_ORDER
                .iter()
                .map(|t| (*t, TypeOutcome::default()))
                .collect(),
            targets: Vec::new(),
            failures: Vec::new(),
            stuck_routers: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether any delete request was sent to the platform
    pub fn issued_deletes(&self) -> bool {
        self.mode == PurgeMode::Confirm && self.found > 0
    }

    fn add_found(&mut self, target: &PurgeTarget) {
        self.found += 1;
        self.per_type.entry(target.resource_type).or_default().found += 1;
        self.targets.push(target.clone());
    }

    fn add_deleted(&mut self, target: &PurgeTarget) {
        self.deleted += 1;
        self.per_type.entry(target.resource_type).or_default().deleted += 1;
    }

    fn add_failure(&mut self, target: &PurgeTarget, step: PurgeStep, error: String) {
        tracing::warn!(
            resource_type = %target.resource_type,
            id = %target.id,
            name = %target.name,
            step = %step,
            error = %error,
            "Purge step failed, continuing"
        );
        self.failures.push(PurgeFailure {
            resource_type: target.resource_type,
            id: target.id.clone(),
            name: target.name.clone(),
            step,
            error,
        });
    }
}

/// Issues the deletions of a [`PurgePlan`], batch by batch
///
/// Batches run strictly in plan order and every call is awaited before the
/// next one starts. No failure aborts the run.
pub struct PurgeExecutor<'a> {
    provider: &'a dyn CloudProvider,
    call_timeout: Duration,
}

impl<'a> PurgeExecutor<'a> {
    pub fn new(provider: &'a dyn CloudProvider, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    pub async fn execute(&self, plan: &PurgePlan, mode: PurgeMode) -> PurgeOutcome {
        let start = Instant::now();
        let mut outcome = PurgeOutcome::new(mode);

        for batch in &plan.batches {
            if batch.targets.is_empty() {
                continue;
            }
            tracing::info!(
                resource_type = %batch.resource_type,
                count = batch.targets.len(),
                %mode,
                "Processing purge batch"
            );

            for target in &batch.targets {
                outcome.add_found(target);
                if mode == PurgeMode::DryRun {
                    continue;
                }

                let teardown_failed = if target.resource_type == ResourceType::Router {
                    self.teardown_router(target, &mut outcome).await
                } else {
                    false
                };

                let delete = self.provider.delete(target.resource_type, &target.id);
                match self.call(delete).await {
                    Ok(()) => {
                        tracing::info!(
                            resource_type = %target.resource_type,
                            id = %target.id,
                            name = %target.name,
                            "Delete request accepted"
                        );
                        outcome.add_deleted(target);
                    }
                    Err(e) => {
                        outcome.add_failure(target, PurgeStep::Delete, e);
                        if teardown_failed {
                            tracing::warn!(
                                id = %target.id,
                                name = %target.name,
                                "Every router purge step failed"
                            );
                            outcome.stuck_routers.push(target.id.clone());
                        }
                    }
                }
            }
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        outcome
    }

    /// Detach every subnet interface and clear the gateway
    ///
    /// All sub-steps are attempted regardless of earlier failures. Returns
    /// whether every attempted sub-step failed.
    async fn teardown_router(&self, target: &PurgeTarget, outcome: &mut PurgeOutcome) -> bool {
        let mut attempted = 1usize;
        let mut failed = 0usize;

        let subnets = match self.call(self.provider.router_subnets(&target.id)).await {
            Ok(subnets) => subnets,
            Err(e) => {
                failed += 1;
                outcome.add_failure(target, PurgeStep::ListInterfaces, e);
                Vec::new()
            }
        };

        for subnet in subnets {
            attempted += 1;
            let detach = self.provider.detach_subnet(&target.id, &subnet);
            if let Err(e) = self.call(detach).await {
                failed += 1;
                outcome.add_failure(target, PurgeStep::DetachSubnet(subnet), e);
            }
        }

        attempted += 1;
        if let Err(e) = self.call(self.provider.clear_gateway(&target.id)).await {
            failed += 1;
            outcome.add_failure(target, PurgeStep::ClearGateway, e);
        }

        failed == attempted
    }

    /// Await a provider call under the per-call timeout
    async fn call<T>(
        &self,
        fut: impl Future<Output = crate::Result<T>>,
    ) -> std::result::Result<T, String> {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "timed out after {}s",
                self.call_timeout.as_secs()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resource, TypeInventory};

    fn snapshot(resources: Vec<Resource>) -> InventorySnapshot {
        let mut snapshot = InventorySnapshot::new();
        for t in ResourceType::PURGE_ORDER {
            let of_type = resources
                .iter()
                .filter(|r| r.resource_type == t)
                .cloned()
                .collect();
            snapshot.insert(t, TypeInventory::ok(of_type));
        }
        snapshot
    }

    #[test]
    fn test_plan_follows_dependency_order() {
        let resources = ResourceType::PURGE_ORDER
            .iter()
            .rev()
            .map(|t| Resource::named(*t, format!("{}-1", t.plural()), "s_rally_x"))
            .collect();

        let plan = PurgePlan::build(&snapshot(resources), &Classifier::default());

        let order: Vec<_> = plan.batches.iter().map(|b| b.resource_type).collect();
        assert_eq!(order, ResourceType::PURGE_ORDER.to_vec());
        assert!(plan.batches.iter().all(|b| b.targets.len() == 1));
    }

    #[test]
    fn test_plan_includes_scenario_and_context_only() {
        let plan = PurgePlan::build(
            &snapshot(vec![
                Resource::named(ResourceType::Server, "a", "s_rally_a"),
                Resource::named(ResourceType::Server, "b", "c_rally_b"),
                Resource::named(ResourceType::Server, "c", "web"),
                Resource::new(ResourceType::Server, "d", None::<String>),
            ]),
            &Classifier::default(),
        );

        let ids: Vec<_> = plan.targets().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(plan.total(), 2);
    }

    #[test]
    fn test_empty_plan() {
        let plan = PurgePlan::build(&snapshot(Vec::new()), &Classifier::default());
        assert!(plan.is_empty());
        assert_eq!(plan.batches.len(), ResourceType::PURGE_ORDER.len());
    }

    #[test]
    fn test_default_mode_is_dry_run() {
        assert_eq!(PurgeMode::default(), PurgeMode::DryRun);
    }

    #[test]
    fn test_failure_serialization() {
        let failure = PurgeFailure {
            resource_type: ResourceType::Router,
            id: "r-1".to_string(),
            name: "s_rally_r".to_string(),
            step: PurgeStep::DetachSubnet("sub-1".to_string()),
            error: "conflict".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["step"]["detach_subnet"], "sub-1");

        let delete = serde_json::to_value(PurgeStep::Delete).unwrap();
        assert_eq!(delete, "delete");
    }
}
