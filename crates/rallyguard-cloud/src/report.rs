//! Reconciliation report and aggregation

use crate::classify::Classifier;
use crate::resource::{Domain, InventorySnapshot, OwnershipClass, ResourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REPORT_VERSION: u32 = 1;

/// Resource counts per ownership class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub scenario_owned: usize,
    pub context_owned: usize,
    pub unrelated: usize,
}

impl ClassCounts {
    pub fn record(&mut self, class: OwnershipClass) {
        match class {
            OwnershipClass::ScenarioOwned => self.scenario_owned += 1,
            OwnershipClass::ContextOwned => self.context_owned += 1,
            OwnershipClass::Unrelated => self.unrelated += 1,
        }
    }

    pub fn get(&self, class: OwnershipClass) -> usize {
        match class {
            OwnershipClass::ScenarioOwned => self.scenario_owned,
            OwnershipClass::ContextOwned => self.context_owned,
            OwnershipClass::Unrelated => self.unrelated,
        }
    }

    /// Scenario- plus context-owned
    pub fn orphans(&self) -> usize {
        self.scenario_owned + self.context_owned
    }

    fn add(&mut self, other: &ClassCounts) {
        self.scenario_owned += other.scenario_owned;
        self.context_owned += other.context_owned;
        self.unrelated += other.unrelated;
    }
}

/// Summary of one reconciliation check
///
/// Every domain and resource type is always present so two reports built
/// from the same snapshot serialize identically apart from `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub version: u32,

    pub timestamp: DateTime<Utc>,

    /// A scenario failed to tear down after itself
    pub cleanup_failed: bool,

    /// Shared context teardown left resources behind
    pub context_cleanup_warning: bool,

    /// Every resource type listed successfully
    pub complete: bool,

    pub per_domain_counts: BTreeMap<Domain, ClassCounts>,

    pub per_resource_type_counts: BTreeMap<ResourceType, ClassCounts>,

    /// Per-type listing success; `false` means the zero counts for that type
    /// are unknown rather than clean
    pub scan_ok: BTreeMap<ResourceType, bool>,
}

impl ReconciliationReport {
    pub fn type_counts(&self, resource_type: ResourceType) -> ClassCounts {
        self.per_resource_type_counts
            .get(&resource_type)
            .copied()
            .unwrap_or_default()
    }

    pub fn domain_counts(&self, domain: Domain) -> ClassCounts {
        self.per_domain_counts
            .get(&domain)
            .copied()
            .unwrap_or_default()
    }

    pub fn total(&self, class: OwnershipClass) -> usize {
        self.per_resource_type_counts
            .values()
            .map(|c| c.get(class))
            .sum()
    }

    /// Resource types whose listing failed
    pub fn failed_scans(&self) -> Vec<ResourceType> {
        self.scan_ok
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(t, _)| *t)
            .collect()
    }
}

/// Folds a snapshot into a [`ReconciliationReport`]
pub struct Aggregator<'a> {
    classifier: &'a Classifier,
}

impl<'a> Aggregator<'a> {
    pub fn new(classifier: &'a Classifier) -> Self {
        Self { classifier }
    }

    pub fn aggregate(&self, snapshot: &InventorySnapshot) -> ReconciliationReport {
        self.aggregate_at(snapshot, Utc::now())
    }

    pub fn aggregate_at(
        &self,
        snapshot: &InventorySnapshot,
        timestamp: DateTime<Utc>,
    ) -> ReconciliationReport {
        let mut per_type = BTreeMap::new();
        let mut scan_ok = BTreeMap::new();

        for resource_type in ResourceType::PURGE_ORDER {
            let mut counts = ClassCounts::default();
            for resource in snapshot.resources(resource_type) {
                counts.record(self.classifier.classify(resource));
            }
            per_type.insert(resource_type, counts);
            scan_ok.insert(
                resource_type,
                snapshot.get(resource_type).is_some_and(|inv| inv.ok),
            );
        }

        let mut per_domain: BTreeMap<Domain, ClassCounts> =
            Domain::ALL.iter().map(|d| (*d, ClassCounts::default())).collect();
        for (resource_type, counts) in &per_type {
            per_domain
                .entry(resource_type.domain())
                .or_default()
                .add(counts);
        }

        let scenario_total: usize = per_type.values().map(|c| c.scenario_owned).sum();
        let context_total: usize = per_type.values().map(|c| c.context_owned).sum();

        ReconciliationReport {
            version: REPORT_VERSION,
            timestamp,
            cleanup_failed: scenario_total > 0,
            context_cleanup_warning: context_total > 0,
            complete: scan_ok.values().all(|ok| *ok),
            per_domain_counts: per_domain,
            per_resource_type_counts: per_type,
            scan_ok,
        }
    }
}

/// Legacy `cleanup_metrics.json` layout read by the Prometheus exporter
///
/// Scenario-owned counts feed the `rally_cleanup_failure` and
/// `rally_orphaned_resources` gauges, context-owned counts the
/// `rally_context_*` gauges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterMetrics {
    pub timestamp: DateTime<Utc>,
    pub cleanup_failed: u8,
    pub context_cleanup_warning: u8,
    pub orphaned_resources: BTreeMap<String, usize>,
    pub details: BTreeMap<String, usize>,
    pub context_orphaned_resources: BTreeMap<String, usize>,
    pub context_details: BTreeMap<String, usize>,
}

impl From<&ReconciliationReport> for ExporterMetrics {
    fn from(report: &ReconciliationReport) -> Self {
        let mut orphaned_resources = BTreeMap::new();
        let mut context_orphaned_resources = BTreeMap::new();
        for domain in Domain::ALL {
            let counts = report.domain_counts(domain);
            orphaned_resources.insert(domain.service_name().to_string(), counts.scenario_owned);
            context_orphaned_resources
                .insert(domain.service_name().to_string(), counts.context_owned);
        }

        let mut details = BTreeMap::new();
        let mut context_details = BTreeMap::new();
        for resource_type in ResourceType::PURGE_ORDER {
            let counts = report.type_counts(resource_type);
            details.insert(resource_type.plural().to_string(), counts.scenario_owned);
            context_details.insert(resource_type.plural().to_string(), counts.context_owned);
        }

        Self {
            timestamp: report.timestamp,
            cleanup_failed: u8::from(report.cleanup_failed),
            context_cleanup_warning: u8::from(report.context_cleanup_warning),
            orphaned_resources,
            details,
            context_orphaned_resources,
            context_details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resource, TypeInventory};

    fn complete_snapshot(resources: Vec<Resource>) -> InventorySnapshot {
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
    fn test_server_and_network_orphans() {
        let classifier = Classifier::default();
        let snapshot = complete_snapshot(vec![
            Resource::named(ResourceType::Server, "srv-1", "s_rally_abc"),
            Resource::named(ResourceType::Network, "net-1", "c_rally_xyz"),
        ]);

        let report = Aggregator::new(&classifier).aggregate(&snapshot);

        assert!(report.cleanup_failed);
        assert!(report.context_cleanup_warning);
        assert!(report.complete);
        assert_eq!(report.type_counts(ResourceType::Server).scenario_owned, 1);
        assert_eq!(report.type_counts(ResourceType::Network).context_owned, 1);
        assert_eq!(report.domain_counts(Domain::Compute).scenario_owned, 1);
        assert_eq!(report.domain_counts(Domain::Network).context_owned, 1);
    }

    #[test]
    fn test_empty_inventory() {
        let classifier = Classifier::default();
        let report = Aggregator::new(&classifier).aggregate(&complete_snapshot(Vec::new()));

        assert!(!report.cleanup_failed);
        assert!(!report.context_cleanup_warning);
        assert_eq!(report.per_resource_type_counts.len(), 8);
        assert_eq!(report.per_domain_counts.len(), 5);
        assert!(
            report
                .per_resource_type_counts
                .values()
                .all(|c| *c == ClassCounts::default())
        );
        assert!(
            report
                .per_domain_counts
                .values()
                .all(|c| *c == ClassCounts::default())
        );
    }

    #[test]
    fn test_context_only_does_not_fail_cleanup() {
        let classifier = Classifier::default();
        let snapshot = complete_snapshot(vec![
            Resource::named(ResourceType::Project, "p-1", "c_rally_proj"),
            Resource::named(ResourceType::User, "u-1", "c_rally_user"),
            Resource::named(ResourceType::Server, "srv-9", "web-01"),
        ]);

        let report = Aggregator::new(&classifier).aggregate(&snapshot);

        assert!(!report.cleanup_failed);
        assert!(report.context_cleanup_warning);
        assert_eq!(report.domain_counts(Domain::Identity).context_owned, 2);
        assert_eq!(report.type_counts(ResourceType::Server).unrelated, 1);
    }

    #[test]
    fn test_network_domain_rolls_up_router_and_security_group() {
        let classifier = Classifier::default();
        let snapshot = complete_snapshot(vec![
            Resource::named(ResourceType::Router, "r-1", "s_rally_r"),
            Resource::named(ResourceType::SecurityGroup, "sg-1", "s_rally_sg"),
            Resource::named(ResourceType::Network, "n-1", "s_rally_n"),
        ]);

        let report = Aggregator::new(&classifier).aggregate(&snapshot);

        assert_eq!(report.domain_counts(Domain::Network).scenario_owned, 3);
        assert_eq!(report.total(OwnershipClass::ScenarioOwned), 3);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let classifier = Classifier::default();
        let snapshot = complete_snapshot(vec![
            Resource::named(ResourceType::Volume, "v-1", "s_rally_vol"),
            Resource::new(ResourceType::Image, "img-1", None::<String>),
        ]);
        let aggregator = Aggregator::new(&classifier);
        let at = Utc::now();

        let first = serde_json::to_vec(&aggregator.aggregate_at(&snapshot, at)).unwrap();
        let second = serde_json::to_vec(&aggregator.aggregate_at(&snapshot, at)).unwrap();
        assert_eq!(first, second);

        let mut later = aggregator.aggregate(&snapshot);
        later.timestamp = at;
        assert_eq!(aggregator.aggregate_at(&snapshot, at), later);
    }

    #[test]
    fn test_failed_scan_is_flagged() {
        let classifier = Classifier::default();
        let mut snapshot = complete_snapshot(Vec::new());
        snapshot.insert(ResourceType::Volume, TypeInventory::failed());

        let report = Aggregator::new(&classifier).aggregate(&snapshot);

        assert!(!report.complete);
        assert!(!report.cleanup_failed);
        assert_eq!(report.failed_scans(), vec![ResourceType::Volume]);
    }

    #[test]
    fn test_unscanned_type_counts_as_failed() {
        let classifier = Classifier::default();
        let report = Aggregator::new(&classifier).aggregate(&InventorySnapshot::new());

        assert!(!report.complete);
        assert_eq!(report.failed_scans().len(), 8);
    }

    #[test]
    fn test_exporter_metrics_layout() {
        let classifier = Classifier::default();
        let snapshot = complete_snapshot(vec![
            Resource::named(ResourceType::Server, "srv-1", "s_rally_abc"),
            Resource::named(ResourceType::SecurityGroup, "sg-1", "c_rally_sg"),
        ]);
        let report = Aggregator::new(&classifier).aggregate(&snapshot);

        let metrics = ExporterMetrics::from(&report);

        assert_eq!(metrics.cleanup_failed, 1);
        assert_eq!(metrics.context_cleanup_warning, 1);
        assert_eq!(metrics.orphaned_resources["nova"], 1);
        assert_eq!(metrics.orphaned_resources["neutron"], 0);
        assert_eq!(metrics.details["servers"], 1);
        assert_eq!(metrics.context_orphaned_resources["neutron"], 1);
        assert_eq!(metrics.context_details["security_groups"], 1);
        assert_eq!(metrics.details.len(), 8);
        assert_eq!(metrics.orphaned_resources.len(), 5);
    }
}
