//! rallyguard orphan reconciliation core
//!
//! Test scenarios create cloud resources and are supposed to delete them.
//! This crate finds the ones that survived ("orphans"), publishes a
//! reconciliation report for the metrics exporter, and purges orphans on
//! explicit request in dependency order.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 rallyguard CLI                  │
//! │           (check / purge / report)              │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                rallyguard-cloud                 │
//! │  Scanner → Classifier → Aggregator → ReportStore│
//! │  Scanner → Classifier → PurgePlan → Executor    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait CloudProvider { list, delete, … } │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │   openstack   │
//!           │   provider    │
//!           └───────────────┘
//! ```

pub mod classify;
pub mod error;
pub mod janitor;
pub mod provider;
pub mod purge;
pub mod report;
pub mod resource;
pub mod scanner;
pub mod store;

// Re-exports
pub use classify::{Classifier, DEFAULT_CONTEXT_PREFIX, DEFAULT_SCENARIO_PREFIX, OwnershipPrefixes};
pub use error::{CloudError, Result};
pub use janitor::{DEFAULT_CALL_TIMEOUT, Janitor};
pub use provider::CloudProvider;
pub use purge::{
    PurgeBatch, PurgeExecutor, PurgeFailure, PurgeMode, PurgeOutcome, PurgePhase, PurgePlan,
    PurgeStep, PurgeTarget, TypeOutcome,
};
pub use report::{Aggregator, ClassCounts, ExporterMetrics, ReconciliationReport};
pub use resource::{
    Domain, InventorySnapshot, OwnershipClass, Resource, ResourceType, TypeInventory,
};
pub use scanner::Scanner;
pub use store::{PurgeLock, ReportStore};
