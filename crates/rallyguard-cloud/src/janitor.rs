//! Reconciliation check and purge orchestration

use crate::classify::Classifier;
use crate::error::Result;
use crate::provider::CloudProvider;
use crate::purge::{PurgeExecutor, PurgeMode, PurgeOutcome, PurgePhase, PurgePlan};
use crate::report::{Aggregator, ReconciliationReport};
use crate::scanner::Scanner;
use crate::store::ReportStore;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs reconciliation checks and purges against one provider
///
/// Calls are strictly sequential. Concurrent purges are not coordinated here;
/// callers serialize them with [`ReportStore::acquire_purge_lock`].
pub struct Janitor {
    provider: Arc<dyn CloudProvider>,
    classifier: Classifier,
    store: ReportStore,
    call_timeout: Duration,
}

impl Janitor {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        classifier: Classifier,
        store: ReportStore,
    ) -> Self {
        Self {
            provider,
            classifier,
            store,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Scan, aggregate and publish a fresh report
    ///
    /// Listing failures degrade to partial data; only a failed report write
    /// is an error, in which case the previous report stays in place.
    pub async fn check(&self) -> Result<ReconciliationReport> {
        let scanner = Scanner::new(self.provider.as_ref(), self.call_timeout);
        let snapshot = scanner.scan_all().await;

        let report = Aggregator::new(&self.classifier).aggregate(&snapshot);
        self.store.save_report(&report).await?;

        tracing::info!(
            provider = self.provider.name(),
            cleanup_failed = report.cleanup_failed,
            context_cleanup_warning = report.context_cleanup_warning,
            complete = report.complete,
            "Reconciliation check finished"
        );
        Ok(report)
    }

    /// Re-scan the cloud and purge every scenario- and context-owned resource
    ///
    /// Never trusts a previously published report. After confirm-mode
    /// deletions a fresh check is published. Persistence failures at this
    /// point are logged only, since the deletions already happened.
    pub async fn purge(&self, mode: PurgeMode) -> PurgeOutcome {
        let mut phase = PurgePhase::Idle;
        transition(&mut phase, PurgePhase::Scanning);
        let snapshot = Scanner::new(self.provider.as_ref(), self.call_timeout)
            .scan_all()
            .await;

        transition(&mut phase, PurgePhase::Classifying);
        let plan = PurgePlan::build(&snapshot, &self.classifier);
        tracing::info!(targets = plan.total(), %mode, "Purge plan built");

        transition(
            &mut phase,
            match mode {
                PurgeMode::DryRun => PurgePhase::DryRunReporting,
                PurgeMode::Confirm => PurgePhase::Deleting,
            },
        );
        let outcome = PurgeExecutor::new(self.provider.as_ref(), self.call_timeout)
            .execute(&plan, mode)
            .await;

        if let Err(e) = self.store.save_purge_outcome(&outcome).await {
            tracing::error!(error = %e, "Failed to persist purge outcome");
        }

        if outcome.issued_deletes() {
            transition(&mut phase, PurgePhase::Reconciling);
            if let Err(e) = self.check().await {
                tracing::error!(error = %e, "Post-purge reconciliation failed");
            }
        }

        transition(&mut phase, PurgePhase::Idle);
        tracing::info!(
            found = outcome.found,
            deleted = outcome.deleted,
            failures = outcome.failures.len(),
            %mode,
            "Purge finished"
        );
        outcome
    }
}

fn transition(phase: &mut PurgePhase, next: PurgePhase) {
    tracing::debug!(from = %phase, to = %next, "Purge phase");
    *phase = next;
}
