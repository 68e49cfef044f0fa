use colored::Colorize;
use rallyguard_cloud::{
    Classifier, Janitor, OwnershipPrefixes, PurgeMode, PurgeOutcome, ReconciliationReport,
    ReportStore, ResourceType,
};
use rallyguard_cloud_openstack::OpenStackProvider;
use rallyguard_config::Settings;
use std::sync::Arc;

/// Wire the OpenStack provider, classifier and results store from settings
pub fn build_janitor(settings: &Settings) -> anyhow::Result<Janitor> {
    let prefixes = OwnershipPrefixes::new(&settings.scenario_prefix, &settings.context_prefix)?;
    let provider =
        OpenStackProvider::with_binary(settings.openstack_bin.clone(), settings.cloud.clone());

    Ok(Janitor::new(
        Arc::new(provider),
        Classifier::new(prefixes),
        ReportStore::new(&settings.results_dir),
    )
    .with_call_timeout(settings.call_timeout()))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Per-type table of a reconciliation report
pub fn print_report(report: &ReconciliationReport) {
    println!(
        "{}",
        format!(
            "Reconciliation report ({})",
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .bold()
    );
    println!();
    println!(
        "  {:<16} {:>9} {:>9} {:>9}  {}",
        "TYPE", "SCENARIO", "CONTEXT", "OTHER", "SCAN"
    );

    for resource_type in ResourceType::PURGE_ORDER {
        let counts = report.type_counts(resource_type);
        let scan_ok = report.scan_ok.get(&resource_type).copied().unwrap_or(false);
        let scan = if scan_ok {
            "✓".green()
        } else {
            "⚠ failed".yellow()
        };
        println!(
            "  {:<16} {:>9} {:>9} {:>9}  {}",
            resource_type.plural(),
            counts.scenario_owned,
            counts.context_owned,
            counts.unrelated,
            scan
        );
    }

    println!();
    if report.cleanup_failed {
        println!("{}", "✗ Scenario cleanup failed: orphans found".red().bold());
    } else {
        println!("{}", "✓ No scenario orphans".green().bold());
    }
    if report.context_cleanup_warning {
        println!("{}", "⚠ Context-owned resources remain".yellow());
    }
    if !report.complete {
        let failed: Vec<String> = report
            .failed_scans()
            .iter()
            .map(|t| t.plural().to_string())
            .collect();
        println!(
            "{} {}",
            "⚠ Incomplete scan, counts are lower bounds:".yellow(),
            failed.join(", ")
        );
    }
}

/// Summary of a purge run
pub fn print_outcome(outcome: &PurgeOutcome) {
    for target in &outcome.targets {
        let verb = match outcome.mode {
            PurgeMode::DryRun => "would delete",
            PurgeMode::Confirm => "delete",
        };
        println!(
            "  • {} {} {} ({})",
            verb,
            target.resource_type,
            target.name.cyan(),
            target.id
        );
    }

    if !outcome.failures.is_empty() {
        println!();
        for failure in &outcome.failures {
            println!(
                "  ⚠ {} {} ({}) {}: {}",
                failure.resource_type,
                failure.name,
                failure.id,
                failure.step,
                failure.error.red()
            );
        }
    }

    if !outcome.stuck_routers.is_empty() {
        println!(
            "  ⚠ Routers stuck during teardown: {}",
            outcome.stuck_routers.join(", ").yellow()
        );
    }

    println!();
    match outcome.mode {
        PurgeMode::DryRun => {
            println!(
                "{}",
                format!("Found {} orphaned resource(s)", outcome.found).bold()
            );
        }
        PurgeMode::Confirm if outcome.is_success() => {
            println!(
                "{}",
                format!(
                    "✓ Deleted {}/{} resource(s) in {} ms",
                    outcome.deleted, outcome.found, outcome.duration_ms
                )
                .green()
                .bold()
            );
        }
        PurgeMode::Confirm => {
            println!(
                "{}",
                format!(
                    "⚠ Deleted {}/{} resource(s), {} failure(s)",
                    outcome.deleted,
                    outcome.found,
                    outcome.failures.len()
                )
                .yellow()
                .bold()
            );
        }
    }
}
