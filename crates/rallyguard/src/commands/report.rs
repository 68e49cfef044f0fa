use crate::utils;
use colored::Colorize;
use rallyguard_cloud::ReportStore;
use rallyguard_config::Settings;

pub async fn handle(settings: &Settings, json: bool, purge: bool) -> anyhow::Result<()> {
    let store = ReportStore::new(&settings.results_dir);

    if purge {
        let Some(outcome) = store.load_purge_outcome().await? else {
            anyhow::bail!(
                "No purge outcome in {}; run `rallyguard purge` first",
                settings.results_dir.display()
            );
        };
        if json {
            return utils::print_json(&outcome);
        }
        println!("{}", format!("Last purge ({})", outcome.mode).bold());
        println!();
        utils::print_outcome(&outcome);
        return Ok(());
    }

    let Some(report) = store.load_report().await? else {
        anyhow::bail!(
            "No report in {}; run `rallyguard check` first",
            settings.results_dir.display()
        );
    };

    if json {
        return utils::print_json(&report);
    }

    utils::print_report(&report);
    let age = chrono::Utc::now().signed_duration_since(report.timestamp);
    if age.num_hours() >= 24 {
        println!();
        println!(
            "{}",
            format!("⚠ Report is {} hour(s) old", age.num_hours()).yellow()
        );
    }
    Ok(())
}
