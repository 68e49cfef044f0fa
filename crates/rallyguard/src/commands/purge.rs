use crate::utils;
use colored::Colorize;
use rallyguard_cloud::PurgeMode;
use rallyguard_config::Settings;

pub async fn handle(settings: &Settings, confirm: bool, json: bool) -> anyhow::Result<()> {
    let janitor = utils::build_janitor(settings)?;
    let mode = if confirm {
        PurgeMode::Confirm
    } else {
        PurgeMode::DryRun
    };

    if !json {
        match mode {
            PurgeMode::DryRun => {
                println!("{}", "Listing orphaned resources (dry-run)...".yellow())
            }
            PurgeMode::Confirm => println!("{}", "Purging orphaned resources...".red().bold()),
        }
        println!();
    }

    let lock = janitor.store().acquire_purge_lock().await?;
    tracing::info!(%mode, results_dir = %settings.results_dir.display(), "Purge lock acquired");
    let outcome = janitor.purge(mode).await;
    lock.release().await?;
    tracing::info!("Purge lock released");

    if json {
        return utils::print_json(&outcome);
    }

    utils::print_outcome(&outcome);

    if mode == PurgeMode::DryRun && outcome.found > 0 {
        println!();
        println!("{}", "⚠ Nothing was deleted".yellow());
        println!("  Re-run with {} to delete them", "--confirm".cyan());
    }
    Ok(())
}
