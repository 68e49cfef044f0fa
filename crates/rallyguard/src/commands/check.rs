use crate::utils;
use colored::Colorize;
use rallyguard_config::Settings;

pub async fn handle(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let janitor = utils::build_janitor(settings)?;

    if !json {
        println!("{}", "Scanning cloud for Rally leftovers...".yellow());
        println!();
    }

    let report = janitor.check().await?;

    if json {
        return utils::print_json(&report);
    }

    utils::print_report(&report);
    println!();
    println!(
        "  Published to {}",
        janitor.store().report_path().display().to_string().cyan()
    );
    Ok(())
}
