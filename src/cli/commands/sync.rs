//! Sync command implementations.

use super::{block_on, open_storage};
use crate::cli::SyncCommands;
use crate::config::resolve_actor;
use crate::error::Result;
use crate::remote::{BloggerClient, RemoteSettings};
use crate::sync::{
    get_sync_overview, print_overview, FullSync, LightSync, LightSyncReport, SyncDetail,
    SyncReport,
};
use colored::Colorize;
use std::path::PathBuf;

/// Execute sync commands.
pub fn execute(
    command: &SyncCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        SyncCommands::Full => full(db_path, actor, json),
        SyncCommands::Light => light(db_path, actor, json),
        SyncCommands::Status => status(db_path, json),
    }
}

fn full(db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let remote = BloggerClient::from_env()?;
    let actor = resolve_actor(actor);

    let report = block_on(FullSync::new(&mut storage, &remote, actor).run())??;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_full_report(&report);
    }
    Ok(())
}

fn light(db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let remote = BloggerClient::from_env()?;
    let actor = resolve_actor(actor);

    let report = block_on(LightSync::new(&mut storage, &remote, actor).run())??;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        print_light_report(&report);
    }
    Ok(())
}

fn status(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let overview = get_sync_overview(&storage, RemoteSettings::resolve().is_configured())?;

    if json {
        println!("{}", serde_json::to_string(&overview)?);
    } else {
        print_overview(&overview);
    }
    Ok(())
}

fn print_full_report(report: &SyncReport) {
    println!("{}", "Full Sync".bold().underline());
    println!();
    println!(
        "Remote:  {} live, {} draft",
        report.remote_live, report.remote_draft
    );
    println!("Local:   {} checked", report.local_checked);
    println!();
    println!("  Synced:       {}", report.synced);
    println!(
        "  Issues:       {} found, {} fixed",
        report.issues_found, report.issues_fixed
    );
    println!("  Imported:     {}", report.imported);
    println!("  Pushed:       {}", report.pushed);
    if report.failed > 0 {
        println!("  {}       {}", "Failed:".red().bold(), report.failed);
    }

    print_details(&report.details);

    println!();
    if report.has_failures() {
        println!("{}", "Some posts could not be reconciled; rerun to retry.".yellow());
    } else if report.is_clean() {
        println!("{}", "Everything already in sync.".green());
    }
}

fn print_light_report(report: &LightSyncReport) {
    if let Some(message) = &report.message {
        println!("{}", message.yellow());
        return;
    }

    println!(
        "Checked {} linked post(s): {} synced, {} skipped",
        report.posts_checked, report.synced_count, report.skipped
    );
    print_details(&report.details);
}

fn print_details(details: &[SyncDetail]) {
    if details.is_empty() {
        return;
    }

    println!();
    for detail in details {
        let label = format!("[{}]", detail.issue);
        let label = if detail.is_failure() {
            label.red()
        } else {
            label.cyan()
        };
        let id = if detail.record_id.is_empty() {
            "-"
        } else {
            detail.record_id.as_str()
        };
        println!("  {label} {id} {}", detail.title.dimmed());

        let transition = match (detail.prior_status, detail.new_status) {
            (Some(prior), Some(new)) if prior != new => format!(" ({prior} -> {new})"),
            _ => String::new(),
        };
        println!("      {}{transition}", detail.action);
        if let Some(error) = &detail.error {
            println!("      {} {error}", "error:".red());
        }
    }
}
