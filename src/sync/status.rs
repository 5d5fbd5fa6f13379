//! Sync status display.
//!
//! Summarizes the local record set from the point of view of reconciliation.
//! Nothing here talks to the remote; `remote_configured` only reports whether
//! credentials are present.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::error::Result;
use crate::model::PostStatus;
use crate::storage::SqliteStorage;

/// Snapshot of local sync state.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOverview {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub linked: usize,
    pub unlinked: usize,
    /// Published records with no live URL, which the next run will correct
    pub published_missing_url: usize,
    pub last_synced_at: Option<i64>,
    pub remote_configured: bool,
}

/// Build the overview from local counts.
///
/// # Errors
///
/// Returns an error if the count queries fail.
pub fn get_sync_overview(storage: &SqliteStorage, remote_configured: bool) -> Result<SyncOverview> {
    let counts = storage.count_posts()?;

    let mut by_status: BTreeMap<String, usize> = [
        PostStatus::Draft,
        PostStatus::Reviewed,
        PostStatus::Published,
    ]
    .iter()
    .map(|s| (s.as_str().to_string(), 0))
    .collect();
    for (status, n) in counts.by_status {
        *by_status.entry(status).or_default() += n;
    }

    Ok(SyncOverview {
        total: counts.total,
        by_status,
        linked: counts.linked,
        unlinked: counts.unlinked,
        published_missing_url: counts.published_missing_url,
        last_synced_at: counts.last_synced_at,
        remote_configured,
    })
}

/// Print the overview to stdout in a human-readable format.
pub fn print_overview(overview: &SyncOverview) {
    println!("{}", "Sync Status".bold().underline());
    println!();

    if overview.remote_configured {
        println!("Remote:     {}", "configured".green());
    } else {
        println!("Remote:     {}", "not configured".yellow());
    }
    println!(
        "Last sync:  {}",
        overview
            .last_synced_at
            .map_or_else(|| "never".dimmed().to_string(), format_timestamp)
    );
    println!();

    if overview.total == 0 {
        println!("{}", "No posts yet.".dimmed());
        return;
    }

    println!("{}", "Posts:".blue().bold());
    for (status, n) in &overview.by_status {
        println!("  {status:<10} {n}");
    }
    println!("  {:<10} {}", "total".bold(), overview.total);
    println!();
    println!("Linked:     {}", overview.linked);
    println!("Unlinked:   {}", overview.unlinked);

    if overview.published_missing_url > 0 {
        println!();
        println!(
            "{} {} published post(s) have no live URL.",
            "Warning:".yellow().bold(),
            overview.published_missing_url
        );
        println!("{}", "Run 'postsync sync full' to reconcile.".dimmed());
    }
}

fn format_timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map_or_else(|| ms.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
