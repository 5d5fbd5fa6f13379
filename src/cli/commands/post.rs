//! Local post commands.

use super::{block_on, open_storage};
use crate::cli::{PostAddArgs, PostCommands, PostEditArgs, PostListArgs};
use crate::config::resolve_actor;
use crate::error::Result;
use crate::model::{ContentRecord, NewPost, PostFilter};
use crate::remote::BloggerClient;
use crate::storage::{ContentStore, SqliteStorage};
use crate::storage::events::Event;
use crate::sync::{apply_local_edit, publish_post, set_review_status, unpublish_post, UnpublishMode};
use crate::validate::{normalize_status, post_not_found};
use chrono::{TimeZone, Utc};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct PostListOutput {
    count: usize,
    posts: Vec<ContentRecord>,
}

#[derive(Serialize)]
struct PostEditOutput {
    post: ContentRecord,
    remote_synced: Option<bool>,
}

#[derive(Serialize)]
struct PostShowOutput {
    #[serde(flatten)]
    post: ContentRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<Event>>,
}

/// Execute post commands.
pub fn execute(
    command: &PostCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        PostCommands::Add(args) => add(args, db_path, actor, json),
        PostCommands::List(args) => list(args, db_path, json),
        PostCommands::Show { id, events } => show(id, *events, db_path, json),
        PostCommands::Edit(args) => edit(args, db_path, actor, json),
        PostCommands::Publish { id } => publish(id, db_path, actor, json),
        PostCommands::Unpublish { id, delete } => unpublish(id, *delete, db_path, actor, json),
        PostCommands::Status { id, status: new_status } => status(id, new_status, db_path, actor, json),
    }
}

fn add(args: &PostAddArgs, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    let mut post = NewPost::draft(&args.title, &args.html);
    if let Some(category) = args.category.as_deref().filter(|c| !c.trim().is_empty()) {
        post = post.with_category(category);
    }
    if let Some(url) = &args.source_url {
        post = post.with_source_url(url);
    }

    let record = storage.insert_post(&post, &actor)?;

    if json {
        println!("{}", serde_json::to_string(&record)?);
    } else {
        println!("Created {} {}", record.id.bold(), record.title);
    }
    Ok(())
}

fn list(args: &PostListArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;

    let filter = PostFilter {
        status: args.status.as_deref().map(normalize_status).transpose()?,
        linked: match (args.linked, args.unlinked) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
        limit: args.limit,
    };
    let posts = storage.list_posts(&filter)?;

    if json {
        let output = PostListOutput {
            count: posts.len(),
            posts,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if posts.is_empty() {
        println!("{}", "No posts found.".dimmed());
        return Ok(());
    }

    for post in &posts {
        let link = match (&post.remote_id, &post.remote_url) {
            (_, Some(url)) => url.as_str().green().to_string(),
            (Some(id), None) => format!("remote {id}").cyan().to_string(),
            (None, None) => "unlinked".dimmed().to_string(),
        };
        println!(
            "{:<18} {:<10} {}  {}",
            post.id,
            post.status.as_str(),
            post.title,
            link
        );
    }
    println!();
    println!("{} post(s)", posts.len());
    Ok(())
}

fn find_post(storage: &SqliteStorage, id: &str) -> Result<ContentRecord> {
    match storage.get_post(id)? {
        Some(post) => Ok(post),
        None => Err(post_not_found(id, &storage.get_all_post_ids()?)),
    }
}

fn show(id: &str, with_events: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path)?;
    let post = find_post(&storage, id)?;
    let events = if with_events {
        Some(storage.get_post_events(&post.id, None)?)
    } else {
        None
    };

    if json {
        let output = PostShowOutput { post, events };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("[{}] {}", post.id, post.title.bold());
    println!();
    println!("Status:       {}", post.status);
    println!("Category:     {}", post.category);
    println!(
        "Remote:       {}",
        post.remote_id.as_deref().unwrap_or("(unlinked)")
    );
    if let Some(url) = &post.remote_url {
        println!("URL:          {url}");
    }
    if let Some(published) = post.remote_published_at {
        println!("Published:    {}", format_ms(published));
    }
    if let Some(source) = &post.source_url {
        println!("Source:       {source}");
    }
    println!("Created:      {}", format_ms(post.created_at));
    println!(
        "Updated:      {}",
        post.updated_at.map_or_else(|| "unknown".to_string(), format_ms)
    );
    println!(
        "Last synced:  {}",
        post.last_synced_at.map_or_else(|| "never".to_string(), format_ms)
    );

    if let Some(events) = events {
        println!();
        println!("{}", "History:".bold());
        if events.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for event in &events {
            let change = match (&event.old_value, &event.new_value) {
                (Some(old), Some(new)) => format!("{old} -> {new}"),
                (None, Some(new)) => new.clone(),
                (Some(old), None) => format!("{old} -> (none)"),
                (None, None) => String::new(),
            };
            println!(
                "  {}  {:<20} {:<10} {}",
                format_ms(event.created_at).dimmed(),
                event.event_type.as_str(),
                event.actor,
                change
            );
        }
    }
    Ok(())
}

fn edit(args: &PostEditArgs, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let id = find_post(&storage, &args.id)?.id;
    let remote = BloggerClient::from_env()?;
    let actor = resolve_actor(actor);

    let outcome = block_on(apply_local_edit(
        &mut storage,
        &remote,
        &id,
        args.title.as_deref(),
        args.html.as_deref(),
        &actor,
    ))??;

    if json {
        let output = PostEditOutput {
            post: outcome.record,
            remote_synced: outcome.remote_synced,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Updated {}", outcome.record.id.bold());
    match outcome.remote_synced {
        Some(true) => println!("  {}", "Pushed to remote.".green()),
        Some(false) => println!(
            "  {}",
            "Push to remote failed; the next sync will retry.".yellow()
        ),
        None => {}
    }
    Ok(())
}

fn publish(id: &str, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let id = find_post(&storage, id)?.id;
    let remote = BloggerClient::from_env()?;
    let actor = resolve_actor(actor);

    let record = block_on(publish_post(&mut storage, &remote, &id, &actor))??;

    if json {
        println!("{}", serde_json::to_string(&record)?);
        return Ok(());
    }

    println!("Published {}", record.id.bold());
    if let Some(url) = &record.remote_url {
        println!("  {}", url.green());
    }
    Ok(())
}

fn unpublish(
    id: &str,
    delete: bool,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let id = find_post(&storage, id)?.id;
    let remote = BloggerClient::from_env()?;
    let actor = resolve_actor(actor);
    let mode = if delete {
        UnpublishMode::Delete
    } else {
        UnpublishMode::Revert
    };

    let outcome = block_on(unpublish_post(&mut storage, &remote, &id, mode, &actor))??;

    if json {
        let output = PostEditOutput {
            post: outcome.record,
            remote_synced: outcome.remote_synced,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Unpublished {} (now {})", outcome.record.id.bold(), outcome.record.status);
    match (mode, outcome.remote_synced) {
        (UnpublishMode::Revert, _) => println!("  Remote post reverted to draft."),
        (UnpublishMode::Delete, Some(true)) => println!("  {}", "Remote post deleted.".green()),
        (UnpublishMode::Delete, Some(false)) => println!(
            "  {}",
            "Remote delete failed; the post was unlinked locally.".yellow()
        ),
        (UnpublishMode::Delete, None) => println!(
            "  {}",
            "Remote not configured; the post was unlinked locally.".yellow()
        ),
    }
    Ok(())
}

fn status(
    id: &str,
    status: &str,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let id = find_post(&storage, id)?.id;
    let status = normalize_status(status)?;
    let actor = resolve_actor(actor);

    let record = set_review_status(&mut storage, &id, status, &actor)?;

    if json {
        println!("{}", serde_json::to_string(&record)?);
    } else {
        println!("{} is now {}", record.id.bold(), record.status);
    }
    Ok(())
}

fn format_ms(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map_or_else(|| ms.to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}
