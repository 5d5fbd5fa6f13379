//! postsync - reconcile a local post store with a remote blog
//!
//! Keeps a local SQLite store of posts (`draft` / `reviewed` / `published`)
//! consistent with a Blogger blog (`LIVE` / `DRAFT`) after out-of-band
//! edits or partial failures cause the two to drift apart.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Post types shared by the store and the remote
//! - [`storage`] - SQLite post store with audit events
//! - [`remote`] - Publishing target trait and the Blogger client
//! - [`sync`] - Identity resolution, conflict resolution and the sync runs
//! - [`config`] - Configuration management
//! - [`validate`] - CLI input normalization
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod validate;

pub use error::{Error, Result};
