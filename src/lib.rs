// src/lib.rs

//! Changelog ingestion and sync library.
//!
//! Reads version history from Markdown changelogs and release APIs,
//! normalizes it into [`models::VersionEntry`] values, and keeps a content
//! store incrementally in sync with the sources.

pub mod config;
pub mod error;
pub mod markdown;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod storage;
pub mod utils;
