// src/models/mod.rs

//! Domain models for changelog ingestion.
//!
//! This module contains the normalized version entry and the configuration
//! types every provider is driven by.

mod config;
mod entry;

// Re-export all public types
pub use config::{
    AppConfig, BaseConfig, GitHubConfig, GiteaConfig, LoadMode, LoaderConfig, MarkdownConfig,
    ProcessHook, ProviderConfig, ProviderKind, SerializedConfig, Settings, Title,
};
pub use entry::{ProviderInfo, VersionEntry};
