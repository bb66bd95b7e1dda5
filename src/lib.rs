//! Driftnet: a resumable social-feed crawl engine
//!
//! This crate implements the crawl engine shared by the platform crawlers:
//! incremental feed paging with cross-run de-duplication, a bounded state
//! machine for walking nested photo galleries, and durable per-target JSON
//! progress files. Site-specific paging, DOM navigation, and authenticated
//! downloads live behind the capability traits in [`source`].

pub mod config;
pub mod crawler;
pub mod download;
pub mod gallery;
pub mod item;
pub mod pager;
pub mod platform;
pub mod source;
pub mod store;

use thiserror::Error;

/// Main error type for Driftnet operations
#[derive(Debug, Error)]
pub enum DriftnetError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Progress store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Feed source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

/// Errors raised while deriving an item identity
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Malformed item: {0}")]
    MalformedItem(String),
}

/// Result type alias for Driftnet operations
pub type Result<T> = std::result::Result<T, DriftnetError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CancelFlag, CrawlOrchestrator, CrawlSummary};
pub use gallery::NavState;
pub use item::{identity_of, ItemEnvelope, ItemIdentity, MediaKind, MediaRef};
pub use pager::{StopPolicy, TerminationReason};
pub use platform::{Platform, TargetKind};
