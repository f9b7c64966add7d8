//! Shared data model, error model, and configuration for entsoe.
//!
//! This crate is the foundation depended on by all other entsoe crates.
//! It provides:
//! - [`EntsoeError`]: the unified error type
//! - Tabular output ([`Table`], [`Record`], [`Cell`], [`Scalar`])
//! - Reference data ([`Catalog`], [`ParameterCatalog`], [`DatasetDescriptor`])
//! - Time handling ([`TimeInterval`], timestamp formats)
//! - Configuration ([`AppConfig`], [`ClientConfig`], config loading)

pub mod catalog;
pub mod config;
pub mod error;
pub mod table;
pub mod time;

// Re-export public API at crate root for ergonomic imports.
pub use catalog::{
    Catalog, CatalogEntry, ConstantField, DatasetDescriptor, ParameterCatalog, ParameterType,
    is_destination_field,
};
pub use config::{
    ApiConfig, AppConfig, CatalogConfig, ClientConfig, MatchConfig, RateLimitConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{EntsoeError, Result};
pub use table::{Cell, Record, Scalar, Table};
pub use time::{
    CANONICAL_FORMAT, DATE_FORMAT, DOCUMENT_FORMAT, TimeInterval, parse_canonical,
    parse_human_timestamp, parse_timestamp, truncate_to_hour,
};
