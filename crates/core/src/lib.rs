//! Core domain types and shared logic for s3share.
//!
//! This crate defines the data model used across all other crates:
//! - Catalog entries and the partition they live in
//! - Application configuration
//! - Object key derivation and public URL construction
//! - Parsing of bucket listings for the one-time catalog import
//! - Wall-clock time zone lookups

pub mod config;
pub mod entry;
pub mod error;
pub mod key;
pub mod listing;
pub mod url;
pub mod zone;

pub use config::{AppConfig, CatalogConfig, ShareConfig, StorageConfig};
pub use entry::{CatalogEntry, PARTITION_VALUE};
pub use error::{Error, Result};
pub use key::{content_type_for, make_urlsafe, object_key_for_path};
pub use listing::{ListedObject, assign_indices, parse_listing, parse_listing_line};
pub use url::serve_url;
pub use zone::TimeZone;

/// Default storage class for uploaded objects (infrequent access).
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD_IA";

/// Content type used when the extension gives no hint.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
