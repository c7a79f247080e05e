//! Command implementations behind the `s3share` and `s3share-import` binaries.

pub mod app;
pub mod backfill;
pub mod health;
pub mod list;
pub mod upload;

pub use upload::UploadedObject;
