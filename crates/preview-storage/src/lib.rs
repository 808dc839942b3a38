//! S3-compatible object storage.
//!
//! This crate provides:
//! - The `ObjectStore` get/put contract used by the pipeline
//! - An S3 client (AWS or any S3-compatible endpoint)
//! - An in-memory store for local runs and tests

pub mod client;
pub mod error;
pub mod memory;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use store::ObjectStore;
