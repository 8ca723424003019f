//! Zipper Common Library
//!
//! Shared types, logging, and error handling for the Zipper workspace.
//!
//! # Overview
//!
//! - **Types**: the archive job payload as submitted over HTTP and the
//!   normalized [`JobDescriptor`](types::JobDescriptor) the worker executes
//! - **Error Handling**: [`ZipperError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use zipper_common::types::{DeliveryMetadata, JobDescriptor};
//!
//! fn decode(body: &str) -> zipper_common::Result<JobDescriptor> {
//!     let delivery = DeliveryMetadata::new("message-id", "receipt-handle", 1);
//!     JobDescriptor::from_message_body(body, delivery)
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, ZipperError};
