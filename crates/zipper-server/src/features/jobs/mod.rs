//! Jobs feature module
//!
//! Job submission and the health probe. Submission only validates and
//! enqueues; processing happens in the worker pipeline.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::jobs_routes;
