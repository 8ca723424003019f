//! Job data model shared by the submission API and the worker
//!
//! A submitted [`JobPayload`] is validated at the HTTP edge and enqueued
//! verbatim. When the worker receives it back from the queue it is combined
//! with [`DeliveryMetadata`] into a [`JobDescriptor`].

mod descriptor;
mod payload;
mod reference;

pub use descriptor::{DeliveryMetadata, Destination, JobArtifacts, JobDescriptor};
pub use payload::{
    Credentials, JobPayload, NotificationSpec, DEFAULT_ACL, DEFAULT_STORAGE_CLASS,
};
pub use reference::ObjectRef;
