use serde::{Deserialize, Serialize};

use crate::queue::QueueAttributes;

/// Liveness plus the queue limits learned at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub max_message_size: Option<usize>,
    pub max_receive_count: Option<u32>,
}

pub fn handle(limits: &QueueAttributes) -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        max_message_size: limits.max_message_size,
        max_receive_count: limits.max_receive_count,
    }
}
