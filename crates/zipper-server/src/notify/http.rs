use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::info;
use zipper_common::types::NotificationSpec;

use super::{NotificationContext, Notifier, NotifyError, NotifyOutcome};

/// Placeholder in the URL replaced by the job id.
const ID_PLACEHOLDER: &str = "{:id}";

/// Sends the notification context as JSON to the URL in the spec.
///
/// Fields: `url` (required), `method` (default `POST`). Any response status
/// counts as delivered; only transport errors fail.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: Client,
}

impl HttpNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("zipper/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

fn resolve_url(template: &str, job_id: &str) -> String {
    template.replace(ID_PLACEHOLDER, job_id)
}

fn resolve_method(spec: &NotificationSpec) -> Result<Method, NotifyError> {
    match spec.str_field("method") {
        None => Ok(Method::POST),
        Some(raw) => Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| NotifyError::InvalidMethod(raw.to_string())),
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn deliver(
        &self,
        spec: &NotificationSpec,
        context: &NotificationContext,
    ) -> Result<NotifyOutcome, NotifyError> {
        let template = spec.str_field("url").ok_or_else(|| NotifyError::MissingField {
            kind: spec.kind.clone(),
            field: "url",
        })?;
        let url = resolve_url(template, &context.id);
        let method = resolve_method(spec)?;

        let response = self
            .client
            .request(method.clone(), &url)
            .json(context)
            .send()
            .await?;

        let status = response.status().as_u16();
        info!(method = %method, url = %url, status, "HTTP notification sent");

        Ok(NotifyOutcome::HttpStatus(status))
    }
}
