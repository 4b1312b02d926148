// Remote management API access (inventory, stats, lifecycle actions) via reqwest

pub(crate) mod decode;

use crate::error::FetchError;
use crate::models::{ActionRequest, CreateUnitRequest, HttpMethod, MetricSample, Unit};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

/// Raw action response: HTTP status plus JSON body (`Null` when the body is empty or not JSON).
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReply {
    pub status: u16,
    pub body: Value,
}

impl ActionReply {
    /// 2xx and the body does not say `success: false`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
            && self.body.get("success").and_then(Value::as_bool) != Some(false)
    }
}

/// The management API as seen by the sync engine.
///
/// `perform` and `create_unit` return `Ok` for any HTTP response so the engine can read the
/// server's message; only transport failures are `Err`.
#[async_trait]
pub trait ContainerApi: Send + Sync {
    async fn list_units(&self) -> Result<Vec<Unit>, FetchError>;

    async fn unit_stats(&self, unit_id: &str) -> Result<MetricSample, FetchError>;

    async fn perform(&self, request: &ActionRequest) -> Result<ActionReply, FetchError>;

    async fn create_unit(&self, request: &CreateUnitRequest) -> Result<ActionReply, FetchError>;
}

pub struct HttpContainerApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpContainerApi {
    pub fn connect(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let parsed = url::Url::parse(base_url)?;
        anyhow::ensure!(
            matches!(parsed.scheme(), "http" | "https"),
            "api base url must be http(s), got {}",
            parsed.scheme()
        );
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(endpoint));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET and decode a JSON body; non-2xx becomes `FetchError::Status`.
    async fn get_json(&self, endpoint: &str) -> Result<Value, FetchError> {
        let response = self.request(Method::GET, endpoint).send().await?;
        let status = response.status();
        let body = read_body(response).await?;
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ContainerApi for HttpContainerApi {
    #[instrument(skip(self), fields(repo = "containers", operation = "list_units"))]
    async fn list_units(&self) -> Result<Vec<Unit>, FetchError> {
        let body = self.get_json("/containers").await?;
        decode::decode_inventory(body)
    }

    #[instrument(skip(self), fields(repo = "containers", operation = "unit_stats"))]
    async fn unit_stats(&self, unit_id: &str) -> Result<MetricSample, FetchError> {
        let body = self
            .get_json(&format!("/containers/stats/{}", unit_id))
            .await?;
        decode::decode_stats(body)
    }

    #[instrument(skip(self, request), fields(repo = "containers", operation = "perform", unit_id = %request.unit_id, kind = %request.kind))]
    async fn perform(&self, request: &ActionRequest) -> Result<ActionReply, FetchError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        };
        let response = self.request(method, &request.endpoint).send().await?;
        reply_of(response).await
    }

    #[instrument(skip(self, request), fields(repo = "containers", operation = "create_unit", image = %request.image))]
    async fn create_unit(&self, request: &CreateUnitRequest) -> Result<ActionReply, FetchError> {
        let response = self
            .request(Method::POST, "/containers/run")
            .json(&request.to_body())
            .send()
            .await?;
        reply_of(response).await
    }
}

async fn reply_of(response: Response) -> Result<ActionReply, FetchError> {
    let status = response.status().as_u16();
    let body = read_body(response).await?;
    Ok(ActionReply { status, body })
}

/// Body as JSON; empty or non-JSON bodies become `Null` unless the status is 2xx and the body
/// is non-empty garbage, which is a decode error.
async fn read_body(response: Response) -> Result<Value, FetchError> {
    let ok = response.status().is_success();
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(&text) {
        Ok(v) => Ok(v),
        Err(e) if ok => Err(FetchError::from(e)),
        Err(_) => Ok(Value::String(text)),
    }
}
