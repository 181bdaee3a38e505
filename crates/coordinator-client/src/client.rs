//! Coordinator REST clients
//!
//! Every call is bounded by the caller's timeout. mtce calls additionally
//! retry transport failures with Fibonacci spacing.

use crate::backoff::FibonacciBackoff;
use crate::error::CoordinatorError;
use crate::models::{
    MtceHostRecord, MtceResponse, QuorumStatus, VimActionRequest, VimHostRecord,
};
use crate::coordinator_trait::{MtceApi, QuorumApi, VimApi};
use inventory_types::HostAction;
use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

const MTCE: &str = "mtce";
const VIM: &str = "vim";
const QUORUM: &str = "quorum";

fn build_client() -> Result<Client, CoordinatorError> {
    Client::builder().build().map_err(CoordinatorError::Http)
}

/// Send with a per-request timeout and classify failures.
async fn send(
    service: &'static str,
    request: RequestBuilder,
    timeout: Duration,
) -> Result<Response, CoordinatorError> {
    let response = request.timeout(timeout).send().await.map_err(|e| {
        if e.is_timeout() {
            CoordinatorError::timeout(service, e.to_string())
        } else {
            CoordinatorError::Http(e)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CoordinatorError::rejected(
            service,
            format!("{status} - {body}"),
        ));
    }
    Ok(response)
}

/// Maintenance daemon client
#[derive(Debug, Clone)]
pub struct MtceClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    backoff_min: Duration,
    backoff_max: Duration,
}

impl MtceClient {
    /// # Arguments
    /// * `address`, `port` - mtce API endpoint
    /// * `token` - optional auth token sent as `X-Auth-Token`
    pub fn new(address: &str, port: u16, token: Option<String>) -> Result<Self, CoordinatorError> {
        Ok(Self {
            client: build_client()?,
            base_url: format!("http://{address}:{port}"),
            token,
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(8),
        })
    }

    /// Override the retry spacing.
    #[must_use]
    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.backoff_min = min;
        self.backoff_max = max;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, record: &MtceHostRecord) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Accept", "application/json")
            .header("User-Agent", "hostops-inventory/1.0")
            .json(record);
        if let Some(token) = &self.token {
            request = request.header("X-Auth-Token", token);
        }
        request
    }

    async fn call(
        &self,
        method: Method,
        path: String,
        record: &MtceHostRecord,
        timeout: Duration,
        retries: u32,
    ) -> Result<MtceResponse, CoordinatorError> {
        let mut backoff = FibonacciBackoff::new(self.backoff_min, self.backoff_max);
        let mut attempt = 0;
        loop {
            debug!("mtce {} {} (attempt {})", method, path, attempt + 1);
            let result = async {
                let response = send(MTCE, self.request(method.clone(), &path, record), timeout).await?;
                let text = response.text().await.map_err(CoordinatorError::Http)?;
                let reply: MtceResponse = serde_json::from_str(&text)?;
                Ok::<_, CoordinatorError>(reply)
            }
            .await;

            match result {
                Ok(reply) if reply.is_pass() => return Ok(reply),
                Ok(reply) => {
                    return Err(CoordinatorError::rejected(
                        MTCE,
                        reply.reason.unwrap_or_else(|| "no reason given".to_string()),
                    ));
                }
                Err(e) if e.is_retryable() && attempt < retries => {
                    let delay = backoff.next_backoff();
                    warn!(
                        "mtce {} {} failed ({}), retrying in {:?}",
                        method, path, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait::async_trait]
impl MtceApi for MtceClient {
    async fn host_add(&self, record: &MtceHostRecord, timeout: Duration, retries: u32) -> Result<MtceResponse, CoordinatorError> {
        self.call(Method::POST, "/v1/hosts/".to_string(), record, timeout, retries)
            .await
    }

    async fn host_modify(&self, record: &MtceHostRecord, timeout: Duration, retries: u32) -> Result<MtceResponse, CoordinatorError> {
        self.call(Method::PATCH, format!("/v1/hosts/{}", record.uuid), record, timeout, retries)
            .await
    }

    async fn host_delete(&self, record: &MtceHostRecord, timeout: Duration, retries: u32) -> Result<MtceResponse, CoordinatorError> {
        self.call(Method::DELETE, format!("/v1/hosts/{}", record.uuid), record, timeout, retries)
            .await
    }
}

/// VIM client
#[derive(Debug, Clone)]
pub struct VimClient {
    client: Client,
    base_url: String,
}

impl VimClient {
    /// Client for the VIM at `base_url`.
    pub fn new(base_url: String) -> Result<Self, CoordinatorError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/nfvi-plugins/v1/hosts/{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl VimApi for VimClient {
    async fn vim_host_add(&self, host: &VimHostRecord, timeout: Duration) -> Result<(), CoordinatorError> {
        debug!("vim host add {}", host.uuid);
        let request = self.client.post(self.url("")).json(host);
        send(VIM, request, timeout).await?;
        Ok(())
    }

    async fn vim_host_action(&self, host: &VimHostRecord, action: HostAction, force: bool, timeout: Duration) -> Result<(), CoordinatorError> {
        debug!("vim host action {} {} force={}", host.uuid, action, force);
        let body = VimActionRequest {
            host: host.clone(),
            action: action.to_string(),
            force,
        };
        let request = self.client.put(self.url(&host.uuid.to_string())).json(&body);
        send(VIM, request, timeout).await?;
        Ok(())
    }

    async fn vim_host_delete(&self, host: &VimHostRecord, timeout: Duration) -> Result<(), CoordinatorError> {
        debug!("vim host delete {}", host.uuid);
        let request = self
            .client
            .delete(self.url(&host.uuid.to_string()))
            .json(host);
        send(VIM, request, timeout).await?;
        Ok(())
    }
}

/// Storage monitor quorum client
#[derive(Debug, Clone)]
pub struct QuorumClient {
    client: Client,
    base_url: String,
}

impl QuorumClient {
    /// Client for the storage quorum service at `base_url`.
    pub fn new(base_url: String) -> Result<Self, CoordinatorError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl QuorumApi for QuorumClient {
    async fn monitor_status(&self, timeout: Duration) -> Result<QuorumStatus, CoordinatorError> {
        let request = self
            .client
            .get(format!("{}/v1/monitors/quorum", self.base_url))
            .header("Accept", "application/json");
        let response = send(QUORUM, request, timeout).await?;
        let text = response.text().await.map_err(CoordinatorError::Http)?;
        Ok(serde_json::from_str(&text)?)
    }
}
