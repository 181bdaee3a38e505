//! Common utilities for the inventory RPC client
//!
//! Shared request plumbing: URL building, status mapping and error body decoding.

use crate::error::RpcError;
use inventory_types::{ErrorBody, ErrorKind, RpcMethod};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

/// HTTP client wrapper bound to one reconciler
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpClient {
    /// Wrap `client`; a trailing slash on `base_url` is dropped.
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `/v1/rpc/{method}` under the base URL
    pub fn rpc_url(&self, method: RpcMethod) -> String {
        format!("{}/v1/rpc/{}", self.base_url, method.as_ref())
    }

    /// Invoke one RPC method and decode its reply.
    pub async fn call<B, T>(&self, method: RpcMethod, body: &B) -> Result<T, RpcError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.rpc_url(method);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error_from_response(method, status, &text));
        }

        let text = response.text().await.map_err(|e| transport_error(method, e))?;
        serde_json::from_str(&text).map_err(RpcError::Serialization)
    }
}

fn transport_error(method: RpcMethod, err: reqwest::Error) -> RpcError {
    if err.is_timeout() {
        RpcError::Timeout(format!("{method}: {err}"))
    } else {
        RpcError::Http(err)
    }
}

/// Map a non-success reply onto the error taxonomy, preferring the JSON body.
pub fn error_from_response(method: RpcMethod, status: StatusCode, body: &str) -> RpcError {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return RpcError::from_body(parsed);
    }
    let kind = match status {
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::CONFLICT => ErrorKind::Conflict,
        StatusCode::BAD_REQUEST => ErrorKind::Validation,
        StatusCode::GATEWAY_TIMEOUT => ErrorKind::Timeout,
        _ => ErrorKind::Internal,
    };
    RpcError::from_kind(kind, format!("{method} failed: {status} - {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_url_trims_trailing_slash() {
        let http = HttpClient::new(Client::new(), "http://inventory:6385/".to_string());
        assert_eq!(
            http.rpc_url(RpcMethod::CpusUpdateByHost),
            "http://inventory:6385/v1/rpc/cpus_update_by_host"
        );
    }

    #[test]
    fn test_error_from_body_kind() {
        let err = error_from_response(
            RpcMethod::GetHostByMacs,
            StatusCode::NOT_FOUND,
            r#"{"kind":"not-found","message":"no host"}"#,
        );
        assert!(err.is_not_found());

        let err = error_from_response(
            RpcMethod::PortUpdateByHost,
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        );
        assert!(err.is_internal());

        let err = error_from_response(RpcMethod::CreateHost, StatusCode::CONFLICT, "");
        assert!(matches!(err, RpcError::Conflict(_)));
    }
}
