//! HTTP surface of the inventory controller.
//!
//! - `POST /v1/rpc/{method}`: agent RPCs, one JSON body per method
//! - `GET /v1/hosts`, `GET|PATCH|DELETE /v1/hosts/{uuid}`: lifecycle REST
//! - `GET /metrics`, `GET /healthz`

use crate::error::ControllerError;
use crate::lifecycle::LifecycleEngine;
use crate::metrics::InventoryMetrics;
use crate::reconciler::Reconciler;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use inventory_types::{
    CallerClass, CpuUpdate, GetHostByHostname, GetHostByMacs, HostCreate, HostRef, HostView,
    LldpAgentUpdate, LldpNeighbourUpdate, MemoryUpdate, NumaUpdate, PatchDocument,
    PciDeviceUpdate, PlatformUpdate, PortUpdate, RpcMethod, SubfunctionsUpdate, TtysDcdRequest,
    UpdateHost,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};
use uuid::Uuid;

/// Shared state of the HTTP handlers.
pub struct AppState {
    pub reconciler: Reconciler,
    pub lifecycle: LifecycleEngine,
    pub metrics: InventoryMetrics,
}

/// Routes for the agent RPCs, the host REST surface and metrics.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/rpc/{method}", post(rpc_handler))
        .route("/v1/hosts", get(list_hosts))
        .route(
            "/v1/hosts/{uuid}",
            get(get_host).patch(patch_host).delete(delete_host),
        )
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ControllerError> {
    serde_json::from_slice(body)
        .map_err(|e| ControllerError::Validation(format!("invalid request body: {e}")))
}

fn encode<T: Serialize>(value: T) -> Result<Value, ControllerError> {
    serde_json::to_value(value).map_err(|e| ControllerError::Internal(e.to_string()))
}

async fn rpc_handler(
    State(state): State<Arc<AppState>>,
    Path(method): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ControllerError> {
    let Ok(parsed) = RpcMethod::from_str(&method) else {
        state.metrics.record_rpc("unknown", "not-found");
        return Err(ControllerError::NotFound(format!("Unknown RPC method {method}")));
    };

    let result = dispatch(&state.reconciler, parsed, &body).await;
    match &result {
        Ok(_) => state.metrics.record_rpc(parsed.as_ref(), "ok"),
        Err(e) => {
            warn!("rpc {} failed: {}", parsed, e);
            state.metrics.record_rpc(parsed.as_ref(), &e.kind().to_string());
        }
    }
    result.map(Json)
}

async fn dispatch(r: &Reconciler, method: RpcMethod, body: &[u8]) -> Result<Value, ControllerError> {
    debug!("rpc {}", method);
    match method {
        RpcMethod::GetHostByMacs => {
            let req: GetHostByMacs = decode(body)?;
            encode(r.get_host_by_macs(&req.macs).await?)
        }
        RpcMethod::GetHostByHostname => {
            let req: GetHostByHostname = decode(body)?;
            encode(r.get_host_by_hostname(&req.hostname).await?)
        }
        RpcMethod::CreateHost => encode(r.create_host(decode::<HostCreate>(body)?).await?),
        RpcMethod::UpdateHost => {
            let req: UpdateHost = decode(body)?;
            encode(r.update_host(req.host_uuid, req.values).await?)
        }
        RpcMethod::ConfigureHost => {
            encode(r.configure_host(decode::<HostRef>(body)?.host_uuid).await?)
        }
        RpcMethod::UnconfigureHost => {
            encode(r.unconfigure_host(decode::<HostRef>(body)?.host_uuid).await?)
        }
        RpcMethod::PortUpdateByHost => {
            let req: PortUpdate = decode(body)?;
            encode(r.port_update_by_host(req.host_uuid, req.items).await?)
        }
        RpcMethod::PciDeviceUpdateByHost => {
            let req: PciDeviceUpdate = decode(body)?;
            encode(r.pci_device_update_by_host(req.host_uuid, req.items).await?)
        }
        RpcMethod::NumasUpdateByHost => {
            let req: NumaUpdate = decode(body)?;
            encode(r.numas_update_by_host(req.host_uuid, req.items).await?)
        }
        RpcMethod::CpusUpdateByHost => {
            let req: CpuUpdate = decode(body)?;
            encode(r.cpus_update_by_host(req.host_uuid, req.items).await?)
        }
        RpcMethod::MemoryUpdateByHost => {
            let req: MemoryUpdate = decode(body)?;
            encode(r.memory_update_by_host(req.host_uuid, req.items).await?)
        }
        RpcMethod::LldpAgentUpdateByHost => {
            let req: LldpAgentUpdate = decode(body)?;
            encode(r.lldp_agent_update_by_host(req.host_uuid, req.items).await?)
        }
        RpcMethod::LldpNeighbourUpdateByHost => {
            let req: LldpNeighbourUpdate = decode(body)?;
            encode(r.lldp_neighbour_update_by_host(req.host_uuid, req.items).await?)
        }
        RpcMethod::PlatformUpdateByHost => {
            let req: PlatformUpdate = decode(body)?;
            encode(r.platform_update_by_host(req.host_uuid, req.report).await?)
        }
        RpcMethod::SubfunctionsUpdateByHost => {
            let req: SubfunctionsUpdate = decode(body)?;
            encode(r.subfunctions_update_by_host(req.host_uuid, &req.subfunctions).await?)
        }
        RpcMethod::NotifySubfunctionsConfig => {
            encode(r.notify_subfunctions_config(decode::<HostRef>(body)?.host_uuid).await?)
        }
        RpcMethod::BmDeprovisionByHost => {
            encode(r.bm_deprovision_by_host(decode::<HostRef>(body)?.host_uuid).await?)
        }
        RpcMethod::ConfigureTtysDcd => {
            let req: TtysDcdRequest = decode(body)?;
            encode(r.configure_ttys_dcd(req.host_uuid, req.ttys_dcd).await?)
        }
        RpcMethod::GetHostTtysDcd => {
            encode(r.get_host_ttys_dcd(decode::<HostRef>(body)?.host_uuid).await?)
        }
    }
}

fn caller_class(headers: &HeaderMap) -> Result<CallerClass, ControllerError> {
    match headers.get(CallerClass::HEADER) {
        None => Ok(CallerClass::Operator),
        Some(value) => {
            let text = value
                .to_str()
                .map_err(|_| ControllerError::Validation("invalid caller header".to_string()))?;
            CallerClass::from_str(text.trim()).map_err(|_| {
                ControllerError::Validation(format!("Unknown caller class '{text}'"))
            })
        }
    }
}

fn parse_uuid(raw: &str) -> Result<Uuid, ControllerError> {
    Uuid::parse_str(raw).map_err(|_| ControllerError::host_not_found(raw))
}

async fn list_hosts(State(state): State<Arc<AppState>>) -> Json<Vec<HostView>> {
    let hosts = state.reconciler.store.list().await;
    Json(hosts.iter().map(inventory_types::Host::view).collect())
}

async fn get_host(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> Result<Json<HostView>, ControllerError> {
    let host = state.reconciler.store.host(parse_uuid(&uuid)?).await?;
    Ok(Json(host.view()))
}

async fn patch_host(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<HostView>, ControllerError> {
    let uuid = parse_uuid(&uuid)?;
    let caller = caller_class(&headers)?;
    let doc: PatchDocument = decode(&body)?;
    let view = state.lifecycle.patch_host(uuid, caller, doc).await?;
    Ok(Json(view))
}

async fn delete_host(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
) -> Result<StatusCode, ControllerError> {
    state.lifecycle.delete_host(parse_uuid(&uuid)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ControllerError> {
    let text = state.metrics.encode_text()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use axum::body::Body;
    use axum::http::Request;
    use inventory_types::{ErrorBody, ErrorKind, Host, Personality, UpsertSummary};
    use tower::ServiceExt;

    fn app(h: &Harness) -> Router {
        router(Arc::new(AppState {
            reconciler: h.reconciler.clone(),
            lifecycle: h.lifecycle.clone(),
            metrics: h.metrics.clone(),
        }))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_rpc_create_then_lookup() {
        let h = harness();
        let (status, body) = send(
            app(&h),
            post_json("/v1/rpc/create_host", serde_json::json!({"mgmt_mac": "08:00:27:20:00:01"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let created: Host = serde_json::from_slice(&body).unwrap();

        let (status, body) = send(
            app(&h),
            post_json(
                "/v1/rpc/get_host_by_macs",
                serde_json::json!({"macs": ["08:00:27:20:00:01"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let found: Host = serde_json::from_slice(&body).unwrap();
        assert_eq!(found.uuid, created.uuid);
    }

    #[tokio::test]
    async fn test_rpc_fact_update_returns_summary() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        let body = serde_json::json!({
            "host_uuid": host.uuid,
            "items": [port("eno1", "08:00:27:20:00:02")],
        });
        let (status, body) = send(app(&h), post_json("/v1/rpc/port_update_by_host", body)).await;
        assert_eq!(status, StatusCode::OK);
        let summary: UpsertSummary = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.created, 1);
    }

    #[tokio::test]
    async fn test_rpc_unknown_host_is_404() {
        let h = harness();
        let body = serde_json::json!({"host_uuid": Uuid::new_v4(), "items": []});
        let (status, body) = send(app(&h), post_json("/v1/rpc/cpus_update_by_host", body)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rpc_unknown_method_and_bad_body() {
        let h = harness();
        let (status, _) = send(app(&h), post_json("/v1/rpc/explode", serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            app(&h),
            post_json("/v1/rpc/get_host_by_macs", serde_json::json!({"mac": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_patch_uses_caller_header() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;
        let doc = serde_json::json!([{"path": "/availability", "op": "replace", "value": "available"}]);

        let request = Request::builder()
            .method("PATCH")
            .uri(format!("/v1/hosts/{}", host.uuid))
            .body(Body::from(doc.to_string()))
            .unwrap();
        let (status, _) = send(app(&h), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("PATCH")
            .uri(format!("/v1/hosts/{}", host.uuid))
            .header(CallerClass::HEADER, "mtce")
            .body(Body::from(doc.to_string()))
            .unwrap();
        let (status, body) = send(app(&h), request).await;
        assert_eq!(status, StatusCode::OK);
        let view: HostView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.host.availability, inventory_types::Availability::Available);
    }

    #[tokio::test]
    async fn test_get_list_and_delete() {
        let h = harness();
        let host = h.bound_host("worker-0", Personality::Worker).await;

        let request = Request::builder().uri("/v1/hosts").body(Body::empty()).unwrap();
        let (status, body) = send(app(&h), request).await;
        assert_eq!(status, StatusCode::OK);
        let hosts: Vec<HostView> = serde_json::from_slice(&body).unwrap();
        assert_eq!(hosts.len(), 1);

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/v1/hosts/{}", host.uuid))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(&h), request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let request = Request::builder()
            .uri(format!("/v1/hosts/{}", host.uuid))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(&h), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_and_health() {
        let h = harness();
        let _ = send(app(&h), post_json("/v1/rpc/get_host_by_hostname", serde_json::json!({"hostname": "x"}))).await;

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let (status, body) = send(app(&h), request).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("method=\"get_host_by_hostname\",outcome=\"not-found\""));

        let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let (status, _) = send(app(&h), request).await;
        assert_eq!(status, StatusCode::OK);
    }
}
