//! Health and liveness probes

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::server_impl::FaultServer;
use crate::traits::{FaultSampler, TerminalHandler};

fn probe_response(ok: bool) -> impl IntoResponse {
    if ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "error")
    }
}

/// `/healthz`
pub async fn healthz<R, H>(State(server): State<FaultServer<R, H>>) -> impl IntoResponse
where
    R: FaultSampler + 'static,
    H: TerminalHandler + 'static,
{
    probe_response(server.settings().is_healthy())
}

/// `/live`
pub async fn live<R, H>(State(server): State<FaultServer<R, H>>) -> impl IntoResponse
where
    R: FaultSampler + 'static,
    H: TerminalHandler + 'static,
{
    probe_response(server.settings().is_live())
}
