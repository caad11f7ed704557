//! Control endpoints mutating the shared fault settings

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use shared::InstanceId;

use crate::core::{PoolStats, Setting, SettingValue, SettingsSnapshot};
use crate::error::FaultError;
use crate::server_impl::FaultServer;
use crate::traits::{FaultSampler, TerminalHandler};

/// Time given to the exit acknowledgment to reach the client
pub const EXIT_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Deserialize)]
pub struct ValueQuery {
    pub value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExitQuery {
    pub code: Option<String>,
}

/// Read half of the control surface
#[derive(Debug, Serialize)]
pub struct SettingsReport {
    #[serde(flatten)]
    pub settings: SettingsSnapshot,
    pub allocation: PoolStats,
}

fn bad_request(err: &FaultError) -> Response {
    (StatusCode::BAD_REQUEST, format!("{err}\n")).into_response()
}

/// Acknowledgment sent back once a setting is stored
pub fn confirmation(setting: Setting, value: SettingValue) -> String {
    match setting {
        Setting::Delay => format!("Delay set to {value}\n"),
        Setting::Bandwidth => format!("Bandwidth set to {value} bytes/s\n"),
        Setting::ErrorRate => format!("Error rate set to {value}\n"),
        Setting::CpuTarget => format!("CPU usage set to {value}\n"),
        Setting::Health => format!("Health check set to {value}\n"),
        Setting::Liveness => format!("Liveness check set to {value}\n"),
    }
}

/// Parse and store one setting. A missing value is parsed as empty and rejected.
pub fn apply_setting<R, H>(server: &FaultServer<R, H>, setting: Setting, query: ValueQuery) -> Response
where
    R: FaultSampler + 'static,
    H: TerminalHandler + 'static,
{
    let raw = query.value.unwrap_or_default();
    match server.settings().apply(setting, &raw) {
        Ok(value) => {
            shared::instance_info!(InstanceId::current(), "🔧 {} set to {}", setting, value);
            confirmation(setting, value).into_response()
        }
        Err(e) => {
            shared::instance_warn!(InstanceId::current(), "❌ rejected {} update: {}", setting, e);
            bad_request(&e)
        }
    }
}

/// `/api/allocate`
pub async fn allocate<R, H>(
    State(server): State<FaultServer<R, H>>,
    Query(query): Query<ValueQuery>,
) -> Response
where
    R: FaultSampler + 'static,
    H: TerminalHandler + 'static,
{
    let raw = query.value.unwrap_or_default();
    let bytes = match raw.parse::<u64>() {
        Ok(bytes) => bytes,
        Err(e) => return bad_request(&FaultError::parse("allocate", raw, e)),
    };

    let pool = server.pool().clone();
    let result = tokio::task::spawn_blocking(move || pool.allocate(bytes)).await;

    match result {
        Ok(Ok(total)) => {
            shared::instance_info!(
                InstanceId::current(),
                "🧱 allocated {} bytes (pool total {} bytes)",
                bytes,
                total
            );
            format!("Allocating {bytes} bytes\n").into_response()
        }
        Ok(Err(e)) => {
            shared::logging::log_error(InstanceId::current(), "Allocation", &e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n")).into_response()
        }
        Err(e) => {
            shared::logging::log_error(InstanceId::current(), "Allocation task", &e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n")).into_response()
        }
    }
}

/// `/api/exit`: acknowledge, then end the process with the requested code
pub async fn exit<R, H>(State(server): State<FaultServer<R, H>>, Query(query): Query<ExitQuery>) -> Response
where
    R: FaultSampler + 'static,
    H: TerminalHandler + 'static,
{
    let raw = query.code.unwrap_or_default();
    let code = match raw.parse::<i32>() {
        Ok(code) => code,
        Err(e) => return bad_request(&FaultError::parse("exit", raw, e)),
    };

    shared::logging::log_shutdown(InstanceId::current(), &format!("exit requested with code {code}"));

    let hook = server.exit_hook();
    tokio::spawn(async move {
        tokio::time::sleep(EXIT_GRACE).await;
        hook(code);
    });

    format!("Exiting {code}\n").into_response()
}

/// `GET /api/settings`
pub async fn get_settings<R, H>(State(server): State<FaultServer<R, H>>) -> Json<SettingsReport>
where
    R: FaultSampler + 'static,
    H: TerminalHandler + 'static,
{
    Json(SettingsReport {
        settings: server.settings().snapshot(),
        allocation: server.pool().stats(),
    })
}
