//! Main fault server implementation
//!
//! Owns the shared settings, the allocation pool and the request pipeline,
//! and wires them into one axum router.

use axum::{
    Router,
    extract::{Query, State},
    http::Uri,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use shared::InstanceId;

use crate::core::{AllocationPool, Setting, SettingsStore};
use crate::error::{FaultError, FaultResult};
use crate::pipeline::RequestPipeline;
use crate::services::{StatusPage, ThreadRngSampler};
use crate::traits::{FaultSampler, TerminalHandler};
use crate::web::handlers::{
    control::{self, ValueQuery},
    listing, probes,
};

/// Called by the exit endpoint once the acknowledgment is on its way
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Fault server with an injected sampler and terminal handler
pub struct FaultServer<R, H> {
    settings: Arc<SettingsStore>,
    pool: Arc<AllocationPool>,
    pipeline: Arc<RequestPipeline<R, H>>,
    exit_hook: ExitHook,
}

// Derive would demand R: Clone and H: Clone
impl<R, H> Clone for FaultServer<R, H> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            pool: self.pool.clone(),
            pipeline: self.pipeline.clone(),
            exit_hook: self.exit_hook.clone(),
        }
    }
}

impl FaultServer<ThreadRngSampler, StatusPage> {
    /// Production wiring: thread-local randomness and the status page
    pub fn standard(settings: Arc<SettingsStore>, pool: Arc<AllocationPool>, started_at: DateTime<Utc>) -> Self {
        let page = StatusPage::new(settings.clone(), pool.clone(), started_at);
        let pipeline = RequestPipeline::new(settings.clone(), ThreadRngSampler::new(), page);
        Self::new(settings, pool, pipeline)
    }
}

impl<R, H> FaultServer<R, H>
where
    R: FaultSampler + 'static,
    H: TerminalHandler + 'static,
{
    pub fn new(settings: Arc<SettingsStore>, pool: Arc<AllocationPool>, pipeline: RequestPipeline<R, H>) -> Self {
        Self {
            settings,
            pool,
            pipeline: Arc::new(pipeline),
            exit_hook: Arc::new(exit_process),
        }
    }

    /// Replace what the exit endpoint does after acknowledging
    pub fn with_exit_hook(mut self, hook: ExitHook) -> Self {
        self.exit_hook = hook;
        self
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn pool(&self) -> &Arc<AllocationPool> {
        &self.pool
    }

    pub fn exit_hook(&self) -> ExitHook {
        self.exit_hook.clone()
    }

    /// Build the axum router with every route
    pub fn build_router(&self) -> Router {
        let mut api = Router::new();
        for setting in Setting::ALL {
            api = api.route(
                &format!("/{}", setting.name()),
                post(
                    move |State(server): State<Self>, Query(query): Query<ValueQuery>| async move {
                        control::apply_setting(&server, setting, query)
                    },
                ),
            );
        }

        let api = api
            .route("/allocate", post(control::allocate::<R, H>))
            .route("/exit", post(control::exit::<R, H>))
            .route("/settings", get(control::get_settings::<R, H>))
            .fallback(listing::list_api);

        Router::new()
            .nest("/api", api)
            .route("/healthz", get(probes::healthz::<R, H>))
            .route("/live", get(probes::live::<R, H>))
            // Everything else is data path
            .fallback(data_path::<R, H>)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CatchPanicLayer::new()),
            )
            .with_state(self.clone())
    }

    /// Bind `addr` and serve until `shutdown` resolves
    pub async fn run<F>(&self, addr: SocketAddr, shutdown: F) -> FaultResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| FaultError::ServerStartup(format!("Failed to bind to {}: {}", addr, e)))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> FaultResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();

        let local = listener.local_addr()?;
        shared::instance_info!(InstanceId::current(), "🌐 envbin listening on http://{}", local);
        shared::instance_info!(
            InstanceId::current(),
            "🧪 fault pipeline: {}",
            self.pipeline
                .stages()
                .iter()
                .map(|stage| stage.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| FaultError::ServerStartup(format!("Server error: {}", e)))?;

        Ok(())
    }
}

fn exit_process(code: i32) {
    std::process::exit(code)
}

/// Every request without a dedicated route goes through the fault pipeline.
///
/// `/api/` slips past the nested router, so it is answered with the listing here.
async fn data_path<R, H>(State(server): State<FaultServer<R, H>>, uri: Uri) -> Response
where
    R: FaultSampler + 'static,
    H: TerminalHandler + 'static,
{
    if listing::is_api_path(uri.path()) {
        return listing::render_listing().into_response();
    }
    server.pipeline.dispatch().await
}
