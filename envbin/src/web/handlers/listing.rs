//! Self-describing listing of the control API

/// One control route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiRoute {
    pub method: &'static str,
    pub path: &'static str,
    pub query: &'static str,
}

pub const API_ROUTES: &[ApiRoute] = &[
    ApiRoute { method: "POST", path: "/api/delay", query: "value=<seconds>" },
    ApiRoute { method: "POST", path: "/api/bandwidth", query: "value=<bytes per second>" },
    ApiRoute { method: "POST", path: "/api/errorrate", query: "value=<probability>" },
    ApiRoute { method: "POST", path: "/api/cpu", query: "value=<cores>" },
    ApiRoute { method: "POST", path: "/api/health", query: "value=<true|false>" },
    ApiRoute { method: "POST", path: "/api/liveness", query: "value=<true|false>" },
    ApiRoute { method: "POST", path: "/api/allocate", query: "value=<bytes>" },
    ApiRoute { method: "POST", path: "/api/exit", query: "code=<exit code>" },
    ApiRoute { method: "GET", path: "/api/settings", query: "" },
];

/// Render the listing, one `METHOD path?query` line per route
pub fn render_listing() -> String {
    API_ROUTES
        .iter()
        .map(|route| {
            if route.query.is_empty() {
                format!("{} {}\n", route.method, route.path)
            } else {
                format!("{} {}?{}\n", route.method, route.path, route.query)
            }
        })
        .collect()
}

/// Whether `path` lies under the control API prefix
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

/// Fallback for unknown paths under `/api`
pub async fn list_api() -> String {
    render_listing()
}
