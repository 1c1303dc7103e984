//! Dependency HTTP server.
//!
//! Exposes the dependency graph of a task and the create/delete operations
//! on edges. The caller's team arrives in the `x-team-id` header, set by the
//! authentication layer in front of this service.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, FromRequestParts, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::domain::errors::DomainError;
use crate::domain::models::{
    parse_task_id, CreateDependencyRequest, DeleteDependencyRequest, DependencyEdge, DependencyView,
    ServerConfig, TenantContext,
};
use crate::domain::ports::DependencyRepository;
use crate::services::{DependencyQueryService, DependencyService};

/// Header carrying the caller's team id.
pub const TEAM_HEADER: &str = "x-team-id";

/// Configuration for the dependency HTTP server.
#[derive(Debug, Clone)]
pub struct DependencyHttpConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable CORS.
    pub enable_cors: bool,
}

impl Default for DependencyHttpConfig {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for DependencyHttpConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
        }
    }
}

/// Query parameters for `GET /dependencies`.
#[derive(Debug, Deserialize)]
pub struct DependencyQueryParams {
    #[serde(default, rename = "taskId", alias = "task_id")]
    pub task_id: Option<String>,
}

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    fn ok() -> Self {
        Self {
            success: true,
            data: None,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

/// An error already mapped to its HTTP status and error code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_ERROR",
            message: message.into(),
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let (status, code, message) = match &err {
            DomainError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            DomainError::TaskNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", "Task not found".to_string()),
            DomainError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            DomainError::DependencyCycle(_) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                "Dependency would create a cycle".to_string(),
            ),
            DomainError::DuplicateDependency { .. } => {
                (StatusCode::CONFLICT, "CONFLICT", "Dependency already exists".to_string())
            }
            DomainError::DatabaseError(_) | DomainError::SerializationError(_) => {
                error!(error = %err, "dependency request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        if err.is_client_error() {
            debug!(error = %err, status = status.as_u16(), "dependency request rejected");
        }

        Self { status, code, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.message,
            code: self.code.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Caller tenant taken from the `x-team-id` header.
///
/// A missing header means a caller without a team; a malformed one is
/// rejected with 400.
#[derive(Debug, Clone, Copy)]
pub struct CallerTenant(pub TenantContext);

impl<S: Send + Sync> FromRequestParts<S> for CallerTenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(TEAM_HEADER) else {
            return Ok(Self(TenantContext::default()));
        };
        let raw = value
            .to_str()
            .map_err(|_| ApiError::bad_request(format!("{TEAM_HEADER} must be a valid UUID")))?;
        let tenant_id = parse_task_id(TEAM_HEADER, Some(raw.trim()))?;
        Ok(Self(TenantContext::team(tenant_id)))
    }
}

/// Shared state for the dependency HTTP server.
struct AppState<R: DependencyRepository> {
    queries: DependencyQueryService<R>,
    mutations: DependencyService<R>,
}

/// Dependency HTTP server.
pub struct DependencyHttpServer<R: DependencyRepository + 'static> {
    config: DependencyHttpConfig,
    queries: DependencyQueryService<R>,
    mutations: DependencyService<R>,
}

impl<R: DependencyRepository + 'static> DependencyHttpServer<R> {
    /// Wire the services into a server with `config`.
    pub fn new(
        queries: DependencyQueryService<R>,
        mutations: DependencyService<R>,
        config: DependencyHttpConfig,
    ) -> Self {
        Self {
            config,
            queries,
            mutations,
        }
    }

    /// Build the router.
    pub fn build_router(self) -> Router {
        let state = Arc::new(AppState {
            queries: self.queries,
            mutations: self.mutations,
        });

        let app = Router::new()
            .route(
                "/dependencies",
                get(get_dependencies::<R>)
                    .post(create_dependency::<R>)
                    .delete(delete_dependency::<R>),
            )
            .route("/health", get(health_check))
            .with_state(state);

        if self.config.enable_cors {
            app.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http())
        } else {
            app.layer(TraceLayer::new_for_http())
        }
    }

    fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.config.host, self.config.port).parse()
    }

    /// Start the server.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the server and stop once `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.addr()?;
        let router = self.build_router();

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Dependency HTTP server listening on {}", addr);

        axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;
        tracing::info!("Dependency HTTP server stopped");
        Ok(())
    }
}

// Handler functions

async fn health_check() -> &'static str {
    "OK"
}

async fn get_dependencies<R: DependencyRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    CallerTenant(ctx): CallerTenant,
    params: Result<Query<DependencyQueryParams>, QueryRejection>,
) -> Result<Json<ApiResponse<DependencyView>>, ApiError> {
    let Query(params) = params?;
    let task_id = parse_task_id("taskId", params.task_id.as_deref())?;
    let view = state.queries.get_dependencies(task_id, &ctx).await?;
    Ok(Json(ApiResponse::data(view)))
}

async fn create_dependency<R: DependencyRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    CallerTenant(ctx): CallerTenant,
    body: Result<Json<CreateDependencyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<DependencyEdge>>), ApiError> {
    let Json(request) = body?;
    let edge = state.mutations.create_dependency(request, &ctx).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(edge))))
}

async fn delete_dependency<R: DependencyRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    CallerTenant(ctx): CallerTenant,
    body: Result<Json<DeleteDependencyRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(request) = body?;
    state.mutations.delete_dependency(request, &ctx).await?;
    Ok(Json(ApiResponse::ok()))
}
