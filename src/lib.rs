use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Authentication and authorization core.
pub mod auth;
pub mod error;
pub mod namespace;
pub mod password;
pub mod token;

// Collaborators: persistence, storage, configuration, HTTP surface.
pub mod audit;
pub mod config;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::TokenState;
pub use config::AppConfig;
pub use password::PasswordHasher;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};
pub use token::TokenService;

/// ApiDoc
///
/// OpenAPI document assembled from the `#[utoipa::path]` handlers and the
/// `ToSchema` models. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::get_me,
        handlers::list_users, handlers::get_user, handlers::update_user,
        handlers::create_user, handlers::delete_user,
        handlers::get_upload_url, handlers::get_download_url
    ),
    components(
        schemas(
            models::Role, models::RegisterRequest, models::RegisterResponse,
            models::LoginRequest, models::TokenResponse, models::MeResponse,
            models::CreateUserRequest, models::UpdateUserRequest, models::UserResponse,
            models::UploadUrlResponse, models::DownloadUrlResponse,
            models::MessageResponse, error::ErrorBody,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "user-portal", description = "Accounts, users and file links")
    )
)]
struct ApiDoc;

/// Registers the `bearer` HTTP security scheme referenced by the
/// authenticated paths.
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// AppState
///
/// Implements the **Unified State Pattern**: the single immutable container
/// shared by every request. Nothing in it is mutated after startup; the
/// token service in particular keeps the signing secret fixed for the process
/// lifetime.
#[derive(Clone)]
pub struct AppState {
    /// Credential Store.
    pub repo: RepositoryState,
    /// Presigned URL issuance.
    pub storage: StorageState,
    /// The loaded environment configuration.
    pub config: AppConfig,
    /// Token issuer/verifier keyed by `config.jwt_secret`.
    pub tokens: TokenState,
    /// Argon2 hasher with the configured work factor.
    pub hasher: PasswordHasher,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.tokens.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for `authenticated_routes`. Extracting `AuthUser`
/// runs the full verification; on failure the extractor's rejection (uniform
/// 401) is returned and the handler never runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers authenticate and check the role themselves through
        // the `AdminUser` extractor.
        .merge(admin::admin_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// Builds the per-request span. Headers are not recorded wholesale so the
/// bearer token never reaches the logs.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
