use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenService;
use crate::config::{AppConfig, MediaConfig};
use crate::database::{PgStore, Store};
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{
    CloudinaryMedia, DisabledGeocoder, DisabledMedia, Geocoder, GoogleGeocoder, MediaStore,
    PlaceService, UserService,
};

/// Handles shared by every request. Cloning is cheap; all members are
/// reference counted.
#[derive(Clone)]
pub struct AppState {
    pub places: PlaceService,
    pub users: UserService,
    pub tokens: TokenService,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        geocoder: Arc<dyn Geocoder>,
        media: Arc<dyn MediaStore>,
        tokens: TokenService,
        folders: &MediaConfig,
    ) -> Self {
        Self {
            places: PlaceService::new(
                store.clone(),
                geocoder,
                media.clone(),
                folders.places_folder.clone(),
            ),
            users: UserService::new(
                store.clone(),
                media,
                tokens.clone(),
                folders.users_folder.clone(),
            ),
            tokens,
            store,
        }
    }

    /// Production wiring: PostgreSQL store plus whichever upstream adapters
    /// have credentials configured
    pub fn from_config(config: &AppConfig, pool: PgPool) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.api.upstream_timeout_secs);

        let geocoder: Arc<dyn Geocoder> = match &config.geocoding.api_key {
            Some(key) => Arc::new(GoogleGeocoder::new(
                key.clone(),
                config.geocoding.base_url.clone(),
                timeout,
            )?),
            None => {
                tracing::warn!("GOOGLE_API_KEY not set; place creation will fail until it is");
                Arc::new(DisabledGeocoder)
            }
        };

        let media: Arc<dyn MediaStore> = match config.media.credentials() {
            Some((cloud, key, secret)) => Arc::new(CloudinaryMedia::new(
                &config.media.base_url,
                cloud,
                key,
                secret,
                timeout,
            )?),
            None => {
                tracing::warn!("Cloudinary credentials not set; image uploads are disabled");
                Arc::new(DisabledMedia)
            }
        };

        let tokens = TokenService::new(
            &config.security.jwt_secret,
            config.security.jwt_expiry_hours,
        )?;

        Ok(Self::new(
            Arc::new(PgStore::new(pool)),
            geocoder,
            media,
            tokens,
            &config.media,
        ))
    }
}

pub fn app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API
        .merge(protected_routes(state.clone()))
        .fallback(route_not_found)
        // Global middleware
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{places, users};

    Router::new()
        .route("/api/users", get(users::list))
        .route("/api/users/signup", post(users::signup))
        .route("/api/users/signin", post(users::signin))
        .route("/api/places/:pid", get(places::get))
        .route("/api/places/user/:uid", get(places::list_by_user))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::places;

    Router::new()
        .route("/api/places", post(places::post))
        .route("/api/places/:pid", patch(places::patch).delete(places::delete))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-requested-with"),
        ])
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Places API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "users": "/api/users, /api/users/signup, /api/users/signin (public)",
            "places": "/api/places/:pid, /api/places/user/:uid (public)",
            "manage": "POST /api/places, PATCH|DELETE /api/places/:pid (protected)",
            "health": "/health (public)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "timestamp": now })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "timestamp": now })),
            )
        }
    }
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Could not find this route.")
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!("Request handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "An unknown error occurred!" })),
    )
        .into_response()
}
