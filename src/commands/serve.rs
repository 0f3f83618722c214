use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::controllers::paste::{PasteError, Pastes};
use crate::error::ApiError;
use crate::render::Pages;
use crate::storage::{AnyStore, Store};
use crate::types::api::{CreatePaste, Health, PasteContent, PasteCreated, ServiceInfo};
use crate::App;

/// Header carrying the current time in test mode, in epoch milliseconds.
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::new(app.config.host, app.config.port);

    if app.config.test_mode {
        info!("test mode enabled, {TEST_NOW_HEADER} sets the current time");
    }

    let router = router(app);

    info!("listening on http://{addr}");
    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/healthz", get(health))
        .route("/api/pastes", post(create_paste))
        .route("/api/pastes/:id", get(get_paste))
        .route("/p/:id", get(view_paste))
        .fallback(no_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(err) => {
            warn!("failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await
        }
    }
}

/// The instant a request is evaluated at, as decided by the configured [`Clock`].
pub struct RequestNow(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for RequestNow
where
    Clock: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let requested = parts
            .headers
            .get(TEST_NOW_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok());

        Ok(RequestNow(Clock::from_ref(state).now(requested)))
    }
}

async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

async fn no_route() -> ApiError {
    ApiError::NoRoute
}

async fn health(State(store): State<AnyStore>) -> (StatusCode, Json<Health>) {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Health {
                ok: true,
                error: None,
            }),
        ),
        Err(err) => {
            warn!("health check failed: {err}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Health {
                    ok: false,
                    error: Some("store connection failed"),
                }),
            )
        }
    }
}

async fn create_paste(
    State(config): State<Config>,
    State(pastes): State<Pastes<AnyStore>>,
    RequestNow(now): RequestNow,
    headers: HeaderMap,
    payload: Result<Json<CreatePaste>, JsonRejection>,
) -> crate::ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let new = payload.into_new_paste().map_err(ApiError::creating)?;
    let paste = pastes.create(new, now).await.map_err(ApiError::creating)?;

    info!(
        "new paste: id='{id}', size={size}, expires_at={expires_at:?}, max_views={max_views:?}",
        id = paste.id,
        size = paste.content.len(),
        expires_at = paste.expires_at,
        max_views = paste.max_views,
    );

    let path = format!("/p/{}", paste.id);
    let url = paste_url(config.base_url.as_deref(), &headers, &paste.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, path)],
        Json(PasteCreated { id: paste.id, url }),
    ))
}

async fn get_paste(
    State(pastes): State<Pastes<AnyStore>>,
    RequestNow(now): RequestNow,
    Path(id): Path<String>,
) -> crate::ApiResult<Json<PasteContent>> {
    let delivery = pastes.consume(&id, now).await.map_err(ApiError::fetching)?;
    Ok(Json(delivery.into()))
}

async fn view_paste(
    State(pastes): State<Pastes<AnyStore>>,
    State(pages): State<Arc<Pages>>,
    RequestNow(now): RequestNow,
    Path(id): Path<String>,
) -> Response {
    let rendered = match pastes.consume(&id, now).await {
        Ok(delivery) => pages
            .paste(&PasteContent::from(delivery))
            .map(|html| (StatusCode::OK, html)),
        Err(PasteError::NotFound) => pages
            .error("Paste Not Found", "This paste does not exist or has expired.")
            .map(|html| (StatusCode::NOT_FOUND, html)),
        Err(err) => {
            error!("failed to fetch paste '{id}': {err}");
            pages
                .error("Error", "Failed to fetch paste.")
                .map(|html| (StatusCode::INTERNAL_SERVER_ERROR, html))
        }
    };

    match rendered {
        Ok((status, html)) => (status, Html(html)).into_response(),
        Err(err) => {
            error!("failed to render page: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Public link to a paste, from the configured base URL or the request's own host.
fn paste_url(base_url: Option<&str>, headers: &HeaderMap, id: &str) -> String {
    if let Some(base_url) = base_url {
        return format!("{}/p/{id}", base_url.trim_end_matches('/'));
    }

    let proto = header_str(headers, "x-forwarded-proto").unwrap_or("http");
    let host = header_str(headers, "x-forwarded-host")
        .or_else(|| header_str(headers, header::HOST.as_str()))
        .unwrap_or("localhost");
    format!("{proto}://{host}/p/{id}")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
