//! HTTP surface of the contact service.

use std::{any::Any, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use server_api::{list_contacts, send_intro};
use shared::{
    domain::ContactId,
    error::{ApiError, ErrorBody, ErrorCode},
    protocol::{ListContactsResponse, SendIntroResponse, CONTACTS_ROUTE, SEND_INTRO_ROUTE},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::app_state::AppState;

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(cors::Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route(
            CONTACTS_ROUTE,
            get(http_list_contacts)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            SEND_INTRO_ROUTE,
            post(http_send_intro).fallback(method_not_allowed),
        )
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::AlreadySent => StatusCode::CONFLICT,
        ErrorCode::SendFailed => StatusCode::BAD_GATEWAY,
        ErrorCode::FetchFailed | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.storage.health_check().await.map_err(|err| {
        error!(error = %format!("{err:#}"), "health check failed");
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

async fn http_list_contacts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListContactsResponse>, (StatusCode, Json<ErrorBody>)> {
    let views = list_contacts(&state.api).await.map_err(|err| {
        error!(error = %err, "contact listing request failed");
        (status_for(err.code), Json(ErrorBody::from(&err)))
    })?;
    Ok(Json(ListContactsResponse::from_views(views)))
}

async fn http_send_intro(
    State(state): State<Arc<AppState>>,
    Path(contact_id): Path<String>,
) -> Result<Json<SendIntroResponse>, (StatusCode, Json<SendIntroResponse>)> {
    let contact_id = ContactId(contact_id);
    send_intro(&state.api, &contact_id)
        .await
        .map_err(|err: ApiError| {
            warn!(%contact_id, error = %err, "send intro request failed");
            (
                status_for(err.code),
                Json(SendIntroResponse::failed(err.client_message())),
            )
        })?;
    Ok(Json(SendIntroResponse::sent()))
}

async fn method_not_allowed(method: Method) -> (StatusCode, Json<ErrorBody>) {
    warn!(%method, "rejected request with unsupported method");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::from(ErrorCode::MethodNotAllowed)),
    )
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::from(ErrorCode::Internal)),
    )
        .into_response()
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
