//! Local HTTP adapter.
//!
//! Turns plain HTTP requests into [`InboundEvent`]s and envelopes back into
//! responses, so the handler can be exercised without an API gateway. The
//! request path stands in for the route template.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::event::{Envelope, InboundEvent};
use crate::response::{self, OperationResult};
use crate::router::{RequestRouter, SYSTEM_EXCEPTION};

/// Build the axum application. Every path goes through the request router.
pub fn app(router: Arc<RequestRouter>) -> Router {
    Router::new().fallback(handle).with_state(router)
}

/// Serve `router` on `addr` until the process is stopped.
pub async fn serve(router: Arc<RequestRouter>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app(router)).await
}

// Extraction failures are answered with an envelope too, never axum's
// plain-text rejection.
async fn handle(
    State(router): State<Arc<RequestRouter>>,
    method: Method,
    uri: Uri,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let envelope = match read_request(&method, &uri, query, body) {
        Ok(event) => router.handle(&event).await,
        Err(reason) => {
            warn!("error=unreadable_request, api={method}{}: {reason}", uri.path());
            unreadable_request()
        }
    };
    envelope_into_response(envelope)
}

fn read_request(
    method: &Method,
    uri: &Uri,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<InboundEvent, String> {
    let Query(params) = query.map_err(|e| e.body_text())?;
    let body = body.map_err(|e| e.body_text())?;
    let body = String::from_utf8(body.to_vec()).map_err(|e| format!("body is not UTF-8: {e}"))?;
    Ok(event_from_http(method, uri, params, body))
}

/// Envelope for a request that could not be read into an event.
pub fn unreadable_request() -> Envelope {
    response::format(Err(OperationResult::failure(SYSTEM_EXCEPTION)))
}

/// Translate an HTTP request into an event.
pub fn event_from_http(
    method: &Method,
    uri: &Uri,
    params: HashMap<String, String>,
    body: String,
) -> InboundEvent {
    InboundEvent {
        http_method: Some(method.as_str().to_string()),
        resource: uri.path().to_string(),
        query_string_parameters: (!params.is_empty()).then_some(params),
        body: (!body.is_empty()).then_some(body),
    }
}

/// Translate an envelope into an HTTP response.
pub fn envelope_into_response(envelope: Envelope) -> Response {
    let status = envelope
        .status_code
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = Response::new(Body::from(envelope.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in envelope.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("dropping invalid header {name}"),
        }
    }

    response
}
