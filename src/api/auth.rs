use crate::routing_utils::UnauthorizedResponse;
use axum::extract::Request;
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::info;

/// Pulls the token out of an `Authorization: Bearer <token>` header. Blank tokens count as missing.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let authorization = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = authorization.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware rejecting any request which doesn't carry a bearer token. The token itself
/// is not verified here.
pub async fn require_bearer_token(request: Request, next: Next) -> Response {
    if extract_bearer_token(request.headers()).is_none() {
        info!(path = request.uri().path(), "Rejected request without bearer token");
        return UnauthorizedResponse.into_response();
    }

    next.run(request).await
}
