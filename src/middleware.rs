use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::database::AppState;

/// Middleware to check for Authorization header
///
/// When the service was configured with a shared secret
/// ([`crate::config::Config::auth_token`]), the request must carry an
/// `Authorization` header with exactly that value. Without a secret every
/// request passes.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(secret) = state.config.auth_token.as_deref() {
        let provided = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        if provided != Some(secret) {
            warn!(path = %request.uri().path(), "rejected request without valid authorization");
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Unauthorized",
                    "message": "Invalid or missing authorization header"
                })),
            )
                .into_response());
        }
    }

    Ok(next.run(request).await)
}
