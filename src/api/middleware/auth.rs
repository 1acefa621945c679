use crate::AppState;
use crate::services::tenant::Principal;
use crate::utils::auth::validate_jwt;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// Attaches the caller's [`Principal`] when a token is presented.
///
/// Anonymous requests pass through without one; handlers decide whether
/// that means 401 or an empty result. A token that fails validation is
/// always rejected.
pub async fn identify_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let token = if let Some(t) = auth_header {
        Some(t)
    } else {
        // EventSource clients cannot set headers
        let query = req.uri().query().unwrap_or_default();
        serde_urlencoded::from_str::<AuthQuery>(query)
            .ok()
            .and_then(|q| q.token)
    };

    let Some(token) = token else {
        return Ok(next.run(req).await);
    };

    match validate_jwt(
        &token,
        &state.config.jwt_secret,
        state.config.jwt_public_key.as_deref(),
    ) {
        Ok(claims) => {
            req.extensions_mut().insert(Principal::from(claims));
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!("Rejected bearer token: {}", e);
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
