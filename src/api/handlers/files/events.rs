use crate::AppState;
use crate::api::error::AppError;
use crate::services::tenant::Principal;
use axum::{
    Extension,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;

use super::require_principal;

#[utoipa::path(
    get,
    path = "/files/events",
    responses(
        (status = 200, description = "Server-sent stream of change events in the caller's scope"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "files"
)]
pub async fn file_events(
    State(state): State<AppState>,
    principal: Option<Extension<Principal>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (principal, scope) = require_principal(principal)?;
    let mut rx = state.changes.subscribe();
    let scope_id = scope.partition_key();

    tracing::info!("📡 {} subscribed to changes in {}", principal.user_id, scope);

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if event.scope_id == scope_id => {
                    match Event::default().event("change").json_data(&event) {
                        Ok(sse_event) => yield Ok(sse_event),
                        Err(e) => tracing::warn!("Could not encode change event: {}", e),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Change subscriber in {} lagged, skipped {} events", scope_id, missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
