//! Opportunistic polling driven by API traffic
//!
//! When a cycle is due (last run older than the poll interval), an inbound
//! API request spawns one in the background. The request itself never waits
//! on the cycle, and a cycle already in progress is left alone.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::engine::{PollOutcome, PollTrigger};
use crate::handlers::AppState;

pub async fn lazy_poll(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    // the manual trigger runs its own cycle
    let manual = request.uri().path().ends_with("/poll");

    if state.lazy_poll && !manual && !state.engine.lock().is_held() {
        let engine = state.engine.clone();
        tokio::spawn(async move {
            match engine.poll_if_due(PollTrigger::Lazy).await {
                Ok(Some(PollOutcome::Completed(report))) => {
                    tracing::debug!(new_transactions = report.new_transactions, "Lazy poll completed");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Lazy poll failed"),
            }
        });
    }

    next.run(request).await
}
