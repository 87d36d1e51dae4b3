use axum::{Router, routing::get};
use tower::ServiceBuilder;

use nurture_core::health::healthz;
use nurture_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{
    cron::{run_cycle, run_drain},
    health::readyz,
    unsubscribe::unsubscribe,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Platform cron triggers
        .route("/cron/cycle", get(run_cycle).post(run_cycle))
        .route("/cron/drain", get(run_drain).post(run_drain))
        // Email footer link
        .route("/unsubscribe", get(unsubscribe))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(trace_layer())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
