use std::sync::Arc;
use std::time::Duration;

use sea_orm::Database;
use tracing::info;

use nurture_core::tracing::init_tracing;
use nurture_scheduler::config::SchedulerConfig;
use nurture_scheduler::handlers::auth::CronSecret;
use nurture_scheduler::infra::delivery::ResendDelivery;
use nurture_scheduler::infra::links::UnsubscribeLinks;
use nurture_scheduler::infra::pacer::IntervalPacer;
use nurture_scheduler::router::build_router;
use nurture_scheduler::state::AppState;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() {
    init_tracing();

    let config = SchedulerConfig::from_env().expect("invalid scheduler configuration");

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let links = UnsubscribeLinks::new(&config.public_base_url, &config.unsubscribe_secret)
        .expect("invalid PUBLIC_BASE_URL");

    let http = reqwest::Client::builder()
        .timeout(DELIVERY_TIMEOUT)
        .build()
        .expect("failed to build HTTP client");

    let delivery = ResendDelivery::new(
        http,
        config.resend_api_url,
        config.resend_api_key,
        config.resend_from_email,
        config.resend_reply_to,
    );

    info!(
        lead_steps = config.plan.leads().steps().len(),
        event_steps = config.plan.events().steps().len(),
        drain_batch_size = config.drain_batch_size,
        send_interval_ms = config.send_interval.as_millis() as u64,
        "offset tables validated"
    );

    let state = AppState {
        db,
        cron_secret: CronSecret::new(&config.cron_secret),
        plan: Arc::new(config.plan),
        links,
        delivery,
        pacer: Arc::new(IntervalPacer::new(config.send_interval)),
        default_locale: config.default_locale,
        lead_launch_date: config.lead_launch_date,
        drain_batch_size: config.drain_batch_size,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.scheduler_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("scheduler service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
