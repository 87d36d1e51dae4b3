use std::sync::Arc;
use std::time::Duration;

use nurture_testing::fixture::Fixture;

use nurture_scheduler::domain::types::{DrainSummary, NotificationStatus};
use nurture_scheduler::infra::pacer::IntervalPacer;
use nurture_scheduler::usecase::drain::DrainQueueUseCase;

use crate::helpers::{CountingPacer, InMemoryStore, MockDelivery, MockRenderer, utc};

fn drain(
    store: InMemoryStore,
    renderer: MockRenderer,
    delivery: MockDelivery,
    pacer: CountingPacer,
) -> DrainQueueUseCase<InMemoryStore, MockRenderer, MockDelivery, CountingPacer> {
    DrainQueueUseCase {
        queue: store,
        renderer,
        delivery,
        pacer,
        batch_size: 50,
    }
}

#[tokio::test]
async fn should_send_due_items_oldest_first() {
    let store = InMemoryStore::new();
    let newer = store.push("J3", "b@example.com", utc(2025, 1, 2, 9));
    let older = store.push("J1", "a@example.com", utc(2025, 1, 1, 9));
    let delivery = MockDelivery::default();
    let sent = delivery.sent_handle();
    let uc = drain(store.clone(), MockRenderer::default(), delivery, CountingPacer::default());

    let report = uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    assert_eq!((report.processed, report.sent, report.failed), (2, 2, 0));
    let sent = sent.lock().unwrap();
    assert_eq!(sent[0].to, "a@example.com");
    assert_eq!(sent[1].to, "b@example.com");
    assert_eq!(store.get(older).item.status, NotificationStatus::Sent);
    assert_eq!(store.get(newer).item.status, NotificationStatus::Sent);
    assert_eq!(store.get(older).provider_message_id.as_deref(), Some("msg_1"));
    assert!(store.get(older).sent_at.is_some());
}

#[tokio::test]
async fn should_isolate_missing_template_failure() {
    let store = InMemoryStore::new();
    let missing = store.push("J3", "a@example.com", utc(2025, 1, 1, 9));
    let fine = store.push("J1", "b@example.com", utc(2025, 1, 1, 10));
    let pacer = CountingPacer::default();
    let uc = drain(
        store.clone(),
        MockRenderer::missing(&["J3"]),
        MockDelivery::default(),
        pacer.clone(),
    );

    let report = uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    assert_eq!((report.processed, report.sent, report.failed), (2, 1, 1));
    let failed = store.get(missing);
    assert_eq!(failed.item.status, NotificationStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("template not found: J3/fr"));
    assert_eq!(store.get(fine).item.status, NotificationStatus::Sent);
    // Nothing was sent for the broken item, so only one pause.
    assert_eq!(pacer.count(), 1);
}

#[tokio::test]
async fn should_store_render_error() {
    let store = InMemoryStore::new();
    let id = store.push("J7", "a@example.com", utc(2025, 1, 1, 9));
    let renderer = MockRenderer {
        broken: vec!["J7".to_owned()],
        ..Default::default()
    };
    let uc = drain(store.clone(), renderer, MockDelivery::default(), CountingPacer::default());

    uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    let failed = store.get(id);
    assert_eq!(failed.item.status, NotificationStatus::Failed);
    assert!(failed.error.unwrap().starts_with("render error:"));
}

#[tokio::test]
async fn should_store_provider_rejection() {
    let store = InMemoryStore::new();
    let rejected = store.push("J1", "bounce@example.com", utc(2025, 1, 1, 9));
    let fine = store.push("J1", "ok@example.com", utc(2025, 1, 1, 10));
    let uc = drain(
        store.clone(),
        MockRenderer::default(),
        MockDelivery::rejecting(&["bounce@example.com"]),
        CountingPacer::default(),
    );

    let report = uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    assert_eq!((report.sent, report.failed), (1, 1));
    let failed = store.get(rejected);
    assert_eq!(failed.item.status, NotificationStatus::Failed);
    assert!(failed.error.unwrap().contains("422"));
    assert_eq!(store.get(fine).item.status, NotificationStatus::Sent);
}

#[tokio::test]
async fn should_respect_batch_size() {
    let store = InMemoryStore::new();
    for hour in 0..5 {
        store.push("J1", &format!("r{hour}@example.com"), utc(2025, 1, 1, hour));
    }
    let mut uc = drain(
        store.clone(),
        MockRenderer::default(),
        MockDelivery::default(),
        CountingPacer::default(),
    );
    uc.batch_size = 2;

    let first = uc.execute(utc(2025, 1, 3, 0)).await.unwrap();
    let second = uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    assert_eq!(first.processed, 2);
    assert_eq!(second.processed, 2);
    let queued = store
        .notifications()
        .into_iter()
        .filter(|n| n.item.status == NotificationStatus::Queued)
        .count();
    assert_eq!(queued, 1);
}

#[tokio::test]
async fn should_hold_items_until_not_before() {
    let store = InMemoryStore::new();
    let held = store.push_with(
        "J1",
        "a@example.com",
        utc(2025, 1, 1, 9),
        Some(utc(2025, 1, 5, 0)),
        Some("lead-1"),
    );
    let uc = drain(
        store.clone(),
        MockRenderer::default(),
        MockDelivery::default(),
        CountingPacer::default(),
    );

    let early = uc.execute(utc(2025, 1, 4, 0)).await.unwrap();
    assert_eq!(early.processed, 0);
    assert_eq!(store.get(held).item.status, NotificationStatus::Queued);

    let due = uc.execute(utc(2025, 1, 5, 0)).await.unwrap();
    assert_eq!(due.sent, 1);
}

#[tokio::test]
async fn should_tag_messages_with_template_and_entity() {
    let store = InMemoryStore::new();
    store.push_with("J1", "a@example.com", utc(2025, 1, 1, 9), None, Some("lead-42"));
    store.push_with("J3", "b@example.com", utc(2025, 1, 1, 10), None, None);
    let delivery = MockDelivery::default();
    let sent = delivery.sent_handle();
    let uc = drain(store, MockRenderer::default(), delivery, CountingPacer::default());

    uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    let sent = sent.lock().unwrap();
    let tags: Vec<(&str, &str)> = sent[0]
        .tags
        .iter()
        .map(|t| (t.name.as_str(), t.value.as_str()))
        .collect();
    assert_eq!(tags, vec![("template", "J1"), ("entity_ref", "lead-42")]);
    assert_eq!(sent[1].tags[1].value, "none");
    assert_eq!(sent[0].subject, "J1 subject");
    assert_eq!(sent[0].body, "<p>Camille</p>");
}

#[tokio::test]
async fn should_pace_every_send() {
    let store = InMemoryStore::new();
    for hour in 0..3 {
        store.push("J1", &format!("r{hour}@example.com"), utc(2025, 1, 1, hour));
    }
    let pacer = CountingPacer::default();
    let uc = drain(store, MockRenderer::default(), MockDelivery::default(), pacer.clone());

    uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    assert_eq!(pacer.count(), 3);
}

#[tokio::test]
async fn should_not_resend_on_rerun() {
    let store = InMemoryStore::new();
    store.push("J1", "a@example.com", utc(2025, 1, 1, 9));
    let delivery = MockDelivery::default();
    let sent = delivery.sent_handle();
    let uc = drain(store, MockRenderer::default(), delivery, CountingPacer::default());

    uc.execute(utc(2025, 1, 3, 0)).await.unwrap();
    let rerun = uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    assert_eq!(rerun.processed, 0);
    assert_eq!(sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_report_queue_unavailable() {
    let store = InMemoryStore {
        queue_unavailable: true,
        ..InMemoryStore::new()
    };
    let uc = drain(
        store,
        MockRenderer::default(),
        MockDelivery::default(),
        CountingPacer::default(),
    );

    let err = uc.execute(utc(2025, 1, 3, 0)).await.unwrap_err();

    assert_eq!(err.kind(), "QUEUE_UNAVAILABLE");
}

#[tokio::test(start_paused = true)]
async fn should_space_sends_with_interval_pacer() {
    let store = InMemoryStore::new();
    for hour in 0..3 {
        store.push("J1", &format!("r{hour}@example.com"), utc(2025, 1, 1, hour));
    }
    let uc = DrainQueueUseCase {
        queue: store,
        renderer: MockRenderer::default(),
        delivery: MockDelivery::default(),
        pacer: Arc::new(IntervalPacer::new(Duration::from_millis(600))),
        batch_size: 50,
    };

    let start = tokio::time::Instant::now();
    let report = uc.execute(utc(2025, 1, 3, 0)).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.sent, 3);
    assert!(elapsed >= Duration::from_millis(1200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1210), "{elapsed:?}");
}

#[tokio::test]
async fn should_summarize_empty_queue_as_contract() {
    let uc = drain(
        InMemoryStore::new(),
        MockRenderer::default(),
        MockDelivery::default(),
        CountingPacer::default(),
    );

    let report = uc.execute(utc(2025, 1, 3, 0)).await.unwrap();

    let body = serde_json::to_value(DrainSummary::new(report, 0)).unwrap();
    let fixture = Fixture::load("contracts/http/scheduler/drain_summary.json");
    assert_eq!(body, fixture["expect"]["body"]);
}
