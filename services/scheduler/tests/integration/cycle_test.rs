use nurture_testing::fixture::Fixture;

use nurture_scheduler::domain::types::NotificationStatus;
use nurture_scheduler::usecase::cycle::RunCycleUseCase;
use nurture_scheduler::usecase::drain::DrainQueueUseCase;
use nurture_scheduler::usecase::enqueue::EnqueuePhaseUseCase;

use crate::helpers::{
    CountingPacer, InMemoryStore, MockAnchorSource, MockDelivery, MockRenderer, MockSuppressions,
    entity, event_sequence, j_sequence, links, utc,
};

type Phase = EnqueuePhaseUseCase<MockAnchorSource, MockSuppressions, InMemoryStore>;
type Drain = DrainQueueUseCase<InMemoryStore, MockRenderer, MockDelivery, CountingPacer>;

struct Harness {
    store: InMemoryStore,
    delivery: MockDelivery,
    cycle: RunCycleUseCase<Phase, Phase, Drain>,
}

fn harness(leads: MockAnchorSource, events: MockAnchorSource, renderer: MockRenderer) -> Harness {
    harness_with(leads, events, renderer, MockSuppressions::default())
}

fn harness_with(
    leads: MockAnchorSource,
    events: MockAnchorSource,
    renderer: MockRenderer,
    suppressions: MockSuppressions,
) -> Harness {
    let store = InMemoryStore::new();
    let delivery = MockDelivery::default();
    let cycle = RunCycleUseCase {
        leads: EnqueuePhaseUseCase {
            source: leads,
            suppressions: suppressions.clone(),
            ledger: store.clone(),
            sequence: j_sequence(),
            links: links(),
        },
        events: EnqueuePhaseUseCase {
            source: events,
            suppressions,
            ledger: store.clone(),
            sequence: event_sequence(),
            links: links(),
        },
        drain: DrainQueueUseCase {
            queue: store.clone(),
            renderer,
            delivery: delivery.clone(),
            pacer: CountingPacer::default(),
            batch_size: 50,
        },
    };
    Harness {
        store,
        delivery,
        cycle,
    }
}

#[tokio::test]
async fn should_enqueue_both_phases_then_drain() {
    let h = harness(
        MockAnchorSource::new(vec![entity("lead-1", "lead@example.com", utc(2025, 1, 1, 10))]),
        MockAnchorSource::new(vec![entity("event-1", "guest@example.com", utc(2025, 1, 1, 0))]),
        MockRenderer::missing(&["B2C_AVIS_GOOGLE"]),
    );

    let summary = h.cycle.execute(utc(2025, 1, 2, 10)).await.unwrap();

    let mut body = serde_json::to_value(&summary).unwrap();
    body["duration_ms"] = 0.into();
    let fixture = Fixture::load("contracts/http/scheduler/cycle_summary.json");
    assert_eq!(body, fixture["expect"]["body"]);

    let sent = h.delivery.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "lead@example.com");
}

#[tokio::test]
async fn should_be_idempotent_across_cycles() {
    let h = harness(
        MockAnchorSource::new(vec![entity("lead-1", "lead@example.com", utc(2025, 1, 1, 10))]),
        MockAnchorSource::new(vec![]),
        MockRenderer::default(),
    );

    let first = h.cycle.execute(utc(2025, 1, 2, 10)).await.unwrap();
    let second = h.cycle.execute(utc(2025, 1, 2, 11)).await.unwrap();

    assert_eq!(first.queued_by_phase["leads"], 1);
    assert_eq!(first.sent, 1);
    assert_eq!(second.queued_by_phase["leads"], 0);
    assert_eq!(second.processed, 0);
    assert_eq!(h.delivery.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_drain_events_when_lead_source_is_down() {
    let h = harness(
        MockAnchorSource::unavailable(),
        MockAnchorSource::new(vec![entity("event-1", "guest@example.com", utc(2025, 1, 1, 0))]),
        MockRenderer::default(),
    );

    let summary = h.cycle.execute(utc(2025, 1, 2, 0)).await.unwrap();

    assert_eq!(summary.queued_by_phase["leads"], 0);
    assert_eq!(summary.queued_by_phase["events"], 1);
    assert_eq!(summary.sent, 1);
    let statuses: Vec<_> = h.store.notifications().iter().map(|n| n.item.status).collect();
    assert_eq!(statuses, vec![NotificationStatus::Sent]);
}

#[tokio::test]
async fn should_abort_before_drain_when_ledger_is_down() {
    let mut h = harness(
        MockAnchorSource::new(vec![entity("lead-1", "lead@example.com", utc(2025, 1, 1, 10))]),
        MockAnchorSource::new(vec![]),
        MockRenderer::default(),
    );
    h.store.push("J1", "earlier@example.com", utc(2024, 12, 31, 0));
    h.cycle.leads.ledger.ledger_unavailable = true;

    let err = h.cycle.execute(utc(2025, 1, 2, 10)).await.unwrap_err();

    assert_eq!(err.kind(), "LEDGER_UNAVAILABLE");
    assert!(h.delivery.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_report_notifications_queued_before_a_phase_aborted() {
    let h = harness_with(
        MockAnchorSource::new(vec![
            entity("lead-1", "first@example.com", utc(2025, 1, 1, 10)),
            entity("lead-2", "second@example.com", utc(2025, 1, 1, 10)),
        ]),
        MockAnchorSource::new(vec![]),
        MockRenderer::default(),
        MockSuppressions::failing_after(1),
    );

    let summary = h.cycle.execute(utc(2025, 1, 2, 10)).await.unwrap();

    assert_eq!(summary.queued_by_phase["leads"], 1);
    assert_eq!(summary.queued_by_phase["events"], 0);
    assert_eq!(h.store.notifications().len(), 1);
    assert_eq!(summary.sent, 1);
}
