use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
use serde_json::json;
use uuid::Uuid;

use nurture_domain::id::{EntityRef, NotificationId};
use nurture_domain::locale::Locale;
use nurture_scheduler::domain::repository::{AnchorSource, DispatchQueue, IdempotencyLedger};
use nurture_scheduler::domain::types::{
    IdempotencyKey, LifecycleStatus, NewNotification, NotificationStatus,
};
use nurture_scheduler::infra::db::{DbDispatchQueue, DbIdempotencyLedger, DbLeadSource};
use nurture_scheduler_schema::{leads, notifications};

use crate::helpers::utc;

fn postgres() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn affected(rows: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: rows,
    }
}

fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::from(n))])
}

/// Every statement sent to `db`, with SQL quoting unescaped for readable assertions.
fn sql_log(db: DatabaseConnection) -> String {
    format!("{:?}", db.into_transaction_log()).replace("\\\"", "\"")
}

fn new_notification(now: DateTime<Utc>) -> NewNotification {
    NewNotification {
        id: NotificationId::generate(),
        render_key: "J3".to_owned(),
        recipient: "client@example.com".parse().unwrap(),
        locale: Locale::FR,
        payload: json!({ "name": "Camille" }),
        not_before: None,
        entity_ref: Some(EntityRef::new("lead-1")),
        created_at: now,
    }
}

fn key_for(n: &NewNotification) -> IdempotencyKey {
    IdempotencyKey {
        render_key: n.render_key.clone(),
        recipient: n.recipient.clone(),
        entity_ref: n.entity_ref.clone(),
    }
}

fn queued_row(id: Uuid, render_key: &str, created_at: DateTime<Utc>) -> notifications::Model {
    notifications::Model {
        id,
        render_key: render_key.to_owned(),
        recipient: "client@example.com".to_owned(),
        locale: "fr".to_owned(),
        payload: json!({ "name": "Camille" }),
        not_before: None,
        entity_ref: Some("lead-1".to_owned()),
        status: "queued".to_owned(),
        error: None,
        provider_message_id: None,
        created_at,
        sent_at: None,
    }
}

fn lead_row(email: &str, status: &str, created_at: DateTime<Utc>) -> leads::Model {
    leads::Model {
        id: Uuid::now_v7(),
        email: email.to_owned(),
        name: Some("Camille".to_owned()),
        language: None,
        status: status.to_owned(),
        event_date: None,
        event_place: None,
        created_at,
        updated_at: created_at,
    }
}

// ── Idempotency ledger ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_reserve_key_and_queue_in_one_transaction() {
    let notification = new_notification(utc(2025, 1, 4, 10));
    let db = postgres()
        .append_query_results([[queued_row(notification.id.0, "J3", notification.created_at)]])
        .append_exec_results([affected(1)])
        .into_connection();
    let ledger = DbIdempotencyLedger { db: db.clone() };

    let reserved = ledger
        .reserve_and_enqueue(&key_for(&notification), &notification)
        .await
        .unwrap();

    assert!(reserved);
    let log = sql_log(db);
    assert!(log.contains("INSERT INTO \"notifications\""), "{log}");
    assert!(log.contains("INSERT INTO \"notification_ledger\""), "{log}");
    assert!(log.contains("DO NOTHING"), "{log}");
    assert!(!log.contains("DELETE"), "{log}");
}

#[tokio::test]
async fn should_treat_unique_conflict_as_already_queued_and_drop_queue_row() {
    let notification = new_notification(utc(2025, 1, 4, 10));
    let db = postgres()
        .append_query_results([[queued_row(notification.id.0, "J3", notification.created_at)]])
        // Ledger insert hits the unique key, then the compensating delete.
        .append_exec_results([affected(0), affected(1)])
        .into_connection();
    let ledger = DbIdempotencyLedger { db: db.clone() };

    let reserved = ledger
        .reserve_and_enqueue(&key_for(&notification), &notification)
        .await
        .unwrap();

    assert!(!reserved);
    let log = sql_log(db);
    assert!(log.contains("DELETE FROM \"notifications\""), "{log}");
}

#[tokio::test]
async fn should_find_existing_ledger_key() {
    let notification = new_notification(utc(2025, 1, 4, 10));
    let db = postgres()
        .append_query_results([[count_row(1)], [count_row(0)]])
        .into_connection();
    let ledger = DbIdempotencyLedger { db };

    assert!(ledger.exists(&key_for(&notification)).await.unwrap());
    assert!(!ledger.exists(&key_for(&notification)).await.unwrap());
}

#[tokio::test]
async fn should_report_ledger_storage_failure() {
    let notification = new_notification(utc(2025, 1, 4, 10));
    let db = postgres()
        .append_query_errors([sea_orm::DbErr::Custom("connection reset".to_owned())])
        .into_connection();
    let ledger = DbIdempotencyLedger { db };

    let err = ledger
        .reserve_and_enqueue(&key_for(&notification), &notification)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "INTERNAL");
}

// ── Dispatch queue ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_select_due_items_oldest_first() {
    let older = Uuid::now_v7();
    let newer = Uuid::now_v7();
    let db = postgres()
        .append_query_results([[
            queued_row(older, "J1", utc(2025, 1, 1, 9)),
            queued_row(newer, "J3", utc(2025, 1, 2, 9)),
        ]])
        .into_connection();
    let queue = DbDispatchQueue { db: db.clone() };

    let due = queue.list_due(utc(2025, 1, 3, 0), 20).await.unwrap();

    let ids: Vec<Uuid> = due.iter().map(|n| n.id.0).collect();
    assert_eq!(ids, vec![older, newer]);
    assert!(due.iter().all(|n| n.status == NotificationStatus::Queued));
    assert_eq!(due[0].entity_ref.as_ref().unwrap().as_str(), "lead-1");

    let log = sql_log(db);
    assert!(log.contains("\"notifications\".\"not_before\" IS NULL"), "{log}");
    assert!(log.contains("\"notifications\".\"not_before\" <="), "{log}");
    assert!(
        log.contains("ORDER BY \"notifications\".\"created_at\" ASC, \"notifications\".\"id\" ASC"),
        "{log}"
    );
    assert!(log.contains("LIMIT"), "{log}");
}

#[tokio::test]
async fn should_reject_rows_with_unknown_status() {
    let mut row = queued_row(Uuid::now_v7(), "J1", utc(2025, 1, 1, 9));
    row.status = "archived".to_owned();
    let db = postgres().append_query_results([[row]]).into_connection();
    let queue = DbDispatchQueue { db };

    let err = queue.list_due(utc(2025, 1, 3, 0), 20).await.unwrap_err();

    assert_eq!(err.kind(), "INTERNAL");
}

#[tokio::test]
async fn should_transition_only_queued_items() {
    let db = postgres()
        .append_exec_results([affected(1), affected(0)])
        .into_connection();
    let queue = DbDispatchQueue { db: db.clone() };
    let id = NotificationId::generate();

    assert!(queue.mark_sent(id, utc(2025, 1, 3, 0), Some("msg_1")).await.unwrap());
    assert!(!queue.mark_sent(id, utc(2025, 1, 3, 0), Some("msg_1")).await.unwrap());

    let log = sql_log(db);
    assert!(log.contains("UPDATE \"notifications\""), "{log}");
    assert!(log.contains("\"notifications\".\"status\" ="), "{log}");
}

#[tokio::test]
async fn should_truncate_stored_failure_reason() {
    let db = postgres().append_exec_results([affected(1)]).into_connection();
    let queue = DbDispatchQueue { db: db.clone() };

    let reason = "x".repeat(1500);
    queue
        .mark_failed(NotificationId::generate(), utc(2025, 1, 3, 0), &reason)
        .await
        .unwrap();

    let log = sql_log(db);
    assert!(log.contains(&"x".repeat(1000)), "{log}");
    assert!(!log.contains(&"x".repeat(1001)), "{log}");
}

// ── Lead source ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_map_lead_rows_to_anchored_entities() {
    let floor = utc(2025, 6, 1, 0);
    let mut before_launch = lead_row("Early@Example.com", "progress", utc(2024, 11, 20, 9));
    before_launch.language = Some("NL-be".to_owned());
    before_launch.event_date = NaiveDate::from_ymd_opt(2025, 9, 13);
    let after_launch = lead_row("late@example.com", "converted", utc(2025, 6, 3, 12));
    let broken = lead_row("not-an-address", "progress", utc(2025, 6, 2, 0));
    let db = postgres()
        .append_query_results([[before_launch.clone(), after_launch.clone(), broken]])
        .into_connection();
    let source = DbLeadSource {
        db: db.clone(),
        launch_floor: Some(floor),
        default_locale: Locale::FR,
    };

    let entities = source.list_active(utc(2025, 6, 4, 0)).await.unwrap();

    assert_eq!(entities.len(), 2);
    let early = &entities[0];
    assert_eq!(early.id, EntityRef::from(before_launch.id));
    assert_eq!(early.anchor_time, floor);
    assert_eq!(early.status, LifecycleStatus::Active);
    assert_eq!(early.locale.as_str(), "nl");
    assert_eq!(early.recipient.as_str(), "early@example.com");
    assert_eq!(early.payload_fields["name"], "Camille");
    assert_eq!(early.payload_fields["event_date"], "2025-09-13");
    assert!(!early.payload_fields.contains_key("event_place"));

    let late = &entities[1];
    assert_eq!(late.anchor_time, after_launch.created_at);
    assert_eq!(late.status, LifecycleStatus::Terminal);
    assert_eq!(late.locale, Locale::FR);

    let log = sql_log(db);
    assert!(log.contains("\"leads\".\"status\" ="), "{log}");
    assert!(
        log.contains("ORDER BY \"leads\".\"created_at\" ASC, \"leads\".\"id\" ASC"),
        "{log}"
    );
}

#[tokio::test]
async fn should_mark_lead_abandoned() {
    let db = postgres().append_exec_results([affected(1)]).into_connection();
    let source = DbLeadSource {
        db: db.clone(),
        launch_floor: None,
        default_locale: Locale::FR,
    };

    source
        .mark_terminal(&EntityRef::from(Uuid::now_v7()))
        .await
        .unwrap();

    let log = sql_log(db);
    assert!(log.contains("UPDATE \"leads\""), "{log}");
    assert!(log.contains("abandoned"), "{log}");
}

#[tokio::test]
async fn should_refuse_non_uuid_lead_reference() {
    let source = DbLeadSource {
        db: postgres().into_connection(),
        launch_floor: None,
        default_locale: Locale::FR,
    };

    let err = source
        .mark_terminal(&EntityRef::new("lead-1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "INTERNAL");
}
