use nurture_scheduler::usecase::unsubscribe::{
    UNSUBSCRIBE_REASON, UnsubscribeInput, UnsubscribeUseCase,
};

use crate::helpers::{MockSuppressions, links};

fn input(email: &str, token: &str, category: Option<&str>) -> UnsubscribeInput {
    UnsubscribeInput {
        email: email.to_owned(),
        token: token.to_owned(),
        category: category.map(str::to_owned),
    }
}

fn token(email: &str) -> String {
    links().token_for(&email.parse().unwrap())
}

fn usecase(suppressions: MockSuppressions) -> UnsubscribeUseCase<MockSuppressions> {
    UnsubscribeUseCase {
        suppressions,
        links: links(),
    }
}

#[tokio::test]
async fn should_suppress_every_category_by_default() {
    let suppressions = MockSuppressions::default();
    let entries = suppressions.entries_handle();

    usecase(suppressions)
        .execute(input("client@example.com", &token("client@example.com"), None))
        .await
        .unwrap();

    let entries = entries.lock().unwrap();
    assert_eq!(
        *entries,
        vec![(
            "client@example.com".to_owned(),
            "*".to_owned(),
            UNSUBSCRIBE_REASON.to_owned()
        )]
    );
}

#[tokio::test]
async fn should_suppress_only_requested_category() {
    let suppressions = MockSuppressions::default();
    let entries = suppressions.entries_handle();

    usecase(suppressions)
        .execute(input(
            "client@example.com",
            &token("client@example.com"),
            Some(" post_event "),
        ))
        .await
        .unwrap();

    assert_eq!(entries.lock().unwrap()[0].1, "post_event");
}

#[tokio::test]
async fn should_accept_differently_cased_address() {
    let suppressions = MockSuppressions::default();
    let entries = suppressions.entries_handle();

    usecase(suppressions)
        .execute(input("Client@Example.COM", &token("client@example.com"), None))
        .await
        .unwrap();

    assert_eq!(entries.lock().unwrap()[0].0, "client@example.com");
}

#[tokio::test]
async fn should_reject_forged_token_and_write_nothing() {
    let suppressions = MockSuppressions::default();
    let entries = suppressions.entries_handle();
    let uc = usecase(suppressions);

    let forged = uc
        .execute(input("client@example.com", "forged", None))
        .await
        .unwrap_err();
    let borrowed = uc
        .execute(input("victim@example.com", &token("client@example.com"), None))
        .await
        .unwrap_err();
    let malformed = uc.execute(input("not-an-email", "x", None)).await.unwrap_err();

    assert_eq!(forged.kind(), "INVALID_UNSUBSCRIBE_TOKEN");
    assert_eq!(borrowed.kind(), "INVALID_UNSUBSCRIBE_TOKEN");
    assert_eq!(malformed.kind(), "INVALID_UNSUBSCRIBE_TOKEN");
    assert!(entries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_be_idempotent() {
    let suppressions = MockSuppressions::default();
    let entries = suppressions.entries_handle();
    let uc = usecase(suppressions);
    let link_token = token("client@example.com");

    for _ in 0..3 {
        uc.execute(input("client@example.com", &link_token, None))
            .await
            .unwrap();
    }

    assert_eq!(entries.lock().unwrap().len(), 1);
}
