// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::json;

use crate::modules::{
    batch::{BatchAccumulator, BatchItem},
    error::code::ErrorCode,
    interceptor::action::{ActionType, AppAction},
};

fn item(pk: &str, sk: &str, action_type: &str) -> BatchItem {
    BatchItem {
        pk: pk.into(),
        sk: sk.into(),
        action_type: action_type.into(),
    }
}

#[test]
fn third_item_flushes_in_insertion_order() {
    let mut accumulator = BatchAccumulator::new(3);

    let first = accumulator.enqueue(item("A", "1", "like")).unwrap();
    assert!(!first.is_flushed);
    assert_eq!(first.batch.queue.len(), 1);

    let second = accumulator.enqueue(item("B", "2", "bookmark")).unwrap();
    assert!(!second.is_flushed);
    assert_eq!(second.batch.queue.len(), 2);

    let third = accumulator.enqueue(item("C", "3", "share")).unwrap();
    assert!(third.is_flushed);
    assert_eq!(
        third.batch.queue,
        vec![
            item("A", "1", "like"),
            item("B", "2", "bookmark"),
            item("C", "3", "share")
        ]
    );
    assert!(accumulator.is_empty());

    let fourth = accumulator.enqueue(item("D", "4", "like")).unwrap();
    assert!(!fourth.is_flushed);
    assert_eq!(fourth.batch.queue, vec![item("D", "4", "like")]);
    assert_ne!(fourth.batch.batch_id, third.batch.batch_id);
}

#[test]
fn queue_never_exceeds_max_size() {
    let mut accumulator = BatchAccumulator::new(4);
    let mut flushes = 0;
    for n in 0..10 {
        let response = accumulator
            .enqueue(item(&format!("pk{n}"), "sk", "like"))
            .unwrap();
        assert!(response.batch.queue.len() <= accumulator.max_size());
        assert!(accumulator.len() < accumulator.max_size());
        if response.is_flushed {
            flushes += 1;
            assert_eq!(response.batch.queue.len(), 4);
        }
    }
    assert_eq!(flushes, 2);
    assert_eq!(accumulator.len(), 2);
}

#[test]
fn batch_size_one_flushes_every_item() {
    let mut accumulator = BatchAccumulator::new(1);
    let response = accumulator.enqueue(item("A", "1", "share")).unwrap();
    assert!(response.is_flushed);
    assert_eq!(response.batch.queue.len(), 1);
}

#[test]
fn empty_keys_are_rejected() {
    let mut accumulator = BatchAccumulator::new(3);
    let error = accumulator.enqueue(item("", "1", "like")).unwrap_err();
    assert_eq!(error.code(), ErrorCode::MalformedAction);
    assert!(accumulator.enqueue(item("A", "", "like")).is_err());
    assert!(accumulator.is_empty());
}

#[test]
fn manual_flush_returns_pending_items() {
    let mut accumulator = BatchAccumulator::new(3);
    accumulator.enqueue(item("A", "1", "like")).unwrap();
    let response = accumulator.flush();
    assert!(response.is_flushed);
    assert_eq!(response.batch.queue.len(), 1);
    assert!(accumulator.is_empty());
    assert!(accumulator.flush().batch.queue.is_empty());
}

#[test]
fn converts_like_and_share_payloads() {
    let like = AppAction::new(ActionType::Like, json!({"pk": "news#1", "sk": "2025-01-01"}));
    assert_eq!(
        BatchAccumulator::convert_to_batch_item(&like).unwrap(),
        item("news#1", "2025-01-01", "like")
    );

    let share = AppAction::new(ActionType::Share, json!({"pk": "P", "sk": 42}));
    assert_eq!(
        BatchAccumulator::convert_to_batch_item(&share).unwrap(),
        item("P", "42", "share")
    );
}

#[test]
fn converts_bookmark_from_first_entry() {
    let action = AppAction::new(
        ActionType::AddBookmark,
        json!({
            "hash-b": {"pk": "B", "sk": "2", "title": "Second"},
            "hash-a": {"pk": "A", "sk": "1", "title": "First"}
        }),
    );
    assert_eq!(
        BatchAccumulator::convert_to_batch_item(&action).unwrap(),
        item("B", "2", "bookmark")
    );

    let remove = AppAction::new(
        ActionType::RemoveBookmark,
        json!({"hash-a": {"pk": "A", "sk": "1"}}),
    );
    assert_eq!(
        BatchAccumulator::convert_to_batch_item(&remove)
            .unwrap()
            .action_type,
        "unbookmark"
    );
}

#[test]
fn malformed_payloads_are_rejected() {
    let cases = [
        AppAction::new(ActionType::Like, json!({"sk": "1"})),
        AppAction::new(ActionType::Unlike, json!({"pk": "", "sk": "1"})),
        AppAction::new(ActionType::AddBookmark, json!({})),
        AppAction::new(ActionType::AddBookmark, json!(["A", "1"])),
        AppAction::new(ActionType::RemoveBookmark, json!({"hash": {"pk": "A"}})),
    ];
    for action in cases {
        let error = BatchAccumulator::convert_to_batch_item(&action).unwrap_err();
        assert_eq!(error.code(), ErrorCode::MalformedAction);
    }
}
