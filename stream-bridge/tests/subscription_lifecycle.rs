/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use integration_test_utils::{BridgeHarness, TEST_CLIENT_ID};
use serde_json::{json, Value};
use stream_bridge::control_plane::{ControlPlane, ControlRequest};
use stream_bridge::{BridgeResult, ErrorKind};

const BASE_TOPIC: &str = "natss";

fn client_topic() -> String {
    format!("{BASE_TOPIC}.clients.{TEST_CLIENT_ID}")
}

async fn act(harness: &BridgeHarness, request: Value) -> BridgeResult<Value> {
    harness
        .control_plane
        .act(ControlRequest::from_value(request).expect("well-formed request"))
        .await
}

async fn list(harness: &BridgeHarness) -> Vec<Value> {
    let listed = act(harness, json!({ "topic": client_topic(), "cmd": "list" }))
        .await
        .expect("list");
    listed.as_array().cloned().expect("list replies with an array")
}

#[tokio::test]
async fn subscribe_defaults_to_manual_acks_and_lists_one_entry() {
    let harness = BridgeHarness::start().await;

    let reply = act(
        &harness,
        json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": "orderCreated" }),
    )
    .await
    .expect("subscribe");
    assert_eq!(reply["subject"], "orderCreated");
    assert_eq!(reply["options"]["manualAcks"], true);
    assert!(reply["options"].get("durableName").is_none());
    assert_eq!(reply["status"], "active");

    let listed = list(&harness).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["subject"], "orderCreated");
    assert_eq!(listed[0]["options"]["manualAcks"], true);

    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn durable_name_and_passthrough_options_are_echoed() {
    let harness = BridgeHarness::start().await;

    act(
        &harness,
        json!({
            "topic": BASE_TOPIC,
            "cmd": "subscribe",
            "subject": "orderCreated",
            "options": { "durableName": "x", "maxInFlight": 5 }
        }),
    )
    .await
    .expect("subscribe");

    let listed = list(&harness).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["options"]["durableName"], "x");
    assert_eq!(listed[0]["options"]["maxInFlight"], 5);

    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn subscribing_an_active_identity_twice_is_a_duplicate() {
    let harness = BridgeHarness::start().await;
    let subscribe = json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": "orderCreated2" });

    act(&harness, subscribe.clone()).await.expect("first");
    let err = act(&harness, subscribe.clone()).await.expect_err("second");
    assert_eq!(err.kind(), ErrorKind::DuplicateSubscription);

    let reply = harness
        .control_plane
        .reply(subscribe)
        .await
        .expect_err("structured error reply");
    assert_eq!(reply["kind"], "DuplicateSubscriptionError");
    assert!(reply["message"].as_str().is_some_and(|m| m.contains("orderCreated2")));

    assert_eq!(list(&harness).await.len(), 1);
    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn same_subject_with_another_durable_name_is_a_separate_identity() {
    let harness = BridgeHarness::start().await;

    act(
        &harness,
        json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": "orders" }),
    )
    .await
    .expect("plain");
    act(
        &harness,
        json!({
            "topic": BASE_TOPIC,
            "cmd": "subscribe",
            "subject": "orders",
            "options": { "durableName": "audit" }
        }),
    )
    .await
    .expect("durable");

    assert_eq!(list(&harness).await.len(), 2);
    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn suspend_then_subscribe_restores_a_single_active_entry() {
    let harness = BridgeHarness::start().await;
    let subscribe = json!({
        "topic": BASE_TOPIC,
        "cmd": "subscribe",
        "subject": "orderCreated3",
        "options": { "durableName": "audit" }
    });

    act(&harness, subscribe.clone()).await.expect("subscribe");
    let suspended = act(
        &harness,
        json!({
            "topic": client_topic(),
            "cmd": "suspend",
            "subject": "orderCreated3",
            "options": { "durableName": "audit" }
        }),
    )
    .await
    .expect("suspend");
    assert_eq!(suspended, Value::Bool(true));

    let listed = list(&harness).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "suspended");

    act(&harness, subscribe).await.expect("resume");
    let listed = list(&harness).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "active");

    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn suspending_twice_reports_not_found() {
    let harness = BridgeHarness::start().await;
    let suspend = json!({ "topic": client_topic(), "cmd": "suspend", "subject": "orderCreated" });

    act(
        &harness,
        json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": "orderCreated" }),
    )
    .await
    .expect("subscribe");
    act(&harness, suspend.clone()).await.expect("suspend");

    let err = act(&harness, suspend).await.expect_err("already suspended");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn unsubscribe_removes_the_entry_for_good() {
    let harness = BridgeHarness::start().await;
    let unsubscribe =
        json!({ "topic": client_topic(), "cmd": "unsubscribe", "subject": "orderCreated4" });

    act(
        &harness,
        json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": "orderCreated4" }),
    )
    .await
    .expect("subscribe");

    let reply = act(&harness, unsubscribe.clone()).await.expect("unsubscribe");
    assert_eq!(reply, Value::Bool(true));
    assert!(list(&harness).await.is_empty());

    let err = act(&harness, unsubscribe).await.expect_err("gone");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn base_topic_serves_lifecycle_commands_too() {
    let harness = BridgeHarness::start().await;

    act(
        &harness,
        json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": "orders" }),
    )
    .await
    .expect("subscribe");
    let listed = act(&harness, json!({ "topic": BASE_TOPIC, "cmd": "list" }))
        .await
        .expect("list on base topic");
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    act(
        &harness,
        json!({ "topic": BASE_TOPIC, "cmd": "unsubscribe", "subject": "orders" }),
    )
    .await
    .expect("unsubscribe on base topic");
    assert!(list(&harness).await.is_empty());
    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn client_topic_is_registered_lazily_and_kept() {
    let harness = BridgeHarness::start().await;
    assert!(!harness.control_plane.has_topic(&client_topic()).await);

    for subject in ["a", "b"] {
        act(
            &harness,
            json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": subject }),
        )
        .await
        .expect("subscribe");
    }
    assert!(harness.control_plane.has_topic(&client_topic()).await);

    for subject in ["a", "b"] {
        act(
            &harness,
            json!({ "topic": client_topic(), "cmd": "unsubscribe", "subject": subject }),
        )
        .await
        .expect("unsubscribe");
    }
    assert!(harness.control_plane.has_topic(&client_topic()).await);
    assert!(list(&harness).await.is_empty());
    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn client_topic_rejects_commands_outside_its_scope() {
    let harness = BridgeHarness::start().await;
    act(
        &harness,
        json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": "orders" }),
    )
    .await
    .expect("subscribe");

    for cmd in ["subscribe", "publish"] {
        let err = act(
            &harness,
            json!({ "topic": client_topic(), "cmd": cmd, "subject": "orders", "data": 1 }),
        )
        .await
        .expect_err("out of scope");
        assert_eq!(err.kind(), ErrorKind::UnsupportedCommand);
    }
    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn malformed_requests_are_rejected_before_any_state_changes() {
    let harness = BridgeHarness::start().await;

    let cases = [
        (json!({ "topic": BASE_TOPIC, "cmd": "fly" }), ErrorKind::UnsupportedCommand),
        (json!({ "topic": BASE_TOPIC }), ErrorKind::Validation),
        (json!({ "topic": BASE_TOPIC, "cmd": "subscribe" }), ErrorKind::Validation),
        (
            json!({ "topic": BASE_TOPIC, "cmd": "subscribe", "subject": "orders.*" }),
            ErrorKind::Validation,
        ),
        (
            json!({
                "topic": BASE_TOPIC,
                "cmd": "subscribe",
                "subject": "orders",
                "options": { "durableName": "bad.name" }
            }),
            ErrorKind::Validation,
        ),
        (
            json!({ "topic": BASE_TOPIC, "cmd": "publish", "subject": "orders" }),
            ErrorKind::Validation,
        ),
        (json!({ "topic": BASE_TOPIC, "cmd": "suspend" }), ErrorKind::Validation),
        (
            json!({
                "topic": BASE_TOPIC,
                "cmd": "unsubscribe",
                "subject": "orders",
                "options": { "durableName": "a b" }
            }),
            ErrorKind::Validation,
        ),
    ];

    for (request, kind) in cases {
        let err = act(&harness, request.clone())
            .await
            .expect_err("rejected request");
        assert_eq!(err.kind(), kind, "request {request}");
    }

    assert!(harness.bridge.registry().is_empty().await);
    assert!(!harness.control_plane.has_topic(&client_topic()).await);
    harness.bridge.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscribes_for_one_identity_have_a_single_winner() {
    let harness = BridgeHarness::start().await;

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let control_plane = harness.control_plane.clone();
            tokio::spawn(async move {
                control_plane
                    .act(
                        ControlRequest::command(BASE_TOPIC, "subscribe")
                            .with_field("subject", "orderCreated")
                            .with_field("options", json!({ "durableName": "race" })),
                    )
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for outcome in futures::future::join_all(attempts).await {
        match outcome.expect("task completes") {
            Ok(_) => succeeded += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::DuplicateSubscription),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(list(&harness).await.len(), 1);
    harness.bridge.shutdown().await.expect("shutdown");
}
