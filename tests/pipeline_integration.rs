// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end pipeline tests over the in-memory store and queue:
//! ingest -> fraud check -> reward scoring -> reward emission.

use chrono::{Duration, Utc};
use fitpulse::config;
use fitpulse::queue::{publish_message, Queue, ScoreActivityMessage};
use fitpulse::store::ActivityStore;
use uuid::Uuid;

mod common;
use common::{create_test_app, running_payload};

#[tokio::test]
async fn clean_activity_is_verified_and_rewarded() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let start = Utc::now() - Duration::hours(3);

    let (status, body) = app
        .request(
            "POST",
            "/api/activities",
            Some(&auth),
            Some(running_payload("ext-1", start, 3600, 5_000.0)),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["status"], "pending");

    app.drain_pipeline().await;

    let activity_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    let activity = app.store.get_activity(activity_id).await.unwrap().unwrap();
    assert_eq!(activity.status.as_str(), "verified");
    assert!(activity.processed);
    // 5 km of running at 10 points/km
    assert_eq!(activity.points, Some(50));

    // One reward event waiting for the minting consumer
    assert_eq!(app.queue.ready_len(config::REWARD_MINT_QUEUE), 1);
}

#[tokio::test]
async fn duplicate_ingest_returns_existing_and_enqueues_once() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let start = Utc::now() - Duration::hours(3);
    let payload = running_payload("ext-1", start, 3600, 5_000.0);

    let (status, first) = app
        .request("POST", "/api/activities", Some(&auth), Some(payload.clone()))
        .await;
    assert_eq!(status, 201);

    let (status, second) = app
        .request("POST", "/api/activities", Some(&auth), Some(payload))
        .await;
    assert_eq!(status, 200);
    assert_eq!(first["id"], second["id"]);

    // Exactly one fraud-check message despite two ingests
    assert_eq!(app.queue.ready_len(config::FRAUD_CHECK_QUEUE), 1);

    app.drain_pipeline().await;
    assert_eq!(app.queue.ready_len(config::REWARD_MINT_QUEUE), 1);
}

#[tokio::test]
async fn redelivered_score_message_emits_no_second_reward() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let start = Utc::now() - Duration::hours(3);

    let (_, body) = app
        .request(
            "POST",
            "/api/activities",
            Some(&auth),
            Some(running_payload("ext-1", start, 3600, 5_000.0)),
        )
        .await;
    app.drain_pipeline().await;

    let activity_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(app.queue.ready_len(config::REWARD_MINT_QUEUE), 1);

    // Simulate an at-least-once duplicate of the score-activity message
    publish_message(
        app.state.queue.as_ref(),
        config::SCORE_ACTIVITY_QUEUE,
        &ScoreActivityMessage {
            activity_id,
            user_id: "runner-1".to_string(),
            timestamp: Utc::now(),
        },
    )
    .await
    .unwrap();
    app.drain_pipeline().await;

    // No additional reward event; points unchanged
    assert_eq!(app.queue.ready_len(config::REWARD_MINT_QUEUE), 1);
    let activity = app.store.get_activity(activity_id).await.unwrap().unwrap();
    assert_eq!(activity.points, Some(50));
}

#[tokio::test]
async fn implausible_overlapping_activity_is_flagged_and_unrewarded() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let start = Utc::now() - Duration::hours(5);

    // A normal run, then an implausibly fast one overlapping its window
    app.request(
        "POST",
        "/api/activities",
        Some(&auth),
        Some(running_payload("ext-1", start, 3600, 5_000.0)),
    )
    .await;
    let (_, body) = app
        .request(
            "POST",
            "/api/activities",
            Some(&auth),
            Some(running_payload(
                "ext-2",
                start + Duration::minutes(30),
                3600,
                50_000.0,
            )),
        )
        .await;

    app.drain_pipeline().await;

    let flagged_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    let flagged = app.store.get_activity(flagged_id).await.unwrap().unwrap();
    assert_eq!(flagged.status.as_str(), "flagged");
    assert!(!flagged.processed);
    assert_eq!(flagged.points, None);
    assert!(flagged.fraud_score >= 110);
    assert!(flagged
        .fraud_reasons
        .iter()
        .any(|r| r.contains("Implausible speed")));

    // Only the clean activity produced a reward
    assert_eq!(app.queue.ready_len(config::REWARD_MINT_QUEUE), 1);
}

#[tokio::test]
async fn reward_points_are_capped() {
    let app = create_test_app();
    let auth = app.bearer("cyclist-1");
    let start = Utc::now() - Duration::hours(20);

    // 1000 km of cycling in 15 h: plausible speed, huge distance base
    let payload = serde_json::json!({
        "source": "strava",
        "sourceId": "ext-long",
        "type": "cycling",
        "startTime": start.to_rfc3339(),
        "endTime": (start + Duration::seconds(54_000)).to_rfc3339(),
        "duration": 54_000,
        "distance": 250_000.0,
    });

    let (status, body) = app
        .request("POST", "/api/activities", Some(&auth), Some(payload))
        .await;
    assert_eq!(status, 201);

    app.drain_pipeline().await;

    let activity_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    let activity = app.store.get_activity(activity_id).await.unwrap().unwrap();
    // 250 km at 3 points/km would be 750; capped at 200
    assert_eq!(activity.points, Some(200));
}

#[tokio::test]
async fn crashed_worker_lease_is_redelivered_and_processed_once() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let start = Utc::now() - Duration::hours(3);

    let (_, body) = app
        .request(
            "POST",
            "/api/activities",
            Some(&auth),
            Some(running_payload("ext-1", start, 3600, 5_000.0)),
        )
        .await;

    // A worker leases the fraud-check message and dies without acking
    let abandoned = app
        .state
        .queue
        .receive(config::FRAUD_CHECK_QUEUE)
        .await
        .unwrap();
    assert!(abandoned.is_some());

    // Visibility timeout elapses; the message is redelivered and the
    // pipeline completes normally
    app.queue.expire_leases(config::FRAUD_CHECK_QUEUE);
    app.drain_pipeline().await;

    let activity_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    let activity = app.store.get_activity(activity_id).await.unwrap().unwrap();
    assert!(activity.processed);
    assert_eq!(activity.points, Some(50));
    assert_eq!(app.queue.ready_len(config::REWARD_MINT_QUEUE), 1);
}
