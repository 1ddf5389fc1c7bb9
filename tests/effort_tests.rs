// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Training effort endpoint: profile-normalized effort and reward.

use chrono::{Duration, Utc};

mod common;
use common::{create_test_app, running_payload, TestApp};

/// Ingest and fully process a 5 km run, returning its id (50 base points).
async fn processed_run(app: &TestApp, auth: &str) -> String {
    let start = Utc::now() - Duration::hours(3);
    let (_, body) = app
        .request(
            "POST",
            "/api/activities",
            Some(auth),
            Some(running_payload("ext-1", start, 3600, 5_000.0)),
        )
        .await;
    app.drain_pipeline().await;
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn effort_defaults_without_profile() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let activity_id = processed_run(&app, &auth).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/effort",
            Some(&auth),
            Some(serde_json::json!({"activity_id": activity_id})),
        )
        .await;
    assert_eq!(status, 200);

    // Default absolute effort 70, no profile: relative stays 70
    assert_eq!(body["effort_metrics"]["absolute_effort"], 70.0);
    assert_eq!(body["effort_metrics"]["relative_effort"], 70.0);
    assert_eq!(body["base_reward"], 50);
    // multiplier = 0.5 + 0.70 * 1.5 = 1.55 -> round(50 * 1.55) = 78
    assert_eq!(body["calculated_reward"], 78);
}

#[tokio::test]
async fn primary_sport_earns_less_than_unrelated_sport() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let activity_id = processed_run(&app, &auth).await;

    // Declared runner: running is the primary sport
    app.request(
        "PUT",
        "/api/profile",
        Some(&auth),
        Some(serde_json::json!({
            "fitness_level": "intermediate",
            "primary_sport": "running",
        })),
    )
    .await;
    let (_, as_primary) = app
        .request(
            "POST",
            "/api/effort",
            Some(&auth),
            Some(serde_json::json!({"activity_id": activity_id, "absolute_effort": 70.0})),
        )
        .await;

    // Re-declared as a swimmer: running is now unrelated
    app.request(
        "PUT",
        "/api/profile",
        Some(&auth),
        Some(serde_json::json!({
            "fitness_level": "intermediate",
            "primary_sport": "swimming",
        })),
    )
    .await;
    let (_, as_unrelated) = app
        .request(
            "POST",
            "/api/effort",
            Some(&auth),
            Some(serde_json::json!({"activity_id": activity_id, "absolute_effort": 70.0})),
        )
        .await;

    let primary_reward = as_primary["calculated_reward"].as_u64().unwrap();
    let unrelated_reward = as_unrelated["calculated_reward"].as_u64().unwrap();
    assert!(primary_reward < unrelated_reward);
}

#[tokio::test]
async fn context_factors_raise_the_reward() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let activity_id = processed_run(&app, &auth).await;

    let (_, flat) = app
        .request(
            "POST",
            "/api/effort",
            Some(&auth),
            Some(serde_json::json!({
                "activity_id": activity_id,
                "absolute_effort": 60.0,
            })),
        )
        .await;

    let (_, mountains) = app
        .request(
            "POST",
            "/api/effort",
            Some(&auth),
            Some(serde_json::json!({
                "activity_id": activity_id,
                "absolute_effort": 60.0,
                "contextual_factors": {
                    "terrain": "mountainous",
                    "sleep": 5.0,
                },
            })),
        )
        .await;

    assert!(
        mountains["effort_metrics"]["relative_effort"].as_f64().unwrap()
            > flat["effort_metrics"]["relative_effort"].as_f64().unwrap()
    );
    assert!(
        mountains["calculated_reward"].as_u64().unwrap()
            >= flat["calculated_reward"].as_u64().unwrap()
    );
}

#[tokio::test]
async fn effort_history_pages_newest_first() {
    let app = create_test_app();
    let auth = app.bearer("runner-1");
    let activity_id = processed_run(&app, &auth).await;

    for effort in [40.0, 60.0, 80.0] {
        app.request(
            "POST",
            "/api/effort",
            Some(&auth),
            Some(serde_json::json!({"activity_id": activity_id, "absolute_effort": effort})),
        )
        .await;
    }

    let (status, body) = app
        .request("GET", "/api/effort/history?limit=2", Some(&auth), None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["total"], 3);
    assert_eq!(body["efforts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn effort_for_another_users_activity_is_not_found() {
    let app = create_test_app();
    let owner = app.bearer("runner-1");
    let other = app.bearer("runner-2");
    let activity_id = processed_run(&app, &owner).await;

    let (status, _) = app
        .request(
            "POST",
            "/api/effort",
            Some(&other),
            Some(serde_json::json!({"activity_id": activity_id})),
        )
        .await;
    assert_eq!(status, 404);
}
