// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tower::ServiceExt;

use fitpulse::config::Config;
use fitpulse::middleware::auth::create_jwt;
use fitpulse::queue::MemoryQueue;
use fitpulse::routes::create_router;
use fitpulse::store::MemoryStore;
use fitpulse::AppState;

/// Test app with in-memory store and queue backends, plus direct handles
/// to both for assertions the HTTP surface cannot express.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub queue: Arc<MemoryQueue>,
}

#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let config = Config::test_default();
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new(StdDuration::from_secs(30)));

    let state = Arc::new(AppState {
        config,
        store: store.clone(),
        queue: queue.clone(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        queue,
    }
}

impl TestApp {
    /// Bearer token for a regular user.
    #[allow(dead_code)]
    pub fn bearer(&self, user_id: &str) -> String {
        let token = create_jwt(user_id, false, &self.state.config.jwt_signing_key)
            .expect("Failed to create test JWT");
        format!("Bearer {}", token)
    }

    /// Bearer token carrying the admin claim.
    #[allow(dead_code)]
    pub fn admin_bearer(&self, user_id: &str) -> String {
        let token = create_jwt(user_id, true, &self.state.config.jwt_signing_key)
            .expect("Failed to create test JWT");
        format!("Bearer {}", token)
    }

    /// Send a request with an optional auth header and JSON body.
    #[allow(dead_code)]
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        (status, json)
    }

    /// Run the pipeline to quiescence.
    #[allow(dead_code)]
    pub async fn drain_pipeline(&self) {
        fitpulse::workers::drain(&self.state)
            .await
            .expect("Pipeline drain failed");
    }
}

/// Provider payload for a running activity, camelCase wire format.
#[allow(dead_code)]
pub fn running_payload(
    source_id: &str,
    start: DateTime<Utc>,
    duration_secs: u32,
    distance_meters: f64,
) -> serde_json::Value {
    serde_json::json!({
        "source": "strava",
        "sourceId": source_id,
        "type": "running",
        "startTime": start.to_rfc3339(),
        "endTime": (start + Duration::seconds(duration_secs as i64)).to_rfc3339(),
        "duration": duration_secs,
        "distance": distance_meters,
    })
}

/// League creation body with a distance metric and a running multiplier.
#[allow(dead_code)]
pub fn distance_league_body(name: &str, running_multiplier: f64) -> serde_json::Value {
    let now = Utc::now();
    serde_json::json!({
        "name": name,
        "scoring": "distance",
        "start_date": (now - Duration::days(1)).to_rfc3339(),
        "end_date": (now + Duration::days(30)).to_rfc3339(),
        "multipliers": { "running": running_multiplier },
    })
}
