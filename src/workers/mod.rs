// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Queue consumers: the worker pool driving the pipeline stages.
//!
//! Each queue gets a pool of independent consumers. A successful handler
//! acks the delivery; a failed one nacks it for redelivery, retrying
//! forever against the stages' idempotent guards. Ordering exists only
//! within one activity (a stage enqueues the next stage after its own
//! commit), never across activities.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config;
use crate::error::Result;
use crate::queue::{Delivery, FraudCheckMessage, LeagueScoreMessage, Queue, ScoreActivityMessage};
use crate::services::{FraudService, LeagueService, RewardService};
use crate::AppState;

/// The pipeline queues this binary consumes. The reward-mint queue is
/// deliberately absent: its consumer is the external minting system.
const PIPELINE_QUEUES: [&str; 3] = [
    config::FRAUD_CHECK_QUEUE,
    config::SCORE_ACTIVITY_QUEUE,
    config::LEAGUE_SCORE_QUEUE,
];

/// Spawn the consumer pools for every pipeline queue.
pub fn spawn_workers(state: Arc<AppState>) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    for queue_name in PIPELINE_QUEUES {
        for worker in 0..state.config.worker_concurrency {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                run_consumer(state, queue_name, worker).await;
            }));
        }
    }

    handles
}

/// Poll one queue forever.
async fn run_consumer(state: Arc<AppState>, queue_name: &'static str, worker: usize) {
    tracing::info!(queue = queue_name, worker, "Worker started");
    let poll_interval = Duration::from_millis(state.config.poll_interval_ms);

    loop {
        match process_one(&state, queue_name).await {
            Ok(true) => {}
            Ok(false) => tokio::time::sleep(poll_interval).await,
            Err(e) => {
                tracing::error!(queue = queue_name, worker, error = %e, "Queue receive failed");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

/// Receive and settle a single delivery from one queue.
///
/// Returns false when the queue had nothing to lease. Handler errors nack
/// the delivery (redelivery, forever); malformed payloads are acked away
/// so a poison message cannot wedge the queue.
pub async fn process_one(state: &Arc<AppState>, queue_name: &str) -> Result<bool> {
    let Some(delivery) = state.queue.receive(queue_name).await? else {
        return Ok(false);
    };

    match handle_delivery(state, queue_name, &delivery).await {
        Ok(()) => {
            state.queue.ack(queue_name, delivery.receipt).await?;
        }
        Err(e) => {
            tracing::error!(
                queue = queue_name,
                attempt = delivery.attempt,
                error = %e,
                "Handler failed, requeuing for redelivery"
            );
            state.queue.nack(queue_name, delivery.receipt).await?;
        }
    }

    Ok(true)
}

/// Process every message currently available on the pipeline queues,
/// including ones enqueued by earlier stages during the drain.
///
/// Drives the pipeline to quiescence without the worker pool; the test
/// harness is the main consumer.
pub async fn drain(state: &Arc<AppState>) -> Result<()> {
    loop {
        let mut progressed = false;
        for queue_name in PIPELINE_QUEUES {
            while process_one(state, queue_name).await? {
                progressed = true;
            }
        }
        if !progressed {
            return Ok(());
        }
    }
}

/// Dispatch a delivery to its stage handler.
async fn handle_delivery(state: &Arc<AppState>, queue_name: &str, delivery: &Delivery) -> Result<()> {
    match queue_name {
        config::FRAUD_CHECK_QUEUE => {
            let message: FraudCheckMessage = match delivery.message() {
                Ok(m) => m,
                Err(e) => return drop_malformed(queue_name, delivery, e),
            };
            FraudService::new(state.store.clone(), state.queue.clone())
                .check_activity(message.activity_id)
                .await
        }
        config::SCORE_ACTIVITY_QUEUE => {
            let message: ScoreActivityMessage = match delivery.message() {
                Ok(m) => m,
                Err(e) => return drop_malformed(queue_name, delivery, e),
            };
            RewardService::new(state.store.clone(), state.queue.clone())
                .score_activity(message.activity_id)
                .await
        }
        config::LEAGUE_SCORE_QUEUE => {
            let message: LeagueScoreMessage = match delivery.message() {
                Ok(m) => m,
                Err(e) => return drop_malformed(queue_name, delivery, e),
            };
            LeagueService::new(state.store.clone())
                .score_activity(message.activity_id, message.league_id)
                .await
        }
        other => {
            tracing::error!(queue = other, "No handler for queue");
            Ok(())
        }
    }
}

fn drop_malformed(queue_name: &str, delivery: &Delivery, error: crate::error::AppError) -> Result<()> {
    tracing::error!(
        queue = queue_name,
        attempt = delivery.attempt,
        error = %error,
        "Dropping malformed queue message"
    );
    Ok(())
}
