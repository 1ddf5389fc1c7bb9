// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory queue broker with visibility-timeout redelivery.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::queue::{Delivery, Queue};

/// A message waiting in a queue.
#[derive(Debug, Clone)]
struct Envelope {
    payload: serde_json::Value,
    attempt: u32,
}

/// A leased message awaiting ack/nack.
#[derive(Debug, Clone)]
struct Leased {
    envelope: Envelope,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<Envelope>,
    in_flight: HashMap<u64, Leased>,
}

/// In-memory at-least-once broker.
///
/// `receive` leases a message for the visibility timeout; leases that
/// expire without an ack go back to the front of the queue and come out
/// again with a higher attempt count, which is exactly the redelivery
/// behavior consumers must tolerate.
pub struct MemoryQueue {
    visibility_timeout: Duration,
    queues: Mutex<HashMap<String, QueueState>>,
    next_receipt: std::sync::atomic::AtomicU64,
}

impl MemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            visibility_timeout,
            queues: Mutex::new(HashMap::new()),
            next_receipt: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Number of messages currently waiting (not leased) on a queue.
    pub fn ready_len(&self, queue: &str) -> usize {
        let queues = self.queues.lock().unwrap();
        queues.get(queue).map(|q| q.ready.len()).unwrap_or(0)
    }

    /// Number of leased, unsettled messages on a queue.
    pub fn in_flight_len(&self, queue: &str) -> usize {
        let queues = self.queues.lock().unwrap();
        queues.get(queue).map(|q| q.in_flight.len()).unwrap_or(0)
    }

    /// Force every active lease on a queue to expire, as if the visibility
    /// timeout elapsed (crash simulation for tests).
    pub fn expire_leases(&self, queue: &str) {
        let mut queues = self.queues.lock().unwrap();
        if let Some(state) = queues.get_mut(queue) {
            for leased in state.in_flight.values_mut() {
                leased.deadline = Instant::now();
            }
        }
    }

    fn reclaim_expired(state: &mut QueueState, now: Instant) {
        let expired: Vec<u64> = state
            .in_flight
            .iter()
            .filter(|(_, leased)| leased.deadline <= now)
            .map(|(receipt, _)| *receipt)
            .collect();

        for receipt in expired {
            if let Some(leased) = state.in_flight.remove(&receipt) {
                state.ready.push_front(leased.envelope);
            }
        }
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    async fn publish(&self, queue: &str, payload: serde_json::Value) -> Result<()> {
        let mut queues = self.queues.lock().unwrap();
        queues.entry(queue.to_string()).or_default().ready.push_back(Envelope {
            payload,
            attempt: 0,
        });
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<Delivery>> {
        let mut queues = self.queues.lock().unwrap();
        let state = queues.entry(queue.to_string()).or_default();

        Self::reclaim_expired(state, Instant::now());

        let Some(mut envelope) = state.ready.pop_front() else {
            return Ok(None);
        };
        envelope.attempt += 1;

        let receipt = self
            .next_receipt
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let delivery = Delivery {
            receipt,
            attempt: envelope.attempt,
            payload: envelope.payload.clone(),
        };

        state.in_flight.insert(
            receipt,
            Leased {
                envelope,
                deadline: Instant::now() + self.visibility_timeout,
            },
        );

        Ok(Some(delivery))
    }

    async fn ack(&self, queue: &str, receipt: u64) -> Result<()> {
        let mut queues = self.queues.lock().unwrap();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| AppError::NotFound(format!("Queue {} not found", queue)))?;

        // An expired-and-reclaimed lease may already be gone; settling it
        // twice is harmless, the redelivered copy governs.
        state.in_flight.remove(&receipt);
        Ok(())
    }

    async fn nack(&self, queue: &str, receipt: u64) -> Result<()> {
        let mut queues = self.queues.lock().unwrap();
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| AppError::NotFound(format!("Queue {} not found", queue)))?;

        if let Some(leased) = state.in_flight.remove(&receipt) {
            state.ready.push_front(leased.envelope);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queue() -> MemoryQueue {
        MemoryQueue::new(Duration::from_secs(30))
    }

    #[tokio::test]
    async fn publish_receive_ack_settles_message() {
        let q = queue();
        q.publish("work", json!({"n": 1})).await.unwrap();

        let delivery = q.receive("work").await.unwrap().unwrap();
        assert_eq!(delivery.attempt, 1);
        assert_eq!(delivery.payload["n"], 1);

        q.ack("work", delivery.receipt).await.unwrap();
        assert!(q.receive("work").await.unwrap().is_none());
        assert_eq!(q.in_flight_len("work"), 0);
    }

    #[tokio::test]
    async fn receive_is_fifo() {
        let q = queue();
        q.publish("work", json!({"n": 1})).await.unwrap();
        q.publish("work", json!({"n": 2})).await.unwrap();

        let first = q.receive("work").await.unwrap().unwrap();
        let second = q.receive("work").await.unwrap().unwrap();
        assert_eq!(first.payload["n"], 1);
        assert_eq!(second.payload["n"], 2);
    }

    #[tokio::test]
    async fn nack_redelivers_with_bumped_attempt() {
        let q = queue();
        q.publish("work", json!({"n": 1})).await.unwrap();

        let delivery = q.receive("work").await.unwrap().unwrap();
        q.nack("work", delivery.receipt).await.unwrap();

        let redelivered = q.receive("work").await.unwrap().unwrap();
        assert_eq!(redelivered.attempt, 2);
        assert_eq!(redelivered.payload["n"], 1);
    }

    #[tokio::test]
    async fn expired_lease_is_redelivered() {
        let q = MemoryQueue::new(Duration::from_secs(0));
        q.publish("work", json!({"n": 1})).await.unwrap();

        let first = q.receive("work").await.unwrap().unwrap();
        // Lease expired instantly; the same message comes back
        let second = q.receive("work").await.unwrap().unwrap();
        assert_eq!(second.payload["n"], 1);
        assert!(second.attempt > first.attempt);
    }

    #[tokio::test]
    async fn unexpired_lease_is_not_redelivered() {
        let q = queue();
        q.publish("work", json!({"n": 1})).await.unwrap();

        let _held = q.receive("work").await.unwrap().unwrap();
        assert!(q.receive("work").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ack_after_lease_expiry_is_harmless() {
        let q = MemoryQueue::new(Duration::from_secs(0));
        q.publish("work", json!({"n": 1})).await.unwrap();

        let first = q.receive("work").await.unwrap().unwrap();
        let second = q.receive("work").await.unwrap().unwrap();
        q.ack("work", first.receipt).await.unwrap();
        q.ack("work", second.receipt).await.unwrap();

        assert!(q.receive("work").await.unwrap().is_none());
    }
}
