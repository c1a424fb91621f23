//! Append-only message/audit logging.
//!
//! Logging is strictly fire-and-forget: a slow or failing log must never
//! delay or abort a protocol response, so writers go through
//! [`append_detached`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::shared::errors::DomainResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub charge_point_id: String,
    pub direction: Direction,
    pub frame: String,
    pub logged_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn inbound(charge_point_id: &str, frame: &str) -> Self {
        Self {
            charge_point_id: charge_point_id.to_string(),
            direction: Direction::Inbound,
            frame: frame.to_string(),
            logged_at: Utc::now(),
        }
    }

    pub fn outbound(charge_point_id: &str, frame: &str) -> Self {
        Self {
            charge_point_id: charge_point_id.to_string(),
            direction: Direction::Outbound,
            frame: frame.to_string(),
            logged_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn append(&self, record: MessageRecord) -> DomainResult<()>;
}

pub type SharedMessageLog = Arc<dyn MessageLog>;

/// Append without waiting; a failure is logged and otherwise ignored.
pub fn append_detached(log: &SharedMessageLog, record: MessageRecord) {
    let log = log.clone();
    tokio::spawn(async move {
        if let Err(e) = log.append(record).await {
            debug!(error = %e, "message log append failed");
        }
    });
}

/// Bounded in-memory log: oldest records are dropped once capacity is hit.
pub struct InMemoryMessageLog {
    records: Mutex<VecDeque<MessageRecord>>,
    capacity: usize,
}

impl InMemoryMessageLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn shared(capacity: usize) -> SharedMessageLog {
        Arc::new(Self::new(capacity))
    }

    pub fn records(&self) -> Vec<MessageRecord> {
        self.records.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageLog for InMemoryMessageLog {
    async fn append(&self, record: MessageRecord) -> DomainResult<()> {
        let mut records = self.records.lock().unwrap();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_keeps_insertion_order() {
        let log = InMemoryMessageLog::new(10);
        log.append(MessageRecord::inbound("CP1", "[2,...]")).await.unwrap();
        log.append(MessageRecord::outbound("CP1", "[3,...]")).await.unwrap();

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].direction, Direction::Inbound);
        assert_eq!(records[1].direction, Direction::Outbound);
    }

    #[tokio::test]
    async fn capacity_drops_oldest() {
        let log = InMemoryMessageLog::new(2);
        for i in 0..3 {
            log.append(MessageRecord::inbound("CP1", &format!("frame-{i}")))
                .await
                .unwrap();
        }
        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].frame, "frame-1");
        assert_eq!(records[1].frame, "frame-2");
    }

    #[tokio::test]
    async fn detached_append_lands_eventually() {
        let log = Arc::new(InMemoryMessageLog::new(8));
        let shared: SharedMessageLog = log.clone();
        append_detached(&shared, MessageRecord::inbound("CP1", "[2,...]"));

        // the append runs on a spawned task
        tokio::task::yield_now().await;
        for _ in 0..100 {
            if !log.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        assert_eq!(log.len(), 1);
    }
}
