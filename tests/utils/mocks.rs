#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use db8z::{message::PersistedMessage, AppError, MessageStore};

// ============================================================================
// Mock Infrastructure
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBehavior {
    Accept,
    Fail,
}

/// Message store issuing sequential ids ("m1", "m2", ...) and recording what
/// it accepted; can be switched to fail every write
pub struct RecordingMessageStore {
    behavior: Mutex<StoreBehavior>,
    next_id: AtomicUsize,
    persisted: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMessageStore {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(StoreBehavior::Accept),
            next_id: AtomicUsize::new(1),
            persisted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: StoreBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// (room id, user id, content) of every accepted write, in order
    pub fn persisted(&self) -> Vec<(String, String, String)> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageStore for RecordingMessageStore {
    async fn persist(
        &self,
        room_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<PersistedMessage, AppError> {
        if *self.behavior.lock().unwrap() == StoreBehavior::Fail {
            return Err(AppError::DatabaseError("connection refused".to_string()));
        }

        let id = format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.persisted.lock().unwrap().push((
            room_id.to_string(),
            user_id.to_string(),
            content.to_string(),
        ));
        Ok(PersistedMessage {
            id,
            created_at: Utc::now(),
        })
    }
}
