//! In-memory review store.
//!
//! [`MemoryReviewStore`] backs the service tests and lets the server run
//! without a database. It enforces the same field rules and the same
//! one-top-level-review-per-author constraint as the Postgres adapter, so
//! either can stand behind the engine interchangeably.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::db::models::review::{NewRecord, ReviewRecord, UpdateFields};
use crate::db::queries::ReviewStore;
use crate::thread::error::ThreadError;

#[derive(Default)]
pub struct MemoryReviewStore {
    records: Mutex<HashMap<Uuid, ReviewRecord>>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, ReviewRecord>> {
        // A panic while holding the lock cannot leave records half-written,
        // so a poisoned guard is still usable.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn fetch_for_product(&self, product_id: Uuid) -> Result<Vec<ReviewRecord>, ThreadError> {
        let records = self.lock();
        Ok(records.values().filter(|r| r.product_id == product_id).cloned().collect())
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<ReviewRecord>, ThreadError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn insert(&self, record: NewRecord) -> Result<ReviewRecord, ThreadError> {
        record.validate()?;
        let mut records = self.lock();
        if record.parent_id.is_none() {
            let taken = records.values().any(|r| {
                r.parent_id.is_none()
                    && r.product_id == record.product_id
                    && r.author_id == record.author_id
            });
            if taken {
                return Err(ThreadError::DuplicateReview);
            }
        }
        let now = Utc::now();
        let stored = ReviewRecord {
            id: Uuid::new_v4(),
            product_id: record.product_id,
            author_id: record.author_id,
            parent_id: record.parent_id,
            reply_level: record.reply_level,
            rating: record.rating,
            comment: record.comment,
            created_at: now,
            updated_at: now,
        };
        records.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: Uuid, fields: UpdateFields) -> Result<ReviewRecord, ThreadError> {
        let mut records = self.lock();
        let record = records.get_mut(&id).ok_or(ThreadError::NotFound(id))?;
        if let Some(rating) = fields.rating {
            record.rating = Some(rating);
        }
        if let Some(comment) = fields.comment {
            record.comment = comment;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), ThreadError> {
        match self.lock().remove(&id) {
            Some(_) => Ok(()),
            None => Err(ThreadError::NotFound(id)),
        }
    }
}
