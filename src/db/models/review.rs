use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::thread::error::ThreadError;

/// Deepest level a reply may sit at. Levels run 0 (top-level review) through
/// 3, so a thread spans at most four generations.
pub const MAX_REPLY_LEVEL: i32 = 3;

/// One row of the flat `product_reviews` store. A record with no parent is
/// the author's top-level review and carries the product rating; replies
/// never do.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub author_id: Uuid,
    /// `None` for a top-level review, otherwise the record replied to.
    pub parent_id: Option<Uuid>,
    /// 0 for a top-level review, parent's level + 1 for a reply.
    pub reply_level: i32,
    /// 1–5, present iff this is a top-level review.
    pub rating: Option<i32>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Insert payload: everything the caller decides; the store assigns `id` and
/// both timestamps.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub product_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub reply_level: i32,
    pub rating: Option<i32>,
    pub comment: String,
}

impl NewRecord {
    /// Field-shape rules every store adapter enforces before writing:
    /// a top-level review needs an in-range rating and level 0, a reply
    /// needs neither a rating nor a level outside 1..=3, and the comment
    /// must survive trimming.
    pub fn validate(&self) -> Result<(), ThreadError> {
        if self.comment.trim().is_empty() {
            return Err(ThreadError::Validation("comment must not be empty".into()));
        }
        match self.parent_id {
            None => {
                let rating = self.rating.ok_or_else(|| {
                    ThreadError::Validation("a top-level review requires a rating".into())
                })?;
                if !(1..=5).contains(&rating) {
                    return Err(ThreadError::Validation(format!(
                        "rating must be between 1 and 5, got {rating}"
                    )));
                }
                if self.reply_level != 0 {
                    return Err(ThreadError::Validation(
                        "a top-level review must sit at level 0".into(),
                    ));
                }
            }
            Some(_) => {
                if self.rating.is_some() {
                    return Err(ThreadError::Validation("a reply cannot carry a rating".into()));
                }
                if !(1..=MAX_REPLY_LEVEL).contains(&self.reply_level) {
                    return Err(ThreadError::Validation(format!(
                        "reply level must be between 1 and {MAX_REPLY_LEVEL}, got {}",
                        self.reply_level
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Partial update accepted by the store. Only these two fields (plus
/// `updated_at`, which the store bumps itself) ever change after insert.
#[derive(Debug, Clone, Default)]
pub struct UpdateFields {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// ✅ New top-level review (frontend sends this)
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewReviewRequest {
    pub rating: i32,
    pub comment: String,
}

/// ✅ New reply to an existing review or reply
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewReplyRequest {
    pub comment: String,
}

/// ✅ Update of the author's own top-level review
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    /// New rating; omit to keep the current one.
    pub rating: Option<i32>,
    pub comment: String,
}

/// ✅ Update of the author's own reply
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReplyRequest {
    pub comment: String,
}
