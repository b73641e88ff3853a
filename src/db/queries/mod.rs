pub mod memory;
pub mod review;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::review::{NewRecord, ReviewRecord, UpdateFields};
use crate::thread::error::ThreadError;

/// Persistence contract for the flat review/reply store.
///
/// The engine only ever needs five operations; anything resembling a table
/// with the `product_reviews` shape can implement this. `fetch_for_product`
/// may return rows in any order — the tree builder re-sorts.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn fetch_for_product(&self, product_id: Uuid) -> Result<Vec<ReviewRecord>, ThreadError>;

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<ReviewRecord>, ThreadError>;

    /// Assigns id and timestamps. Fails `Validation` when the record breaks
    /// the rating/parent field rules and `DuplicateReview` when the author
    /// already has a top-level review for the product.
    async fn insert(&self, record: NewRecord) -> Result<ReviewRecord, ThreadError>;

    /// Applies the provided fields and bumps `updated_at`; everything else
    /// is immutable after insert. Fails `NotFound` for an absent id.
    async fn update(&self, id: Uuid, fields: UpdateFields) -> Result<ReviewRecord, ThreadError>;

    /// Permanent, single-record removal — descendants are left in place and
    /// surface as orphans on the next fetch. Fails `NotFound` if already
    /// gone.
    async fn delete(&self, id: Uuid) -> Result<(), ThreadError>;
}
