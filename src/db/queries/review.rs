//! PostgreSQL adapter for the review store.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE product_reviews (
//!     id          UUID PRIMARY KEY,
//!     product_id  UUID NOT NULL,
//!     author_id   UUID NOT NULL,
//!     parent_id   UUID,
//!     reply_level INT NOT NULL,
//!     rating      INT,
//!     comment     TEXT NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL,
//!     updated_at  TIMESTAMPTZ NOT NULL
//! );
//!
//! -- One rating-bearing top-level review per author per product. The
//! -- engine never check-then-inserts; this index is what closes the
//! -- concurrent double-submit race.
//! CREATE UNIQUE INDEX product_reviews_one_root_per_author
//!     ON product_reviews (product_id, author_id)
//!     WHERE parent_id IS NULL;
//! ```
//!
//! Queries are bound at runtime so the crate builds without a live
//! database.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::review::{NewRecord, ReviewRecord, UpdateFields};
use crate::db::queries::ReviewStore;
use crate::thread::error::ThreadError;

pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn fetch_for_product(&self, product_id: Uuid) -> Result<Vec<ReviewRecord>, ThreadError> {
        let records = sqlx::query_as::<_, ReviewRecord>(
            r#"
            SELECT id, product_id, author_id, parent_id, reply_level, rating,
                   comment, created_at, updated_at
              FROM product_reviews
             WHERE product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<ReviewRecord>, ThreadError> {
        let record = sqlx::query_as::<_, ReviewRecord>(
            r#"
            SELECT id, product_id, author_id, parent_id, reply_level, rating,
                   comment, created_at, updated_at
              FROM product_reviews
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn insert(&self, record: NewRecord) -> Result<ReviewRecord, ThreadError> {
        record.validate()?;
        let now = Utc::now();
        let inserted = sqlx::query_as::<_, ReviewRecord>(
            r#"
            INSERT INTO product_reviews
                   (id, product_id, author_id, parent_id, reply_level, rating,
                    comment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id, product_id, author_id, parent_id, reply_level, rating,
                      comment, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.product_id)
        .bind(record.author_id)
        .bind(record.parent_id)
        .bind(record.reply_level)
        .bind(record.rating)
        .bind(record.comment)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ThreadError::DuplicateReview,
            _ => ThreadError::Storage(e),
        })?;
        Ok(inserted)
    }

    async fn update(&self, id: Uuid, fields: UpdateFields) -> Result<ReviewRecord, ThreadError> {
        let updated = sqlx::query_as::<_, ReviewRecord>(
            r#"
            UPDATE product_reviews
               SET rating     = COALESCE($2, rating),
                   comment    = COALESCE($3, comment),
                   updated_at = $4
             WHERE id = $1
            RETURNING id, product_id, author_id, parent_id, reply_level, rating,
                      comment, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(fields.rating)
        .bind(fields.comment)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or(ThreadError::NotFound(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), ThreadError> {
        let deleted: Option<(Uuid,)> =
            sqlx::query_as("DELETE FROM product_reviews WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match deleted {
            Some(_) => Ok(()),
            None => Err(ThreadError::NotFound(id)),
        }
    }
}
