use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Product, ProductPayload};

pub mod dynamo;
pub mod item;
#[cfg(test)]
pub mod memory;

/// Page size of the product listing; there is no continuation token.
pub const SCAN_LIMIT: i32 = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    /// `attribute_exists(productId)` did not hold.
    #[error("conditional check failed")]
    ConditionFailed,

    /// Item could not be converted to or from a `Product`.
    #[error("item codec: {0}")]
    Codec(String),

    /// Anything the remote store reported.
    #[error("store backend: {0}")]
    Backend(String),
}

/// Single-item access to the products table. Every call is one round trip.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Unconditional write of the full record.
    async fn put(&self, product: &Product) -> Result<(), StoreError>;

    async fn get(&self, product_id: &str) -> Result<Option<Product>, StoreError>;

    /// One scan page of at most `limit` items.
    async fn scan(&self, limit: i32) -> Result<Vec<Product>, StoreError>;

    /// Overwrite the mutable fields of an existing record and return it as stored.
    async fn update(
        &self,
        product_id: &str,
        payload: &ProductPayload,
        updated_at: DateTime<Utc>,
    ) -> Result<Product, StoreError>;

    /// Delete an existing record; absent records fail with `ConditionFailed`.
    async fn delete(&self, product_id: &str) -> Result<(), StoreError>;
}
