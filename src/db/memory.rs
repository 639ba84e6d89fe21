use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};

use super::item::{from_item, number, to_item, Item};
use super::{ProductStore, StoreError};
use crate::models::{timestamp, Product, ProductPayload};

/// In-memory table holding encoded items, with the same conditional-write and
/// scan-limit behavior as the DynamoDB store.
#[derive(Default)]
pub struct MemoryProductStore {
    items: Mutex<BTreeMap<String, Item>>,
    unavailable: bool,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails with a backend error.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Store a raw item, bypassing the codec.
    pub fn insert_raw(&self, product_id: &str, item: Item) {
        self.items.lock().unwrap().insert(product_id.to_string(), item);
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Backend("service unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn put(&self, product: &Product) -> Result<(), StoreError> {
        self.check_available()?;
        self.items
            .lock()
            .unwrap()
            .insert(product.product_id.clone(), to_item(product));
        Ok(())
    }

    async fn get(&self, product_id: &str) -> Result<Option<Product>, StoreError> {
        self.check_available()?;
        self.items
            .lock()
            .unwrap()
            .get(product_id)
            .map(from_item)
            .transpose()
    }

    async fn scan(&self, limit: i32) -> Result<Vec<Product>, StoreError> {
        self.check_available()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        self.items
            .lock()
            .unwrap()
            .values()
            .take(limit)
            .map(from_item)
            .collect()
    }

    async fn update(
        &self,
        product_id: &str,
        payload: &ProductPayload,
        updated_at: DateTime<Utc>,
    ) -> Result<Product, StoreError> {
        self.check_available()?;
        let mut items = self.items.lock().unwrap();
        let item = items
            .get_mut(product_id)
            .ok_or(StoreError::ConditionFailed)?;

        item.insert("name".into(), AttributeValue::S(payload.name.clone()));
        item.insert("description".into(), AttributeValue::S(payload.description.clone()));
        item.insert("price".into(), number(payload.price));
        item.insert("category".into(), AttributeValue::S(payload.category.clone()));
        item.insert("stock".into(), number(payload.stock));
        item.insert(
            "updatedAt".into(),
            AttributeValue::S(timestamp::format(&updated_at)),
        );

        from_item(item)
    }

    async fn delete(&self, product_id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.items
            .lock()
            .unwrap()
            .remove(product_id)
            .map(|_| ())
            .ok_or(StoreError::ConditionFailed)
    }
}
