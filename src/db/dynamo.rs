//! DynamoDB-backed product store.
//!
//! Existence checks on update and delete are expressed as
//! `attribute_exists(productId)` conditions rather than a prior read, so each
//! operation stays a single request.

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::{DisplayErrorContext, SdkError},
    operation::{delete_item::DeleteItemError, update_item::UpdateItemError},
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType, ReturnValue,
        ScalarAttributeType,
    },
    Client,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::item::{from_item, key, number, to_item, KEY_ATTRIBUTE};
use super::{ProductStore, StoreError};
use crate::config::Config;
use crate::models::{timestamp, Product, ProductPayload};

const EXISTS_CONDITION: &str = "attribute_exists(productId)";

const UPDATE_EXPRESSION: &str = "SET #name = :name, description = :desc, price = :price, \
     category = :cat, stock = :stock, updatedAt = :updated";

/// Build a client for the configured region, honouring an endpoint override.
pub async fn create_client(config: &Config) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));
    if let Some(endpoint) = &config.dynamodb_endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    Client::new(&loader.load().await)
}

fn backend<E>(err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Backend(DisplayErrorContext(err).to_string())
}

/// Like `backend`, but a failed `attribute_exists` condition, as recognised by
/// `is_condition_failure`, becomes `ConditionFailed`.
fn conditional<E, R>(err: SdkError<E, R>, is_condition_failure: fn(&E) -> bool) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if err.as_service_error().map(is_condition_failure).unwrap_or(false) {
        StoreError::ConditionFailed
    } else {
        backend(err)
    }
}

pub struct DynamoProductStore {
    client: Client,
    table_name: String,
}

impl DynamoProductStore {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    /// Create the table (hash key `productId`, on-demand billing) unless it
    /// already exists. Safe to call from several instances at once.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => {
                debug!(table = %self.table_name, "Table already exists");
                return Ok(());
            }
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false);
                if !not_found {
                    return Err(backend(err));
                }
            }
        }

        info!(table = %self.table_name, "Creating table");

        let created = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(KEY_ATTRIBUTE)
                    .key_type(KeyType::Hash)
                    .build()
                    .map_err(backend)?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(KEY_ATTRIBUTE)
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .map_err(backend)?,
            )
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match created {
            Ok(_) => {
                info!(table = %self.table_name, "Table created");
                Ok(())
            }
            // another instance won the race
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_resource_in_use_exception())
                    .unwrap_or(false) =>
            {
                debug!(table = %self.table_name, "Table is being created elsewhere");
                Ok(())
            }
            Err(err) => Err(backend(err)),
        }
    }
}

#[async_trait]
impl ProductStore for DynamoProductStore {
    #[tracing::instrument(skip_all, level = "debug", fields(id = %product.product_id))]
    async fn put(&self, product: &Product) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(product)))
            .send()
            .await
            .map_err(backend)?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get(&self, product_id: &str) -> Result<Option<Product>, StoreError> {
        let (name, value) = key(product_id);
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(name, value)
            .send()
            .await
            .map_err(backend)?;

        output.item().map(from_item).transpose()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn scan(&self, limit: i32) -> Result<Vec<Product>, StoreError> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .limit(limit)
            .send()
            .await
            .map_err(backend)?;

        output.items().iter().map(from_item).collect()
    }

    #[tracing::instrument(skip(self, payload), level = "debug")]
    async fn update(
        &self,
        product_id: &str,
        payload: &ProductPayload,
        updated_at: DateTime<Utc>,
    ) -> Result<Product, StoreError> {
        let (name, value) = key(product_id);
        let output = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(name, value)
            .update_expression(UPDATE_EXPRESSION)
            .expression_attribute_names("#name", "name")
            .expression_attribute_values(":name", AttributeValue::S(payload.name.clone()))
            .expression_attribute_values(":desc", AttributeValue::S(payload.description.clone()))
            .expression_attribute_values(":price", number(payload.price))
            .expression_attribute_values(":cat", AttributeValue::S(payload.category.clone()))
            .expression_attribute_values(":stock", number(payload.stock))
            .expression_attribute_values(
                ":updated",
                AttributeValue::S(timestamp::format(&updated_at)),
            )
            .condition_expression(EXISTS_CONDITION)
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(|err| conditional(err, UpdateItemError::is_conditional_check_failed_exception))?;

        let attributes = output
            .attributes()
            .ok_or_else(|| StoreError::Codec("update returned no attributes".to_string()))?;
        from_item(attributes)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn delete(&self, product_id: &str) -> Result<(), StoreError> {
        let (name, value) = key(product_id);
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(name, value)
            .condition_expression(EXISTS_CONDITION)
            .send()
            .await
            .map_err(|err| conditional(err, DeleteItemError::is_conditional_check_failed_exception))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::error::ConditionalCheckFailedException;

    use super::*;

    fn condition_failed() -> SdkError<DeleteItemError, ()> {
        SdkError::service_error(
            DeleteItemError::ConditionalCheckFailedException(
                ConditionalCheckFailedException::builder().build(),
            ),
            (),
        )
    }

    #[test]
    fn failed_condition_is_classified() {
        let err = conditional(
            condition_failed(),
            DeleteItemError::is_conditional_check_failed_exception,
        );
        assert!(matches!(err, StoreError::ConditionFailed));
    }

    #[test]
    fn other_failures_are_backend_errors() {
        let err = conditional(
            SdkError::<DeleteItemError, ()>::timeout_error("timed out"),
            DeleteItemError::is_conditional_check_failed_exception,
        );
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
