use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;

use super::StoreError;
use crate::models::{timestamp, Product};

pub type Item = HashMap<String, AttributeValue>;

pub const KEY_ATTRIBUTE: &str = "productId";

pub fn key(product_id: &str) -> (String, AttributeValue) {
    (KEY_ATTRIBUTE.to_string(), AttributeValue::S(product_id.to_string()))
}

pub fn number(value: impl ToString) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

pub fn to_item(product: &Product) -> Item {
    HashMap::from([
        key(&product.product_id),
        ("name".to_string(), AttributeValue::S(product.name.clone())),
        (
            "description".to_string(),
            AttributeValue::S(product.description.clone()),
        ),
        ("price".to_string(), number(product.price)),
        ("category".to_string(), AttributeValue::S(product.category.clone())),
        ("stock".to_string(), number(product.stock)),
        (
            "createdAt".to_string(),
            AttributeValue::S(timestamp::format(&product.created_at)),
        ),
        (
            "updatedAt".to_string(),
            AttributeValue::S(timestamp::format(&product.updated_at)),
        ),
    ])
}

pub fn from_item(item: &Item) -> Result<Product, StoreError> {
    Ok(Product {
        product_id: string(item, KEY_ATTRIBUTE)?,
        name: string(item, "name")?,
        description: string(item, "description")?,
        price: parsed(item, "price")?,
        category: string(item, "category")?,
        stock: parsed(item, "stock")?,
        created_at: timestamp::parse(&string(item, "createdAt")?)
            .map_err(|e| StoreError::Codec(format!("createdAt: {e}")))?,
        updated_at: timestamp::parse(&string(item, "updatedAt")?)
            .map_err(|e| StoreError::Codec(format!("updatedAt: {e}")))?,
    })
}

fn attribute<'a>(item: &'a Item, name: &str) -> Result<&'a AttributeValue, StoreError> {
    item.get(name)
        .ok_or_else(|| StoreError::Codec(format!("missing attribute {name}")))
}

fn string(item: &Item, name: &str) -> Result<String, StoreError> {
    attribute(item, name)?
        .as_s()
        .cloned()
        .map_err(|_| StoreError::Codec(format!("attribute {name} is not a string")))
}

fn parsed<T>(item: &Item, name: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    attribute(item, name)?
        .as_n()
        .map_err(|_| StoreError::Codec(format!("attribute {name} is not a number")))?
        .parse()
        .map_err(|e| StoreError::Codec(format!("attribute {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn sample() -> Product {
        Product {
            product_id: "4f1c".to_string(),
            name: "Widget".to_string(),
            description: "Blue".to_string(),
            price: 9.99,
            category: "tools".to_string(),
            stock: 5,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            updated_at: DateTime::from_timestamp(1_700_000_060, 500_000_000).unwrap(),
        }
    }

    #[test]
    fn item_uses_string_and_number_attributes() {
        let item = to_item(&sample());
        assert_eq!(item.len(), 8);
        assert_eq!(item["productId"], AttributeValue::S("4f1c".into()));
        assert_eq!(item["price"], AttributeValue::N("9.99".into()));
        assert_eq!(item["stock"], AttributeValue::N("5".into()));
        assert_eq!(
            item["createdAt"],
            AttributeValue::S("2023-11-14T22:13:20.000Z".into())
        );
        assert_eq!(
            item["updatedAt"],
            AttributeValue::S("2023-11-14T22:14:20.500Z".into())
        );
    }

    #[test]
    fn decoding_an_encoded_item_gives_back_the_product() {
        let product = sample();
        assert_eq!(from_item(&to_item(&product)).unwrap(), product);
    }

    #[test]
    fn decodes_numbers_written_with_fixed_precision() {
        let mut item = to_item(&sample());
        item.insert("price".into(), AttributeValue::N("9.990000".into()));
        assert!((from_item(&item).unwrap().price - 9.99).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_attribute_is_a_codec_error() {
        let mut item = to_item(&sample());
        item.remove("category");
        assert!(matches!(from_item(&item), Err(StoreError::Codec(msg)) if msg.contains("category")));
    }

    #[test]
    fn mistyped_attribute_is_a_codec_error() {
        let mut item = to_item(&sample());
        item.insert("stock".into(), AttributeValue::S("5".into()));
        assert!(matches!(from_item(&item), Err(StoreError::Codec(_))));

        let mut item = to_item(&sample());
        item.insert("stock".into(), AttributeValue::N("5.5".into()));
        assert!(matches!(from_item(&item), Err(StoreError::Codec(_))));
    }

    #[test]
    fn bad_timestamp_is_a_codec_error() {
        let mut item = to_item(&sample());
        item.insert("createdAt".into(), AttributeValue::S("yesterday".into()));
        assert!(matches!(from_item(&item), Err(StoreError::Codec(msg)) if msg.starts_with("createdAt")));
    }
}
