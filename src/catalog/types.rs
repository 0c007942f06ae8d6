//! Search-facing projections of catalog data.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Product identifier as the listing endpoint returns it (numeric or string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductId::Number(n) => write!(f, "{}", n),
            ProductId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        ProductId::Number(value)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        ProductId::Text(value.to_string())
    }
}

/// Minimal product projection used by search.
///
/// Other commerce fields (price, variants, stock) are ignored on deserialization.
/// `name` and `description` are always present: missing or `null` becomes `""`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: &str, description: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Deserialize a missing or `null` string as `""`
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A product with its cumulative relevance score (always > 0 in search output)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult<'a> {
    pub product: &'a Product,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_and_missing_fields_become_empty() {
        let json = r#"[
            {"id": 1, "name": null, "description": "Soft cotton"},
            {"id": "sku-2", "name": "Jeans"}
        ]"#;
        let products: Vec<Product> = serde_json::from_str(json).unwrap();

        assert_eq!(products[0].name, "");
        assert_eq!(products[0].description, "Soft cotton");
        assert_eq!(products[1].id, ProductId::Text("sku-2".to_string()));
        assert_eq!(products[1].description, "");
    }

    #[test]
    fn test_extra_commerce_fields_ignored() {
        let json = r#"{"id": 7, "name": "Áo Thun", "description": "", "price": 199000,
                       "variants": [{"size": "M"}]}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product, Product::new(7, "Áo Thun", ""));
    }

    #[test]
    fn test_product_id_display() {
        assert_eq!(ProductId::Number(42).to_string(), "42");
        assert_eq!(ProductId::from("abc").to_string(), "abc");
    }
}
