// SPDX-License-Identifier: GPL-3.0-only
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written into every document this daemon produces.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

fn default_schema_version() -> i64 {
    CURRENT_SCHEMA_VERSION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Simple,
    Variable,
}

impl Default for ProductKind {
    fn default() -> Self {
        ProductKind::Simple
    }
}

/// The complete catalog document: an ordered list of products plus a
/// schema version. Product order is significant and preserved verbatim
/// through decode/encode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDocument {
    /// Documents written before versioning was introduced carry no field
    /// and are treated as version 1.
    #[serde(default = "default_schema_version")]
    pub schema_version: i64,

    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductDocument {
    pub fn empty() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            products: Vec::new(),
        }
    }

    pub fn new(products: Vec<Product>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            products,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Numeric identifier assigned by the editor; null for drafts
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub title: String,

    /// URL-safe identifier, also the primary index key
    #[serde(default)]
    pub slug: String,

    /// Merchant stock-keeping unit
    #[serde(default)]
    pub sku: String,

    /// Simple or variable; variable products carry attributes/variations
    #[serde(rename = "type", default)]
    pub kind: ProductKind,

    /// Current price as a decimal string; empty means unset
    #[serde(default)]
    pub price: String,

    #[serde(default)]
    pub regular_price: String,

    #[serde(default)]
    pub sale_price: String,

    /// Rich-text body; limited HTML allowed
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub short_description: String,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Primary image URL (remote, relative, or data URL)
    #[serde(default)]
    pub image: String,

    /// Additional image URLs
    #[serde(default)]
    pub images: Vec<String>,

    /// Hidden products are stored but excluded from the checkout index
    #[serde(default)]
    pub hidden: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<ProductAttribute>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<ProductVariation>,

    /// Editor-owned fields this daemon does not interpret (stock, shipping,
    /// display state). Carried through untouched so a save/load cycle never
    /// drops them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    /// Attribute/variation pair for products that actually vary. Returns
    /// None for simple products and for variable products with no
    /// variations recorded yet.
    pub fn variable_parts(&self) -> Option<(&[ProductAttribute], &[ProductVariation])> {
        if self.kind == ProductKind::Variable && !self.variations.is_empty() {
            Some((&self.attributes, &self.variations))
        } else {
            None
        }
    }

    /// Human-readable handle for log lines and validation messages.
    pub fn label(&self) -> String {
        if !self.slug.is_empty() {
            self.slug.clone()
        } else if let Some(id) = self.id {
            id.to_string()
        } else {
            "<unidentified>".to_string()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAttribute {
    pub name: String,

    /// Option values in display order, e.g. ["S", "M", "L"]
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariation {
    /// Attribute name to selected option value, e.g. {"Size": "M"}
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    #[serde(default)]
    pub price: String,

    #[serde(default)]
    pub regular_price: String,

    #[serde(default)]
    pub sale_price: String,

    /// Explicit price offset relative to the base product; when absent the
    /// offset is derived from the variation price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_delta: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Canonical byte form of a document: pretty-printed JSON with a trailing
/// newline. This is the exact payload stored remotely, chosen to diff
/// cleanly under version control.
pub fn encode_document(doc: &ProductDocument) -> anyhow::Result<String> {
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');
    Ok(text)
}

pub fn decode_document(raw: &[u8]) -> Result<ProductDocument, serde_json::Error> {
    serde_json::from_slice(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_minimal_document() {
        let json = r#"{"products": [{"title": "Mug"}]}"#;
        let doc = decode_document(json.as_bytes()).unwrap();

        assert_eq!(doc.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(doc.products.len(), 1);
        let product = &doc.products[0];
        assert_eq!(product.title, "Mug");
        assert_eq!(product.id, None);
        assert_eq!(product.kind, ProductKind::Simple);
        assert_eq!(product.price, "");
        assert!(!product.hidden);
        assert!(product.variations.is_empty());
    }

    #[test]
    fn test_decode_variable_product() {
        let json = r#"{
            "schema_version": 1,
            "products": [{
                "id": 42,
                "title": "Shirt",
                "slug": "shirt",
                "sku": "SH-1",
                "type": "variable",
                "price": "20.00",
                "attributes": [{"name": "Size", "options": ["S", "M"]}],
                "variations": [
                    {"attributes": {"Size": "S"}, "price": "20.00"},
                    {"attributes": {"Size": "M"}, "price": "22.00"}
                ]
            }]
        }"#;
        let doc = decode_document(json.as_bytes()).unwrap();
        let product = &doc.products[0];

        assert_eq!(product.kind, ProductKind::Variable);
        let (attributes, variations) = product.variable_parts().unwrap();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].options, vec!["S", "M"]);
        assert_eq!(variations.len(), 2);
        assert_eq!(variations[1].attributes.get("Size"), Some(&"M".to_string()));
    }

    #[test]
    fn test_variable_parts_requires_variations() {
        let json = r#"{"products": [{"title": "Shirt", "type": "variable"}]}"#;
        let doc = decode_document(json.as_bytes()).unwrap();
        assert!(doc.products[0].variable_parts().is_none());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{"products": [{
            "title": "Mug",
            "slug": "mug",
            "stock_status": "instock",
            "weight": "0.3"
        }]}"#;
        let doc = decode_document(json.as_bytes()).unwrap();
        assert_eq!(
            doc.products[0].extra.get("stock_status"),
            Some(&serde_json::Value::String("instock".to_string()))
        );

        let encoded = encode_document(&doc).unwrap();
        let reparsed = decode_document(encoded.as_bytes()).unwrap();
        assert_eq!(
            reparsed.products[0].extra.get("weight"),
            Some(&serde_json::Value::String("0.3".to_string()))
        );
    }

    #[test]
    fn test_product_order_preserved() {
        let json = r#"{"products": [
            {"slug": "c"}, {"slug": "a"}, {"slug": "b"}
        ]}"#;
        let doc = decode_document(json.as_bytes()).unwrap();
        let encoded = encode_document(&doc).unwrap();
        let reparsed = decode_document(encoded.as_bytes()).unwrap();

        let slugs: Vec<&str> = reparsed.products.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_encode_is_pretty_with_trailing_newline() {
        let doc = ProductDocument::empty();
        let encoded = encode_document(&doc).unwrap();

        assert!(encoded.ends_with('\n'));
        assert!(encoded.contains("\n  \"products\""));
        assert!(encoded.contains("\"schema_version\": 1"));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(decode_document(b"{not json").is_err());
        assert!(decode_document(b"[1, 2, 3]").is_err());
    }

    #[test]
    fn test_label() {
        let json = r#"{"products": [
            {"slug": "mug", "id": 7},
            {"id": 7},
            {"title": "Draft"}
        ]}"#;
        let doc = decode_document(json.as_bytes()).unwrap();
        assert_eq!(doc.products[0].label(), "mug");
        assert_eq!(doc.products[1].label(), "7");
        assert_eq!(doc.products[2].label(), "<unidentified>");
    }
}
