// SPDX-License-Identifier: GPL-3.0-only
//! Checkout price-validation index. The hosted checkout re-fetches this
//! file and rejects any cart whose prices disagree with it, so entries
//! must mirror exactly what the storefront displays. Regenerated from the
//! full document on every successful catalog write.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{
    Product, ProductAttribute, ProductVariation, effective_price, money_f64, parse_price,
    round_money,
};

/// One checkout-verifiable product. Products are listed under their slug;
/// a second entry under the numeric id covers carts that reference
/// products by id instead.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIndexEntry {
    pub id: String,
    pub price: f64,
    pub url: String,
    #[serde(rename = "customFields", skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Vec<CustomField>>,
}

/// A selectable attribute with its pipe-delimited option list, each option
/// carrying a bracketed price delta when it changes the price.
#[derive(Debug, Clone, Serialize)]
pub struct CustomField {
    pub name: String,
    pub options: String,
}

fn variation_effective_price(variation: &ProductVariation) -> Decimal {
    effective_price(
        &variation.sale_price,
        &variation.price,
        &variation.regular_price,
    )
}

/// Price offset for one option value. The first variation carrying this
/// name/value pair decides: its explicit delta field when numeric, else
/// its own price relative to the base. Options no variation covers cost
/// nothing extra.
fn option_delta(
    attribute_name: &str,
    option: &str,
    variations: &[ProductVariation],
    base_price: Decimal,
) -> Decimal {
    let matching = variations.iter().find(|v| {
        v.attributes
            .get(attribute_name)
            .is_some_and(|value| value == option)
    });
    let Some(variation) = matching else {
        return Decimal::ZERO;
    };

    if let Some(raw) = &variation.price_delta {
        if let Some(delta) = parse_price(raw) {
            return delta;
        }
    }

    variation_effective_price(variation) - base_price
}

fn format_option(option: &str, delta: Decimal) -> String {
    let rounded = round_money(delta);
    if rounded.is_zero() {
        option.to_string()
    } else if rounded > Decimal::ZERO {
        format!("{}[+{:.2}]", option, rounded)
    } else {
        format!("{}[-{:.2}]", option, rounded.abs())
    }
}

fn build_custom_fields(
    attributes: &[ProductAttribute],
    variations: &[ProductVariation],
    base_price: Decimal,
) -> Vec<CustomField> {
    attributes
        .iter()
        .filter(|attribute| !attribute.options.is_empty())
        .map(|attribute| {
            let options = attribute
                .options
                .iter()
                .map(|option| {
                    let delta = option_delta(&attribute.name, option, variations, base_price);
                    format_option(option, delta)
                })
                .collect::<Vec<_>>()
                .join("|");

            CustomField {
                name: attribute.name.clone(),
                options,
            }
        })
        .collect()
}

/// Generate the index in document order. Hidden products are excluded;
/// every other product appears under its slug (falling back to the
/// numeric id), plus a duplicate entry under the id when the two differ.
pub fn generate_index(products: &[Product], index_url: &str) -> Vec<ValidationIndexEntry> {
    let mut entries = Vec::new();

    for product in products {
        if product.hidden {
            continue;
        }

        let key = if !product.slug.is_empty() {
            product.slug.clone()
        } else if let Some(id) = product.id {
            id.to_string()
        } else {
            debug!(title = %product.title, "Skipping index entry for product without slug or id");
            continue;
        };

        let base_price =
            effective_price(&product.sale_price, &product.price, &product.regular_price);
        let price = money_f64(base_price);

        let custom_fields = product
            .variable_parts()
            .map(|(attributes, variations)| build_custom_fields(attributes, variations, base_price))
            .filter(|fields| !fields.is_empty());

        entries.push(ValidationIndexEntry {
            id: key.clone(),
            price,
            url: index_url.to_string(),
            custom_fields: custom_fields.clone(),
        });

        // Dual lookup keys: carts may reference the numeric id instead of
        // the slug
        if let Some(id) = product.id {
            let id_key = id.to_string();
            if id_key != key {
                entries.push(ValidationIndexEntry {
                    id: id_key,
                    price,
                    url: index_url.to_string(),
                    custom_fields,
                });
            }
        }
    }

    entries
}

/// Canonical byte form of the index, matching the document encoding:
/// pretty-printed JSON with a trailing newline.
pub fn encode_index(entries: &[ValidationIndexEntry]) -> anyhow::Result<String> {
    let mut text = serde_json::to_string_pretty(entries)?;
    text.push('\n');
    Ok(text)
}
