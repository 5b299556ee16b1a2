// SPDX-License-Identifier: GPL-3.0-only
pub mod models;
pub mod prices;

pub use models::{
    Product, ProductAttribute, ProductDocument, ProductKind, ProductVariation, decode_document,
    encode_document,
};
pub use prices::{effective_price, money_f64, parse_price, round_money};
