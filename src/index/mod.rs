// SPDX-License-Identifier: GPL-3.0-only
pub mod generator;

pub use generator::{CustomField, ValidationIndexEntry, encode_index, generate_index};
