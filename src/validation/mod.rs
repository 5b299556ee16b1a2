// SPDX-License-Identifier: GPL-3.0-only
pub mod outbound;
pub mod sanitize;

pub use outbound::{ImagePolicy, ValidationError, validate_products};
pub use sanitize::sanitize_document;
