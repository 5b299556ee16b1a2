// SPDX-License-Identifier: GPL-3.0-only
//! Outbound validation. Runs before any remote write and collects every
//! problem in the document, not just the first, so the editor can present
//! the full list. Any error blocks the entire write.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

use crate::catalog::{Product, parse_price};
use crate::config::ImageConfig;

static SCRIPT_PATTERN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<\s*script").expect("valid regex"));

#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// 1-based position in the document
    pub position: usize,
    pub product: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "product {} ({}): {}",
            self.position, self.product, self.message
        )
    }
}

/// Which image sources products may reference: configured remote
/// prefixes, site-relative paths, and inline image data URLs.
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    allowed_prefixes: Vec<String>,
}

impl ImagePolicy {
    pub fn new(allowed_prefixes: Vec<String>) -> Self {
        Self { allowed_prefixes }
    }

    pub fn from_config(images: &ImageConfig) -> Self {
        Self::new(images.allowed_prefixes.clone())
    }

    pub fn is_allowed(&self, raw: &str) -> bool {
        if raw.is_empty() {
            return true;
        }

        match Url::parse(raw) {
            Ok(url) => {
                if url.scheme() == "data" {
                    return url.path().starts_with("image/");
                }
                self.allowed_prefixes
                    .iter()
                    .any(|prefix| raw.starts_with(prefix.as_str()))
            }
            // No scheme: a site-relative path served alongside the catalog
            Err(url::ParseError::RelativeUrlWithoutBase) => true,
            Err(_) => false,
        }
    }
}

fn check_pricing(product: &Product, report: &mut impl FnMut(String)) {
    let fields = [
        ("price", &product.price),
        ("regular_price", &product.regular_price),
        ("sale_price", &product.sale_price),
    ];

    let mut any_set = false;
    for (name, raw) in fields {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        any_set = true;
        match parse_price(trimmed) {
            Some(value) if value.is_sign_negative() && !value.is_zero() => {
                report(format!("{} '{}' must not be negative", name, trimmed));
            }
            Some(_) => {}
            None => {
                report(format!("{} '{}' is not a number", name, trimmed));
            }
        }
    }

    if !any_set {
        report("no price set".to_string());
    }
}

fn check_script_patterns(product: &Product, report: &mut impl FnMut(String)) {
    let mut fields: Vec<(String, &str)> = vec![
        ("title".to_string(), product.title.as_str()),
        ("slug".to_string(), product.slug.as_str()),
        ("sku".to_string(), product.sku.as_str()),
        ("description".to_string(), product.description.as_str()),
        (
            "short_description".to_string(),
            product.short_description.as_str(),
        ),
    ];
    for (i, category) in product.categories.iter().enumerate() {
        fields.push((format!("categories[{}]", i), category.as_str()));
    }
    for (i, tag) in product.tags.iter().enumerate() {
        fields.push((format!("tags[{}]", i), tag.as_str()));
    }

    for (name, value) in fields {
        if SCRIPT_PATTERN_RE.is_match(value) {
            report(format!("{} contains a script tag", name));
        }
    }
}

fn check_images(product: &Product, images: &ImagePolicy, report: &mut impl FnMut(String)) {
    if !images.is_allowed(&product.image) {
        report(format!(
            "image URL '{}' is not from an allowed source",
            product.image
        ));
    }
    for (i, url) in product.images.iter().enumerate() {
        if !images.is_allowed(url) {
            report(format!(
                "images[{}] URL '{}' is not from an allowed source",
                i, url
            ));
        }
    }
}

/// Validate every product, returning all problems found. An empty result
/// means the document may be written.
pub fn validate_products(products: &[Product], images: &ImagePolicy) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (idx, product) in products.iter().enumerate() {
        let position = idx + 1;
        let label = product.label();
        let mut report = |message: String| {
            errors.push(ValidationError {
                position,
                product: label.clone(),
                message,
            })
        };

        if product.id.is_none() {
            report("missing id".to_string());
        }
        if product.title.trim().is_empty() {
            report("title must not be empty".to_string());
        }
        if product.slug.trim().is_empty() {
            report("slug must not be empty".to_string());
        }
        if product.sku.trim().is_empty() {
            report("sku must not be empty".to_string());
        }

        check_pricing(product, &mut report);
        check_script_patterns(product, &mut report);
        check_images(product, images, &mut report);
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;

    fn policy() -> ImagePolicy {
        ImagePolicy::new(vec![
            "https://res.cloudinary.com/".to_string(),
            "https://images.unsplash.com/".to_string(),
        ])
    }

    fn valid_product(slug: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Mug",
            "slug": slug,
            "sku": "M-1",
            "price": "10.00"
        }))
        .unwrap()
    }

    fn messages(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn test_valid_product_passes() {
        let products = vec![valid_product("mug")];
        assert!(validate_products(&products, &policy()).is_empty());
    }

    #[test]
    fn test_missing_identity_fields_all_reported() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "price": "10.00"
        }))
        .unwrap();

        let errors = validate_products(&[product], &policy());
        let msgs = messages(&errors);
        assert!(msgs.contains(&"missing id"));
        assert!(msgs.contains(&"title must not be empty"));
        assert!(msgs.contains(&"slug must not be empty"));
        assert!(msgs.contains(&"sku must not be empty"));
    }

    #[test]
    fn test_non_numeric_and_script_reported_together() {
        let mut product = valid_product("mug");
        product.price = "abc".to_string();
        product.title = "Mug <script>alert(1)</script>".to_string();

        let errors = validate_products(&[product], &policy());
        let msgs = messages(&errors);
        assert!(msgs.contains(&"price 'abc' is not a number"));
        assert!(msgs.contains(&"title contains a script tag"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut product = valid_product("mug");
        product.price = "-5.00".to_string();

        let errors = validate_products(&[product], &policy());
        assert_eq!(messages(&errors), vec!["price '-5.00' must not be negative"]);
    }

    #[test]
    fn test_zero_price_allowed() {
        let mut product = valid_product("mug");
        product.price = "0".to_string();
        assert!(validate_products(&[product], &policy()).is_empty());
    }

    #[test]
    fn test_no_price_at_all_rejected() {
        let mut product = valid_product("mug");
        product.price = String::new();

        let errors = validate_products(&[product], &policy());
        assert_eq!(messages(&errors), vec!["no price set"]);
    }

    #[test]
    fn test_any_set_price_field_must_parse() {
        let mut product = valid_product("mug");
        product.sale_price = "soon".to_string();

        let errors = validate_products(&[product], &policy());
        assert_eq!(messages(&errors), vec!["sale_price 'soon' is not a number"]);
    }

    #[test]
    fn test_script_pattern_in_tag_reported_with_index() {
        let mut product = valid_product("mug");
        product.tags = vec!["fine".to_string(), "< script >bad".to_string()];

        let errors = validate_products(&[product], &policy());
        assert_eq!(messages(&errors), vec!["tags[1] contains a script tag"]);
    }

    #[test]
    fn test_errors_collected_across_products() {
        let mut first = valid_product("mug");
        first.price = "abc".to_string();
        let mut second = valid_product("shirt");
        second.sku = String::new();

        let errors = validate_products(&[first, second], &policy());
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].position, 1);
        assert_eq!(errors[0].product, "mug");
        assert_eq!(errors[1].position, 2);
        assert_eq!(errors[1].product, "shirt");
    }

    #[test]
    fn test_error_display() {
        let error = ValidationError {
            position: 3,
            product: "mug".to_string(),
            message: "price 'abc' is not a number".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "product 3 (mug): price 'abc' is not a number"
        );
    }

    #[test]
    fn test_image_policy_allows_expected_sources() {
        let policy = policy();
        assert!(policy.is_allowed(""));
        assert!(policy.is_allowed("https://res.cloudinary.com/demo/image/upload/mug.jpg"));
        assert!(policy.is_allowed("https://images.unsplash.com/photo-123"));
        assert!(policy.is_allowed("/assets/images/mug.jpg"));
        assert!(policy.is_allowed("./images/mug.jpg"));
        assert!(policy.is_allowed("images/mug.jpg"));
        assert!(policy.is_allowed("data:image/png;base64,iVBORw0KGgo="));
    }

    #[test]
    fn test_image_policy_rejects_unlisted_sources() {
        let policy = policy();
        assert!(!policy.is_allowed("https://evil.example.com/mug.jpg"));
        assert!(!policy.is_allowed("http://res.cloudinary.com/demo/mug.jpg"));
        assert!(!policy.is_allowed("data:text/html;base64,PHNjcmlwdD4="));
        assert!(!policy.is_allowed("javascript:alert(1)"));
        assert!(!policy.is_allowed("file:///etc/passwd"));
    }

    #[test]
    fn test_disallowed_image_reported() {
        let mut product = valid_product("mug");
        product.image = "https://evil.example.com/mug.jpg".to_string();
        product.images = vec![
            "https://res.cloudinary.com/demo/mug2.jpg".to_string(),
            "https://evil.example.com/mug3.jpg".to_string(),
        ];

        let errors = validate_products(&[product], &policy());
        let msgs = messages(&errors);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].starts_with("image URL 'https://evil.example.com/mug.jpg'"));
        assert!(msgs[1].starts_with("images[1] URL"));
    }
}
