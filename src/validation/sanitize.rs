// SPDX-License-Identifier: GPL-3.0-only
//! Inbound sanitization. Remote documents may have been written by other
//! tools, so every read passes through here before reaching the editor:
//! plain-text fields are HTML-escaped, rich-text fields have active
//! content stripped. The pass is idempotent, so running it on already
//! sanitized data changes nothing.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::catalog::ProductDocument;

static SCRIPT_ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid regex"));

static SCRIPT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?script\b[^>]*>").expect("valid regex"));

static EVENT_HANDLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<[^>]+?)\son\w+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
});

static JS_SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)((?:href|src)\s*=\s*["']?\s*)javascript\s*:"#).expect("valid regex")
});

/// Apply a removal/rewrite until the text stops changing. A single pass is
/// not enough: stripping can reassemble a payload that was split across
/// the removed span ("<scr<script>ipt>").
fn rewrite_to_fixpoint(re: &Regex, replacement: &str, input: String) -> String {
    let mut current = input;
    loop {
        let next = re.replace_all(&current, replacement).into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Strip active content from a rich-text field, keeping harmless markup.
fn sanitize_rich_text(input: &str) -> String {
    let mut text = input.to_string();
    text = rewrite_to_fixpoint(&SCRIPT_ELEMENT_RE, "", text);
    text = rewrite_to_fixpoint(&SCRIPT_TAG_RE, "", text);
    text = rewrite_to_fixpoint(&EVENT_HANDLER_RE, "${1}", text);
    text = rewrite_to_fixpoint(&JS_SCHEME_RE, "${1}", text);
    text
}

/// True when the characters after an '&' spell out an HTML entity
/// (named, decimal or hex), terminated by ';'.
fn is_entity_start(rest: &[char]) -> bool {
    if rest.first() == Some(&'#') {
        let hex = matches!(rest.get(1), Some('x') | Some('X'));
        let mut i = if hex { 2 } else { 1 };
        let start = i;
        while let Some(&c) = rest.get(i) {
            if c == ';' {
                return i > start;
            }
            let is_digit = if hex { c.is_ascii_hexdigit() } else { c.is_ascii_digit() };
            if !is_digit || i - start >= 8 {
                return false;
            }
            i += 1;
        }
        false
    } else {
        let mut len = 0;
        while let Some(&c) = rest.get(len) {
            if c == ';' {
                return len > 0;
            }
            if !c.is_ascii_alphanumeric() || len >= 32 {
                return false;
            }
            len += 1;
        }
        false
    }
}

/// HTML-escape a plain-text field. Ampersands already part of an entity
/// are left alone, which keeps the escape idempotent.
fn escape_text(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());

    for (idx, &c) in chars.iter().enumerate() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '&' => {
                if is_entity_start(&chars[idx + 1..]) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                }
            }
            other => out.push(other),
        }
    }

    out
}

fn apply(value: &mut String, f: fn(&str) -> String) -> bool {
    let next = f(value);
    if next != *value {
        *value = next;
        true
    } else {
        false
    }
}

/// Sanitize a whole document in place and return it. Changes are logged,
/// never reported as errors: inbound data is repaired, not rejected.
pub fn sanitize_document(mut doc: ProductDocument) -> ProductDocument {
    for product in &mut doc.products {
        let label = product.label();
        let mut changed = 0usize;

        changed += apply(&mut product.title, escape_text) as usize;
        changed += apply(&mut product.slug, escape_text) as usize;
        changed += apply(&mut product.sku, escape_text) as usize;
        for category in &mut product.categories {
            changed += apply(category, escape_text) as usize;
        }
        for tag in &mut product.tags {
            changed += apply(tag, escape_text) as usize;
        }
        changed += apply(&mut product.description, sanitize_rich_text) as usize;
        changed += apply(&mut product.short_description, sanitize_rich_text) as usize;

        if changed > 0 {
            debug!(product = %label, fields = changed, "Sanitized inbound fields");
        }
    }

    doc
}
