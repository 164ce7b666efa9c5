//! Identifier Rendering
//!
//! Definition ids and property names are arbitrary strings; generated code
//! needs JS identifiers (for exports) or valid object-literal keys (for fields).

use std::sync::OnceLock;

use regex::Regex;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z$_][a-zA-Z0-9$_]*$").expect("identifier pattern"))
}

fn non_identifier_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-zA-Z0-9$_]").expect("identifier charset pattern"))
}

pub fn is_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

/// Convert an arbitrary name into a JS identifier.
///
/// Characters outside `[A-Za-z0-9$_]` are removed; a leading digit gets a `_` prefix.
/// A name with no identifier characters at all becomes `_`.
pub fn encode_identifier(name: &str) -> String {
    if is_identifier(name) {
        return name.to_string();
    }

    let stripped = non_identifier_chars().replace_all(name, "");
    if stripped.is_empty() {
        "_".to_string()
    } else if stripped.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{stripped}")
    } else {
        stripped.into_owned()
    }
}

/// Render a property name as an object-literal key, single-quoting it when needed
pub fn property_name(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}
