//! Deterministic label-derived names.

/// Fallback identifier when a label has no alphanumeric characters.
pub const FALLBACK_FIELD_NAME: &str = "field";

/// Camel-cased, alphanumeric-only identifier derived from a display label.
///
/// `"Arrest Date"` becomes `"arrestDate"`, `"e-mail address"` becomes
/// `"eMailAddress"`.
#[must_use]
pub fn camel_case_identifier(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for (index, word) in label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if index == 0 {
            out.extend(first.to_lowercase());
        } else {
            out.extend(first.to_uppercase());
        }
        out.extend(chars.flat_map(char::to_lowercase));
    }
    if out.is_empty() {
        return FALLBACK_FIELD_NAME.to_owned();
    }
    out
}

/// Placeholder text shown in an empty input bound to `label`.
#[must_use]
pub fn default_placeholder(label: &str) -> String {
    format!("Enter {label}")
}
