//! Slug normalization for entity ids.
//!
//! Entity names arrive from a language model and become directory names,
//! so they are forced into a safe lowercase hyphenated form.

/// Convert an arbitrary name into a directory-safe slug.
///
/// Lowercases, spells out `&`, replaces non-alphanumeric runs with a
/// single hyphen and trims. Empty input falls back to `"unnamed"`.
///
/// # Example
/// ```
/// use para_memory::services::slug::slugify;
/// assert_eq!(slugify("Bards & Cards"), "bards-and-cards");
/// assert_eq!(slugify("API Design Decisions"), "api-design-decisions");
/// ```
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace('&', " and ");

    let mut result = String::with_capacity(lowered.len());
    let mut prev_hyphen = true; // start true to skip leading hyphens
    for c in lowered.chars() {
        if c.is_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        "unnamed".to_string()
    } else {
        result
    }
}
