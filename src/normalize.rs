//! Accent- and case-insensitive location matching

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercases `input`, decomposes it (NFD) and drops the combining marks.
///
/// Lowercasing happens first so that marks introduced by case mapping
/// (`İ` lowercases to `i` + U+0307) are stripped too.
///
/// ```
/// use fakebnb::normalize::normalize;
/// assert_eq!(normalize("Medellín"), "medellin");
/// ```
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// True when the normalized `needle` occurs in the normalized `location`.
/// An empty needle matches every location.
pub fn location_matches(location: &str, needle: &str) -> bool {
    let needle = normalize(needle.trim());
    needle.is_empty() || normalize(location).contains(&needle)
}
