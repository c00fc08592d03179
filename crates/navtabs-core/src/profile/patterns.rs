//! URL pattern matching for automatic profile selection
//!
//! Patterns are globs matched against the whole URL. `*` also crosses `/`.

use globset::{GlobBuilder, GlobMatcher};

/// Compile one URL pattern
///
/// # Errors
/// Returns the glob error if the pattern is malformed (e.g. an unclosed `[`)
pub fn compile(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    GlobBuilder::new(pattern.trim())
        .literal_separator(false)
        .build()
        .map(|g| g.compile_matcher())
}

/// Whether any of `patterns` matches `url`
///
/// Blank patterns never match. Malformed ones are logged and skipped.
#[must_use]
pub fn any_matches(patterns: &[String], url: &str) -> bool {
    patterns
        .iter()
        .filter(|p| !p.trim().is_empty())
        .filter_map(|p| match compile(p) {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "ignoring invalid URL pattern");
                None
            }
        })
        .any(|matcher| matcher.is_match(url))
}
