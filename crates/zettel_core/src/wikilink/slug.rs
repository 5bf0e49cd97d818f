//! Slug normalization.
//!
//! Slugs are the durable key links are written against, so the output
//! alphabet is restricted to letters, digits, `-` and `_`. Path separators,
//! shell/SQL metacharacters, control bytes and emoji never survive.

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on slug length, in characters.
pub const MAX_SLUG_LEN: usize = 200;

static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\-_ ]+").expect("valid disallowed-char regex"));
static SPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("valid space regex"));
static HYPHEN_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid hyphen regex"));

/// Converts arbitrary text into a canonical slug.
///
/// Returns an empty string when nothing usable remains; callers must treat
/// that as an invalid title rather than persist it.
pub fn normalize_slug(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let lowered = trimmed.to_lowercase();
    let allowed = DISALLOWED_RE.replace_all(&lowered, "");
    let hyphenated = SPACE_RUN_RE.replace_all(&allowed, "-");
    let collapsed = HYPHEN_RUN_RE.replace_all(&hyphenated, "-");
    let slug = collapsed.trim_matches('-');

    if slug.chars().count() <= MAX_SLUG_LEN {
        return slug.to_string();
    }

    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Returns whether `value` is already in canonical slug form.
pub fn is_normalized_slug(value: &str) -> bool {
    !value.is_empty() && normalize_slug(value) == value
}

#[cfg(test)]
mod tests {
    use super::{is_normalized_slug, normalize_slug, MAX_SLUG_LEN};

    #[test]
    fn title_becomes_hyphenated_lowercase() {
        assert_eq!(normalize_slug("My Important Note"), "my-important-note");
    }

    #[test]
    fn collapses_spaces_and_trims_hyphens() {
        assert_eq!(
            normalize_slug("  spaces  and  hyphens---"),
            "spaces-and-hyphens"
        );
        assert_eq!(normalize_slug("--a - - b--"), "a-b");
    }

    #[test]
    fn symbols_only_yield_empty_slug() {
        assert_eq!(normalize_slug("!!!"), "");
        assert_eq!(normalize_slug("   "), "");
        assert_eq!(normalize_slug(""), "");
    }

    #[test]
    fn strips_path_and_shell_metacharacters() {
        assert_eq!(normalize_slug("../../etc/passwd"), "etcpasswd");
        assert_eq!(normalize_slug("a; DROP TABLE notes;--"), "a-drop-table-notes");
        assert_eq!(normalize_slug("tab\there\u{0}"), "tabhere");
        assert_eq!(normalize_slug("rocket 🚀 launch"), "rocket-launch");
    }

    #[test]
    fn keeps_underscores_digits_and_unicode_letters() {
        assert_eq!(normalize_slug("Café_2024 Plan"), "café_2024-plan");
    }

    #[test]
    fn long_input_is_truncated_without_trailing_hyphen() {
        let long = "a".repeat(300);
        assert_eq!(normalize_slug(&long).chars().count(), MAX_SLUG_LEN);

        // Position 200 lands on a hyphen boundary.
        let words = format!("{} {}", "b".repeat(199), "c".repeat(100));
        let slug = normalize_slug(&words);
        assert_eq!(slug, "b".repeat(199));
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn normalized_form_check() {
        assert!(is_normalized_slug("my-note"));
        assert!(!is_normalized_slug("My Note"));
        assert!(!is_normalized_slug(""));
    }
}
