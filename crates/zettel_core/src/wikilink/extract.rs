//! Code-aware wiki-link extraction.
//!
//! # Rules
//! - Fenced blocks (```` ``` ```` with optional language tag) and inline code
//!   spans are removed before scanning.
//! - A fence only counts once it is closed. An unclosed fence hides nothing,
//!   and inline spans never cross a newline, so prose after an unclosed fence
//!   is still scanned.
//! - Links are deduplicated by normalized slug; the first occurrence wins.

use crate::wikilink::slug::normalize_slug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static FENCED_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[^\n`]*\n.*?```").expect("valid fenced code regex"));
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`\n]*`").expect("valid inline code regex"));
static WIKI_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^\[\]|]*)(?:\|([^\[\]]*))?\]\]").expect("valid wiki-link regex")
});

/// One wiki-link found in note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Normalized slug of the link target.
    pub target_slug: String,
    /// Alias text when given, otherwise the trimmed target text.
    pub display_text: String,
    /// Full matched markup, e.g. `[[Target|alias]]`.
    pub raw_match: String,
}

/// Extracts deduplicated wiki-links in document order.
pub fn extract_links(text: &str) -> Vec<ExtractedLink> {
    let without_fences = FENCED_CODE_RE.replace_all(text, " ");
    let prose = INLINE_CODE_RE.replace_all(&without_fences, " ");

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for caps in WIKI_LINK_RE.captures_iter(&prose) {
        let target = caps.get(1).map_or("", |m| m.as_str()).trim();
        if target.is_empty() {
            continue;
        }

        let target_slug = normalize_slug(target);
        if target_slug.is_empty() || !seen.insert(target_slug.clone()) {
            continue;
        }

        let display_text = caps
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|alias| !alias.is_empty())
            .unwrap_or(target)
            .to_string();

        links.push(ExtractedLink {
            target_slug,
            display_text,
            raw_match: caps[0].to_string(),
        });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::extract_links;

    fn slugs(text: &str) -> Vec<String> {
        extract_links(text)
            .into_iter()
            .map(|link| link.target_slug)
            .collect()
    }

    #[test]
    fn extracts_plain_and_aliased_links_in_order() {
        let links = extract_links("See [[Second Brain]] and [[zettel|the box]].");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target_slug, "second-brain");
        assert_eq!(links[0].display_text, "Second Brain");
        assert_eq!(links[0].raw_match, "[[Second Brain]]");
        assert_eq!(links[1].target_slug, "zettel");
        assert_eq!(links[1].display_text, "the box");
        assert_eq!(links[1].raw_match, "[[zettel|the box]]");
    }

    #[test]
    fn duplicate_targets_collapse_to_first_occurrence() {
        let links = extract_links("[[a]] then [[a]] and [[a|x]] and [[A ]]");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_slug, "a");
        assert_eq!(links[0].display_text, "a");
    }

    #[test]
    fn first_alias_wins_for_display_text() {
        let links = extract_links("[[Topic|first]] [[topic|second]]");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].display_text, "first");
    }

    #[test]
    fn skips_empty_and_unusable_targets() {
        assert!(slugs("[[]] [[   ]] [[!!!]] [[|alias]]").is_empty());
    }

    #[test]
    fn blank_alias_falls_back_to_target() {
        let links = extract_links("[[Target| ]]");
        assert_eq!(links[0].display_text, "Target");
    }

    #[test]
    fn ignores_links_in_inline_code() {
        assert!(slugs("`[[x]]`").is_empty());
        assert_eq!(slugs("use `[[x]]` syntax, like [[y]]"), vec!["y"]);
    }

    #[test]
    fn ignores_links_in_fenced_code() {
        assert!(slugs("```\n[[x]]\n```").is_empty());
        assert!(slugs("```markdown\n[[x]] and [[z]]\n```").is_empty());
    }

    #[test]
    fn code_mentions_do_not_hide_real_links_to_same_target() {
        let text = "```\n[[x]]\n```\nInline `[[x]]` here.\nReal link: [[x]]";
        let links = extract_links(text);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_slug, "x");
    }

    #[test]
    fn unclosed_fence_leaves_following_prose_scannable() {
        let text = "intro [[a]]\n```rust\nlet s = \"[[b]]\";\nmore [[c]]";
        assert_eq!(slugs(text), vec!["a", "b", "c"]);
    }

    #[test]
    fn unbalanced_inline_backtick_does_not_cross_lines() {
        let text = "a lone ` backtick\n[[kept]]";
        assert_eq!(slugs(text), vec!["kept"]);
    }

    #[test]
    fn target_text_is_normalized() {
        assert_eq!(slugs("[[ ../Secret Plans; rm -rf ]]"), vec!["secret-plans-rm-rf"]);
    }

    #[test]
    fn plain_text_has_no_links() {
        assert!(extract_links("no links [here] or [[unterminated").is_empty());
    }
}
