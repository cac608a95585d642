//! Parenthetical clarifiers such as `Tokyo (東京)`.
//!
//! ASCII and fullwidth brackets are interchangeable. Groups are matched
//! non-greedily and must hold at least one character, except in
//! [`strip_brackets`] which also removes empty pairs. Every caller that
//! looks inside or around parentheses goes through this module.

use regex::Regex;
use std::sync::OnceLock;

static GROUP: OnceLock<Regex> = OnceLock::new();
static ANY_GROUP: OnceLock<Regex> = OnceLock::new();

fn group() -> &'static Regex {
    GROUP.get_or_init(|| Regex::new(r"[（(](.+?)[）)]").expect("valid parenthetical regex"))
}

fn any_group() -> &'static Regex {
    ANY_GROUP.get_or_init(|| Regex::new(r"[（(][^）)]*[）)]").expect("valid bracket regex"))
}

/// Trimmed inner text of the first parenthetical group, or "" when there is none.
pub fn inside(text: &str) -> String {
    group()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// The text with every parenthetical group removed, trimmed.
pub fn outside(text: &str) -> String {
    group().replace_all(text, "").trim().to_string()
}

/// Like [`outside`], but empty brackets are removed too. Used for link text.
pub fn strip_brackets(text: &str) -> String {
    any_group().replace_all(text, "").trim().to_string()
}
