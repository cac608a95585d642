//! External Wikipedia search links.

use url::form_urlencoded::byte_serialize;

use crate::model::Entity;
use crate::parens;

pub const DEFAULT_HOST: &str = "ja.wikipedia.org";

/// `https://{host}/w/index.php?search=<query>&go=Go`, or `None` for a blank query.
pub fn search_url(host: &str, query: &str) -> Option<String> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    let encoded: String = byte_serialize(query.as_bytes()).collect();
    Some(format!("https://{}/w/index.php?search={}&go=Go", host, encoded))
}

/// Refine a free-text query into a search term: the text outside
/// parentheses, else the first parenthetical content, else the query as given.
pub fn search_term(query: &str) -> String {
    let outside = parens::outside(query);
    if !outside.is_empty() {
        return outside;
    }
    let inside = parens::inside(query);
    if !inside.is_empty() {
        return inside;
    }
    query.to_string()
}

/// Search text for an entity's link: its explicit override, else its name
/// with every bracket pair removed, empty ones included.
pub fn entity_query(entity: &Entity) -> String {
    match entity.wiki_query.as_deref() {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => parens::strip_brackets(&entity.name),
    }
}
