//! Keyword filter over the canonical document.
//!
//! Entities are kept when the query's keywords are substrings of their
//! search targets; periods and regions left without entities are pruned.
//! Nothing is reordered or merged, and the source document is never touched.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::model::{Document, Entity, Period, Region};
use crate::parens;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchMode {
    /// Every keyword must hit some target.
    #[default]
    And,
    /// Any keyword hitting any target is enough.
    Or,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::And => "AND",
            SearchMode::Or => "OR",
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" => Ok(SearchMode::And),
            "or" => Ok(SearchMode::Or),
            other => Err(format!("unknown search mode '{}' (expected AND or OR)", other)),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercased, whitespace-separated, non-empty keywords.
pub fn keywords(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Lowercased strings a keyword may match against. Empty strings are dropped.
pub fn search_targets(entity: &Entity) -> Vec<String> {
    let mut targets = Vec::with_capacity(4 + entity.tags.len());
    targets.push(entity.name.to_lowercase());
    targets.push(parens::outside(&entity.name).to_lowercase());
    targets.push(parens::inside(&entity.name).to_lowercase());
    targets.extend(entity.tags.iter().map(|t| t.to_lowercase()));
    targets.push(entity.composition_text().to_lowercase());
    targets.retain(|t| !t.is_empty());
    targets
}

pub fn entity_matches(entity: &Entity, keywords: &[String], mode: SearchMode) -> bool {
    let targets = search_targets(entity);
    let hit = |kw: &String| targets.iter().any(|t| t.contains(kw.as_str()));
    match mode {
        SearchMode::And => keywords.iter().all(hit),
        SearchMode::Or => keywords.iter().any(hit),
    }
}

/// Filter `doc` by `query`. A query without keywords borrows `doc` unchanged.
pub fn filter_document<'a>(doc: &'a Document, query: &str, mode: SearchMode) -> Cow<'a, Document> {
    let keywords = keywords(query);
    if keywords.is_empty() {
        return Cow::Borrowed(doc);
    }

    let regions = doc
        .regions
        .iter()
        .filter_map(|region| filter_region(region, &keywords, mode))
        .collect();
    Cow::Owned(Document::new(regions))
}

fn filter_region(region: &Region, keywords: &[String], mode: SearchMode) -> Option<Region> {
    let periods: Vec<Period> = region
        .periods
        .iter()
        .filter_map(|period| filter_period(period, keywords, mode))
        .collect();
    if periods.is_empty() {
        return None;
    }
    Some(Region {
        id: region.id.clone(),
        name: region.name.clone(),
        periods,
        extra: region.extra.clone(),
    })
}

fn filter_period(period: &Period, keywords: &[String], mode: SearchMode) -> Option<Period> {
    let entities: Vec<Entity> = period
        .entities
        .iter()
        .filter(|e| entity_matches(e, keywords, mode))
        .cloned()
        .collect();
    if entities.is_empty() {
        return None;
    }
    Some(Period {
        label: period.label.clone(),
        entities,
        extra: period.extra.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(vec![
            Region::new(
                "1",
                "Kanto",
                vec![
                    Period::new(
                        "現在",
                        vec![
                            Entity::new("Tokyo (東京)").with_tags(["Capital", "Metropolis"]),
                            Entity::new("Saitama").with_composition("Urawa, Omiya and Yono"),
                            Entity::new("Chiba").with_capital("Chiba City"),
                        ],
                    ),
                    Period::new("Edo period", vec![Entity::new("Musashi Province")]),
                ],
            ),
            Region::new(
                "2",
                "Kansai",
                vec![Period::new(
                    "現在",
                    vec![
                        Entity::new("Osaka（大阪）").with_tags(["metropolis"]),
                        Entity::new("Kyoto"),
                    ],
                )],
            ),
        ])
    }

    fn names(doc: &Document) -> Vec<String> {
        doc.entities().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn test_empty_and_blank_query_is_identity() {
        let doc = sample();
        for mode in [SearchMode::And, SearchMode::Or] {
            assert!(matches!(filter_document(&doc, "", mode), Cow::Borrowed(_)));
            assert_eq!(filter_document(&doc, "   \t", mode).as_ref(), &doc);
        }
    }

    #[test]
    fn test_keywords_split_and_lowercase() {
        assert_eq!(keywords("  Tokyo\tOSAKA  kyoto "), vec!["tokyo", "osaka", "kyoto"]);
        assert!(keywords(" \n ").is_empty());
    }

    #[test]
    fn test_targets_include_paren_parts_tags_and_composition() {
        let e = Entity::new("Tokyo (東京)").with_tags(["Capital"]).with_capital("Shinjuku");
        let targets = search_targets(&e);
        assert_eq!(targets, vec!["tokyo (東京)", "tokyo", "東京", "capital", "shinjuku"]);
    }

    #[test]
    fn test_match_on_parenthetical_content() {
        let doc = sample();
        let out = filter_document(&doc, "大阪", SearchMode::And);
        assert_eq!(names(&out), vec!["Osaka（大阪）"]);
    }

    #[test]
    fn test_and_requires_every_keyword() {
        let doc = sample();
        let out = filter_document(&doc, "metropolis tokyo", SearchMode::And);
        assert_eq!(names(&out), vec!["Tokyo (東京)"]);
    }

    #[test]
    fn test_or_accepts_any_keyword_and_prunes() {
        let doc = sample();
        let out = filter_document(&doc, "omiya kyoto", SearchMode::Or);
        assert_eq!(names(&out), vec!["Saitama", "Kyoto"]);
        // Edo period has no match and is pruned
        assert_eq!(out.regions[0].periods.len(), 1);
        assert_eq!(out.regions.len(), 2);
    }

    #[test]
    fn test_substring_not_token_match() {
        let doc = sample();
        let out = filter_document(&doc, "CITY", SearchMode::And);
        assert_eq!(names(&out), vec!["Chiba"]);
    }

    #[test]
    fn test_regions_without_matches_are_dropped() {
        let doc = sample();
        let out = filter_document(&doc, "musashi", SearchMode::Or);
        assert_eq!(out.regions.len(), 1);
        assert_eq!(out.regions[0].name, "Kanto");
        assert_eq!(out.regions[0].periods[0].label, "Edo period");
    }

    #[test]
    fn test_no_match_yields_empty_document() {
        let doc = sample();
        let out = filter_document(&doc, "hokkaido", SearchMode::Or);
        assert!(out.regions.is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_and_is_subset_of_or() {
        let doc = sample();
        for q in ["tokyo metropolis", "osaka kyoto", "capital city", "x y"] {
            let and = names(&filter_document(&doc, q, SearchMode::And));
            let or = names(&filter_document(&doc, q, SearchMode::Or));
            assert!(and.iter().all(|n| or.contains(n)), "query {q}");
        }
    }

    #[test]
    fn test_pruning_is_exact_and_order_preserving() {
        let doc = sample();
        for (q, mode) in [("metropolis", SearchMode::Or), ("a", SearchMode::And), ("o i", SearchMode::And)] {
            let kws = keywords(q);
            let out = filter_document(&doc, q, mode);
            let expected: Vec<String> = doc
                .entities()
                .filter(|e| entity_matches(e, &kws, mode))
                .map(|e| e.name.clone())
                .collect();
            assert_eq!(names(&out), expected);
            for region in &out.regions {
                assert!(!region.periods.is_empty());
                assert!(region.periods.iter().all(|p| !p.entities.is_empty()));
            }
        }
    }

    #[test]
    fn test_filtered_copy_is_independent() {
        let doc = sample();
        let before = doc.clone();
        let mut out = filter_document(&doc, "tokyo", SearchMode::And).into_owned();
        out.regions[0].periods[0].entities.clear();
        out.regions[0].periods[0].entities.push(Entity::new("Injected"));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("and".parse::<SearchMode>().unwrap(), SearchMode::And);
        assert_eq!(" OR ".parse::<SearchMode>().unwrap(), SearchMode::Or);
        assert!("xor".parse::<SearchMode>().is_err());
        assert_eq!(SearchMode::default(), SearchMode::And);
    }
}
