//! Canonical history document: regions → periods → entities.
//!
//! The wire form nests everything under `history_structured_list.regions`.
//! Fields the crate does not interpret are kept in `extra` so that a
//! document survives load → filter → export without losing data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "DocumentRepr", into = "DocumentRepr")]
pub struct Document {
    pub regions: Vec<Region>,
}

#[derive(Serialize, Deserialize)]
struct DocumentRepr {
    history_structured_list: RegionList,
}

#[derive(Serialize, Deserialize)]
struct RegionList {
    #[serde(default)]
    regions: Vec<Region>,
}

impl From<DocumentRepr> for Document {
    fn from(repr: DocumentRepr) -> Self {
        Document {
            regions: repr.history_structured_list.regions,
        }
    }
}

impl From<Document> for DocumentRepr {
    fn from(doc: Document) -> Self {
        DocumentRepr {
            history_structured_list: RegionList {
                regions: doc.regions,
            },
        }
    }
}

impl Document {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn period_count(&self) -> usize {
        self.regions.iter().map(|r| r.periods.len()).sum()
    }

    pub fn entity_count(&self) -> usize {
        self.entities().count()
    }

    /// True when no region holds a single entity.
    pub fn is_empty(&self) -> bool {
        self.entities().next().is_none()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.regions
            .iter()
            .flat_map(|r| r.periods.iter())
            .flat_map(|p| p.entities.iter())
    }
}

// =============================================================================
// Region
// =============================================================================

/// Region identifiers arrive as strings or numbers and are echoed back as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionId {
    Number(serde_json::Number),
    Text(String),
}

impl Default for RegionId {
    fn default() -> Self {
        RegionId::Text(String::new())
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        RegionId::Text(s.to_string())
    }
}

impl From<u64> for RegionId {
    fn from(n: u64) -> Self {
        RegionId::Number(n.into())
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionId::Number(n) => write!(f, "{}", n),
            RegionId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Region {
    #[serde(rename = "region_id", default)]
    pub id: RegionId,
    #[serde(rename = "region_name", default)]
    pub name: String,
    #[serde(default)]
    pub periods: Vec<Period>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Region {
    pub fn new(id: impl Into<RegionId>, name: impl Into<String>, periods: Vec<Period>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            periods,
            extra: Map::new(),
        }
    }

    /// Heading shown above the region's periods.
    pub fn heading(&self) -> String {
        format!("{}: {}", self.id, self.name)
    }
}

// =============================================================================
// Period
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    Current,
    Proposed,
    Historical,
}

impl PeriodStatus {
    /// Classify a period label. "current" markers win over "proposed" ones.
    pub fn classify(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("current") || label.contains("現在") {
            PeriodStatus::Current
        } else if lower.contains("proposed") || label.contains("構想中") || label.contains('案') {
            PeriodStatus::Proposed
        } else {
            PeriodStatus::Historical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStatus::Current => "current",
            PeriodStatus::Proposed => "proposed",
            PeriodStatus::Historical => "historical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Period {
    #[serde(rename = "upper_level", default)]
    pub label: String,
    #[serde(rename = "middle_level_entities", default)]
    pub entities: Vec<Entity>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Period {
    pub fn new(label: impl Into<String>, entities: Vec<Entity>) -> Self {
        Self {
            label: label.into(),
            entities,
            extra: Map::new(),
        }
    }

    pub fn status(&self) -> PeriodStatus {
        PeriodStatus::classify(&self.label)
    }
}

// =============================================================================
// Entity
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital: Option<String>,
    /// Overrides the name when building the external search link.
    #[serde(rename = "wiki_link_query", default, skip_serializing_if = "Option::is_none")]
    pub wiki_query: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_composition(mut self, composition: impl Into<String>) -> Self {
        self.composition = Some(composition.into());
        self
    }

    pub fn with_capital(mut self, capital: impl Into<String>) -> Self {
        self.capital = Some(capital.into());
        self
    }

    pub fn with_wiki_query(mut self, query: impl Into<String>) -> Self {
        self.wiki_query = Some(query.into());
        self
    }

    /// Composition text, falling back to the capital when composition is absent or empty.
    pub fn composition_text(&self) -> &str {
        [self.composition.as_deref(), self.capital.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_roundtrip() {
        let raw = json!({
            "history_structured_list": {
                "regions": [{
                    "region_id": 3,
                    "region_name": "Kanto",
                    "note": "kept",
                    "periods": [{
                        "upper_level": "現在 (2024)",
                        "middle_level_entities": [
                            {"name": "Tokyo (東京)", "tags": ["capital"], "capital": "Shinjuku", "population": 14}
                        ]
                    }]
                }]
            }
        });
        let doc: Document = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.regions[0].id, RegionId::from(3));
        assert_eq!(doc.regions[0].extra.get("note").unwrap(), "kept");
        let entity = &doc.regions[0].periods[0].entities[0];
        assert_eq!(entity.capital.as_deref(), Some("Shinjuku"));
        assert_eq!(entity.extra.get("population").unwrap(), 14);
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let doc: Document = serde_json::from_value(json!({
            "history_structured_list": {
                "regions": [{"region_id": "r1", "periods": [{"upper_level": "x", "middle_level_entities": [{"name": "A"}]}]}]
            }
        }))
        .unwrap();
        let entity = &doc.regions[0].periods[0].entities[0];
        assert!(entity.tags.is_empty());
        assert_eq!(entity.composition_text(), "");
        assert_eq!(doc.regions[0].name, "");
    }

    #[test]
    fn test_composition_falls_back_to_capital() {
        let e = Entity::new("A").with_composition("").with_capital("Kyoto");
        assert_eq!(e.composition_text(), "Kyoto");
        let e = Entity::new("A").with_composition("three towns").with_capital("Kyoto");
        assert_eq!(e.composition_text(), "three towns");
    }

    #[test]
    fn test_period_status_classification() {
        assert_eq!(PeriodStatus::classify("現在の区分"), PeriodStatus::Current);
        assert_eq!(PeriodStatus::classify("Current districts"), PeriodStatus::Current);
        assert_eq!(PeriodStatus::classify("道州制構想中"), PeriodStatus::Proposed);
        assert_eq!(PeriodStatus::classify("第二案"), PeriodStatus::Proposed);
        assert_eq!(PeriodStatus::classify("Proposed merger"), PeriodStatus::Proposed);
        assert_eq!(PeriodStatus::classify("江戸時代"), PeriodStatus::Historical);
        assert_eq!(PeriodStatus::classify("現在案"), PeriodStatus::Current);
    }

    #[test]
    fn test_counts_and_emptiness() {
        let doc = Document::new(vec![Region::new(
            "r",
            "R",
            vec![Period::new("p", vec![Entity::new("a"), Entity::new("b")]), Period::new("q", vec![])],
        )]);
        assert_eq!(doc.period_count(), 2);
        assert_eq!(doc.entity_count(), 2);
        assert!(!doc.is_empty());
        assert!(Document::new(vec![Region::new("r", "R", vec![])]).is_empty());
    }

    #[test]
    fn test_region_heading() {
        assert_eq!(Region::new(7u64, "Tohoku", vec![]).heading(), "7: Tohoku");
    }
}
