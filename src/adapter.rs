//! Input shapes accepted by the loader and their conversion into a `Document`.
//!
//! Shape A is the pre-aggregated `history_structured_list.regions` form.
//! Shape B is a flat list of `{category_name, list}` records (or one such
//! record on its own), which is adapted into a single region.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::model::{Document, Entity, Period, Region};

pub const CATEGORY_REGION_ID: &str = "categories";
pub const CATEGORY_REGION_NAME: &str = "Categories";
pub const TAG_MAX_CHARS: usize = 20;
pub const ELLIPSIS: &str = "…";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ShapeError(String);

impl ShapeError {
    fn new(msg: impl Into<String>) -> Self {
        ShapeError(msg.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub category_name: String,
    pub list: Vec<CategoryItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryItem {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Structured,
    Categories,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Structured => "structured",
            ShapeKind::Categories => "categories",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputShape {
    Structured(Vec<Region>),
    Categories(Vec<Category>),
}

impl InputShape {
    /// Recognize one file's parsed JSON as shape A or shape B.
    pub fn detect(value: Value) -> Result<Self, ShapeError> {
        match value {
            Value::Object(mut map) => {
                if let Some(list) = map.remove("history_structured_list") {
                    let regions = match list {
                        Value::Object(mut inner) => inner.remove("regions"),
                        _ => None,
                    };
                    return match regions {
                        Some(regions @ Value::Array(_)) => serde_json::from_value(regions)
                            .map(InputShape::Structured)
                            .map_err(|e| ShapeError::new(format!("malformed region record: {}", e))),
                        _ => Err(ShapeError::new(
                            "history_structured_list.regions is missing or not an array",
                        )),
                    };
                }
                if map.contains_key("category_name") && map.contains_key("list") {
                    let category: Category = serde_json::from_value(Value::Object(map))
                        .map_err(|e| ShapeError::new(format!("malformed category record: {}", e)))?;
                    return Ok(InputShape::Categories(vec![category]));
                }
                Err(ShapeError::new(
                    "object has neither history_structured_list nor category_name/list",
                ))
            }
            Value::Array(items) => serde_json::from_value(Value::Array(items))
                .map(InputShape::Categories)
                .map_err(|e| ShapeError::new(format!("malformed category record: {}", e))),
            other => Err(ShapeError::new(format!(
                "top-level value must be an object or an array, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            InputShape::Structured(_) => ShapeKind::Structured,
            InputShape::Categories(_) => ShapeKind::Categories,
        }
    }

    /// Append another file's records. Returns false, leaving `self` untouched,
    /// when the shapes differ.
    pub fn absorb(&mut self, other: InputShape) -> bool {
        match (self, other) {
            (InputShape::Structured(acc), InputShape::Structured(more)) => {
                acc.extend(more);
                true
            }
            (InputShape::Categories(acc), InputShape::Categories(more)) => {
                acc.extend(more);
                true
            }
            _ => false,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            InputShape::Structured(regions) => Document::new(regions),
            InputShape::Categories(categories) => Document::new(vec![adapt_categories(categories)]),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One region, one period per category in input order.
pub fn adapt_categories(categories: Vec<Category>) -> Region {
    let periods = categories
        .into_iter()
        .map(|c| Period::new(c.category_name, c.list.into_iter().map(adapt_item).collect()))
        .collect();
    Region::new(CATEGORY_REGION_ID, CATEGORY_REGION_NAME, periods)
}

fn adapt_item(item: CategoryItem) -> Entity {
    let mut entity = Entity {
        name: item.name,
        composition: item.composition,
        capital: item.capital,
        extra: item.extra,
        ..Default::default()
    };
    entity.tags = derive_tag(entity.composition_text()).into_iter().collect();
    entity
}

/// Short tag for a composition text: at most `TAG_MAX_CHARS` characters,
/// followed by `ELLIPSIS` when cut. `None` for empty text.
pub fn derive_tag(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    if text.chars().count() <= TAG_MAX_CHARS {
        return Some(text.to_string());
    }
    let mut tag: String = text.chars().take(TAG_MAX_CHARS).collect();
    tag.push_str(ELLIPSIS);
    Some(tag)
}
