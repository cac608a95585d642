//! Display projection of a document.
//!
//! `render` builds a plain tree; `to_html` and `to_text` turn it into
//! nested HTML lists or terminal output. No state is kept between calls.

use serde::Serialize;
use std::fmt::Write;

use crate::model::{Document, PeriodStatus};
use crate::wiki;

pub const NO_RESULTS: &str = "No entities matched the search.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTree {
    pub regions: Vec<RegionBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionBlock {
    pub heading: String,
    pub periods: Vec<PeriodBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodBlock {
    pub label: String,
    pub status: PeriodStatus,
    pub entities: Vec<EntityLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityLine {
    pub name: String,
    pub href: Option<String>,
    pub tags: Vec<TagChip>,
}

/// A tag links to a search for its own literal text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagChip {
    pub text: String,
    pub href: Option<String>,
    pub current: bool,
}

pub fn render(doc: &Document, tags_visible: bool, host: &str) -> RenderTree {
    let regions = doc
        .regions
        .iter()
        .map(|region| RegionBlock {
            heading: region.heading(),
            periods: region
                .periods
                .iter()
                .map(|period| {
                    let status = period.status();
                    PeriodBlock {
                        label: period.label.clone(),
                        status,
                        entities: period
                            .entities
                            .iter()
                            .map(|entity| EntityLine {
                                name: entity.name.clone(),
                                href: wiki::search_url(host, &wiki::entity_query(entity)),
                                tags: if tags_visible {
                                    entity
                                        .tags
                                        .iter()
                                        .map(|tag| TagChip {
                                            text: tag.clone(),
                                            href: wiki::search_url(host, tag),
                                            current: status == PeriodStatus::Current,
                                        })
                                        .collect()
                                } else {
                                    Vec::new()
                                },
                            })
                            .collect(),
                    }
                })
                .collect(),
        })
        .collect();
    RenderTree { regions }
}

impl RenderTree {
    pub fn is_empty(&self) -> bool {
        self.regions
            .iter()
            .all(|r| r.periods.iter().all(|p| p.entities.is_empty()))
    }

    pub fn to_html(&self) -> String {
        if self.is_empty() {
            return format!("<p class=\"no-results-message\">{}</p>\n", NO_RESULTS);
        }
        let mut out = String::new();
        for region in &self.regions {
            out.push_str("<div class=\"region-card\">\n");
            let _ = writeln!(out, "  <div class=\"region-header\">{}</div>", escape(&region.heading));
            for period in &region.periods {
                out.push_str("  <div class=\"period-section\">\n");
                let _ = writeln!(
                    out,
                    "    <div class=\"period-upper status-{}\">{}</div>",
                    period.status.as_str(),
                    escape(&period.label)
                );
                out.push_str("    <ul class=\"middle-entities-list\">\n");
                for entity in &period.entities {
                    out.push_str("      <li>");
                    push_link(&mut out, None, entity.href.as_deref(), &entity.name);
                    for tag in &entity.tags {
                        let class = if tag.current { "entity-tag tag-current" } else { "entity-tag" };
                        out.push(' ');
                        push_link(&mut out, Some(class), tag.href.as_deref(), &tag.text);
                    }
                    out.push_str("</li>\n");
                }
                out.push_str("    </ul>\n  </div>\n");
            }
            out.push_str("</div>\n");
        }
        out
    }

    pub fn to_text(&self) -> String {
        if self.is_empty() {
            return format!("{}\n", NO_RESULTS);
        }
        let mut out = String::new();
        for region in &self.regions {
            let _ = writeln!(out, "== {}", region.heading);
            for period in &region.periods {
                let _ = writeln!(out, "  [{}] {}", period.status.as_str(), period.label);
                for entity in &period.entities {
                    let _ = write!(out, "    - {}", entity.name);
                    if !entity.tags.is_empty() {
                        let tags: Vec<&str> = entity.tags.iter().map(|t| t.text.as_str()).collect();
                        let _ = write!(out, "  #{}", tags.join(" #"));
                    }
                    out.push('\n');
                }
            }
        }
        out
    }
}

fn push_link(out: &mut String, class: Option<&str>, href: Option<&str>, text: &str) {
    out.push_str("<a");
    if let Some(class) = class {
        let _ = write!(out, " class=\"{}\"", class);
    }
    if let Some(href) = href {
        let _ = write!(out, " href=\"{}\" target=\"_blank\" rel=\"noopener\"", escape(href));
    }
    let _ = write!(out, ">{}</a>", escape(text));
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
