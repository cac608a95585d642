//! Request/response front for a UI layer.
//!
//! A `Session` owns the document store and the active data source. UI code
//! calls `reload`, `search`, `render` and `export`; nothing here depends on
//! how the results are shown.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::export::{self, ExportReceipt, ExportScope};
use crate::filter::{filter_document, SearchMode};
use crate::loader::{self, DataSource, Fetch, LoadError, LoadReport};
use crate::logging::{self, log_filter, log_load_complete, log_load_failed, log_load_started, obj, v_str, Domain, Level};
use crate::model::Document;
use crate::render::{self, RenderTree};
use crate::store::{CommitOutcome, DocumentStore, StoreState};
use crate::wiki;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub mode: SearchMode,
    pub scope: ExportScope,
    pub document: Document,
    /// Refined term for the external search, present for non-empty queries.
    pub search_term: Option<String>,
    pub search_url: Option<String>,
}

pub struct Session {
    config: Config,
    source: DataSource,
    store: DocumentStore,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let source = config.source.clone();
        Self {
            config,
            source,
            store: DocumentStore::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn document(&self) -> Option<&Document> {
        self.store.current()
    }

    /// Human-readable status line for the current store state.
    pub fn status(&self) -> String {
        match self.store.state() {
            StoreState::Empty => "No data loaded.".to_string(),
            StoreState::Loading => format!("Loading {}...", self.source.label()),
            StoreState::Ready(doc) => format!(
                "Loaded {}: {} regions, {} entities.",
                self.source.label(),
                doc.regions.len(),
                doc.entity_count()
            ),
            StoreState::Failed(msg) => format!("Failed to load {}: {}", self.source.label(), msg),
        }
    }

    /// Load the active source and replace the stored document.
    pub async fn reload(&mut self, fetcher: &dyn Fetch) -> Result<LoadReport, LoadError> {
        let ticket = self.store.begin_load();
        log_load_started(&self.source.prefix, self.source.total, ticket.generation());
        match loader::load(fetcher, &self.source).await {
            Ok(loaded) => {
                let regions = loaded.document.regions.len();
                let entities = loaded.document.entity_count();
                let outcome = self.store.commit(ticket, loaded.document);
                log_load_complete(
                    &self.source.prefix,
                    ticket.generation(),
                    regions,
                    entities,
                    outcome == CommitOutcome::Committed,
                );
                Ok(loaded.report)
            }
            Err(err) => {
                let msg = err.to_string();
                log_load_failed(&self.source.prefix, ticket.generation(), err.file(), &msg);
                self.store.fail(ticket, msg);
                Err(err)
            }
        }
    }

    /// Switch to the other data-source preset. The caller reloads afterwards.
    pub fn switch_source(&mut self) -> &DataSource {
        self.source = self.source.toggled();
        logging::log(
            Level::Info,
            Domain::Session,
            "source_switched",
            obj(&[("source", v_str(&self.source.label()))]),
        );
        &self.source
    }

    fn loaded(&self) -> Result<&Document> {
        self.store.current().ok_or_else(|| anyhow!("{}", self.status()))
    }

    pub fn search(&self, query: &str, mode: SearchMode) -> Result<SearchOutcome> {
        let doc = self.loaded()?;
        let query = query.trim();
        let document = filter_document(doc, query, mode).into_owned();
        log_filter(query, mode.as_str(), document.entity_count(), doc.entity_count());

        let (search_term, search_url) = if query.is_empty() {
            (None, None)
        } else {
            let term = wiki::search_term(query);
            let url = wiki::search_url(&self.config.wiki_host, &term);
            (Some(term), url)
        };
        Ok(SearchOutcome {
            query: query.to_string(),
            mode,
            scope: ExportScope::for_query(query),
            document,
            search_term,
            search_url,
        })
    }

    pub fn render(&self, query: &str, mode: SearchMode, tags_visible: bool) -> Result<RenderTree> {
        let outcome = self.search(query, mode)?;
        Ok(render::render(&outcome.document, tags_visible, &self.config.wiki_host))
    }

    /// Export the document the query produces: the full aggregate for an
    /// empty query, the filtered subset otherwise.
    pub fn export(&self, dir: &Path, query: &str, mode: SearchMode) -> Result<ExportReceipt> {
        let outcome = self.search(query, mode)?;
        export::write_export(dir, &self.source.prefix, outcome.scope, &outcome.document)
    }
}
