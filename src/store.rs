//! Single-writer cell holding the current aggregate document.
//!
//! Each load attempt takes a ticket. Only the most recently issued ticket may
//! commit or fail the store; results carried by older tickets are dropped.

use crate::model::Document;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreState {
    Empty,
    Loading,
    Ready(Document),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// A newer load was started after this ticket was issued.
    Stale,
}

#[derive(Debug)]
pub struct DocumentStore {
    issued: u64,
    state: StoreState,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            issued: 0,
            state: StoreState::Empty,
        }
    }

    /// Start a load attempt. The current document is discarded.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        self.state = StoreState::Loading;
        LoadTicket(self.issued)
    }

    pub fn commit(&mut self, ticket: LoadTicket, document: Document) -> CommitOutcome {
        self.settle(ticket, StoreState::Ready(document))
    }

    pub fn fail(&mut self, ticket: LoadTicket, message: impl Into<String>) -> CommitOutcome {
        self.settle(ticket, StoreState::Failed(message.into()))
    }

    fn settle(&mut self, ticket: LoadTicket, state: StoreState) -> CommitOutcome {
        if ticket.0 != self.issued || !self.is_loading() {
            return CommitOutcome::Stale;
        }
        self.state = state;
        CommitOutcome::Committed
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// The committed document; `None` while empty, loading or failed.
    pub fn current(&self) -> Option<&Document> {
        match &self.state {
            StoreState::Ready(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            StoreState::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, StoreState::Loading)
    }

    /// Generation of the latest issued ticket (0 before any load).
    pub fn generation(&self) -> u64 {
        self.issued
    }
}
