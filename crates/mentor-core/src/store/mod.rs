//! Document store capability.
//!
//! This module defines the narrow interface through which the persistence
//! gateway reaches a remote document database, decoupled from any vendor.
//!
//! # Module Structure
//!
//! - `error`: tagged store failures (`StoreError`, `StoreErrorKind`)
//! - `query`: collection queries (`Query`, `Filter`, `OrderBy`, `Direction`)

mod error;
mod query;

pub use error::{StoreError, StoreErrorKind, StoreResult};
pub use query::{Direction, Filter, FilterOp, OrderBy, Query};

use async_trait::async_trait;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter};

/// Field map of a stored document (wire names, JSON values).
pub type Fields = Map<String, Value>;

/// Collections persisted by the application, named as they appear remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
pub enum Collection {
    #[strum(serialize = "users")]
    Users,
    #[strum(serialize = "tasks")]
    Tasks,
    #[strum(serialize = "moodEntries")]
    MoodEntries,
    #[strum(serialize = "journalEntries")]
    JournalEntries,
    #[strum(serialize = "chatMessages")]
    ChatMessages,
    #[strum(serialize = "chatSessions")]
    ChatSessions,
    #[strum(serialize = "progressReports")]
    ProgressReports,
    #[strum(serialize = "weeklyReports")]
    WeeklyReports,
    #[strum(serialize = "userAnalytics")]
    UserAnalytics,
}

/// A stored document: its generated id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Returns a field value by wire name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// An abstract remote document store.
///
/// Implementations talk to a concrete database (or hold documents in memory
/// for tests) and report failures as classified [`StoreError`]s.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether the store has usable (non-placeholder) connection credentials.
    ///
    /// Callers never attempt network I/O against a store that reports `false`.
    fn is_configured(&self) -> bool;

    /// Adds a document with a store-generated id and returns that id.
    async fn add(&self, collection: Collection, fields: Fields) -> StoreResult<String>;

    /// Creates or overwrites the document with the given id.
    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> StoreResult<()>;

    /// Reads one document.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Document))`: Document found
    /// - `Ok(None)`: Document does not exist
    /// - `Err(_)`: Error occurred during retrieval
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>>;

    /// Merges `fields` into an existing document.
    ///
    /// Fails with [`StoreErrorKind::NotFound`] when the document is missing.
    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> StoreResult<()>;

    /// Deletes the named fields from an existing document.
    ///
    /// Fails with [`StoreErrorKind::NotFound`] when the document is missing.
    async fn remove_fields(&self, collection: Collection, id: &str, names: &[&str]) -> StoreResult<()>;

    /// Deletes a document; deleting a missing document succeeds.
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;

    /// Runs a query and returns matching documents in store order.
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;
}
