//! In-memory [`DocumentStore`] used as a stand-in for the remote database.
//!
//! Behaves like a configured remote store: generated ids, merge updates,
//! filtered and ordered queries. Failures can be injected per operation so
//! gateway fallback paths can be exercised without a network.

use async_trait::async_trait;
use mentor_core::store::{
    Collection, Direction, Document, DocumentStore, Fields, Query, StoreError, StoreErrorKind,
    StoreResult,
};
use mentor_core::timestamp::try_parse_timestamp;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Store operation selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Add,
    Set,
    Get,
    Update,
    Delete,
    Query,
}

#[derive(Debug, Default)]
struct State {
    /// Documents per collection, in insertion order.
    documents: HashMap<Collection, Vec<Document>>,
    /// Queued failures per operation, consumed one per call.
    failures: HashMap<StoreOp, VecDeque<StoreError>>,
    calls: HashMap<StoreOp, usize>,
}

/// A configured in-memory document store.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    state: Mutex<State>,
    configured: AtomicBool,
    /// When set, every ordered query fails with `FailedPrecondition`.
    missing_index: AtomicBool,
    next_id: AtomicUsize,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            configured: AtomicBool::new(true),
            missing_index: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
        }
    }

    /// A store reporting placeholder credentials.
    pub fn unconfigured() -> Self {
        let store = Self::new();
        store.configured.store(false, AtomicOrdering::SeqCst);
        store
    }

    /// Makes ordered queries fail as if the composite index were missing.
    pub fn without_composite_index(self) -> Self {
        self.missing_index.store(true, AtomicOrdering::SeqCst);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a failure for the next call of `op`.
    pub fn fail_next(&self, op: StoreOp, kind: StoreErrorKind, message: impl Into<String>) {
        self.lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(StoreError::new(kind, message));
    }

    /// Inserts a document directly with the given id and raw fields.
    pub fn seed(&self, collection: Collection, id: impl Into<String>, fields: Fields) {
        self.lock()
            .documents
            .entry(collection)
            .or_default()
            .push(Document::new(id, fields));
    }

    /// Raw stored document, bypassing failure injection.
    pub fn document(&self, collection: Collection, id: &str) -> Option<Document> {
        self.lock()
            .documents
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned())
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.lock().documents.get(&collection).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    /// How many times `op` was invoked.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    fn begin(&self, op: StoreOp) -> StoreResult<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_default() += 1;
        if let Some(err) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }

    fn generate_id(&self) -> String {
        format!("doc-{}", self.next_id.fetch_add(1, AtomicOrdering::SeqCst))
    }
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => match (try_parse_timestamp(x), try_parse_timestamp(y)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => match (x, y) {
                (Value::String(x), Value::String(y)) => x.cmp(y),
                _ => Ordering::Equal,
            },
        },
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn is_configured(&self) -> bool {
        self.configured.load(AtomicOrdering::SeqCst)
    }

    async fn add(&self, collection: Collection, fields: Fields) -> StoreResult<String> {
        let mut state = self.begin(StoreOp::Add)?;
        let id = self.generate_id();
        state
            .documents
            .entry(collection)
            .or_default()
            .push(Document::new(id.clone(), fields));
        Ok(id)
    }

    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> StoreResult<()> {
        let mut state = self.begin(StoreOp::Set)?;
        let docs = state.documents.entry(collection).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.fields = fields,
            None => docs.push(Document::new(id, fields)),
        }
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        let state = self.begin(StoreOp::Get)?;
        Ok(state
            .documents
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> StoreResult<()> {
        let mut state = self.begin(StoreOp::Update)?;
        let existing = state
            .documents
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::not_found(format!("No document to update: {}/{}", collection, id)))?;
        existing.fields.extend(fields);
        Ok(())
    }

    async fn remove_fields(&self, collection: Collection, id: &str, names: &[&str]) -> StoreResult<()> {
        let mut state = self.begin(StoreOp::Update)?;
        let existing = state
            .documents
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::not_found(format!("No document to update: {}/{}", collection, id)))?;
        for name in names {
            existing.fields.remove(*name);
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let mut state = self.begin(StoreOp::Delete)?;
        if let Some(docs) = state.documents.get_mut(&collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let state = self.begin(StoreOp::Query)?;
        if query.order_by.is_some() && self.missing_index.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::failed_precondition(
                "The query requires an index. You can create it in the console.",
            ));
        }

        let mut results: Vec<Document> = state
            .documents
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| query.filters.iter().all(|f| f.matches(d.get(&f.field))))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            results.sort_by(|a, b| {
                let ordering = compare_field(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }
}
