//! In-process mirror store.
//!
//! A degraded-mode substitute for the remote document store: one map per
//! collection, keyed by owning-user id, each holding an ordered list of
//! documents. It is never reconciled with the remote store.

use mentor_core::store::{Collection, Direction, Document, Fields};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

type OwnerLists = HashMap<String, Vec<Document>>;

/// Owner-keyed document lists per collection.
///
/// Mutations are short, synchronous edits under a single lock that is never
/// held across an `.await`. Concurrent writers race with last-write-wins.
#[derive(Debug, Default)]
pub struct MirrorStore {
    collections: Mutex<HashMap<Collection, OwnerLists>>,
}

impl MirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Collection, OwnerLists>> {
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a new document to the owner's list.
    ///
    /// Newest-first collections receive it at the front, oldest-first
    /// collections at the back, so lists stay in natural order.
    pub fn insert(&self, collection: Collection, owner: &str, document: Document, order: Direction) {
        let mut collections = self.lock();
        let list = collections
            .entry(collection)
            .or_default()
            .entry(owner.to_string())
            .or_default();
        match order {
            Direction::Descending => list.insert(0, document),
            Direction::Ascending => list.push(document),
        }
    }

    /// Replaces the document with the same id, or inserts it at the front.
    pub fn upsert(&self, collection: Collection, owner: &str, document: Document) {
        let mut collections = self.lock();
        let list = collections
            .entry(collection)
            .or_default()
            .entry(owner.to_string())
            .or_default();
        match list.iter_mut().find(|existing| existing.id == document.id) {
            Some(existing) => *existing = document,
            None => list.insert(0, document),
        }
    }

    /// Returns a snapshot of the owner's documents in stored order.
    pub fn list(&self, collection: Collection, owner: &str) -> Vec<Document> {
        self.lock()
            .get(&collection)
            .and_then(|owners| owners.get(owner))
            .cloned()
            .unwrap_or_default()
    }

    /// Finds a document by id across all owners.
    pub fn get(&self, collection: Collection, id: &str) -> Option<Document> {
        self.lock().get(&collection).and_then(|owners| {
            owners
                .values()
                .flat_map(|list| list.iter())
                .find(|document| document.id == id)
                .cloned()
        })
    }

    /// Merges `fields` into the document with `id`.
    ///
    /// Returns `false` when no such document exists.
    pub fn merge(&self, collection: Collection, id: &str, fields: Fields) -> bool {
        let mut collections = self.lock();
        let Some(owners) = collections.get_mut(&collection) else {
            return false;
        };
        let Some(document) = owners
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|document| document.id == id)
        else {
            return false;
        };
        document.fields.extend(fields);
        true
    }

    /// Deletes the named fields of the document with `id`. Returns `false`
    /// when the document does not exist.
    pub fn remove_fields(&self, collection: Collection, id: &str, names: &[&str]) -> bool {
        let mut collections = self.lock();
        let Some(document) = collections
            .get_mut(&collection)
            .into_iter()
            .flat_map(|owners| owners.values_mut())
            .flat_map(|list| list.iter_mut())
            .find(|document| document.id == id)
        else {
            return false;
        };
        for name in names {
            document.fields.remove(*name);
        }
        true
    }

    /// Removes the document with `id`. Returns `false` when it did not exist.
    pub fn remove(&self, collection: Collection, id: &str) -> bool {
        let mut collections = self.lock();
        let Some(owners) = collections.get_mut(&collection) else {
            return false;
        };
        for list in owners.values_mut() {
            if let Some(position) = list.iter().position(|document| document.id == id) {
                list.remove(position);
                return true;
            }
        }
        false
    }

    /// Drops every document of `owner`, returning how many were removed.
    pub fn clear_owner(&self, collection: Collection, owner: &str) -> usize {
        self.lock()
            .get_mut(&collection)
            .and_then(|owners| owners.remove(owner))
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Number of documents held for `owner`.
    pub fn count(&self, collection: Collection, owner: &str) -> usize {
        self.lock()
            .get(&collection)
            .and_then(|owners| owners.get(owner))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str) -> Document {
        let mut fields = Fields::new();
        fields.insert("title".into(), json!(id));
        Document::new(id, fields)
    }

    #[test]
    fn test_insert_respects_natural_order() {
        let mirror = MirrorStore::new();
        mirror.insert(Collection::Tasks, "u1", doc("a"), Direction::Descending);
        mirror.insert(Collection::Tasks, "u1", doc("b"), Direction::Descending);
        mirror.insert(Collection::ChatMessages, "u1", doc("m1"), Direction::Ascending);
        mirror.insert(Collection::ChatMessages, "u1", doc("m2"), Direction::Ascending);

        let tasks: Vec<_> = mirror.list(Collection::Tasks, "u1").into_iter().map(|d| d.id).collect();
        assert_eq!(tasks, vec!["b", "a"]);
        let messages: Vec<_> = mirror
            .list(Collection::ChatMessages, "u1")
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(messages, vec!["m1", "m2"]);
    }

    #[test]
    fn test_lists_are_scoped_by_owner() {
        let mirror = MirrorStore::new();
        mirror.insert(Collection::Tasks, "u1", doc("a"), Direction::Descending);
        mirror.insert(Collection::Tasks, "u2", doc("b"), Direction::Descending);
        assert_eq!(mirror.count(Collection::Tasks, "u1"), 1);
        assert!(mirror.list(Collection::MoodEntries, "u1").is_empty());
        assert!(mirror.get(Collection::Tasks, "b").is_some());
    }

    #[test]
    fn test_merge_remove_and_clear() {
        let mirror = MirrorStore::new();
        mirror.insert(Collection::ChatMessages, "u1", doc("m1"), Direction::Ascending);
        mirror.insert(Collection::ChatMessages, "u1", doc("m2"), Direction::Ascending);

        let mut patch = Fields::new();
        patch.insert("title".into(), json!("edited"));
        assert!(mirror.merge(Collection::ChatMessages, "m1", patch.clone()));
        assert!(!mirror.merge(Collection::ChatMessages, "missing", patch));
        assert_eq!(
            mirror.get(Collection::ChatMessages, "m1").unwrap().fields["title"],
            json!("edited")
        );

        assert!(mirror.remove(Collection::ChatMessages, "m1"));
        assert!(!mirror.remove(Collection::ChatMessages, "m1"));
        assert_eq!(mirror.clear_owner(Collection::ChatMessages, "u1"), 1);
        assert_eq!(mirror.count(Collection::ChatMessages, "u1"), 0);
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mirror = MirrorStore::new();
        mirror.upsert(Collection::Users, "u1", doc("u1"));
        let mut replacement = doc("u1");
        replacement.fields.insert("name".into(), json!("Asha"));
        mirror.upsert(Collection::Users, "u1", replacement);
        assert_eq!(mirror.count(Collection::Users, "u1"), 1);
        assert_eq!(mirror.get(Collection::Users, "u1").unwrap().fields["name"], json!("Asha"));
    }
}
