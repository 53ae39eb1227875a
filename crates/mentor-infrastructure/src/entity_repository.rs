//! Generic remote-or-mirror repository.
//!
//! [`EntityRepository`] makes the remote/mirror decision once per call for
//! any [`Entity`], and applies the shared failure policy:
//!
//! - no usable remote store: the mirror serves the call, no network I/O
//! - list + `FailedPrecondition`: unordered re-query, stable in-memory sort,
//!   then the limit
//! - create + `PermissionDenied`: mirror, for entities that opt in
//! - list failures: logged, empty result
//! - other mutation failures: propagated unchanged

use crate::mirror_store::MirrorStore;
use mentor_core::entity::{Entity, sort_naturally};
use mentor_core::payload::sanitize_fields;
use chrono::{DateTime, Utc};
use mentor_core::store::{Document, DocumentStore, Fields, FilterOp, Query, StoreError, StoreErrorKind};
use mentor_core::timestamp::to_wire;
use mentor_core::{MentorError, Result};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Repository for one entity kind over an optional remote store and the shared mirror.
pub struct EntityRepository<E: Entity> {
    remote: Option<Arc<dyn DocumentStore>>,
    mirror: Arc<MirrorStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityRepository<E> {
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            mirror: self.mirror.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityRepository<E> {
    pub fn new(remote: Option<Arc<dyn DocumentStore>>, mirror: Arc<MirrorStore>) -> Self {
        Self {
            remote,
            mirror,
            _entity: PhantomData,
        }
    }

    /// The remote store, when one is wired and reports itself configured.
    fn remote(&self) -> Option<&Arc<dyn DocumentStore>> {
        self.remote.as_ref().filter(|store| store.is_configured())
    }

    pub fn is_remote_available(&self) -> bool {
        self.remote().is_some()
    }

    /// Creates a record owned by `owner` with a generated id.
    ///
    /// `fields` are sanitized and stamped with the owner before the write.
    ///
    /// # Returns
    ///
    /// - `Ok(E)`: The stored record, with its generated id
    /// - `Err(MentorError::Store)`: The remote store rejected the write and
    ///   no fallback applies
    pub async fn create(&self, owner: &str, mut fields: Fields) -> Result<E> {
        fields.insert(E::OWNER_FIELD.to_string(), Value::String(owner.to_string()));
        let fields = sanitize_fields(fields);

        let Some(store) = self.remote() else {
            return self.create_in_mirror(owner, fields);
        };

        match store.add(E::COLLECTION, fields.clone()).await {
            Ok(id) => {
                tracing::debug!("[Persistence] Created {} {}", E::ENTITY_NAME, id);
                E::from_document(Document::new(id, fields))
            }
            Err(err) if err.is_permission_denied() && E::MIRROR_ON_PERMISSION_DENIED => {
                tracing::warn!(
                    "[Persistence] Permission denied creating {}; keeping it in the mirror: {}",
                    E::ENTITY_NAME,
                    err
                );
                self.create_in_mirror(owner, fields)
            }
            Err(err) => {
                tracing::error!("[Persistence] Failed to create {}: {}", E::ENTITY_NAME, err);
                Err(err.into())
            }
        }
    }

    /// Creates a record in the mirror with a locally generated id.
    pub fn create_in_mirror(&self, owner: &str, mut fields: Fields) -> Result<E> {
        fields.insert(E::OWNER_FIELD.to_string(), Value::String(owner.to_string()));
        let document = Document::new(Uuid::new_v4().to_string(), sanitize_fields(fields));
        let entity = E::from_document(document.clone())?;
        self.mirror
            .insert(E::COLLECTION, owner, document, E::ORDER_DIRECTION);
        tracing::debug!(
            "[Mirror] Stored {} {} for '{}'",
            E::ENTITY_NAME,
            entity.id(),
            owner
        );
        Ok(entity)
    }

    /// Creates or replaces the record keyed by `id`.
    pub async fn put(&self, id: &str, owner: &str, mut fields: Fields) -> Result<E> {
        fields.insert(E::OWNER_FIELD.to_string(), Value::String(owner.to_string()));
        let fields = sanitize_fields(fields);
        let document = Document::new(id, fields);

        match self.remote() {
            Some(store) => {
                store
                    .set(E::COLLECTION, id, document.fields.clone())
                    .await
                    .map_err(|err| {
                        tracing::error!("[Persistence] Failed to write {} {}: {}", E::ENTITY_NAME, id, err);
                        MentorError::from(err)
                    })?;
            }
            None => self.mirror.upsert(E::COLLECTION, owner, document.clone()),
        }
        E::from_document(document)
    }

    /// Reads one record. Failures are logged and read as absent.
    pub async fn get(&self, id: &str) -> Option<E> {
        let document = match self.remote() {
            Some(store) => match store.get(E::COLLECTION, id).await {
                Ok(document) => document,
                Err(err) => {
                    tracing::error!("[Persistence] Failed to read {} {}: {}", E::ENTITY_NAME, id, err);
                    None
                }
            },
            None => self.mirror.get(E::COLLECTION, id),
        }?;
        self.decode(document)
    }

    /// Lists the owner's records in natural order, bounded to `limit` when given.
    ///
    /// Never fails: unrecoverable errors are logged and yield an empty list.
    pub async fn list(&self, owner: &str, limit: Option<usize>) -> Vec<E> {
        let Some(store) = self.remote() else {
            let mut items = self.decode_all(self.mirror.list(E::COLLECTION, owner));
            sort_naturally(&mut items);
            if let Some(limit) = limit {
                items.truncate(limit);
            }
            return items;
        };

        let mut query = Query::new(E::COLLECTION)
            .where_eq(E::OWNER_FIELD, owner)
            .order_by(E::ORDER_FIELD, E::ORDER_DIRECTION);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        match store.query(&query).await {
            Ok(documents) => self.decode_all(documents),
            Err(err) if err.is_failed_precondition() => {
                tracing::warn!(
                    "[Persistence] Index not ready for {} query; sorting in memory",
                    E::ENTITY_NAME
                );
                match store.query(&query.without_ordering()).await {
                    Ok(documents) => {
                        let mut items = self.decode_all(documents);
                        sort_naturally(&mut items);
                        if let Some(limit) = limit {
                            items.truncate(limit);
                        }
                        items
                    }
                    Err(err) => {
                        tracing::error!(
                            "[Persistence] Fallback {} query also failed: {}",
                            E::ENTITY_NAME,
                            err
                        );
                        Vec::new()
                    }
                }
            }
            Err(err) => {
                tracing::error!("[Persistence] Failed to list {}: {}", E::ENTITY_NAME, err);
                Vec::new()
            }
        }
    }

    /// Lists every record of the owner ordered at or after `since`, in natural order.
    ///
    /// The range query runs unordered and is sorted in memory, so it needs
    /// no composite index. Failures are logged and yield an empty list.
    pub async fn list_since(&self, owner: &str, since: DateTime<Utc>) -> Vec<E> {
        let documents = match self.remote() {
            Some(store) => {
                let query = Query::new(E::COLLECTION)
                    .where_eq(E::OWNER_FIELD, owner)
                    .filter(E::ORDER_FIELD, FilterOp::GreaterThanOrEqual, to_wire(since));
                match store.query(&query).await {
                    Ok(documents) => documents,
                    Err(err) => {
                        tracing::error!("[Persistence] Failed to list recent {}: {}", E::ENTITY_NAME, err);
                        return Vec::new();
                    }
                }
            }
            None => self.mirror.list(E::COLLECTION, owner),
        };

        let mut items: Vec<E> = self
            .decode_all(documents)
            .into_iter()
            .filter(|item| item.order_key() >= since)
            .collect();
        sort_naturally(&mut items);
        items
    }

    /// Merges `fields` into an existing record.
    ///
    /// Unknown ids fail with [`MentorError::NotFound`] in both modes.
    pub async fn update(&self, id: &str, fields: Fields) -> Result<()> {
        let fields = sanitize_fields(fields);
        match self.remote() {
            Some(store) => store
                .update(E::COLLECTION, id, fields)
                .await
                .map_err(|err| self.mutation_error("update", id, err)),
            None => {
                if self.mirror.merge(E::COLLECTION, id, fields) {
                    Ok(())
                } else {
                    Err(MentorError::not_found(E::ENTITY_NAME, id))
                }
            }
        }
    }

    /// Deletes the named fields of an existing record.
    ///
    /// Unknown ids fail with [`MentorError::NotFound`] in both modes.
    pub async fn remove_fields(&self, id: &str, names: &[&str]) -> Result<()> {
        match self.remote() {
            Some(store) => store
                .remove_fields(E::COLLECTION, id, names)
                .await
                .map_err(|err| self.mutation_error("update", id, err)),
            None => {
                if self.mirror.remove_fields(E::COLLECTION, id, names) {
                    Ok(())
                } else {
                    Err(MentorError::not_found(E::ENTITY_NAME, id))
                }
            }
        }
    }

    /// Deletes a record.
    pub async fn delete(&self, id: &str) -> Result<()> {
        match self.remote() {
            Some(store) => store
                .delete(E::COLLECTION, id)
                .await
                .map_err(|err| self.mutation_error("delete", id, err)),
            None => {
                if self.mirror.remove(E::COLLECTION, id) {
                    Ok(())
                } else {
                    Err(MentorError::not_found(E::ENTITY_NAME, id))
                }
            }
        }
    }

    /// Deletes every record of `owner`, returning how many were removed.
    pub async fn clear_owner(&self, owner: &str) -> Result<usize> {
        let Some(store) = self.remote() else {
            return Ok(self.mirror.clear_owner(E::COLLECTION, owner));
        };

        let query = Query::new(E::COLLECTION).where_eq(E::OWNER_FIELD, owner);
        let documents = store.query(&query).await.map_err(|err| {
            tracing::error!("[Persistence] Failed to list {} for clearing: {}", E::ENTITY_NAME, err);
            MentorError::from(err)
        })?;
        for document in &documents {
            store
                .delete(E::COLLECTION, &document.id)
                .await
                .map_err(|err| self.mutation_error("delete", &document.id, err))?;
        }
        Ok(documents.len())
    }

    fn mutation_error(&self, operation: &str, id: &str, err: StoreError) -> MentorError {
        tracing::error!(
            "[Persistence] Failed to {} {} {}: {}",
            operation,
            E::ENTITY_NAME,
            id,
            err
        );
        if err.kind == StoreErrorKind::NotFound {
            return MentorError::not_found(E::ENTITY_NAME, id);
        }
        err.into()
    }

    fn decode(&self, document: Document) -> Option<E> {
        let id = document.id.clone();
        match E::from_document(document) {
            Ok(entity) => Some(entity),
            Err(err) => {
                tracing::warn!("[Persistence] Skipping unreadable {} {}: {}", E::ENTITY_NAME, id, err);
                None
            }
        }
    }

    fn decode_all(&self, documents: Vec<Document>) -> Vec<E> {
        documents
            .into_iter()
            .filter_map(|document| self.decode(document))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryDocumentStore;
    use mentor_core::task::Task;
    use serde_json::json;

    fn task_fields(title: &str, created_at: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".into(), json!(title));
        fields.insert("createdAt".into(), json!(created_at));
        fields
    }

    #[tokio::test]
    async fn test_unconfigured_remote_uses_mirror() {
        let remote = Arc::new(InMemoryDocumentStore::unconfigured());
        let repo: EntityRepository<Task> =
            EntityRepository::new(Some(remote.clone()), Arc::new(MirrorStore::new()));

        let task = repo.create("u1", task_fields("Read", "2025-01-01T00:00:00Z")).await.unwrap();
        assert!(!repo.is_remote_available());
        assert_eq!(remote.len(mentor_core::store::Collection::Tasks), 0);
        assert_eq!(repo.list("u1", None).await, vec![task]);
    }

    #[tokio::test]
    async fn test_mirror_list_sorts_newest_first_and_limits() {
        let repo: EntityRepository<Task> = EntityRepository::new(None, Arc::new(MirrorStore::new()));
        repo.create("u1", task_fields("old", "2025-01-01T00:00:00Z")).await.unwrap();
        repo.create("u1", task_fields("new", "2025-01-03T00:00:00Z")).await.unwrap();
        repo.create("u1", task_fields("mid", "2025-01-02T00:00:00Z")).await.unwrap();

        let titles: Vec<_> = repo.list("u1", Some(2)).await.into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["new", "mid"]);
    }

    #[tokio::test]
    async fn test_mirror_update_unknown_id_is_not_found() {
        let repo: EntityRepository<Task> = EntityRepository::new(None, Arc::new(MirrorStore::new()));
        let err = repo.update("missing", Fields::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.delete("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_since_keeps_records_inside_window() {
        let remote = Arc::new(InMemoryDocumentStore::new());
        let repo: EntityRepository<Task> =
            EntityRepository::new(Some(remote), Arc::new(MirrorStore::new()));
        let mirror_repo: EntityRepository<Task> = EntityRepository::new(None, Arc::new(MirrorStore::new()));
        for repo in [&repo, &mirror_repo] {
            repo.create("u1", task_fields("old", "2025-01-01T00:00:00.000Z")).await.unwrap();
            repo.create("u1", task_fields("new", "2025-01-03T00:00:00.000Z")).await.unwrap();
            repo.create("u1", task_fields("mid", "2025-01-02T00:00:00.000Z")).await.unwrap();
            repo.create("u2", task_fields("other", "2025-01-03T00:00:00.000Z")).await.unwrap();

            let since = "2025-01-02T00:00:00Z".parse().unwrap();
            let titles: Vec<_> = repo.list_since("u1", since).await.into_iter().map(|t| t.title).collect();
            assert_eq!(titles, vec!["new", "mid"]);
        }
    }

    #[tokio::test]
    async fn test_remove_fields_in_both_modes() {
        let remote = Arc::new(InMemoryDocumentStore::new());
        let repo: EntityRepository<Task> =
            EntityRepository::new(Some(remote.clone()), Arc::new(MirrorStore::new()));
        let mut fields = task_fields("Read", "2025-01-01T00:00:00Z");
        fields.insert("completedAt".into(), json!("2025-01-02T00:00:00Z"));
        let task = repo.create("u1", fields.clone()).await.unwrap();

        repo.remove_fields(&task.id, &["completedAt"]).await.unwrap();
        let stored = remote.document(mentor_core::store::Collection::Tasks, &task.id).unwrap();
        assert!(stored.get("completedAt").is_none());
        assert_eq!(stored.get("title"), Some(&json!("Read")));

        let mirror_repo: EntityRepository<Task> = EntityRepository::new(None, Arc::new(MirrorStore::new()));
        let task = mirror_repo.create("u1", fields).await.unwrap();
        mirror_repo.remove_fields(&task.id, &["completedAt"]).await.unwrap();
        assert!(mirror_repo.get(&task.id).await.unwrap().completed_at.is_none());
        assert!(mirror_repo.remove_fields("missing", &["completedAt"]).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_remote_list_error_reads_as_empty() {
        let remote = Arc::new(InMemoryDocumentStore::new());
        remote.fail_next(
            crate::memory_store::StoreOp::Query,
            StoreErrorKind::Unavailable,
            "offline",
        );
        let repo: EntityRepository<Task> =
            EntityRepository::new(Some(remote), Arc::new(MirrorStore::new()));
        assert!(repo.list("u1", None).await.is_empty());
    }
}
