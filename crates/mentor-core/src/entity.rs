//! Persisted entity metadata.
//!
//! [`Entity`] describes how one record kind lives in the document store:
//! its collection, natural ordering, timestamp fields, and fallback policy.
//! A single generic repository drives every entity through this trait.

use crate::error::{MentorError, Result};
use crate::store::{Collection, Direction, Document};
use crate::timestamp::normalize_timestamp_fields;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;

/// A record kind persisted in one collection.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection holding this entity.
    const COLLECTION: Collection;

    /// Human-readable name used in errors and log lines.
    const ENTITY_NAME: &'static str;

    /// Natural ordering field for list operations.
    const ORDER_FIELD: &'static str;

    /// Natural ordering direction (newest first unless overridden).
    const ORDER_DIRECTION: Direction = Direction::Descending;

    /// Timestamp fields that always exist after a read.
    const REQUIRED_TIMESTAMPS: &'static [&'static str];

    /// Timestamp fields that may be absent.
    const OPTIONAL_TIMESTAMPS: &'static [&'static str] = &[];

    /// Field holding the owning-user id.
    const OWNER_FIELD: &'static str = "userId";

    /// Whether a create rejected with permission-denied degrades to the mirror.
    const MIRROR_ON_PERMISSION_DENIED: bool = false;

    fn id(&self) -> &str;

    /// Value of [`Self::ORDER_FIELD`], used for in-memory sorting.
    fn order_key(&self) -> DateTime<Utc>;

    /// Builds the entity from a stored document.
    ///
    /// Timestamp fields are normalized first, then the document id is merged
    /// into the field map under `id`.
    fn from_document(document: Document) -> Result<Self> {
        let Document { id, mut fields } = document;
        normalize_timestamp_fields(
            &mut fields,
            Self::REQUIRED_TIMESTAMPS,
            Self::OPTIONAL_TIMESTAMPS,
            Utc::now(),
        );
        fields.insert("id".to_string(), Value::String(id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| MentorError::Serialization {
            format: "JSON".to_string(),
            message: format!("{} '{}': {}", Self::ENTITY_NAME, id, e),
        })
    }
}

/// Stable-sorts entities by their natural ordering.
///
/// Ties keep their incoming order.
pub fn sort_naturally<E: Entity>(items: &mut [E]) {
    items.sort_by(|a, b| compare_natural::<E>(a, b));
}

fn compare_natural<E: Entity>(a: &E, b: &E) -> Ordering {
    let ordering = a.order_key().cmp(&b.order_key());
    match E::ORDER_DIRECTION {
        Direction::Ascending => ordering,
        Direction::Descending => ordering.reverse(),
    }
}
