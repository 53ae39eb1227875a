//! FirestoreStore - [`DocumentStore`] over the Cloud Firestore REST API.
//!
//! Requests carry the web API key and, when the identity provider has one,
//! the signed-in user's bearer token. gRPC status strings from error bodies
//! are mapped onto [`StoreErrorKind`] here and nowhere else.

use crate::firestore_value::{decode_fields, encode_fields, encode_value};
use async_trait::async_trait;
use mentor_core::config::FirebaseConfig;
use mentor_core::identity::IdentityProvider;
use mentor_core::store::{
    Collection, Direction, Document, DocumentStore, Fields, FilterOp, Query, StoreError,
    StoreErrorKind, StoreResult,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Remote document store backed by Firestore.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    config: FirebaseConfig,
    base_url: String,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl FirestoreStore {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: BASE_URL.to_string(),
            identity: None,
        }
    }

    /// Attaches the identity whose bearer token authorizes requests.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Points the store at another endpoint root, e.g. the local emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `.../projects/{project}/databases/(default)/documents`
    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base_url,
            self.config.project_id.as_deref().unwrap_or_default()
        )
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.documents_root(), collection)
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), collection, id)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.config.api_key {
            builder = builder.query(&[("key", key.as_str())]);
        }
        if let Some(token) = self.identity.as_ref().and_then(|identity| identity.id_token()) {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Sends the request, returning the response body of a 2xx response.
    async fn send(&self, builder: RequestBuilder) -> StoreResult<Value> {
        let response = builder.send().await.map_err(|err| {
            let kind = if err.is_connect() || err.is_timeout() {
                StoreErrorKind::Unavailable
            } else {
                StoreErrorKind::Other
            };
            tracing::error!("[Persistence] Firestore request failed ({:?}): {}", kind, err);
            StoreError::new(kind, format!("Firestore request failed: {err}"))
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| StoreError::unavailable(format!("Failed to read Firestore response: {err}")))?;

        if !status.is_success() {
            let err = map_http_error(status, &body);
            tracing::warn!("[Persistence] Firestore returned {} ({:?}): {}", status, err.kind, err.message);
            return Err(err);
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| {
            StoreError::new(StoreErrorKind::Other, format!("Failed to parse Firestore response: {err}"))
        })
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn add(&self, collection: Collection, fields: Fields) -> StoreResult<String> {
        let body = json!({ "fields": encode_fields(&fields) });
        let response = self
            .send(self.request(Method::POST, self.collection_url(collection)).json(&body))
            .await?;
        response
            .get("name")
            .and_then(Value::as_str)
            .and_then(document_id)
            .map(str::to_string)
            .ok_or_else(|| StoreError::new(StoreErrorKind::Other, "Firestore returned a document without a name"))
    }

    async fn set(&self, collection: Collection, id: &str, fields: Fields) -> StoreResult<()> {
        let body = json!({ "fields": encode_fields(&fields) });
        self.send(self.request(Method::PATCH, self.document_url(collection, id)).json(&body))
            .await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        match self
            .send(self.request(Method::GET, self.document_url(collection, id)))
            .await
        {
            Ok(response) => Ok(parse_document(&response)),
            Err(err) if err.kind == StoreErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> StoreResult<()> {
        let mut params: Vec<(&str, &str)> = fields
            .keys()
            .map(|name| ("updateMask.fieldPaths", name.as_str()))
            .collect();
        params.push(("currentDocument.exists", "true"));

        let body = json!({ "fields": encode_fields(&fields) });
        self.send(
            self.request(Method::PATCH, self.document_url(collection, id))
                .query(&params)
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn remove_fields(&self, collection: Collection, id: &str, names: &[&str]) -> StoreResult<()> {
        // Masked fields missing from the body are deleted.
        let mut params: Vec<(&str, &str)> = names
            .iter()
            .map(|name| ("updateMask.fieldPaths", *name))
            .collect();
        params.push(("currentDocument.exists", "true"));

        self.send(
            self.request(Method::PATCH, self.document_url(collection, id))
                .query(&params)
                .json(&json!({ "fields": {} })),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        self.send(self.request(Method::DELETE, self.document_url(collection, id)))
            .await?;
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_root());
        let body = json!({ "structuredQuery": structured_query(query) });
        let response = self.send(self.request(Method::POST, url).json(&body)).await?;
        parse_query_response(&response)
    }
}

/// Last path segment of a document resource name.
fn document_id(name: &str) -> Option<&str> {
    name.rsplit('/').next().filter(|id| !id.is_empty())
}

fn parse_document(raw: &Value) -> Option<Document> {
    let id = raw.get("name").and_then(Value::as_str).and_then(document_id)?;
    let fields = raw
        .get("fields")
        .and_then(Value::as_object)
        .map(decode_fields)
        .unwrap_or_default();
    Some(Document::new(id, fields))
}

/// Reads a `runQuery` stream. Entries without a `document` carry only a
/// read time; an entry with an `error` fails the whole query.
fn parse_query_response(response: &Value) -> StoreResult<Vec<Document>> {
    let Some(entries) = response.as_array() else {
        return Ok(Vec::new());
    };
    let mut documents = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(error) = entry.get("error") {
            return Err(error_from_status(error));
        }
        if let Some(document) = entry.get("document").and_then(parse_document) {
            documents.push(document);
        }
    }
    Ok(documents)
}

fn operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Equal => "EQUAL",
        FilterOp::LessThan => "LESS_THAN",
        FilterOp::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        FilterOp::GreaterThan => "GREATER_THAN",
        FilterOp::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
    }
}

/// Builds the `structuredQuery` body for a [`Query`].
pub fn structured_query(query: &Query) -> Value {
    let mut structured = Map::new();
    structured.insert(
        "from".to_string(),
        json!([{ "collectionId": query.collection.as_ref() }]),
    );

    let mut filters: Vec<Value> = query
        .filters
        .iter()
        .map(|filter| {
            json!({
                "fieldFilter": {
                    "field": { "fieldPath": filter.field },
                    "op": operator(filter.op),
                    "value": encode_value(&filter.value),
                }
            })
        })
        .collect();
    match filters.len() {
        0 => {}
        1 => {
            structured.insert("where".to_string(), filters.remove(0));
        }
        _ => {
            structured.insert(
                "where".to_string(),
                json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
            );
        }
    }

    if let Some(order) = &query.order_by {
        let direction = match order.direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured.insert(
            "orderBy".to_string(),
            json!([{ "field": { "fieldPath": order.field }, "direction": direction }]),
        );
    }
    if let Some(limit) = query.limit {
        structured.insert("limit".to_string(), json!(limit));
    }
    Value::Object(structured)
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Maps a gRPC status name onto the store error set.
pub fn kind_for_status(status: &str) -> Option<StoreErrorKind> {
    let kind = match status {
        "FAILED_PRECONDITION" => StoreErrorKind::FailedPrecondition,
        "PERMISSION_DENIED" | "UNAUTHENTICATED" => StoreErrorKind::PermissionDenied,
        "UNAVAILABLE" | "DEADLINE_EXCEEDED" | "RESOURCE_EXHAUSTED" | "ABORTED" | "INTERNAL" => {
            StoreErrorKind::Unavailable
        }
        "NOT_FOUND" => StoreErrorKind::NotFound,
        "INVALID_ARGUMENT" | "OUT_OF_RANGE" => StoreErrorKind::InvalidArgument,
        _ => return None,
    };
    Some(kind)
}

fn kind_for_http(status: StatusCode) -> StoreErrorKind {
    match status.as_u16() {
        400 => StoreErrorKind::InvalidArgument,
        401 | 403 => StoreErrorKind::PermissionDenied,
        404 => StoreErrorKind::NotFound,
        412 => StoreErrorKind::FailedPrecondition,
        429 | 500..=599 => StoreErrorKind::Unavailable,
        _ => StoreErrorKind::Other,
    }
}

fn error_from_status(error: &Value) -> StoreError {
    let body: Option<ErrorBody> = serde_json::from_value(error.clone()).ok();
    let status = body.as_ref().and_then(|b| b.status.clone()).unwrap_or_default();
    let message = body
        .and_then(|b| b.message)
        .unwrap_or_else(|| error.to_string());
    let kind = kind_for_status(&status).unwrap_or(StoreErrorKind::Other);
    StoreError::new(kind, message)
}

/// Classifies a non-2xx response. The body is either `{"error": {...}}` or,
/// for `runQuery`, a one-element array of that shape.
fn map_http_error(status: StatusCode, body: &str) -> StoreError {
    let error = serde_json::from_str::<Value>(body).ok().and_then(|parsed| {
        let wrapper = match parsed {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        wrapper.get("error").cloned()
    });

    let Some(error) = error else {
        return StoreError::new(kind_for_http(status), format!("HTTP {status}: {body}"));
    };
    let mapped = error_from_status(&error);
    let has_status = error
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| kind_for_status(status).is_some());
    if has_status {
        mapped
    } else {
        StoreError::new(kind_for_http(status), mapped.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_query_single_filter() {
        let query = Query::new(Collection::MoodEntries)
            .where_eq("userId", "u1")
            .order_by("date", Direction::Descending)
            .limit(7);
        assert_eq!(
            structured_query(&query),
            json!({
                "from": [{"collectionId": "moodEntries"}],
                "where": {"fieldFilter": {
                    "field": {"fieldPath": "userId"},
                    "op": "EQUAL",
                    "value": {"stringValue": "u1"}
                }},
                "orderBy": [{"field": {"fieldPath": "date"}, "direction": "DESCENDING"}],
                "limit": 7
            })
        );
    }

    #[test]
    fn test_structured_query_composite_without_order() {
        let query = Query::new(Collection::Tasks)
            .where_eq("userId", "u1")
            .filter("estimatedTime", FilterOp::GreaterThanOrEqual, 30)
            .without_ordering();
        let structured = structured_query(&query);
        assert_eq!(structured["where"]["compositeFilter"]["op"], "AND");
        assert_eq!(
            structured["where"]["compositeFilter"]["filters"][1]["fieldFilter"]["value"],
            json!({"integerValue": "30"})
        );
        assert!(structured.get("orderBy").is_none());
        assert!(structured.get("limit").is_none());
    }

    #[test]
    fn test_missing_index_maps_to_failed_precondition() {
        let body = r#"[{"error":{"code":400,"message":"The query requires an index.","status":"FAILED_PRECONDITION"}}]"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body);
        assert!(err.is_failed_precondition());
        assert_eq!(err.message, "The query requires an index.");
    }

    #[test]
    fn test_permission_and_http_fallbacks() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert!(map_http_error(StatusCode::FORBIDDEN, body).is_permission_denied());

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "<html>busy</html>");
        assert_eq!(err.kind, StoreErrorKind::Unavailable);
        let err = map_http_error(StatusCode::NOT_FOUND, r#"{"error":{"code":404,"message":"No document"}}"#);
        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert_eq!(err.message, "No document");
    }

    #[test]
    fn test_query_response_skips_read_time_entries() {
        let response = json!([
            {"document": {
                "name": "projects/p/databases/(default)/documents/tasks/abc",
                "fields": {"title": {"stringValue": "Read"}}
            }, "readTime": "2025-03-10T09:00:00Z"},
            {"readTime": "2025-03-10T09:00:00Z"}
        ]);
        let documents = parse_query_response(&response).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "abc");
        assert_eq!(documents[0].get("title"), Some(&json!("Read")));

        let failed = json!([{"error": {"status": "PERMISSION_DENIED", "message": "no"}}]);
        assert!(parse_query_response(&failed).unwrap_err().is_permission_denied());
    }

    #[test]
    fn test_placeholder_credentials_are_not_configured() {
        let store = FirestoreStore::new(FirebaseConfig {
            api_key: Some("your_firebase_api_key_here".into()),
            auth_domain: Some("demo.firebaseapp.com".into()),
            project_id: Some("demo".into()),
            ..Default::default()
        });
        assert!(!store.is_configured());

        let store = FirestoreStore::new(FirebaseConfig {
            api_key: Some("AIzaReal".into()),
            auth_domain: Some("demo.firebaseapp.com".into()),
            project_id: Some("demo".into()),
            ..Default::default()
        })
        .with_base_url("http://localhost:8080/v1/");
        assert!(store.is_configured());
        assert_eq!(
            store.document_url(Collection::ChatSessions, "s1"),
            "http://localhost:8080/v1/projects/demo/databases/(default)/documents/chatSessions/s1"
        );
    }
}
