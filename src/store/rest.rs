// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! REST shim for the remote document store.
//!
//! Development fallback used when no data directory is configured. Talks
//! to the store's HTTPS endpoint
//! (`{base}/projects/{project}/databases/(default)/documents/...`),
//! authenticated by a static API key query parameter.
//!
//! ## Contract
//!
//! - `get_doc` never propagates errors: any transport failure, non-2xx
//!   status or undecodable body yields the not-found sentinel.
//! - `set_doc` is an existence-guarded create (the remote store rejects a
//!   duplicate document ID with 409).
//! - `update_doc` is an unconditional field merge via an update mask.
//! - Filtered queries download the **entire** collection, then filter,
//!   sort and truncate client-side. No pagination, no composite indexes.
//!   Fine for a development stub, unacceptable for production data
//!   volumes.
//! - Everything except `get_doc` propagates HTTP errors to the caller.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use super::query::Query;
use super::wire::{self, Fields};
use super::{Document, StoreError, StoreResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    project_id: String,
    api_key: String,
    http: Client,
}

impl RestStore {
    pub fn new(base_url: &str, project_id: &str, api_key: &str) -> StoreResult<Self> {
        // Validate the base URL up front; a typo here would otherwise
        // surface as a confusing per-request transport error.
        url::Url::parse(base_url)
            .map_err(|e| StoreError::Config(format!("bad store base URL: {e}")))?;

        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project_id, collection
        )
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), id)
    }

    /// Fetch one document by ID. Any failure is the not-found sentinel.
    pub async fn get_doc(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let response = match self
            .http
            .get(self.doc_url(collection, id))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(collection, id, error = %e, "document fetch failed; treating as not found");
                return Ok(None);
            }
        };

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(collection, id, error = %e, "document body undecodable; treating as not found");
                return Ok(None);
            }
        };

        match parse_wire_document(&body) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                warn!(collection, id, error = %e, "document fields undecodable; treating as not found");
                Ok(None)
            }
        }
    }

    /// Existence-guarded create with an explicit document ID.
    pub async fn set_doc(&self, collection: &str, doc: &Document) -> StoreResult<()> {
        let response = self
            .http
            .post(self.collection_url(collection))
            .query(&[
                ("documentId", doc.id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .json(&wire::encode_fields(&doc.fields))
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("create {collection}/{}: {e}", doc.id)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == reqwest::StatusCode::CONFLICT {
            Err(StoreError::AlreadyExists(format!("{collection}/{}", doc.id)))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Transport(format!(
                "create {collection}/{} returned {status}: {body}",
                doc.id
            )))
        }
    }

    /// Unconditional field merge. The update mask names exactly the
    /// supplied fields so untouched fields survive.
    pub async fn update_doc(&self, collection: &str, id: &str, fields: &Fields) -> StoreResult<()> {
        let mut params: Vec<(&str, &str)> = vec![("key", self.api_key.as_str())];
        for name in fields.keys() {
            params.push(("updateMask.fieldPaths", name.as_str()));
        }

        let response = self
            .http
            .patch(self.doc_url(collection, id))
            .query(&params)
            .json(&wire::encode_fields(fields))
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("update {collection}/{id}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Transport(format!(
                "update {collection}/{id} returned {status}: {body}"
            )));
        }
        Ok(())
    }

    /// Create with a store-assigned ID; returns the assigned ID.
    pub async fn add_doc(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let response = self
            .http
            .post(self.collection_url(collection))
            .query(&[("key", self.api_key.as_str())])
            .json(&wire::encode_fields(&fields))
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("add to {collection}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Transport(format!(
                "add to {collection} returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("add to {collection}: {e}")))?;

        doc_id_from_name(&body).ok_or_else(|| {
            StoreError::InvalidResponse(format!("add to {collection}: response has no document name"))
        })
    }

    /// Run a filtered query: download the whole collection, evaluate
    /// client-side.
    pub async fn run_query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let response = self
            .http
            .get(self.collection_url(collection))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("list {collection}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Transport(format!(
                "list {collection} returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("list {collection}: {e}")))?;

        // An empty collection comes back without a `documents` array.
        let mut docs = Vec::new();
        if let Some(entries) = body.get("documents").and_then(Value::as_array) {
            for entry in entries {
                docs.push(parse_wire_document(entry)?);
            }
        }

        Ok(query.apply(docs))
    }
}

/// Parse a wire document (`{"name": ".../documents/col/ID", "fields": {...}}`).
fn parse_wire_document(body: &Value) -> StoreResult<Document> {
    let id = doc_id_from_name(body)
        .ok_or_else(|| StoreError::InvalidResponse("document has no name".into()))?;

    let fields = match body.get("fields").and_then(Value::as_object) {
        Some(wire_fields) => wire::decode_fields(wire_fields)?,
        None => Fields::new(),
    };

    Ok(Document { id, fields })
}

/// The document ID is the last segment of the resource name.
fn doc_id_from_name(body: &Value) -> Option<String> {
    body.get("name")
        .and_then(Value::as_str)
        .and_then(|name| name.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::store::wire::FieldValue;

    fn store() -> RestStore {
        RestStore::new("https://docs.example.com/v1", "green-karma", "test-key").unwrap()
    }

    #[test]
    fn new_rejects_invalid_base_url() {
        let err = RestStore::new("not a url", "p", "k").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn urls_follow_the_documents_pattern() {
        let store = store();
        assert_eq!(
            store.collection_url("users"),
            "https://docs.example.com/v1/projects/green-karma/databases/(default)/documents/users"
        );
        assert_eq!(
            store.doc_url("users", "abc"),
            "https://docs.example.com/v1/projects/green-karma/databases/(default)/documents/users/abc"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let store = RestStore::new("https://docs.example.com/v1/", "p", "k").unwrap();
        assert!(!store.collection_url("users").contains("//projects"));
    }

    #[test]
    fn wire_document_parses_name_and_fields() {
        let body = json!({
            "name": "projects/p/databases/(default)/documents/users/user-1",
            "fields": {
                "name": { "stringValue": "Ada" },
                "weight": { "doubleValue": 3.5 }
            }
        });
        let doc = parse_wire_document(&body).unwrap();
        assert_eq!(doc.id, "user-1");
        assert_eq!(doc.fields["name"], FieldValue::Str("Ada".into()));
        assert_eq!(doc.fields["weight"], FieldValue::Double(3.5));
    }

    #[test]
    fn wire_document_without_fields_is_empty() {
        let body = json!({ "name": "x/y/documents/users/empty-doc" });
        let doc = parse_wire_document(&body).unwrap();
        assert_eq!(doc.id, "empty-doc");
        assert!(doc.fields.is_empty());
    }

    #[test]
    fn wire_document_without_name_errors() {
        let body = json!({ "fields": {} });
        assert!(parse_wire_document(&body).is_err());
    }
}
