// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! # Document Store
//!
//! One call surface over two backends, selected once at startup:
//!
//! - [`EmbeddedStore`] - local ACID database. The privileged backend;
//!   the only one that supports the transactional balance debit.
//! - [`RestStore`] - hand-rolled HTTPS client for the remote document
//!   store's REST API. Development fallback used when no data directory
//!   is configured; filtered queries download the whole collection and
//!   evaluate client-side.
//!
//! Route handlers are written against the fluent surface and run
//! unmodified on either backend:
//!
//! ```rust,ignore
//! let docs = store
//!     .collection(collections::SUBMISSIONS)
//!     .where_field("status", Op::Eq, FieldValue::Str("pending".into()))
//!     .order_by("created_at", Direction::Asc)
//!     .limit(50)
//!     .get()
//!     .await?;
//! ```

pub mod embedded;
pub mod query;
pub mod rest;
pub mod wire;

pub use embedded::EmbeddedStore;
pub use query::{Direction, Filter, Op, Query};
pub use rest::RestStore;
pub use wire::{FieldValue, Fields};

use serde::{de::DeserializeOwned, Serialize};

use crate::models::{Redemption, User};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("unsupported value for field {field}: {kind}")]
    UnsupportedValue { field: String, kind: &'static str },

    #[error("unrecognized wire type for field {field}: {tag}")]
    UnsupportedWireType { field: String, tag: String },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error("store backend does not support transactions")]
    TransactionsUnsupported,

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: f64, requested: f64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored document: ID plus scalar field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Build a document from any flat serializable model. Nested values
    /// error via the wire codec.
    pub fn from_serializable<T: Serialize>(id: &str, model: &T) -> StoreResult<Document> {
        let value = serde_json::to_value(model).map_err(|e| StoreError::Codec(e.to_string()))?;
        let map = value
            .as_object()
            .ok_or_else(|| StoreError::Codec("model did not serialize to an object".into()))?;
        Ok(Document {
            id: id.to_string(),
            fields: wire::fields_from_json_map(map)?,
        })
    }

    /// Deserialize the field map back into a model.
    pub fn deserialize<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let map = wire::fields_to_json_map(&self.fields);
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| StoreError::Codec(e.to_string()))
    }
}

/// The backend pair. Constructed once at startup from configuration and
/// shared through the application state.
pub enum Datastore {
    Embedded(EmbeddedStore),
    Rest(RestStore),
}

impl Datastore {
    pub fn collection<'a>(&'a self, name: &'a str) -> Collection<'a> {
        Collection { store: self, name }
    }

    /// Whether the backend supports the native transaction primitive.
    /// Redemption refuses to run without it.
    pub fn supports_transactions(&self) -> bool {
        matches!(self, Datastore::Embedded(_))
    }

    /// Human-readable backend name for health reporting.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Datastore::Embedded(_) => "embedded",
            Datastore::Rest(_) => "rest",
        }
    }

    /// Check-then-debit a user's token balance and record the redemption,
    /// atomically. Only the embedded backend can uphold the atomicity.
    pub async fn debit_tokens(
        &self,
        user_key: &str,
        cost: f64,
        redemption: &Redemption,
    ) -> StoreResult<User> {
        match self {
            Datastore::Embedded(store) => store.debit_tokens(user_key, cost, redemption),
            Datastore::Rest(_) => Err(StoreError::TransactionsUnsupported),
        }
    }

    async fn get_doc(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        match self {
            Datastore::Embedded(store) => store.get_doc(collection, id),
            Datastore::Rest(store) => store.get_doc(collection, id).await,
        }
    }

    async fn set_doc(&self, collection: &str, doc: &Document) -> StoreResult<()> {
        match self {
            Datastore::Embedded(store) => store.set_doc(collection, doc),
            Datastore::Rest(store) => store.set_doc(collection, doc).await,
        }
    }

    async fn update_doc(&self, collection: &str, id: &str, fields: &Fields) -> StoreResult<()> {
        match self {
            Datastore::Embedded(store) => store.update_doc(collection, id, fields),
            Datastore::Rest(store) => store.update_doc(collection, id, fields).await,
        }
    }

    async fn add_doc(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        match self {
            Datastore::Embedded(store) => store.add_doc(collection, fields),
            Datastore::Rest(store) => store.add_doc(collection, fields).await,
        }
    }

    async fn run_query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        match self {
            Datastore::Embedded(store) => store.run_query(collection, query),
            Datastore::Rest(store) => store.run_query(collection, query).await,
        }
    }
}

/// Handle to one collection.
pub struct Collection<'a> {
    store: &'a Datastore,
    name: &'a str,
}

impl<'a> Collection<'a> {
    pub fn doc(&self, id: &str) -> DocRef<'a> {
        DocRef {
            store: self.store,
            collection: self.name,
            id: id.to_string(),
        }
    }

    /// Create a document with a server/store-assigned ID; returns the ID.
    pub async fn add(&self, fields: Fields) -> StoreResult<String> {
        self.store.add_doc(self.name, fields).await
    }

    pub fn where_field(self, field: &str, op: Op, value: FieldValue) -> QueryBuilder<'a> {
        self.query().where_field(field, op, value)
    }

    pub fn order_by(self, field: &str, direction: Direction) -> QueryBuilder<'a> {
        self.query().order_by(field, direction)
    }

    pub fn query(self) -> QueryBuilder<'a> {
        QueryBuilder {
            store: self.store,
            collection: self.name,
            query: Query::default(),
        }
    }
}

/// Handle to one document.
pub struct DocRef<'a> {
    store: &'a Datastore,
    collection: &'a str,
    id: String,
}

impl DocRef<'_> {
    /// Fetch the document. `Ok(None)` is the not-found sentinel; the REST
    /// backend also folds transport failures into it.
    pub async fn get(&self) -> StoreResult<Option<Document>> {
        self.store.get_doc(self.collection, &self.id).await
    }

    /// Existence-guarded create: fails with `AlreadyExists` rather than
    /// overwriting.
    pub async fn set(&self, fields: Fields) -> StoreResult<()> {
        let doc = Document {
            id: self.id.clone(),
            fields,
        };
        self.store.set_doc(self.collection, &doc).await
    }

    /// Unconditional field merge; untouched fields keep their values.
    pub async fn update(&self, fields: Fields) -> StoreResult<()> {
        self.store.update_doc(self.collection, &self.id, &fields).await
    }
}

/// Accumulates filters, a sort and a limit before the terminal `get()`.
pub struct QueryBuilder<'a> {
    store: &'a Datastore,
    collection: &'a str,
    query: Query,
}

impl QueryBuilder<'_> {
    pub fn where_field(mut self, field: &str, op: Op, value: FieldValue) -> Self {
        self.query.filters.push(Filter {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.query.sort = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.query.limit = Some(n);
        self
    }

    pub async fn get(self) -> StoreResult<Vec<Document>> {
        self.store.run_query(self.collection, &self.query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Flat {
        name: String,
        weight: f64,
        count: i64,
        active: bool,
        note: Option<String>,
    }

    #[test]
    fn model_document_round_trip() {
        let model = Flat {
            name: "bin".into(),
            weight: 2.25,
            count: 4,
            active: true,
            note: None,
        };
        let doc = Document::from_serializable("flat-1", &model).unwrap();
        assert_eq!(doc.id, "flat-1");
        let back: Flat = doc.deserialize().unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn nested_models_are_rejected() {
        #[derive(Serialize)]
        struct Nested {
            inner: Vec<u32>,
        }
        let err = Document::from_serializable("n", &Nested { inner: vec![1] }).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedValue { .. }));
    }
}
