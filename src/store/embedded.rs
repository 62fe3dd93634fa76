// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Embedded store backend on redb.
//!
//! The privileged backend, selected when a data directory is configured.
//! One table maps `"{collection}/{doc_id}"` to a JSON-encoded field map.
//! Collection scans are key-prefix ranges; filtering/sorting reuses the
//! shared query evaluator, so behavior matches the REST shim exactly.
//!
//! This backend additionally provides the native write transaction that
//! token redemption requires: the balance check, debit and redemption
//! record commit or abort together.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::query::Query;
use super::wire::{self, Fields};
use super::{Document, StoreError, StoreResult};
use crate::models::{collections, Redemption, User};

const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

const DB_FILE: &str = "documents.redb";

#[derive(Clone)]
pub struct EmbeddedStore {
    db: Arc<Database>,
}

fn db_err<E: Into<redb::Error>>(e: E) -> StoreError {
    StoreError::Database(e.into().to_string())
}

/// Composite key; `/` never appears in collection names.
fn storage_key(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

fn encode_doc(doc: &Document) -> StoreResult<Vec<u8>> {
    let map = wire::fields_to_json_map(&doc.fields);
    serde_json::to_vec(&serde_json::Value::Object(map)).map_err(|e| StoreError::Codec(e.to_string()))
}

fn decode_doc(id: &str, bytes: &[u8]) -> StoreResult<Document> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Codec(e.to_string()))?;
    let map = value
        .as_object()
        .ok_or_else(|| StoreError::Codec(format!("stored document {id} is not an object")))?;
    Ok(Document {
        id: id.to_string(),
        fields: wire::fields_from_json_map(map)?,
    })
}

impl EmbeddedStore {
    /// Open (or create) the database under the data directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| StoreError::Database(format!("create {}: {e}", data_dir.display())))?;

        let db = Database::create(data_dir.join(DB_FILE)).map_err(db_err)?;

        // Ensure the table exists so read transactions never race its
        // creation.
        let txn = db.begin_write().map_err(db_err)?;
        txn.open_table(DOCUMENTS).map_err(db_err)?;
        txn.commit().map_err(db_err)?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn get_doc(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(DOCUMENTS).map_err(db_err)?;
        let key = storage_key(collection, id);
        match table.get(key.as_str()).map_err(db_err)? {
            Some(guard) => Ok(Some(decode_doc(id, guard.value())?)),
            None => Ok(None),
        }
    }

    /// Existence-guarded create.
    pub fn set_doc(&self, collection: &str, doc: &Document) -> StoreResult<()> {
        let bytes = encode_doc(doc)?;
        let key = storage_key(collection, &doc.id);

        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(DOCUMENTS).map_err(db_err)?;
            if table.get(key.as_str()).map_err(db_err)?.is_some() {
                return Err(StoreError::AlreadyExists(key));
            }
            table.insert(key.as_str(), bytes.as_slice()).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    /// Field merge; fails with `NotFound` when the document is absent.
    pub fn update_doc(&self, collection: &str, id: &str, fields: &Fields) -> StoreResult<()> {
        let key = storage_key(collection, id);

        let txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = txn.open_table(DOCUMENTS).map_err(db_err)?;
            let mut doc = match table.get(key.as_str()).map_err(db_err)? {
                Some(guard) => decode_doc(id, guard.value())?,
                None => return Err(StoreError::NotFound(key)),
            };
            for (name, value) in fields {
                doc.fields.insert(name.clone(), value.clone());
            }
            let bytes = encode_doc(&doc)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(db_err)?;
        }
        txn.commit().map_err(db_err)?;
        Ok(())
    }

    /// Create with a generated ID; returns it.
    pub fn add_doc(&self, collection: &str, fields: Fields) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.set_doc(
            collection,
            &Document {
                id: id.clone(),
                fields,
            },
        )?;
        Ok(id)
    }

    /// Prefix-scan the collection, then evaluate the query in memory.
    pub fn run_query(&self, collection: &str, query: &Query) -> StoreResult<Vec<Document>> {
        let txn = self.db.begin_read().map_err(db_err)?;
        let table = txn.open_table(DOCUMENTS).map_err(db_err)?;

        let start = format!("{collection}/");
        // '0' is the successor byte of '/', closing the prefix range.
        let end = format!("{collection}0");

        let mut docs = Vec::new();
        for entry in table.range(start.as_str()..end.as_str()).map_err(db_err)? {
            let (key, value) = entry.map_err(db_err)?;
            let id = key
                .value()
                .split_once('/')
                .map(|(_, id)| id.to_string())
                .unwrap_or_else(|| key.value().to_string());
            docs.push(decode_doc(&id, value.value())?);
        }

        Ok(query.apply(docs))
    }

    /// Atomic check-then-debit plus redemption record.
    ///
    /// The balance check and both writes share one write transaction:
    /// an overdraw or a duplicate redemption ID aborts everything.
    pub fn debit_tokens(
        &self,
        user_key: &str,
        cost: f64,
        redemption: &Redemption,
    ) -> StoreResult<User> {
        let user_storage_key = storage_key(collections::USERS, user_key);
        let redemption_storage_key = storage_key(collections::REDEMPTIONS, &redemption.id);

        let txn = self.db.begin_write().map_err(db_err)?;
        let updated: User;
        {
            let mut table = txn.open_table(DOCUMENTS).map_err(db_err)?;

            let mut user: User = match table.get(user_storage_key.as_str()).map_err(db_err)? {
                Some(guard) => decode_doc(user_key, guard.value())?.deserialize()?,
                None => return Err(StoreError::NotFound(user_storage_key)),
            };

            let available = user.tokens_available();
            if available < cost {
                return Err(StoreError::InsufficientBalance {
                    available,
                    requested: cost,
                });
            }

            if table
                .get(redemption_storage_key.as_str())
                .map_err(db_err)?
                .is_some()
            {
                return Err(StoreError::AlreadyExists(redemption_storage_key));
            }

            user.tokens_spent += cost;

            let user_bytes = encode_doc(&Document::from_serializable(user_key, &user)?)?;
            table
                .insert(user_storage_key.as_str(), user_bytes.as_slice())
                .map_err(db_err)?;

            let redemption_bytes =
                encode_doc(&Document::from_serializable(&redemption.id, redemption)?)?;
            table
                .insert(redemption_storage_key.as_str(), redemption_bytes.as_slice())
                .map_err(db_err)?;

            updated = user;
        }
        txn.commit().map_err(db_err)?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::auth::Role;
    use crate::store::query::{Direction, Filter, Op};
    use crate::store::wire::FieldValue;

    fn test_store() -> (EmbeddedStore, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let store = EmbeddedStore::open(dir.path()).expect("open store");
        (store, dir)
    }

    fn fields_with(field: &str, value: FieldValue) -> Fields {
        let mut fields = Fields::new();
        fields.insert(field.to_string(), value);
        fields
    }

    fn test_user(key: &str, earned: f64, spent: f64) -> User {
        User {
            key: key.to_string(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            wallet_address: None,
            role: Role::User,
            total_weight_kg: 0.0,
            tokens_earned: earned,
            tokens_spent: spent,
            password_salt: "salt".into(),
            password_hash: "hash".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let (store, _dir) = test_store();
        let doc = Document {
            id: "d1".into(),
            fields: fields_with("a", FieldValue::Int(1)),
        };
        store.set_doc("things", &doc).unwrap();

        let loaded = store.get_doc("things", "d1").unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn get_missing_returns_none_not_error() {
        let (store, _dir) = test_store();
        assert!(store.get_doc("things", "ghost").unwrap().is_none());
    }

    #[test]
    fn set_on_existing_id_fails() {
        let (store, _dir) = test_store();
        let doc = Document {
            id: "d1".into(),
            fields: fields_with("a", FieldValue::Int(1)),
        };
        store.set_doc("things", &doc).unwrap();
        let err = store.set_doc("things", &doc).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn update_merges_without_clobbering() {
        let (store, _dir) = test_store();
        let mut fields = fields_with("a", FieldValue::Int(1));
        fields.insert("b".into(), FieldValue::Str("keep".into()));
        store
            .set_doc("things", &Document { id: "d1".into(), fields })
            .unwrap();

        store
            .update_doc("things", "d1", &fields_with("a", FieldValue::Int(9)))
            .unwrap();

        let loaded = store.get_doc("things", "d1").unwrap().unwrap();
        assert_eq!(loaded.fields["a"], FieldValue::Int(9));
        assert_eq!(loaded.fields["b"], FieldValue::Str("keep".into()));
    }

    #[test]
    fn update_missing_fails() {
        let (store, _dir) = test_store();
        let err = store
            .update_doc("things", "ghost", &fields_with("a", FieldValue::Int(1)))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn add_assigns_distinct_ids() {
        let (store, _dir) = test_store();
        let id1 = store
            .add_doc("things", fields_with("a", FieldValue::Int(1)))
            .unwrap();
        let id2 = store
            .add_doc("things", fields_with("a", FieldValue::Int(2)))
            .unwrap();
        assert_ne!(id1, id2);
        assert!(store.get_doc("things", &id1).unwrap().is_some());
    }

    #[test]
    fn query_filters_sorts_and_limits() {
        let (store, _dir) = test_store();
        for (id, a) in [("one", 1), ("two", 2), ("three", 3)] {
            store
                .set_doc(
                    "things",
                    &Document {
                        id: id.into(),
                        fields: fields_with("a", FieldValue::Int(a)),
                    },
                )
                .unwrap();
        }

        let query = Query {
            filters: vec![Filter {
                field: "a".into(),
                op: Op::Gt,
                value: FieldValue::Int(1),
            }],
            sort: Some(("a".into(), Direction::Desc)),
            limit: Some(1),
        };
        let result = store.run_query("things", &query).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].fields["a"], FieldValue::Int(3));
    }

    #[test]
    fn query_scopes_to_the_collection_prefix() {
        let (store, _dir) = test_store();
        store
            .set_doc(
                "things",
                &Document {
                    id: "x".into(),
                    fields: fields_with("a", FieldValue::Int(1)),
                },
            )
            .unwrap();
        // "thingsmore" shares the string prefix but not the collection.
        store
            .set_doc(
                "thingsmore",
                &Document {
                    id: "y".into(),
                    fields: fields_with("a", FieldValue::Int(2)),
                },
            )
            .unwrap();

        let result = store.run_query("things", &Query::default()).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "x");
    }

    #[test]
    fn debit_tokens_spends_and_records_atomically() {
        let (store, _dir) = test_store();
        let user = test_user("u1", 100.0, 10.0);
        store
            .set_doc(
                collections::USERS,
                &Document::from_serializable("u1", &user).unwrap(),
            )
            .unwrap();

        let redemption = Redemption {
            id: "r1".into(),
            user_key: "u1".into(),
            reward_id: "tree".into(),
            reward_title: "Plant a tree".into(),
            cost_tokens: 30.0,
            created_at: Utc::now(),
        };

        let updated = store.debit_tokens("u1", 30.0, &redemption).unwrap();
        assert_eq!(updated.tokens_spent, 40.0);

        let stored: User = store
            .get_doc(collections::USERS, "u1")
            .unwrap()
            .unwrap()
            .deserialize()
            .unwrap();
        assert_eq!(stored.tokens_spent, 40.0);
        assert!(store
            .get_doc(collections::REDEMPTIONS, "r1")
            .unwrap()
            .is_some());
    }

    #[test]
    fn debit_tokens_overdraw_leaves_everything_untouched() {
        let (store, _dir) = test_store();
        let user = test_user("u1", 20.0, 0.0);
        store
            .set_doc(
                collections::USERS,
                &Document::from_serializable("u1", &user).unwrap(),
            )
            .unwrap();

        let redemption = Redemption {
            id: "r1".into(),
            user_key: "u1".into(),
            reward_id: "tree".into(),
            reward_title: "Plant a tree".into(),
            cost_tokens: 50.0,
            created_at: Utc::now(),
        };

        let err = store.debit_tokens("u1", 50.0, &redemption).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientBalance { .. }));

        let stored: User = store
            .get_doc(collections::USERS, "u1")
            .unwrap()
            .unwrap()
            .deserialize()
            .unwrap();
        assert_eq!(stored.tokens_spent, 0.0);
        assert!(store
            .get_doc(collections::REDEMPTIONS, "r1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn reopening_preserves_documents() {
        let dir = TempDir::new().unwrap();
        {
            let store = EmbeddedStore::open(dir.path()).unwrap();
            store
                .set_doc(
                    "things",
                    &Document {
                        id: "persisted".into(),
                        fields: fields_with("a", FieldValue::Int(1)),
                    },
                )
                .unwrap();
        }
        let store = EmbeddedStore::open(dir.path()).unwrap();
        assert!(store.get_doc("things", "persisted").unwrap().is_some());
    }
}
