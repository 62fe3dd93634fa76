// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! In-memory query evaluation shared by both store backends.
//!
//! A query applies, in order: predicate filters, a single-field stable
//! sort, and a result-count limit. Both backends materialize the candidate
//! documents first (the REST shim downloads the whole collection, the
//! embedded store scans a key prefix), so evaluation is identical.

use std::cmp::Ordering;

use super::wire::FieldValue;
use super::Document;

/// Comparison operators accepted by `where_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl std::str::FromStr for Op {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Op::Eq),
            "!=" => Ok(Op::Ne),
            "<" => Ok(Op::Lt),
            "<=" => Ok(Op::Le),
            ">" => Ok(Op::Gt),
            ">=" => Ok(Op::Ge),
            other => Err(format!("unknown operator: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: Op,
    pub value: FieldValue,
}

/// Accumulated query parameters. Built by the fluent builder in the store
/// module; terminal `get()` hands it to the backend.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub sort: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Evaluate filter, sort and limit over materialized documents.
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        docs.retain(|doc| self.filters.iter().all(|f| matches(doc, f)));

        if let Some((field, direction)) = &self.sort {
            // Vec::sort_by is stable; reversing the comparator (not the
            // result) keeps ties in insertion order for descending too.
            docs.sort_by(|a, b| {
                let ord = sort_value(a, field).compare(&sort_value(b, field));
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

/// Documents missing the filtered field never match, for any operator.
fn matches(doc: &Document, filter: &Filter) -> bool {
    let Some(value) = doc.fields.get(&filter.field) else {
        return false;
    };
    let ord = value.compare(&filter.value);
    match filter.op {
        Op::Eq => ord == Ordering::Equal,
        Op::Ne => ord != Ordering::Equal,
        Op::Lt => ord == Ordering::Less,
        Op::Le => ord != Ordering::Greater,
        Op::Gt => ord == Ordering::Greater,
        Op::Ge => ord != Ordering::Less,
    }
}

/// Missing sort fields order as null (first ascending, last descending).
fn sort_value<'a>(doc: &'a Document, field: &str) -> &'a FieldValue {
    doc.fields.get(field).unwrap_or(&FieldValue::Null)
}
