//! Versa statement model and the in-memory statement store.
//!
//! The conversion output is a multiset of 4-tuples
//! (origin, relationship, target, attributes). [`StatementStore`] is the
//! accumulating container the transducer writes into and the serialization
//! layer reads from, offering pattern matching, deletion by row id, and
//! bulk copy with origin rewrite (used for multi-ISBN instance duplication).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The target of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// A resource reference (an identifier minted by the identity generator
    /// or an absolute IRI).
    Link(String),
    /// A plain string value.
    Text(String),
    /// A numeric value.
    Number(i64),
}

impl Target {
    /// Returns the target as a string slice where possible.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Target::Link(s) | Target::Text(s) => Some(s),
            Target::Number(_) => None,
        }
    }

    /// Returns true if this target is a resource reference.
    #[must_use]
    pub const fn is_link(&self) -> bool {
        matches!(self, Target::Link(_))
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target::Text(s.to_string())
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Target::Text(s)
    }
}

/// A single graph statement: (origin, relationship, target, attributes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// The origin (subject) resource identifier.
    pub origin: String,
    /// The relationship (predicate) IRI.
    pub relationship: String,
    /// The target value.
    pub target: Target,
    /// Auxiliary attributes (target typing, source provenance).
    pub attrs: IndexMap<String, String>,
}

impl Statement {
    /// Creates a new statement with no attributes.
    #[must_use]
    pub fn new(
        origin: impl Into<String>,
        relationship: impl Into<String>,
        target: Target,
    ) -> Self {
        Statement {
            origin: origin.into(),
            relationship: relationship.into(),
            target,
            attrs: IndexMap::new(),
        }
    }

    /// Adds an attribute, consuming and returning the statement.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

/// An in-memory statement multiset.
///
/// Insertion order is preserved (some serializers depend on it); deleted
/// rows leave tombstones so row ids stay stable within a run.
#[derive(Debug, Clone, Default)]
pub struct StatementStore {
    rows: Vec<Option<Statement>>,
}

impl StatementStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        StatementStore::default()
    }

    /// Adds a statement, returning its row id.
    pub fn add(&mut self, stmt: Statement) -> usize {
        self.rows.push(Some(stmt));
        self.rows.len() - 1
    }

    /// Adds a statement from components with no attributes.
    pub fn add_parts(
        &mut self,
        origin: impl Into<String>,
        relationship: impl Into<String>,
        target: Target,
    ) -> usize {
        self.add(Statement::new(origin, relationship, target))
    }

    /// Returns all live statements whose non-`None` fields equal the query.
    #[must_use]
    pub fn match_stmts(
        &self,
        origin: Option<&str>,
        relationship: Option<&str>,
        target: Option<&Target>,
    ) -> Vec<&Statement> {
        self.iter()
            .map(|(_, stmt)| stmt)
            .filter(|s| origin.map_or(true, |o| s.origin == o))
            .filter(|s| relationship.map_or(true, |r| s.relationship == r))
            .filter(|s| target.map_or(true, |t| &s.target == t))
            .collect()
    }

    /// Deletes statements by row id; unknown ids are ignored.
    pub fn delete(&mut self, ids: &[usize]) {
        for &id in ids {
            if let Some(slot) = self.rows.get_mut(id) {
                *slot = None;
            }
        }
    }

    /// Total row count including tombstones; the next added statement gets
    /// this as its row id.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rolls the store back to a previously observed row count, discarding
    /// every statement added since.
    pub fn truncate_rows(&mut self, count: usize) {
        self.rows.truncate(count);
    }

    /// Iterates over live statements as (row id, statement) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Statement)> {
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|s| (id, s)))
    }

    /// Number of live statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.iter().filter(|s| s.is_some()).count()
    }

    /// Returns true if the store has no live statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies every statement whose origin is `from` to a new statement
    /// with origin `to`, preserving relationship, target, and attributes.
    ///
    /// Used for multi-ISBN records: descriptive statements attached to the
    /// first Instance are replicated onto each further Instance.
    pub fn copy_origin(&mut self, from: &str, to: &str) {
        let copies: Vec<Statement> = self
            .iter()
            .map(|(_, s)| s)
            .filter(|s| s.origin == from)
            .cloned()
            .map(|mut s| {
                s.origin = to.to_string();
                s
            })
            .collect();
        for stmt in copies {
            self.add(stmt);
        }
    }

    /// Returns true if the store contains a statement equal to the given
    /// (origin, relationship, target) triple, ignoring attributes.
    #[must_use]
    pub fn contains(&self, origin: &str, relationship: &str, target: &Target) -> bool {
        self.iter().any(|(_, s)| {
            s.origin == origin && s.relationship == relationship && &s.target == target
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_match() {
        let mut store = StatementStore::new();
        store.add_parts("w1", "http://bibfra.me/vocab/lite/title", "Arithmetic".into());
        store.add_parts("w1", "http://bibfra.me/vocab/lite/creator", Target::Link("a1".into()));
        store.add_parts("i1", "http://bibfra.me/vocab/lite/title", "Arithmetic".into());

        assert_eq!(store.match_stmts(Some("w1"), None, None).len(), 2);
        assert_eq!(
            store
                .match_stmts(None, Some("http://bibfra.me/vocab/lite/title"), None)
                .len(),
            2
        );
        let t = Target::Text("Arithmetic".into());
        assert_eq!(store.match_stmts(Some("i1"), None, Some(&t)).len(), 1);
    }

    #[test]
    fn test_delete_leaves_stable_ids() {
        let mut store = StatementStore::new();
        let id0 = store.add_parts("a", "r", "x".into());
        let id1 = store.add_parts("b", "r", "y".into());
        store.delete(&[id0]);

        assert_eq!(store.len(), 1);
        let rows: Vec<usize> = store.iter().map(|(id, _)| id).collect();
        assert_eq!(rows, vec![id1]);
    }

    #[test]
    fn test_copy_origin() {
        let mut store = StatementStore::new();
        store.add_parts("i1", "r1", "v1".into());
        store.add_parts("i1", "r2", "v2".into());
        store.add_parts("w1", "r3", "v3".into());

        store.copy_origin("i1", "i2");
        assert_eq!(store.match_stmts(Some("i2"), None, None).len(), 2);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_statement_attrs_preserved() {
        let stmt = Statement::new("w1", "r", "v".into()).with_attr("marc-tag", "245");
        assert_eq!(stmt.attrs.get("marc-tag").map(String::as_str), Some("245"));
    }
}
