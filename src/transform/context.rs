//! Per-field expression evaluation context.
//!
//! A [`Context`] is the environment an expression combinator sees: the
//! current field, the anchor resource the active rule will attach to, the
//! vocabulary base for absolutizing names, ambient record state (work and
//! instance ids), and the external lookup tables. Contexts are immutable;
//! rule application derives new contexts with the `with_*` builders rather
//! than mutating shared state, which keeps recursive materialization safe.

use indexmap::IndexMap;

use crate::record::DataField;

/// Externally registered lookup tables, keyed by table IRI.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    tables: IndexMap<String, IndexMap<String, String>>,
}

impl LookupTables {
    /// Creates an empty set of tables.
    #[must_use]
    pub fn new() -> Self {
        LookupTables::default()
    }

    /// Registers a table under an IRI, replacing any existing one.
    pub fn register(&mut self, iri: impl Into<String>, table: IndexMap<String, String>) {
        self.tables.insert(iri.into(), table);
    }

    /// Looks up a value in a named table.
    #[must_use]
    pub fn get(&self, table_iri: &str, key: &str) -> Option<&str> {
        self.tables
            .get(table_iri)
            .and_then(|t| t.get(key))
            .map(String::as_str)
    }

    /// Returns true if a table is registered under the IRI.
    #[must_use]
    pub fn has_table(&self, table_iri: &str) -> bool {
        self.tables.contains_key(table_iri)
    }
}

/// Ambient per-record values available to expressions and rules.
#[derive(Debug, Clone, Default)]
pub struct Extras {
    /// The record's resolved Work identifier.
    pub work_id: String,
    /// Instance identifiers generated for the record, first is primary.
    pub instance_ids: Vec<String>,
}

/// The per-field execution environment for expression evaluation.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    /// The field currently being processed.
    pub field: &'a DataField,
    /// The anchor resource id the active rule attaches statements to.
    pub origin: String,
    /// When dispatched via a `tag$code` key, the matched subfield code.
    pub subfield: Option<char>,
    /// Base IRI for absolutizing relationship and type names.
    pub base: &'a str,
    /// Ambient record state.
    pub extras: &'a Extras,
    /// External lookup tables.
    pub lookups: &'a LookupTables,
}

impl<'a> Context<'a> {
    /// Creates a context for a field anchored on `origin`.
    #[must_use]
    pub fn new(
        field: &'a DataField,
        origin: impl Into<String>,
        base: &'a str,
        extras: &'a Extras,
        lookups: &'a LookupTables,
    ) -> Self {
        Context {
            field,
            origin: origin.into(),
            subfield: None,
            base,
            extras,
            lookups,
        }
    }

    /// Derives a context with a different origin (used when a materialized
    /// resource becomes the origin for its own attribute statements).
    #[must_use]
    pub fn with_origin(&self, origin: impl Into<String>) -> Self {
        let mut ctx = self.clone();
        ctx.origin = origin.into();
        ctx
    }

    /// Derives a context scoped to one subfield code.
    #[must_use]
    pub fn with_subfield(&self, code: char) -> Self {
        let mut ctx = self.clone();
        ctx.subfield = Some(code);
        ctx
    }
}
