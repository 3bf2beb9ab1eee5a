//! The declarative transform subsystem.
//!
//! This module holds the rule interpreter that drives the conversion:
//!
//! - `context` — the per-field evaluation environment
//! - `expr` — the expression combinator language
//! - `rules` — the rename and materialize rule kinds
//! - `registry` — named transform sets, phase resolution, field dispatch
//! - `patterns` — the default MARC → BIBFRAME Lite rule tables
//!
//! Transform sets are plain data: a table mapping field-selector keys
//! (`"650"`, `"650$a"`, `"856-4#$u"`) to rules whose parts are [`expr::Expr`]
//! values evaluated against a [`context::Context`] at conversion time.

pub mod context;
pub mod expr;
pub mod patterns;
pub mod registry;
pub mod rules;

pub use context::{Context, Extras, LookupTables};
pub use expr::{Expr, ExprError, Value};
pub use registry::{CompiledTransforms, Phase, RuleTable, TransformRegistry, TransformsSpec};
pub use rules::{Anchor, Materialize, TransformRule};
