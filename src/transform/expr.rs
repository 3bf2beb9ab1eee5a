//! Expression combinators for transform rules.
//!
//! Every dynamic part of a rule (relationship names, target values,
//! uniqueness keys, resource types) is an [`Expr`]: a small sum type
//! evaluated against a [`Context`] by the single [`eval`] dispatcher.
//! Expressions are pure; all statement emission happens in rule
//! application, never during evaluation.

use indexmap::IndexMap;
use log::{debug, warn};

use super::context::Context;

/// A value produced by expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absent value; rules skip the corresponding item.
    None,
    /// A plain string.
    Text(String),
    /// A resource reference (absolute IRI or minted id).
    Link(String),
    /// A flat list of values.
    List(Vec<Value>),
    /// Ordered (subfield code, value) pairs.
    Pairs(Vec<(char, String)>),
    /// A boolean, from tests like `indicator()`.
    Bool(bool),
}

impl Value {
    /// Truthiness: `None`, `false`, empty text, and empty collections are
    /// falsy; everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Text(s) | Value::Link(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Pairs(pairs) => !pairs.is_empty(),
        }
    }

    /// Flattens the value into its text leaves, dropping `None`s.
    #[must_use]
    pub fn into_texts(self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_texts(&mut out);
        out
    }

    fn collect_texts(self, out: &mut Vec<String>) {
        match self {
            Value::None | Value::Bool(_) => {}
            Value::Text(s) | Value::Link(s) => out.push(s),
            Value::List(items) => {
                for item in items {
                    item.collect_texts(out);
                }
            }
            Value::Pairs(pairs) => {
                for (_, v) in pairs {
                    out.push(v);
                }
            }
        }
    }
}

/// Errors raised during expression evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    /// An `abort_on` expression matched: stop consuming input entirely.
    Abort,
    /// Evaluation failed; fatal for the current field only.
    Failed(String),
}

impl std::fmt::Display for ExprError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExprError::Abort => write!(f, "abort signaled"),
            ExprError::Failed(msg) => write!(f, "expression failed: {msg}"),
        }
    }
}

/// A transform expression.
///
/// Literals and computed forms are distinct variants, so rule tables are
/// plain data and evaluation needs no runtime type inspection.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A constant string.
    Literal(String),
    /// Flattens literals and nested expressions into one list.
    Values(Vec<Expr>),
    /// All values of one subfield code from the current field.
    Subfield(char),
    /// All (code, value) pairs of the current field, in document order.
    AllSubfields,
    /// Evaluate `test`; truthy yields `then`, otherwise `otherwise`
    /// (absent `otherwise` yields `None`, i.e. the item is omitted).
    IfExists {
        /// Condition expression.
        test: Box<Expr>,
        /// Result when the condition is truthy.
        then: Box<Expr>,
        /// Result when the condition is falsy.
        otherwise: Option<Box<Expr>>,
    },
    /// Map a computed value through an inline table; misses are dropped.
    LookupInline {
        /// The inline mapping table.
        table: IndexMap<String, String>,
        /// Expression producing the key(s).
        value: Box<Expr>,
    },
    /// Map a computed value through an externally registered table.
    Lookup {
        /// IRI of the registered table.
        table: String,
        /// Expression producing the key(s).
        value: Box<Expr>,
    },
    /// Slugify free text into a predicate IRI under `prefix` (used for
    /// MARC relator terms).
    RelatorProperty {
        /// Expression producing the free text.
        value: Box<Expr>,
        /// Namespace the slug is appended to.
        prefix: String,
    },
    /// Coerce a value into an absolute resource reference.
    Url {
        /// Expression producing the candidate value.
        value: Box<Expr>,
        /// Base joined with relative values, when given.
        base: Option<String>,
    },
    /// Tests the field's indicator pair against a two-character pattern
    /// where `?` matches any character (e.g. `"3?"`).
    Indicator(String),
    /// Evaluates `value`; when any produced text equals one of `matches`,
    /// signals a full stop of input processing.
    AbortOn {
        /// Expression producing the tested value(s).
        value: Box<Expr>,
        /// Values that trigger the stop.
        matches: Vec<String>,
    },
}

impl Expr {
    /// Shorthand for a literal expression.
    #[must_use]
    pub fn lit(s: impl Into<String>) -> Self {
        Expr::Literal(s.into())
    }

    /// Shorthand for a subfield expression.
    #[must_use]
    pub const fn sf(code: char) -> Self {
        Expr::Subfield(code)
    }
}

/// Evaluates an expression against a context.
///
/// # Errors
///
/// Returns [`ExprError::Abort`] when an `abort_on` matched, or
/// [`ExprError::Failed`] for conditions fatal to the current field.
pub fn eval(expr: &Expr, ctx: &Context<'_>) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(s) => Ok(Value::Text(s.clone())),

        Expr::Values(items) => {
            let mut out = Vec::new();
            for item in items {
                match eval(item, ctx)? {
                    Value::None => {}
                    Value::List(mut inner) => out.append(&mut inner),
                    v => out.push(v),
                }
            }
            if out.is_empty() {
                Ok(Value::None)
            } else {
                Ok(Value::List(out))
            }
        }

        Expr::Subfield(code) => {
            let values: Vec<Value> = ctx
                .field
                .subfield_values(*code)
                .into_iter()
                .map(|v| Value::Text(v.to_string()))
                .collect();
            if values.is_empty() {
                Ok(Value::None)
            } else {
                Ok(Value::List(values))
            }
        }

        Expr::AllSubfields => Ok(Value::Pairs(
            ctx.field
                .subfields
                .iter()
                .map(|sf| (sf.code, sf.value.clone()))
                .collect(),
        )),

        Expr::IfExists {
            test,
            then,
            otherwise,
        } => {
            if eval(test, ctx)?.is_truthy() {
                eval(then, ctx)
            } else if let Some(other) = otherwise {
                eval(other, ctx)
            } else {
                Ok(Value::None)
            }
        }

        Expr::LookupInline { table, value } => {
            let keys = eval(value, ctx)?.into_texts();
            Ok(map_through(&keys, |k| {
                table.get(k).cloned().or_else(|| {
                    debug!("inline lookup miss for {k:?}");
                    None
                })
            }))
        }

        Expr::Lookup { table, value } => {
            if !ctx.lookups.has_table(table) {
                debug!("lookup table {table} not registered; dropping");
                return Ok(Value::None);
            }
            let keys = eval(value, ctx)?.into_texts();
            Ok(map_through(&keys, |k| {
                ctx.lookups.get(table, k).map(String::from).or_else(|| {
                    debug!("lookup miss for {k:?} in {table}");
                    None
                })
            }))
        }

        Expr::RelatorProperty { value, prefix } => {
            let texts = eval(value, ctx)?.into_texts();
            let links: Vec<Value> = texts
                .iter()
                .filter_map(|t| {
                    let slug = relator_slug(t);
                    if slug.is_empty() {
                        None
                    } else {
                        Some(Value::Link(format!("{prefix}{slug}")))
                    }
                })
                .collect();
            if links.is_empty() {
                Ok(Value::None)
            } else {
                Ok(Value::List(links))
            }
        }

        Expr::Url { value, base } => {
            let texts = eval(value, ctx)?.into_texts();
            let links: Vec<Value> = texts
                .iter()
                .filter_map(|t| coerce_url(t, base.as_deref()).map(Value::Link))
                .collect();
            if links.is_empty() {
                Ok(Value::None)
            } else {
                Ok(Value::List(links))
            }
        }

        Expr::Indicator(pattern) => {
            let mut chars = pattern.chars();
            let (p1, p2) = (chars.next().unwrap_or('?'), chars.next().unwrap_or('?'));
            let matched = (p1 == '?' || p1 == ctx.field.indicator1)
                && (p2 == '?' || p2 == ctx.field.indicator2);
            Ok(Value::Bool(matched))
        }

        Expr::AbortOn { value, matches } => {
            let result = eval(value, ctx)?;
            let texts = result.clone().into_texts();
            if texts.iter().any(|t| matches.iter().any(|m| m == t)) {
                Err(ExprError::Abort)
            } else {
                Ok(result)
            }
        }
    }
}

fn map_through(keys: &[String], f: impl Fn(&str) -> Option<String>) -> Value {
    let mapped: Vec<Value> = keys.iter().filter_map(|k| f(k).map(Value::Text)).collect();
    if mapped.is_empty() {
        Value::None
    } else {
        Value::List(mapped)
    }
}

/// Slugifies relator free text into a predicate-name suffix: parenthetical
/// qualifiers are stripped, trailing punctuation dropped, words joined with
/// `-`, and remaining reserved characters percent-encoded.
#[must_use]
pub fn relator_slug(text: &str) -> String {
    let mut cleaned = String::new();
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => cleaned.push(c),
            _ => {}
        }
    }
    let cleaned = cleaned.trim().trim_end_matches(['.', ',', ';', ':']).trim();
    let joined = cleaned
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    percent_encode(&joined)
}

/// Percent-encodes characters outside the IRI-safe unreserved set plus `-`.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Coerces a value into an absolute resource reference.
///
/// Relative values are joined with `base` when given. An invalid candidate
/// is percent-encoded and retried once; a still-invalid result is dropped
/// with a warning.
pub(crate) fn coerce_url(value: &str, base: Option<&str>) -> Option<String> {
    let candidate = if value.contains("://") {
        value.to_string()
    } else if let Some(base) = base {
        format!("{}{}", base, value.trim_start_matches('/'))
    } else {
        value.to_string()
    };

    if is_valid_iri(&candidate) {
        return Some(candidate);
    }
    // recoverable fallback: encode the offending characters and retry
    let (prefix, rest) = match candidate.find("://") {
        Some(idx) => candidate.split_at(idx + 3),
        None => {
            warn!("cannot coerce {value:?} into a resource reference; dropping");
            return None;
        }
    };
    let encoded = format!("{prefix}{}", encode_iri_rest(rest));
    if is_valid_iri(&encoded) {
        Some(encoded)
    } else {
        warn!("cannot coerce {value:?} into a resource reference; dropping");
        None
    }
}

fn is_valid_iri(s: &str) -> bool {
    s.contains("://")
        && !s.chars().any(|c| {
            c.is_whitespace() || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`')
        })
}

fn encode_iri_rest(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_graphic() && !matches!(b, b'<' | b'>' | b'"' | b'{' | b'}' | b'|' | b'\\' | b'^' | b'`')
        {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
