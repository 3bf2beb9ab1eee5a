//! Transform rule kinds: rename/link and materialize.
//!
//! A rename emits one statement per computed relationship reusing (or
//! deriving) a target value. A materialize mints or folds a new resource
//! via the identity generator, links it to the anchor, and — on first
//! encounter only — emits its type, its attribute links, and raw-subfield
//! provenance statements. Folded resources get relationship links only.

use std::collections::HashSet;

use log::warn;

use super::context::Context;
use super::expr::{coerce_url, eval, Expr, ExprError};
use crate::idgen::IdentityGenerator;
use crate::statement::{Statement, StatementStore, Target};
use crate::vocab::{self, absolutize, attrs, MARCEXT};

/// Which record-level resource a rule anchors its statements on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The record's Work.
    Work,
    /// The record's primary Instance (Work before any Instance exists).
    Instance,
}

/// Mutable conversion state threaded through rule application.
#[derive(Debug)]
pub struct RuleState<'a> {
    /// The accumulating output store.
    pub store: &'a mut StatementStore,
    /// The identity generator.
    pub idgen: &'a mut IdentityGenerator,
    /// Identifiers whose type/attribute statements have been emitted.
    pub existing_ids: &'a mut HashSet<String>,
    /// Resources materialized while processing the current record,
    /// as (id, type IRI) pairs, for plugin notification.
    pub materialized: &'a mut Vec<(String, String)>,
    /// Re-splice attribute statements into original subfield order.
    pub preserve_order: bool,
}

/// An attribute link inside a materialize rule.
#[derive(Debug, Clone)]
pub enum Link {
    /// A plain property: relationship expression plus value expression.
    Prop {
        /// Relationship name expression.
        rel: Expr,
        /// Target value expression.
        value: Expr,
    },
    /// A nested materialization with the new resource as anchor.
    Nested(Box<Materialize>),
}

/// A materialize rule: mint or fold a resource and describe it.
#[derive(Debug, Clone)]
pub struct Materialize {
    /// Anchor the relationship statement(s) originate from.
    pub anchor: Anchor,
    /// Resource type expression; falsy suppresses the type statement only.
    pub typ: Expr,
    /// Relationship name expression (may yield several names).
    pub rel: Expr,
    /// Ordered (predicate, value expression) uniqueness spec; pairs whose
    /// value is absent are skipped.
    pub unique: Vec<(String, Expr)>,
    /// Attribute links emitted from the new resource on first encounter.
    pub links: Vec<Link>,
    /// Optional origin-derivation expression overriding the anchor.
    pub origin_override: Option<Expr>,
}

/// A transform rule: one variant per rule kind.
#[derive(Debug, Clone)]
pub enum TransformRule {
    /// Emit one statement per relationship, reusing or deriving the target.
    Rename {
        /// Anchor the statement originates from.
        anchor: Anchor,
        /// Relationship name expression.
        rel: Expr,
        /// Optional target derivation; default is the dispatched
        /// subfield value(s).
        target: Option<Expr>,
        /// Coerce the target into a resource reference; failed coercion
        /// drops the statement with a warning.
        res: bool,
    },
    /// Mint or fold a resource (see [`Materialize`]).
    Materialize(Materialize),
}

impl TransformRule {
    /// Returns the rule's anchor.
    #[must_use]
    pub const fn anchor(&self) -> Anchor {
        match self {
            TransformRule::Rename { anchor, .. } => *anchor,
            TransformRule::Materialize(m) => m.anchor,
        }
    }
}

/// Resolves an anchor to a resource id against the record's ambient state.
#[must_use]
pub fn anchor_id<'a>(anchor: Anchor, ctx: &'a Context<'_>) -> &'a str {
    match anchor {
        Anchor::Work => &ctx.extras.work_id,
        Anchor::Instance => ctx
            .extras
            .instance_ids
            .first()
            .map_or(ctx.extras.work_id.as_str(), String::as_str),
    }
}

/// Applies a rule to the current field.
///
/// # Errors
///
/// Propagates [`ExprError::Abort`] and per-field [`ExprError::Failed`].
pub fn apply_rule(
    rule: &TransformRule,
    ctx: &Context<'_>,
    state: &mut RuleState<'_>,
) -> Result<(), ExprError> {
    let ctx = ctx.with_origin(anchor_id(rule.anchor(), ctx));
    match rule {
        TransformRule::Rename {
            rel, target, res, ..
        } => apply_rename(rel, target.as_ref(), *res, &ctx, state),
        TransformRule::Materialize(m) => apply_materialize(m, &ctx, state).map(|_| ()),
    }
}

fn apply_rename(
    rel: &Expr,
    target: Option<&Expr>,
    res: bool,
    ctx: &Context<'_>,
    state: &mut RuleState<'_>,
) -> Result<(), ExprError> {
    let rels = eval(rel, ctx)?.into_texts();
    let targets: Vec<String> = match target {
        Some(expr) => eval(expr, ctx)?.into_texts(),
        None => default_targets(ctx),
    };

    for rel_name in &rels {
        let rel_iri = absolutize(ctx.base, rel_name);
        for value in &targets {
            let target = if res {
                match coerce_url(value, None) {
                    Some(iri) => Target::Link(iri),
                    None => {
                        warn!("dropping {rel_iri} statement: {value:?} is not a resource reference");
                        continue;
                    }
                }
            } else {
                Target::Text(value.clone())
            };
            let mut stmt = Statement::new(&ctx.origin, rel_iri.clone(), target);
            stmt.attrs
                .insert(attrs::SOURCE_TAG.to_string(), ctx.field.tag.clone());
            if let Target::Link(_) = stmt.target {
                stmt.attrs
                    .insert(attrs::TARGET_TYPE.to_string(), attrs::IRI_REF.to_string());
            }
            state.store.add(stmt);
        }
    }
    Ok(())
}

/// Applies a materialize rule, returning the resource id when one was
/// minted or folded.
pub fn apply_materialize(
    rule: &Materialize,
    ctx: &Context<'_>,
    state: &mut RuleState<'_>,
) -> Result<Option<String>, ExprError> {
    let origin = match &rule.origin_override {
        Some(expr) => match eval(expr, ctx)?.into_texts().into_iter().next() {
            Some(o) => o,
            None => ctx.origin.clone(),
        },
        None => ctx.origin.clone(),
    };

    let type_names = eval(&rule.typ, ctx)?.into_texts();
    let rels = eval(&rule.rel, ctx)?.into_texts();

    // uniqueness key: ordered (predicate, value) pairs, absent values skipped
    let mut identity: Vec<(String, String)> = Vec::new();
    for (pred, expr) in &rule.unique {
        let pred_iri = absolutize(ctx.base, pred);
        for value in eval(expr, ctx)?.into_texts() {
            identity.push((pred_iri.clone(), value));
        }
    }

    let hash_type = type_names
        .first()
        .map_or_else(String::new, |t| absolutize(ctx.base, t));
    let (rid, first_seen) = state.idgen.next_id(&hash_type, &identity);

    for rel_name in &rels {
        let stmt = Statement::new(
            &origin,
            absolutize(ctx.base, rel_name),
            Target::Link(rid.clone()),
        )
        .with_attr(attrs::TARGET_TYPE, attrs::IRI_REF)
        .with_attr(attrs::SOURCE_TAG, ctx.field.tag.clone());
        state.store.add(stmt);
    }

    if !first_seen || state.existing_ids.contains(&rid) {
        // fold: relationship links only, no duplicate type/attributes
        return Ok(Some(rid));
    }
    state.existing_ids.insert(rid.clone());

    if let Some(first_type) = type_names.first() {
        state
            .materialized
            .push((rid.clone(), absolutize(ctx.base, first_type)));
    }

    let mut buffer: Vec<Statement> = Vec::new();
    for name in &type_names {
        buffer.push(
            Statement::new(
                &rid,
                absolutize(ctx.base, vocab::properties::TYPE),
                Target::Link(absolutize(ctx.base, name)),
            )
            .with_attr(attrs::TARGET_TYPE, attrs::IRI_REF),
        );
    }

    let sub_ctx = ctx.with_origin(&rid);
    for link in &rule.links {
        match link {
            Link::Prop { rel, value } => {
                let rels = eval(rel, &sub_ctx)?.into_texts();
                let values = eval(value, &sub_ctx)?.into_texts();
                for rel_name in &rels {
                    let rel_iri = absolutize(ctx.base, rel_name);
                    for v in &values {
                        buffer.push(Statement::new(&rid, rel_iri.clone(), Target::Text(v.clone())));
                    }
                }
            }
            Link::Nested(nested) => {
                // recursive materialization from the new resource; its own
                // statements are emitted directly, not order-spliced
                apply_materialize(nested, &sub_ctx, state)?;
            }
        }
    }

    // raw-subfield provenance so no source content is silently lost
    for sf in &ctx.field.subfields {
        buffer.push(
            Statement::new(
                &rid,
                format!("{MARCEXT}sf-{}", sf.code),
                Target::Text(sf.value.clone()),
            )
            .with_attr(attrs::SOURCE_TAG, ctx.field.tag.clone()),
        );
    }

    if state.preserve_order {
        splice_in_subfield_order(&mut buffer, ctx);
    }
    for stmt in buffer {
        state.store.add(stmt);
    }

    Ok(Some(rid))
}

/// When the field itself is the target source, a rename uses the dispatched
/// subfield's values, or every subfield value in document order for
/// whole-field dispatch.
fn default_targets(ctx: &Context<'_>) -> Vec<String> {
    match ctx.subfield {
        Some(code) => ctx
            .field
            .subfield_values(code)
            .into_iter()
            .map(String::from)
            .collect(),
        None => ctx.field.subfields.iter().map(|sf| sf.value.clone()).collect(),
    }
}

/// Re-splices buffered attribute statements into original subfield order:
/// each statement is keyed by the position of the first subfield carrying
/// its target text (statements with no matching subfield sort last, stably).
fn splice_in_subfield_order(buffer: &mut [Statement], ctx: &Context<'_>) {
    let type_rel = absolutize(ctx.base, vocab::properties::TYPE);
    let position = |stmt: &Statement| -> usize {
        if stmt.relationship == type_rel {
            return 0;
        }
        stmt.target
            .as_str()
            .and_then(|text| ctx.field.subfields.iter().position(|sf| sf.value == text))
            .unwrap_or(usize::MAX)
    };
    buffer.sort_by_key(position);
}
