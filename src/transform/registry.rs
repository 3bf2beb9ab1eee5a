//! Transform-set registry and phase resolution.
//!
//! Rule tables are registered under transform-set IRIs on an explicit
//! [`TransformRegistry`] owned by the application (no import-time global
//! state). A configuration names the sets to merge per phase;
//! [`TransformRegistry::resolve`] produces the [`CompiledTransforms`] the
//! transducer dispatches against. When two sets carry rules for the same
//! key, the rules accumulate in registration order rather than replacing
//! each other.

use indexmap::IndexMap;

use super::rules::TransformRule;
use crate::error::{Marc2BfError, Result};
use crate::record::DataField;

/// Processing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Optional first pass resolving the resource being described.
    Bootstrap,
    /// Default per-field processing.
    Main,
}

/// A rule table: field-selector key → rules applied in order.
///
/// Key forms: `"650"` (whole field), `"650$a"` (per subfield),
/// `"856-40$u"` (indicator-qualified, blank indicator written `#`).
pub type RuleTable = IndexMap<String, Vec<TransformRule>>;

/// Declared hash-input ordering for bootstrap-phase resources:
/// produced type name → ordered relationship IRIs.
pub type HashOrdering = IndexMap<String, Vec<String>>;

/// Which transform sets apply per phase.
#[derive(Debug, Clone)]
pub enum TransformsSpec {
    /// Merged-list shortcut: the sets apply to the main phase only and the
    /// bootstrap phase uses the registry's default.
    List(Vec<String>),
    /// Explicit per-phase set lists.
    Phased {
        /// Sets merged for the bootstrap phase; empty means the default.
        bootstrap: Vec<String>,
        /// Sets merged for the main phase.
        main: Vec<String>,
    },
}

/// The merged, phase-scoped rule tables the transducer runs against.
#[derive(Debug, Clone)]
pub struct CompiledTransforms {
    bootstrap: RuleTable,
    main: RuleTable,
    ordering: HashOrdering,
}

impl CompiledTransforms {
    /// The merged bootstrap-phase table.
    #[must_use]
    pub fn table(&self, phase: Phase) -> &RuleTable {
        match phase {
            Phase::Bootstrap => &self.bootstrap,
            Phase::Main => &self.main,
        }
    }

    /// The declared bootstrap hash-input ordering for a type, if any.
    #[must_use]
    pub fn ordering_for(&self, type_name: &str) -> Option<&[String]> {
        self.ordering.get(type_name).map(Vec::as_slice)
    }

    /// Gathers every rule matching a field within a phase (union dispatch).
    ///
    /// Returns `(matched subfield code, rule)` pairs: the code is `Some`
    /// for per-subfield keys and `None` for whole-field keys. Precedence
    /// within subfield dispatch: an indicator-qualified `tag-XY$c` key
    /// (tried when the indicators are not both blank) shadows the plain
    /// `tag$c` key; the whole-field `tag` and `tag-XY` keys are checked
    /// independently and their rules also fire.
    #[must_use]
    pub fn rules_for<'t>(
        &'t self,
        phase: Phase,
        field: &DataField,
    ) -> Vec<(Option<char>, &'t TransformRule)> {
        let table = self.table(phase);
        let mut matched = Vec::new();

        let ind_key = indicator_key(field);

        // whole-field keys, plain and indicator-qualified
        if let Some(rules) = table.get(field.tag.as_str()) {
            matched.extend(rules.iter().map(|r| (None, r)));
        }
        if let Some(key) = &ind_key {
            if let Some(rules) = table.get(key.as_str()) {
                matched.extend(rules.iter().map(|r| (None, r)));
            }
        }

        // per-subfield keys, one dispatch per distinct code
        let mut seen_codes = Vec::new();
        for sf in &field.subfields {
            if seen_codes.contains(&sf.code) {
                continue;
            }
            seen_codes.push(sf.code);

            let qualified = ind_key.as_ref().map(|k| format!("{k}${}", sf.code));
            let plain = format!("{}${}", field.tag, sf.code);
            let rules = qualified
                .as_deref()
                .and_then(|k| table.get(k))
                .or_else(|| table.get(plain.as_str()));
            if let Some(rules) = rules {
                matched.extend(rules.iter().map(|r| (Some(sf.code), r)));
            }
        }

        matched
    }
}

fn indicator_key(field: &DataField) -> Option<String> {
    if field.indicators_blank() {
        return None;
    }
    let norm = |c: char| if c == ' ' { '#' } else { c };
    Some(format!(
        "{}-{}{}",
        field.tag,
        norm(field.indicator1),
        norm(field.indicator2)
    ))
}

/// An explicit registry of named transform sets.
#[derive(Debug, Default)]
pub struct TransformRegistry {
    sets: IndexMap<String, RuleTable>,
    orderings: IndexMap<String, HashOrdering>,
    default_bootstrap: Option<String>,
}

impl TransformRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        TransformRegistry::default()
    }

    /// Registers a rule table under a transform-set IRI.
    ///
    /// `ordering` constrains how bootstrap-phase identity hash inputs are
    /// ordered for resources of each listed type; without it, hash
    /// stability across runs for bootstrap targets is not guaranteed, so
    /// supplying one is strongly recommended for bootstrap sets.
    pub fn register(
        &mut self,
        set_iri: impl Into<String>,
        table: RuleTable,
        ordering: Option<HashOrdering>,
    ) {
        let iri = set_iri.into();
        if let Some(ordering) = ordering {
            self.orderings.insert(iri.clone(), ordering);
        }
        self.sets.insert(iri, table);
    }

    /// Marks a registered set as the bootstrap default used when a
    /// configuration specifies no bootstrap sets.
    pub fn set_default_bootstrap(&mut self, set_iri: impl Into<String>) {
        self.default_bootstrap = Some(set_iri.into());
    }

    /// Returns true if a set is registered under the IRI.
    #[must_use]
    pub fn has_set(&self, set_iri: &str) -> bool {
        self.sets.contains_key(set_iri)
    }

    /// Merges the named sets per phase into a compiled transform set.
    ///
    /// # Errors
    ///
    /// Returns [`Marc2BfError::UnknownTransformSet`] for an unregistered
    /// IRI (fail fast, before any record is processed).
    pub fn resolve(&self, spec: &TransformsSpec) -> Result<CompiledTransforms> {
        let (bootstrap_iris, main_iris) = match spec {
            TransformsSpec::List(main) => (Vec::new(), main.clone()),
            TransformsSpec::Phased { bootstrap, main } => (bootstrap.clone(), main.clone()),
        };

        let bootstrap_iris = if bootstrap_iris.is_empty() {
            self.default_bootstrap.iter().cloned().collect()
        } else {
            bootstrap_iris
        };

        Ok(CompiledTransforms {
            bootstrap: self.merge_tables(&bootstrap_iris)?,
            main: self.merge_tables(&main_iris)?,
            ordering: self.merge_orderings(&bootstrap_iris),
        })
    }

    fn merge_tables(&self, iris: &[String]) -> Result<RuleTable> {
        let mut merged = RuleTable::new();
        for iri in iris {
            let table = self
                .sets
                .get(iri)
                .ok_or_else(|| Marc2BfError::UnknownTransformSet(iri.clone()))?;
            for (key, rules) in table {
                merged
                    .entry(key.clone())
                    .or_default()
                    .extend(rules.iter().cloned());
            }
        }
        Ok(merged)
    }

    fn merge_orderings(&self, iris: &[String]) -> HashOrdering {
        let mut merged = HashOrdering::new();
        for iri in iris {
            if let Some(ordering) = self.orderings.get(iri) {
                for (type_name, rels) in ordering {
                    merged.insert(type_name.clone(), rels.clone());
                }
            }
        }
        merged
    }
}
