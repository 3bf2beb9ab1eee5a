//! Default MARC → BIBFRAME Lite transform sets.
//!
//! Three sets are provided: the semantic `bflite` table, a `marc` table for
//! properties that only make sense in MARC terms (content/media types), and
//! the `workid` bootstrap table that accumulates the identity-defining
//! fields for the record's Work together with its declared hash-input
//! ordering. [`default_registry`] registers all three and marks `workid`
//! as the bootstrap default.

use indexmap::IndexMap;

use super::expr::Expr;
use super::registry::{HashOrdering, RuleTable, TransformRegistry};
use super::rules::{Anchor, Link, Materialize, TransformRule};
use crate::vocab::{properties, types, MARC, RELATORS};

/// IRI of the default semantic transform set.
pub const BFLITE_TRANSFORMS: &str = "http://bibfra.me/tool/marc2bf/transforms#bflite";

/// IRI of the MARC-specials transform set.
pub const MARC_TRANSFORMS: &str = "http://bibfra.me/tool/marc2bf/transforms#marc";

/// IRI of the Work-identity bootstrap transform set.
pub const WORKID_TRANSFORMS: &str = "http://bibfra.me/tool/marc2bf/transforms#workid";

fn rename(anchor: Anchor, rel: &str) -> TransformRule {
    TransformRule::Rename {
        anchor,
        rel: Expr::lit(rel),
        target: None,
        res: false,
    }
}

fn name_prop(code: char) -> Link {
    Link::Prop {
        rel: Expr::lit(properties::NAME),
        value: Expr::sf(code),
    }
}

fn date_prop(code: char) -> Link {
    Link::Prop {
        rel: Expr::lit(properties::DATE),
        value: Expr::sf(code),
    }
}

/// An agent materialization from a name field: `creator`/`contributor`
/// plus any relator-term predicates derived from $e.
fn agent(anchor: Anchor, type_name: &str, base_rel: &str, with_date: bool) -> TransformRule {
    let mut unique = vec![(properties::NAME.to_string(), Expr::sf('a'))];
    let mut links = vec![name_prop('a')];
    if with_date {
        unique.push((properties::DATE.to_string(), Expr::sf('d')));
        links.push(date_prop('d'));
    }
    TransformRule::Materialize(Materialize {
        anchor,
        typ: Expr::lit(type_name),
        rel: Expr::Values(vec![
            Expr::lit(base_rel),
            Expr::RelatorProperty {
                value: Box::new(Expr::sf('e')),
                prefix: RELATORS.to_string(),
            },
        ]),
        unique,
        links,
        origin_override: None,
    })
}

/// A concept materialization (subjects, genres).
fn concept(type_name: &str, rel: &str, subdivided: bool) -> TransformRule {
    let mut unique = vec![(properties::NAME.to_string(), Expr::sf('a'))];
    let mut links = vec![name_prop('a')];
    if subdivided {
        unique.push((format!("{MARC}subdivision"), Expr::sf('x')));
        links.push(Link::Prop {
            rel: Expr::lit(format!("{MARC}subdivision")),
            value: Expr::sf('x'),
        });
    }
    TransformRule::Materialize(Materialize {
        anchor: Anchor::Work,
        typ: Expr::lit(type_name),
        rel: Expr::lit(rel),
        unique,
        links,
        origin_override: None,
    })
}

/// Publication statement: a `ProviderEvent` with a nested `Place` and
/// agent `Organization`, exercising recursive materialization.
fn provision() -> TransformRule {
    TransformRule::Materialize(Materialize {
        anchor: Anchor::Instance,
        typ: Expr::lit(types::PROVIDER_EVENT),
        rel: Expr::lit("publication"),
        unique: vec![
            (properties::NAME.to_string(), Expr::sf('b')),
            (properties::DATE.to_string(), Expr::sf('c')),
            ("place".to_string(), Expr::sf('a')),
        ],
        links: vec![
            date_prop('c'),
            Link::Nested(Box::new(Materialize {
                anchor: Anchor::Instance,
                typ: Expr::lit(types::PLACE),
                rel: Expr::lit("place"),
                unique: vec![(properties::NAME.to_string(), Expr::sf('a'))],
                links: vec![name_prop('a')],
                origin_override: None,
            })),
            Link::Nested(Box::new(Materialize {
                anchor: Anchor::Instance,
                typ: Expr::lit(types::ORGANIZATION),
                rel: Expr::lit("agent"),
                unique: vec![(properties::NAME.to_string(), Expr::sf('b'))],
                links: vec![name_prop('b')],
                origin_override: None,
            })),
        ],
        origin_override: None,
    })
}

/// The default semantic (BIBFRAME Lite) rule table.
#[must_use]
pub fn bflite_table() -> RuleTable {
    let mut t = RuleTable::new();

    t.insert(
        "100".into(),
        vec![agent(Anchor::Work, types::PERSON, properties::CREATOR, true)],
    );
    t.insert(
        "110".into(),
        vec![agent(Anchor::Work, types::ORGANIZATION, properties::CREATOR, false)],
    );
    t.insert(
        "111".into(),
        vec![agent(Anchor::Work, types::MEETING, properties::CREATOR, true)],
    );

    t.insert(
        "245$a".into(),
        vec![
            rename(Anchor::Work, properties::TITLE),
            rename(Anchor::Instance, properties::TITLE),
        ],
    );
    t.insert(
        "245$b".into(),
        vec![rename(Anchor::Instance, &format!("{MARC}titleRemainder"))],
    );
    t.insert(
        "246$a".into(),
        vec![rename(Anchor::Work, &format!("{MARC}titleVariation"))],
    );
    t.insert(
        "250$a".into(),
        vec![rename(Anchor::Instance, &format!("{MARC}edition"))],
    );

    t.insert("260".into(), vec![provision()]);
    t.insert("264".into(), vec![provision()]);

    t.insert(
        "300$a".into(),
        vec![rename(Anchor::Instance, &format!("{MARC}extent"))],
    );
    t.insert(
        "500$a".into(),
        vec![rename(Anchor::Instance, &format!("{MARC}note"))],
    );
    t.insert(
        "520$a".into(),
        vec![rename(Anchor::Work, "description")],
    );

    t.insert(
        "600".into(),
        vec![TransformRule::Materialize(Materialize {
            anchor: Anchor::Work,
            typ: Expr::lit(types::PERSON),
            rel: Expr::lit(properties::SUBJECT),
            unique: vec![
                (properties::NAME.to_string(), Expr::sf('a')),
                (properties::DATE.to_string(), Expr::sf('d')),
            ],
            links: vec![name_prop('a'), date_prop('d')],
            origin_override: None,
        })],
    );
    t.insert(
        "610".into(),
        vec![TransformRule::Materialize(Materialize {
            anchor: Anchor::Work,
            typ: Expr::lit(types::ORGANIZATION),
            rel: Expr::lit(properties::SUBJECT),
            unique: vec![(properties::NAME.to_string(), Expr::sf('a'))],
            links: vec![name_prop('a')],
            origin_override: None,
        })],
    );
    t.insert(
        "650".into(),
        vec![concept(types::TOPIC, properties::SUBJECT, true)],
    );
    t.insert(
        "651".into(),
        vec![concept(types::PLACE, properties::SUBJECT, false)],
    );
    t.insert(
        "655".into(),
        vec![concept(types::FORM, properties::GENRE, false)],
    );

    t.insert(
        "700".into(),
        vec![agent(Anchor::Work, types::PERSON, properties::CONTRIBUTOR, true)],
    );
    t.insert(
        "710".into(),
        vec![agent(Anchor::Work, types::ORGANIZATION, properties::CONTRIBUTOR, false)],
    );
    t.insert(
        "711".into(),
        vec![agent(Anchor::Work, types::MEETING, properties::CONTRIBUTOR, true)],
    );

    t.insert(
        "856$u".into(),
        vec![TransformRule::Rename {
            anchor: Anchor::Instance,
            rel: Expr::lit(properties::LINK),
            target: None,
            res: true,
        }],
    );

    t
}

/// The MARC-specials rule table: RDA content/media type codes mapped
/// through inline lookup tables onto MARC-vocabulary predicates.
#[must_use]
pub fn marc_table() -> RuleTable {
    let mut t = RuleTable::new();

    let mut content_types = IndexMap::new();
    for (code, label) in [
        ("txt", "text"),
        ("prm", "performed-music"),
        ("snd", "sounds"),
        ("sti", "still-image"),
        ("tdi", "two-dimensional-moving-image"),
        ("ntm", "notated-music"),
        ("crd", "cartographic-dataset"),
        ("cri", "cartographic-image"),
        ("spw", "spoken-word"),
        ("cod", "computer-dataset"),
        ("cop", "computer-program"),
    ] {
        content_types.insert(code.to_string(), label.to_string());
    }
    t.insert(
        "336$b".into(),
        vec![TransformRule::Rename {
            anchor: Anchor::Instance,
            rel: Expr::lit(format!("{MARC}contentType")),
            target: Some(Expr::LookupInline {
                table: content_types,
                value: Box::new(Expr::sf('b')),
            }),
            res: false,
        }],
    );

    let mut media_types = IndexMap::new();
    for (code, label) in [
        ("c", "computer"),
        ("h", "microform"),
        ("n", "unmediated"),
        ("s", "audio"),
        ("v", "video"),
        ("g", "projected"),
        ("x", "other"),
    ] {
        media_types.insert(code.to_string(), label.to_string());
    }
    t.insert(
        "337$b".into(),
        vec![TransformRule::Rename {
            anchor: Anchor::Instance,
            rel: Expr::lit(format!("{MARC}mediaType")),
            target: Some(Expr::LookupInline {
                table: media_types,
                value: Box::new(Expr::sf('b')),
            }),
            res: false,
        }],
    );

    t
}

/// The Work-identity bootstrap table: each rule contributes one
/// (relationship, value) pair to the Work's identity data.
#[must_use]
pub fn workid_table() -> RuleTable {
    let mut t = RuleTable::new();
    for key in ["130$a", "240$a", "245$a", "245$b", "246$a", "830$a"] {
        t.insert(key.into(), vec![rename(Anchor::Work, properties::TITLE)]);
    }
    for key in ["100$a", "110$a", "111$a"] {
        t.insert(key.into(), vec![rename(Anchor::Work, properties::NAME)]);
    }
    t.insert("100$d".into(), vec![rename(Anchor::Work, properties::DATE)]);
    t
}

/// The declared hash-input ordering for bootstrap Work resources.
#[must_use]
pub fn workid_ordering() -> HashOrdering {
    let mut ordering = HashOrdering::new();
    ordering.insert(
        types::WORK.to_string(),
        vec![
            properties::TITLE.to_string(),
            properties::NAME.to_string(),
            properties::DATE.to_string(),
        ],
    );
    ordering
}

/// Builds a registry with the default transform sets registered and the
/// Work-identity set as the bootstrap default.
#[must_use]
pub fn default_registry() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry.register(BFLITE_TRANSFORMS, bflite_table(), None);
    registry.register(MARC_TRANSFORMS, marc_table(), None);
    registry.register(WORKID_TRANSFORMS, workid_table(), Some(workid_ordering()));
    registry.set_default_bootstrap(WORKID_TRANSFORMS);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DataField;
    use crate::transform::registry::{Phase, TransformsSpec};

    #[test]
    fn test_default_registry_resolves() {
        let registry = default_registry();
        let compiled = registry
            .resolve(&TransformsSpec::List(vec![
                BFLITE_TRANSFORMS.to_string(),
                MARC_TRANSFORMS.to_string(),
            ]))
            .unwrap();

        let f245 = DataField::builder("245", '1', '0').subfield('a', "X").build();
        assert_eq!(compiled.rules_for(Phase::Main, &f245).len(), 2);
        // bootstrap default picks up the workid table
        assert_eq!(compiled.rules_for(Phase::Bootstrap, &f245).len(), 1);
    }

    #[test]
    fn test_workid_ordering_declared() {
        let registry = default_registry();
        let compiled = registry
            .resolve(&TransformsSpec::List(vec![BFLITE_TRANSFORMS.to_string()]))
            .unwrap();
        let ordering = compiled.ordering_for("Work").unwrap();
        assert_eq!(ordering[0], "title");
    }
}
