//! Vocabulary namespace definitions and constants.
//!
//! This module defines the IRI namespaces used when emitting BIBFRAME-shaped
//! statements, following the BIBFRAME Lite vocabulary layering: the core
//! `lite` vocabulary for semantic properties, a `marc` vocabulary for
//! fixed-field specials, and a `marcext` vocabulary for verbatim
//! source-subfield provenance.

/// BIBFRAME Lite vocabulary namespace IRI (default `vocab-base-uri`).
pub const BFLITE: &str = "http://bibfra.me/vocab/lite/";

/// MARC specials vocabulary namespace IRI (default `marcspecials-vocab`).
///
/// Used for statements that carry fixed-field semantics (leader, 006/007/008
/// decodings, `tag-XXX` control-field statements).
pub const MARC: &str = "http://bibfra.me/vocab/marc/";

/// MARC extension vocabulary namespace IRI.
///
/// Used for raw-subfield provenance (`sf-a`, `sf-b`, ...) and for the
/// fallback predicates minted for fields no rule handles.
pub const MARCEXT: &str = "http://bibfra.me/vocab/marcext/";

/// LOC relators vocabulary namespace IRI.
pub const RELATORS: &str = "http://bibfra.me/vocab/relation/";

/// Statement attribute keys used in the Versa model.
pub mod attrs {
    /// Marks a target as a resource reference rather than a literal.
    pub const TARGET_TYPE: &str = "@target-type";
    /// Value of [`TARGET_TYPE`] for resource references.
    pub const IRI_REF: &str = "iri-ref";
    /// Provenance attribute naming the source MARC tag.
    pub const SOURCE_TAG: &str = "marc-tag";
}

/// Common resource type local names.
pub mod types {
    /// Work - the abstract intellectual content.
    pub const WORK: &str = "Work";
    /// Instance - a concrete manifestation of a Work.
    pub const INSTANCE: &str = "Instance";
    /// Collection - an aggregate described as one resource.
    pub const COLLECTION: &str = "Collection";
    /// Person agent type.
    pub const PERSON: &str = "Person";
    /// Organization agent type.
    pub const ORGANIZATION: &str = "Organization";
    /// Meeting agent type.
    pub const MEETING: &str = "Meeting";
    /// Topic concept type.
    pub const TOPIC: &str = "Topic";
    /// Place concept type.
    pub const PLACE: &str = "Place";
    /// Genre/form concept type.
    pub const FORM: &str = "Form";
    /// Publisher provider type.
    pub const PROVIDER_EVENT: &str = "ProviderEvent";

    // Leader-derived material categories
    /// Language material category.
    pub const LANGUAGE_MATERIAL: &str = "LanguageMaterial";
    /// Notated music category.
    pub const NOTATED_MUSIC: &str = "NotatedMusic";
    /// Cartographic material category.
    pub const CARTOGRAPHY: &str = "Cartography";
    /// Moving image category.
    pub const MOVING_IMAGE: &str = "MovingImage";
    /// Still image category.
    pub const STILL_IMAGE: &str = "StillImage";
    /// Non-musical audio category.
    pub const AUDIO: &str = "Audio";
    /// Musical audio category.
    pub const MUSICAL_AUDIO: &str = "MusicalAudio";
    /// Software/multimedia category.
    pub const SOFTWARE: &str = "Software";
    /// Kit category.
    pub const KIT: &str = "Kit";
    /// Mixed materials category.
    pub const MIXED_MATERIALS: &str = "MixedMaterials";
    /// Three-dimensional object category.
    pub const OBJECT: &str = "ThreeDimensionalObject";
}

/// Common property local names.
pub mod properties {
    /// rdf:type analogue for the statement model.
    pub const TYPE: &str = "type";
    /// Instance → Work linkage.
    pub const INSTANTIATES: &str = "instantiates";
    /// Title property.
    pub const TITLE: &str = "title";
    /// Creator relationship.
    pub const CREATOR: &str = "creator";
    /// Contributor relationship.
    pub const CONTRIBUTOR: &str = "contributor";
    /// Subject relationship.
    pub const SUBJECT: &str = "subject";
    /// Genre relationship.
    pub const GENRE: &str = "genre";
    /// Generic name property (agents, places, topics).
    pub const NAME: &str = "name";
    /// Date property.
    pub const DATE: &str = "date";
    /// Language property.
    pub const LANGUAGE: &str = "language";
    /// Link (URL) property.
    pub const LINK: &str = "link";
    /// ISBN identifier property.
    pub const ISBN: &str = "isbn";
    /// Audience property (008/22).
    pub const AUDIENCE: &str = "audience";
    /// Medium property (008/23).
    pub const MEDIUM: &str = "medium";
    /// Bootstrap-phase marker relating the resolved target to the record.
    pub const DESCRIBED_BY: &str = "described-by";
}

/// Absolutizes a local property or type name against a namespace base.
///
/// Names that already look absolute (contain a scheme separator) pass
/// through unchanged, so lookup tables may mix local and absolute names.
#[must_use]
pub fn absolutize(base: &str, name: &str) -> String {
    if name.contains("://") {
        name.to_string()
    } else {
        format!("{base}{name}")
    }
}
