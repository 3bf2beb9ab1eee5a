//! Conversion configuration.
//!
//! The configuration is an opaque structure handed in by the embedding
//! application (typically deserialized from JSON). It names the transform
//! sets per phase, external lookup tables, plugin activations, and the
//! vocabulary bases. Validation is fail-fast: unknown transform-set IRIs
//! and plugin ids are rejected before any record is processed.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Marc2BfError, Result};
use crate::transform::patterns::{BFLITE_TRANSFORMS, MARC_TRANSFORMS};
use crate::transform::{LookupTables, TransformsSpec};
use crate::vocab;

/// Scope of the `abort_on` full-stop signal in a multi-source run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbortScope {
    /// Stop consuming the current source, continue with the next.
    CurrentSource,
    /// Stop consuming all remaining sources.
    #[default]
    AllSources,
}

/// Activation entry for a plugin, by id plus plugin-specific options.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    /// The plugin's registered id.
    pub id: String,
    /// Plugin-specific options, passed through uninterpreted.
    #[serde(flatten)]
    pub options: IndexMap<String, serde_json::Value>,
}

/// Raw transform-set selection as it appears in configuration: either a
/// plain merged list (main phase only) or a per-phase map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTransforms {
    List(Vec<String>),
    Phased {
        #[serde(default)]
        bootstrap: Vec<String>,
        #[serde(default)]
        main: Vec<String>,
    },
}

/// Conversion configuration.
///
/// # Examples
///
/// ```ignore
/// use marc2bf::config::ConverterConfig;
///
/// let config: ConverterConfig = serde_json::from_str(r#"{
///     "transforms": ["http://bibfra.me/tool/marc2bf/transforms#bflite"],
///     "vocab-base-uri": "http://bibfra.me/vocab/lite/",
///     "record-limit": 1000
/// }"#)?;
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConverterConfig {
    /// Transform sets per phase; `None` means the default MARC+BFLite sets.
    transforms: Option<RawTransforms>,
    /// External lookup tables: table IRI → key/value map.
    pub lookups: IndexMap<String, IndexMap<String, String>>,
    /// Plugins to activate, in invocation order.
    pub plugins: Vec<PluginConfig>,
    /// Base IRI for absolutizing relationship and type names.
    pub vocab_base_uri: String,
    /// Base IRI for fixed-field special statements.
    pub marcspecials_vocab: String,
    /// Stop after this many records, when set.
    pub record_limit: Option<u64>,
    /// Scope of the `abort_on` signal.
    pub abort_scope: AbortScope,
    /// Re-splice materialized attribute statements into original subfield
    /// order.
    pub preserve_field_order: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            transforms: None,
            lookups: IndexMap::new(),
            plugins: Vec::new(),
            vocab_base_uri: vocab::BFLITE.to_string(),
            marcspecials_vocab: vocab::MARC.to_string(),
            record_limit: None,
            abort_scope: AbortScope::default(),
            preserve_field_order: false,
        }
    }
}

impl ConverterConfig {
    /// Parses a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Marc2BfError::ConfigError`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Marc2BfError::ConfigError(e.to_string()))
    }

    /// The transform-set selection, defaulting to the MARC+BFLite sets.
    #[must_use]
    pub fn transforms_spec(&self) -> TransformsSpec {
        match &self.transforms {
            None => TransformsSpec::List(vec![
                BFLITE_TRANSFORMS.to_string(),
                MARC_TRANSFORMS.to_string(),
            ]),
            Some(RawTransforms::List(list)) => TransformsSpec::List(list.clone()),
            Some(RawTransforms::Phased { bootstrap, main }) => TransformsSpec::Phased {
                bootstrap: bootstrap.clone(),
                main: main.clone(),
            },
        }
    }

    /// Builds the lookup-table handle for expression evaluation.
    #[must_use]
    pub fn lookup_tables(&self) -> LookupTables {
        let mut tables = LookupTables::new();
        for (iri, table) in &self.lookups {
            tables.register(iri.clone(), table.clone());
        }
        tables
    }
}
