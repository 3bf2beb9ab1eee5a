//! Conversion plugins.
//!
//! Plugins observe the conversion at three points: after each record's
//! statements land ([`Plugin::on_record`], which may drop the record),
//! whenever a resource is materialized ([`Plugin::on_materialize`]), and
//! once after all input is consumed ([`Plugin::on_finalize`], which may
//! write into the store). Activation is by id through a
//! [`PluginRegistry`]; unknown ids are rejected before any record is
//! processed.

use indexmap::IndexMap;

use crate::config::PluginConfig;
use crate::error::{Marc2BfError, Result};
use crate::record::Record;
use crate::statement::{Statement, StatementStore, Target};
use crate::vocab::BFLITE;

/// Well-known id of the [`Labelizer`] plugin.
pub const LABELIZER_ID: &str = "http://bibfra.me/tool/marc2bf/plugin#labelizer";

/// What a plugin wants done with the record just processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    /// Keep the record's statements.
    Keep,
    /// Remove the record's statements from the store.
    Drop,
}

/// Read-only view of the record just processed, handed to `on_record`.
#[derive(Debug)]
pub struct PluginContext<'a> {
    /// The source record.
    pub record: &'a Record,
    /// The record's resolved Work identifier.
    pub work_id: &'a str,
    /// Instance identifiers, primary first.
    pub instance_ids: &'a [String],
}

/// A conversion observer.
///
/// All hooks default to no-ops so a plugin implements only what it needs.
pub trait Plugin {
    /// The plugin's registered id.
    fn id(&self) -> &str;

    /// Called once before the first record is consumed.
    ///
    /// # Errors
    ///
    /// A plugin error stops the run before any input is read.
    fn on_init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called after a record's statements are in the store.
    ///
    /// # Errors
    ///
    /// A plugin error stops the run.
    fn on_record(
        &mut self,
        _ctx: &PluginContext<'_>,
        _store: &mut StatementStore,
    ) -> Result<RecordAction> {
        Ok(RecordAction::Keep)
    }

    /// Called when a resource is materialized (first encounter only).
    fn on_materialize(&mut self, _resource_id: &str, _type_iri: &str) {}

    /// Called once after all input is consumed.
    fn on_finalize(&mut self, _store: &mut StatementStore) {}
}

/// Factory producing a plugin instance from its activation entry.
pub type PluginFactory = fn(&PluginConfig) -> Result<Box<dyn Plugin>>;

/// Registry of available plugins, keyed by id.
#[derive(Default)]
pub struct PluginRegistry {
    factories: IndexMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        PluginRegistry::default()
    }

    /// Creates a registry with the built-in plugins registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = PluginRegistry::new();
        registry.register(LABELIZER_ID, |config| {
            Ok(Box::new(Labelizer::from_config(config)))
        });
        registry
    }

    /// Registers a factory under a plugin id.
    pub fn register(&mut self, id: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(id.into(), factory);
    }

    /// Instantiates a plugin from its activation entry.
    ///
    /// # Errors
    ///
    /// Returns [`Marc2BfError::UnknownPlugin`] for an unregistered id.
    pub fn create(&self, config: &PluginConfig) -> Result<Box<dyn Plugin>> {
        let factory = self
            .factories
            .get(&config.id)
            .ok_or_else(|| Marc2BfError::UnknownPlugin(config.id.clone()))?;
        factory(config)
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("ids", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Reference plugin: attaches a human-readable label to every materialized
/// resource, derived from its first name-like property value.
#[derive(Debug)]
pub struct Labelizer {
    label_rel: String,
    source_rels: Vec<String>,
    resources: Vec<String>,
}

impl Labelizer {
    /// Creates a labelizer from its activation options.
    ///
    /// Recognized options: `"label-rel"` (the relationship the label is
    /// emitted under) and `"properties"` (ordered relationship IRIs
    /// searched for a label value).
    #[must_use]
    pub fn from_config(config: &PluginConfig) -> Self {
        let label_rel = config
            .options
            .get("label-rel")
            .and_then(|v| v.as_str())
            .map_or_else(|| format!("{BFLITE}label"), String::from);
        let source_rels = config
            .options
            .get("properties")
            .and_then(|v| v.as_array())
            .map_or_else(
                || vec![format!("{BFLITE}name"), format!("{BFLITE}title")],
                |values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_str())
                        .map(String::from)
                        .collect()
                },
            );
        Labelizer {
            label_rel,
            source_rels,
            resources: Vec::new(),
        }
    }
}

impl Plugin for Labelizer {
    fn id(&self) -> &str {
        LABELIZER_ID
    }

    fn on_materialize(&mut self, resource_id: &str, _type_iri: &str) {
        self.resources.push(resource_id.to_string());
    }

    fn on_finalize(&mut self, store: &mut StatementStore) {
        for rid in &self.resources {
            let label = self.source_rels.iter().find_map(|rel| {
                store
                    .match_stmts(Some(rid), Some(rel), None)
                    .first()
                    .and_then(|s| s.target.as_str())
                    .map(String::from)
            });
            if let Some(label) = label {
                store.add(Statement::new(
                    rid,
                    self.label_rel.clone(),
                    Target::Text(label),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin_config(json: &str) -> PluginConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_unknown_plugin_rejected() {
        let registry = PluginRegistry::with_defaults();
        let result = registry.create(&plugin_config(r#"{"id": "http://example.org/nope"}"#));
        assert!(matches!(result, Err(Marc2BfError::UnknownPlugin(_))));
    }

    #[test]
    fn test_labelizer_labels_from_name() {
        let registry = PluginRegistry::with_defaults();
        let mut plugin = registry
            .create(&plugin_config(
                r#"{"id": "http://bibfra.me/tool/marc2bf/plugin#labelizer"}"#,
            ))
            .unwrap();

        let mut store = StatementStore::new();
        store.add_parts("p1", "http://bibfra.me/vocab/lite/name", "Sandburg, Carl,".into());
        plugin.on_materialize("p1", "http://bibfra.me/vocab/lite/Person");
        plugin.on_finalize(&mut store);

        let labels = store.match_stmts(Some("p1"), Some("http://bibfra.me/vocab/lite/label"), None);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].target, Target::Text("Sandburg, Carl,".into()));
    }

    #[test]
    fn test_labelizer_custom_properties() {
        let config = plugin_config(
            r#"{
                "id": "http://bibfra.me/tool/marc2bf/plugin#labelizer",
                "label-rel": "http://example.org/label",
                "properties": ["http://example.org/title"]
            }"#,
        );
        let mut plugin = Labelizer::from_config(&config);

        let mut store = StatementStore::new();
        store.add_parts("w1", "http://example.org/title", "Arithmetic".into());
        store.add_parts("w1", "http://bibfra.me/vocab/lite/name", "ignored".into());
        plugin.on_materialize("w1", "http://bibfra.me/vocab/lite/Work");
        plugin.on_finalize(&mut store);

        let labels = store.match_stmts(Some("w1"), Some("http://example.org/label"), None);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].target, Target::Text("Arithmetic".into()));
    }

    #[test]
    fn test_labelizer_no_source_value_emits_nothing() {
        let mut plugin = Labelizer::from_config(&plugin_config(
            r#"{"id": "http://bibfra.me/tool/marc2bf/plugin#labelizer"}"#,
        ));
        let mut store = StatementStore::new();
        plugin.on_materialize("x1", "http://bibfra.me/vocab/lite/Topic");
        plugin.on_finalize(&mut store);
        assert!(store.is_empty());
    }
}
