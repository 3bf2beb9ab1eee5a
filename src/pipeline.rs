//! The conversion pipeline: sources in, statement store out.
//!
//! A [`Pipeline`] binds a resolved transform set, a configuration, and the
//! activated plugins, then drains one or more [`RecordSource`]s through a
//! [`Transducer`](crate::transducer::Transducer). Validation is fail-fast:
//! unknown transform-set IRIs and plugin ids are rejected at construction,
//! before any record is consumed. An `abort_on` rule firing stops input
//! consumption per the configured [`AbortScope`].

use log::{debug, info};

use crate::config::{AbortScope, ConverterConfig};
use crate::error::Result;
use crate::plugins::{Plugin, PluginContext, PluginRegistry, RecordAction};
use crate::record::Record;
use crate::statement::StatementStore;
use crate::transducer::{RecordOutcome, Transducer};
use crate::transform::{CompiledTransforms, TransformRegistry};

/// A pull source of parsed records.
///
/// The conversion core does not parse serialized MARC; the embedding
/// application adapts its parser behind this trait.
pub trait RecordSource {
    /// Returns the next record, or `None` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates source-level read failures, which stop the run.
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// A [`RecordSource`] over an in-memory record list.
#[derive(Debug)]
pub struct VecSource {
    records: std::vec::IntoIter<Record>,
}

impl VecSource {
    /// Creates a source yielding the records in order.
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        VecSource {
            records: records.into_iter(),
        }
    }
}

impl RecordSource for VecSource {
    fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.records.next())
    }
}

/// The result of a pipeline run.
#[derive(Debug)]
pub struct RunReport {
    /// Every statement produced by the run.
    pub store: StatementStore,
    /// Records fully processed.
    pub records_processed: u64,
    /// Records dropped (aborted or dropped by a plugin).
    pub records_dropped: u64,
    /// Data fields no rule handled.
    pub unhandled_fields: u64,
}

/// A validated, ready-to-run conversion.
pub struct Pipeline {
    transforms: CompiledTransforms,
    config: ConverterConfig,
    plugins: Vec<Box<dyn Plugin>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("plugins", &self.plugins.len())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Builds a pipeline, resolving transform sets and instantiating
    /// plugins.
    ///
    /// # Errors
    ///
    /// Returns [`Marc2BfError::UnknownTransformSet`] or
    /// [`Marc2BfError::UnknownPlugin`] for configuration referencing
    /// unregistered names.
    ///
    /// [`Marc2BfError::UnknownTransformSet`]: crate::error::Marc2BfError::UnknownTransformSet
    /// [`Marc2BfError::UnknownPlugin`]: crate::error::Marc2BfError::UnknownPlugin
    pub fn new(
        registry: &TransformRegistry,
        plugin_registry: &PluginRegistry,
        config: ConverterConfig,
    ) -> Result<Self> {
        let transforms = registry.resolve(&config.transforms_spec())?;
        let mut plugins = Vec::with_capacity(config.plugins.len());
        for entry in &config.plugins {
            plugins.push(plugin_registry.create(entry)?);
        }
        Ok(Pipeline {
            transforms,
            config,
            plugins,
        })
    }

    /// Drains every source through the transducer and finalizes plugins.
    ///
    /// # Errors
    ///
    /// Propagates source read failures and plugin errors.
    pub fn run(&mut self, sources: &mut [&mut dyn RecordSource]) -> Result<RunReport> {
        for plugin in &mut self.plugins {
            plugin.on_init()?;
        }

        let mut transducer = Transducer::new(&self.transforms, &self.config);
        let mut consumed: u64 = 0;

        'sources: for source in sources.iter_mut() {
            loop {
                // check before pulling so the source is never read past
                // the limit
                if let Some(limit) = self.config.record_limit {
                    if consumed >= limit {
                        debug!("record limit {limit} reached");
                        break 'sources;
                    }
                }
                let Some(record) = source.next_record()? else {
                    break;
                };
                consumed += 1;

                match transducer.process_record(&record) {
                    RecordOutcome::Aborted => match self.config.abort_scope {
                        AbortScope::CurrentSource => {
                            info!("abort signaled; skipping rest of current source");
                            break;
                        }
                        AbortScope::AllSources => {
                            info!("abort signaled; stopping all input");
                            break 'sources;
                        }
                    },
                    RecordOutcome::Done(state) => {
                        for (rid, type_iri) in &state.materialized {
                            for plugin in &mut self.plugins {
                                plugin.on_materialize(rid, type_iri);
                            }
                        }
                        let ctx = PluginContext {
                            record: &record,
                            work_id: &state.work_id,
                            instance_ids: &state.instance_ids,
                        };
                        let mut action = RecordAction::Keep;
                        for plugin in &mut self.plugins {
                            if plugin.on_record(&ctx, &mut transducer.store)? == RecordAction::Drop
                            {
                                action = RecordAction::Drop;
                            }
                        }
                        if action == RecordAction::Drop {
                            transducer.drop_record(&state);
                        }
                    }
                }
            }
        }

        for plugin in &mut self.plugins {
            plugin.on_finalize(&mut transducer.store);
        }

        debug!(
            "run finished: {} records processed, {} dropped, {} unhandled fields",
            transducer.records_processed, transducer.records_dropped, transducer.unhandled_fields
        );
        Ok(RunReport {
            records_processed: transducer.records_processed,
            records_dropped: transducer.records_dropped,
            unhandled_fields: transducer.unhandled_fields,
            store: transducer.into_store(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Marc2BfError;
    use crate::record::DataField;
    use crate::transform::patterns::{default_registry, BFLITE_TRANSFORMS, MARC_TRANSFORMS};
    use crate::transform::rules::{Anchor, TransformRule};
    use crate::transform::{Expr, RuleTable};

    fn record(title: &str) -> Record {
        Record::builder()
            .field(DataField::builder("245", '1', '0').subfield('a', title).build())
            .build()
    }

    fn suppressible(title: &str, marker: &str) -> Record {
        Record::builder()
            .field(DataField::builder("245", '1', '0').subfield('a', title).build())
            .field(DataField::builder("915", ' ', ' ').subfield('a', marker).build())
            .build()
    }

    /// A registry whose 915$a rule aborts on the value "SUPPRESS".
    fn abortable_registry() -> TransformRegistry {
        let mut registry = default_registry();
        let mut table = RuleTable::new();
        table.insert(
            "915$a".into(),
            vec![TransformRule::Rename {
                anchor: Anchor::Work,
                rel: Expr::lit("local-note"),
                target: Some(Expr::AbortOn {
                    value: Box::new(Expr::sf('a')),
                    matches: vec!["SUPPRESS".to_string()],
                }),
                res: false,
            }],
        );
        registry.register("http://example.org/abort", table, None);
        registry
    }

    fn abortable_config(scope: &str) -> ConverterConfig {
        ConverterConfig::from_json(&format!(
            r#"{{
                "transforms": [
                    "{BFLITE_TRANSFORMS}",
                    "{MARC_TRANSFORMS}",
                    "http://example.org/abort"
                ],
                "abort-scope": "{scope}"
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_unknown_transform_set_fails_before_run() {
        let config = ConverterConfig::from_json(
            r#"{"transforms": ["http://example.org/nope"]}"#,
        )
        .unwrap();
        let err = Pipeline::new(&default_registry(), &PluginRegistry::new(), config).unwrap_err();
        assert!(matches!(err, Marc2BfError::UnknownTransformSet(_)));
    }

    #[test]
    fn test_unknown_plugin_fails_before_run() {
        let config = ConverterConfig::from_json(
            r#"{"plugins": [{"id": "http://example.org/nope"}]}"#,
        )
        .unwrap();
        let err = Pipeline::new(&default_registry(), &PluginRegistry::new(), config).unwrap_err();
        assert!(matches!(err, Marc2BfError::UnknownPlugin(_)));
    }

    #[test]
    fn test_record_limit() {
        let config = ConverterConfig::from_json(r#"{"record-limit": 2}"#).unwrap();
        let mut pipeline =
            Pipeline::new(&default_registry(), &PluginRegistry::new(), config).unwrap();

        let mut source = VecSource::new(vec![record("A"), record("B"), record("C")]);
        let report = pipeline.run(&mut [&mut source]).unwrap();
        assert_eq!(report.records_processed, 2);
    }

    struct CountingSource {
        inner: VecSource,
        pulled: u64,
    }
    impl RecordSource for CountingSource {
        fn next_record(&mut self) -> Result<Option<Record>> {
            self.pulled += 1;
            self.inner.next_record()
        }
    }

    #[test]
    fn test_record_limit_does_not_overfetch() {
        let config = ConverterConfig::from_json(r#"{"record-limit": 2}"#).unwrap();
        let mut pipeline =
            Pipeline::new(&default_registry(), &PluginRegistry::new(), config).unwrap();

        let mut source = CountingSource {
            inner: VecSource::new(vec![record("A"), record("B"), record("C")]),
            pulled: 0,
        };
        let report = pipeline.run(&mut [&mut source]).unwrap();
        assert_eq!(report.records_processed, 2);
        // the third record stays in the source
        assert_eq!(source.pulled, 2);
    }

    #[test]
    fn test_abort_discards_aborting_record() {
        let mut pipeline = Pipeline::new(
            &abortable_registry(),
            &PluginRegistry::new(),
            abortable_config("all-sources"),
        )
        .unwrap();

        let mut source = VecSource::new(vec![
            record("First title"),
            suppressible("Second title", "SUPPRESS"),
            record("Third title"),
        ]);
        let report = pipeline.run(&mut [&mut source]).unwrap();

        assert_eq!(report.records_processed, 1);
        assert_eq!(report.records_dropped, 1);
        let titles: Vec<&str> = report
            .store
            .match_stmts(None, Some("http://bibfra.me/vocab/lite/title"), None)
            .iter()
            .filter_map(|s| s.target.as_str())
            .collect();
        assert!(titles.contains(&"First title"));
        assert!(!titles.iter().any(|t| *t == "Second title"));
        assert!(!titles.iter().any(|t| *t == "Third title"));
    }

    #[test]
    fn test_abort_current_source_continues_with_next() {
        let mut pipeline = Pipeline::new(
            &abortable_registry(),
            &PluginRegistry::new(),
            abortable_config("current-source"),
        )
        .unwrap();

        let mut first = VecSource::new(vec![
            suppressible("Suppressed", "SUPPRESS"),
            record("Skipped in same source"),
        ]);
        let mut second = VecSource::new(vec![record("From second source")]);
        let report = pipeline.run(&mut [&mut first, &mut second]).unwrap();

        let titles: Vec<&str> = report
            .store
            .match_stmts(None, Some("http://bibfra.me/vocab/lite/title"), None)
            .iter()
            .filter_map(|s| s.target.as_str())
            .collect();
        // work + instance copies, all from the surviving record
        assert!(!titles.is_empty());
        assert!(titles.iter().all(|t| *t == "From second source"));
    }

    struct DropAll;
    impl Plugin for DropAll {
        fn id(&self) -> &str {
            "http://example.org/drop-all"
        }
        fn on_record(
            &mut self,
            _ctx: &PluginContext<'_>,
            _store: &mut StatementStore,
        ) -> Result<RecordAction> {
            Ok(RecordAction::Drop)
        }
    }

    #[test]
    fn test_plugin_can_drop_records() {
        let mut plugin_registry = PluginRegistry::new();
        plugin_registry.register("http://example.org/drop-all", |_| Ok(Box::new(DropAll)));
        let config = ConverterConfig::from_json(
            r#"{"plugins": [{"id": "http://example.org/drop-all"}]}"#,
        )
        .unwrap();
        let mut pipeline = Pipeline::new(&default_registry(), &plugin_registry, config).unwrap();

        let mut source = VecSource::new(vec![record("A")]);
        let report = pipeline.run(&mut [&mut source]).unwrap();
        assert_eq!(report.records_dropped, 1);
        assert!(report
            .store
            .match_stmts(None, Some("http://bibfra.me/vocab/lite/title"), None)
            .is_empty());
    }
}
