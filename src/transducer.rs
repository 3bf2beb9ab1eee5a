//! The per-record transducer.
//!
//! Walks a parsed record's entries in document order and turns them into
//! graph statements: the bootstrap phase resolves the record's Work
//! identity, ISBN values in 020$a drive Instance generation, each data
//! field is dispatched against the compiled transform tables, fixed-field
//! specials are decoded, and multi-ISBN records have their shared
//! descriptive statements replicated across Instances.
//!
//! Processing is a plain synchronous function of (state, record); the only
//! state carried across records is the statement store, the identity
//! generator, and the set of already-materialized identifiers, which is
//! exactly what lets identical entities fold across records.

use std::collections::HashSet;

use log::{debug, warn};

use crate::config::ConverterConfig;
use crate::idgen::IdentityGenerator;
use crate::isbn::isbn_instance_groups;
use crate::marcspecials::{decode_006, decode_007, decode_008, decode_leader_types};
use crate::record::{DataField, FieldEntry, Record};
use crate::statement::{Statement, StatementStore, Target};
use crate::transform::expr::{eval, ExprError};
use crate::transform::registry::{CompiledTransforms, Phase};
use crate::transform::rules::{apply_rule, RuleState, TransformRule};
use crate::transform::{Context, Extras, LookupTables};
use crate::vocab::{absolutize, attrs, properties, types, MARCEXT};

/// Per-record results handed to the driving loop for plugin notification.
#[derive(Debug, Clone)]
pub struct RecordState {
    /// The record's resolved Work identifier.
    pub work_id: String,
    /// Instance identifiers, primary first.
    pub instance_ids: Vec<String>,
    /// Resources materialized while processing this record (id, type IRI).
    pub materialized: Vec<(String, String)>,
    /// Store row range this record's statements occupy.
    pub rows: std::ops::Range<usize>,
}

/// Outcome of processing one record.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// The record was processed; statements are in the store.
    Done(RecordState),
    /// An `abort_on` rule fired; the record's statements were rolled back
    /// and the caller must stop consuming input per the configured scope.
    Aborted,
}

/// The record transducer: running conversion state plus per-record logic.
#[derive(Debug)]
pub struct Transducer<'a> {
    transforms: &'a CompiledTransforms,
    config: &'a ConverterConfig,
    lookups: LookupTables,
    /// The accumulating output store.
    pub store: StatementStore,
    idgen: IdentityGenerator,
    existing_ids: HashSet<String>,
    /// Records fully processed so far.
    pub records_processed: u64,
    /// Records dropped (aborted or dropped by a plugin).
    pub records_dropped: u64,
    /// Data fields no rule handled (fallback statements were emitted).
    pub unhandled_fields: u64,
}

impl<'a> Transducer<'a> {
    /// Creates a transducer over compiled transforms and configuration.
    #[must_use]
    pub fn new(transforms: &'a CompiledTransforms, config: &'a ConverterConfig) -> Self {
        Transducer {
            transforms,
            config,
            lookups: config.lookup_tables(),
            store: StatementStore::new(),
            idgen: IdentityGenerator::new(),
            existing_ids: HashSet::new(),
            records_processed: 0,
            records_dropped: 0,
            unhandled_fields: 0,
        }
    }

    /// Consumes the transducer, yielding the finished store.
    #[must_use]
    pub fn into_store(self) -> StatementStore {
        self.store
    }

    /// Rolls back a record's statements (plugin-requested drop).
    pub fn drop_record(&mut self, state: &RecordState) {
        let ids: Vec<usize> = state.rows.clone().collect();
        self.store.delete(&ids);
        self.records_dropped += 1;
    }

    /// Processes one record, emitting statements into the store.
    pub fn process_record(&mut self, record: &Record) -> RecordOutcome {
        let rows_start = self.store.row_count();
        match self.run_record(record) {
            Ok(mut state) => {
                state.rows = rows_start..self.store.row_count();
                self.records_processed += 1;
                RecordOutcome::Done(state)
            }
            Err(ExprError::Abort) => {
                self.store.truncate_rows(rows_start);
                self.records_dropped += 1;
                RecordOutcome::Aborted
            }
            Err(ExprError::Failed(msg)) => {
                // per-field failures are absorbed in the field loop; a
                // failure surfacing here came from bootstrap, which only
                // costs identity data for this record
                warn!("record-level expression failure: {msg}");
                self.records_processed += 1;
                RecordOutcome::Done(RecordState {
                    work_id: String::new(),
                    instance_ids: Vec::new(),
                    materialized: Vec::new(),
                    rows: rows_start..self.store.row_count(),
                })
            }
        }
    }

    fn run_record(&mut self, record: &Record) -> Result<RecordState, ExprError> {
        let base = self.config.vocab_base_uri.clone();

        // bootstrap phase: resolve the Work identity before anything else
        let work_id = self.resolve_work(record, &base)?;

        // instance generation precedes field processing
        let instance_ids = self.generate_instances(record, &base, &work_id);

        let extras = Extras {
            work_id: work_id.clone(),
            instance_ids: instance_ids.clone(),
        };

        let mut leader_text: Option<String> = None;
        let mut f006_texts: Vec<String> = Vec::new();
        let mut f007_texts: Vec<String> = Vec::new();
        let mut f008_text: Option<String> = None;
        let mut materialized: Vec<(String, String)> = Vec::new();

        for entry in &record.entries {
            match entry {
                FieldEntry::Leader(l) => leader_text = Some(l.clone()),
                FieldEntry::Control { tag, value } => {
                    match tag.as_str() {
                        "006" => f006_texts.push(value.clone()),
                        "007" => f007_texts.push(value.clone()),
                        "008" => f008_text = Some(value.clone()),
                        _ => {}
                    }
                    let anchor = instance_ids
                        .first()
                        .map_or(work_id.as_str(), String::as_str);
                    self.store.add(
                        Statement::new(
                            anchor,
                            format!("{}tag-{tag}", self.config.marcspecials_vocab),
                            Target::Text(value.clone()),
                        )
                        .with_attr(attrs::SOURCE_TAG, tag.clone()),
                    );
                }
                FieldEntry::Data(field) => {
                    self.process_data_field(field, &extras, &base, &mut materialized)?;
                }
            }
        }

        self.process_specials(
            leader_text.as_deref(),
            &f006_texts,
            &f007_texts,
            f008_text.as_deref(),
            &base,
            &work_id,
        );

        // multi-ISBN records share descriptive data across instances
        if instance_ids.len() > 1 {
            self.duplicate_instance_statements(&instance_ids);
        }

        Ok(RecordState {
            work_id,
            instance_ids,
            materialized,
            rows: 0..0, // filled by process_record
        })
    }

    /// Runs the bootstrap phase: accumulates identity pairs from the
    /// bootstrap rule table, orders them per the declared hash-input
    /// ordering, and mints (or folds) the Work.
    fn resolve_work(&mut self, record: &Record, base: &str) -> Result<String, ExprError> {
        let extras = Extras::default();
        let mut pairs: Vec<(String, String)> = Vec::new();

        for field in record.data_fields() {
            for (code, rule) in self.transforms.rules_for(Phase::Bootstrap, field) {
                let TransformRule::Rename { rel, .. } = rule else {
                    continue; // bootstrap accumulates identity data only
                };
                let mut ctx = Context::new(field, "", base, &extras, &self.lookups);
                if let Some(code) = code {
                    ctx = ctx.with_subfield(code);
                }
                let rels = match eval(rel, &ctx) {
                    Ok(v) => v.into_texts(),
                    Err(ExprError::Abort) => return Err(ExprError::Abort),
                    Err(ExprError::Failed(msg)) => {
                        warn!("bootstrap expression failed on {}: {msg}", field.tag);
                        continue;
                    }
                };
                let values: Vec<String> = match code {
                    Some(c) => field.subfield_values(c).into_iter().map(String::from).collect(),
                    None => field.subfields.iter().map(|sf| sf.value.clone()).collect(),
                };
                for rel_name in &rels {
                    let rel_iri = absolutize(base, rel_name);
                    for v in &values {
                        pairs.push((rel_iri.clone(), v.clone()));
                    }
                }
            }
        }

        if let Some(ordering) = self.transforms.ordering_for(types::WORK) {
            let order: Vec<String> = ordering.iter().map(|r| absolutize(base, r)).collect();
            pairs.sort_by_key(|(rel, _)| {
                order.iter().position(|o| o == rel).unwrap_or(usize::MAX)
            });
        }

        let work_type = absolutize(base, types::WORK);
        let (work_id, first_seen) = self.idgen.next_id(&work_type, &pairs);
        if first_seen && !self.existing_ids.contains(&work_id) {
            self.existing_ids.insert(work_id.clone());
            self.store.add(
                Statement::new(
                    &work_id,
                    absolutize(base, properties::TYPE),
                    Target::Link(work_type),
                )
                .with_attr(attrs::TARGET_TYPE, attrs::IRI_REF),
            );
        }
        // bootstrap marker: tie the resolved target back to the record
        if let Some(record_id) = record.control_field("001") {
            self.store.add_parts(
                &work_id,
                format!("{MARCEXT}{}", properties::DESCRIBED_BY),
                Target::Text(record_id.to_string()),
            );
        }
        Ok(work_id)
    }

    /// Generates the record's Instances from canonicalized 020$a values,
    /// or a single default Instance when the record carries no usable ISBN.
    fn generate_instances(&mut self, record: &Record, base: &str, work_id: &str) -> Vec<String> {
        let raw: Vec<&str> = record
            .fields_by_tag("020")
            .flat_map(|f| f.subfield_values('a'))
            .collect();
        let groups = isbn_instance_groups(&raw);

        let instance_type = absolutize(base, types::INSTANCE);
        let instantiates = absolutize(base, properties::INSTANTIATES);
        let isbn_prop = absolutize(base, properties::ISBN);

        let mut ids = Vec::new();
        if groups.is_empty() {
            let pairs = vec![(instantiates.clone(), work_id.to_string())];
            let (iid, _) = self.idgen.next_id(&instance_type, &pairs);
            self.emit_instance(&iid, base, work_id, None);
            ids.push(iid);
        } else {
            for (canonical, annotation) in &groups {
                let pairs = vec![
                    (instantiates.clone(), work_id.to_string()),
                    (isbn_prop.clone(), canonical.clone()),
                ];
                let (iid, _) = self.idgen.next_id(&instance_type, &pairs);
                self.emit_instance(&iid, base, work_id, Some((canonical, annotation)));
                ids.push(iid);
            }
        }
        ids
    }

    fn emit_instance(
        &mut self,
        iid: &str,
        base: &str,
        work_id: &str,
        isbn: Option<(&String, &String)>,
    ) {
        if self.existing_ids.contains(iid) {
            return; // folded instance, fully described already
        }
        self.existing_ids.insert(iid.to_string());
        self.store.add(
            Statement::new(
                iid,
                absolutize(base, properties::INSTANTIATES),
                Target::Link(work_id.to_string()),
            )
            .with_attr(attrs::TARGET_TYPE, attrs::IRI_REF),
        );
        self.store.add(
            Statement::new(
                iid,
                absolutize(base, properties::TYPE),
                Target::Link(absolutize(base, types::INSTANCE)),
            )
            .with_attr(attrs::TARGET_TYPE, attrs::IRI_REF),
        );
        if let Some((canonical, annotation)) = isbn {
            let mut stmt = Statement::new(
                iid,
                absolutize(base, properties::ISBN),
                Target::Text(canonical.clone()),
            );
            if !annotation.is_empty() {
                stmt.attrs
                    .insert("annotation".to_string(), annotation.clone());
            }
            self.store.add(stmt);
        }
    }

    fn process_data_field(
        &mut self,
        field: &DataField,
        extras: &Extras,
        base: &str,
        materialized: &mut Vec<(String, String)>,
    ) -> Result<(), ExprError> {
        let rules = self.transforms.rules_for(Phase::Main, field);

        if rules.is_empty() {
            if field.tag == "020" {
                // consumed by instance generation
                return Ok(());
            }
            // no-rule fallback: reuse tag + subfield code as an ad hoc
            // relationship so no content is silently lost
            self.unhandled_fields += 1;
            debug!("no rule for field {}; emitting fallback statements", field.tag);
            for sf in &field.subfields {
                self.store.add(
                    Statement::new(
                        &extras.work_id,
                        format!("{MARCEXT}tag-{}-{}", field.tag, sf.code),
                        Target::Text(sf.value.clone()),
                    )
                    .with_attr(attrs::SOURCE_TAG, field.tag.clone()),
                );
            }
            return Ok(());
        }

        for (code, rule) in rules {
            let mut ctx = Context::new(field, "", base, extras, &self.lookups);
            if let Some(code) = code {
                ctx = ctx.with_subfield(code);
            }
            let mut state = RuleState {
                store: &mut self.store,
                idgen: &mut self.idgen,
                existing_ids: &mut self.existing_ids,
                materialized,
                preserve_order: self.config.preserve_field_order,
            };
            match apply_rule(rule, &ctx, &mut state) {
                Ok(()) => {}
                Err(ExprError::Abort) => return Err(ExprError::Abort),
                Err(ExprError::Failed(msg)) => {
                    // fatal for this field only
                    warn!("expression failed on field {}: {msg}; skipping field", field.tag);
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Decodes leader 6/7 and the 006/007/008 fixed fields into statements
    /// on the Work, deduplicating repeated values before emission.
    fn process_specials(
        &mut self,
        leader: Option<&str>,
        f006: &[String],
        f007: &[String],
        f008: Option<&str>,
        base: &str,
        work_id: &str,
    ) {
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let type_rel = absolutize(base, properties::TYPE);

        if let Some(leader) = leader {
            for type_name in decode_leader_types(leader) {
                self.emit_special_type(&type_rel, base, work_id, type_name, &mut seen);
            }
        }
        for text in f006 {
            let (type_names, pairs) = decode_006(text);
            for type_name in type_names {
                self.emit_special_type(&type_rel, base, work_id, type_name, &mut seen);
            }
            self.emit_special_pairs(pairs, work_id, &mut seen);
        }
        for text in f007 {
            self.emit_special_pairs(decode_007(text), work_id, &mut seen);
        }
        if let Some(f008) = f008 {
            self.emit_special_pairs(decode_008(f008), work_id, &mut seen);
        }
    }

    fn emit_special_type(
        &mut self,
        type_rel: &str,
        base: &str,
        work_id: &str,
        type_name: &str,
        seen: &mut HashSet<(String, String)>,
    ) {
        let type_iri = absolutize(base, type_name);
        if seen.insert((type_rel.to_string(), type_iri.clone())) {
            self.store.add(
                Statement::new(work_id, type_rel.to_string(), Target::Link(type_iri))
                    .with_attr(attrs::TARGET_TYPE, attrs::IRI_REF),
            );
        }
    }

    fn emit_special_pairs(
        &mut self,
        pairs: Vec<(&'static str, String)>,
        work_id: &str,
        seen: &mut HashSet<(String, String)>,
    ) {
        for (prop, value) in pairs {
            let rel = format!("{}{prop}", self.config.marcspecials_vocab);
            if seen.insert((rel.clone(), value.clone())) {
                self.store.add_parts(work_id, rel, Target::Text(value));
            }
        }
    }

    /// Replicates every statement anchored on the first Instance onto each
    /// further Instance, skipping triples already present. The ISBN
    /// statement stays with its own Instance.
    fn duplicate_instance_statements(&mut self, instance_ids: &[String]) {
        let isbn_rel = absolutize(&self.config.vocab_base_uri, properties::ISBN);
        let first = &instance_ids[0];
        let snapshot: Vec<Statement> = self
            .store
            .match_stmts(Some(first.as_str()), None, None)
            .into_iter()
            .filter(|s| s.relationship != isbn_rel)
            .cloned()
            .collect();
        for iid in &instance_ids[1..] {
            for stmt in &snapshot {
                if !self.store.contains(iid, &stmt.relationship, &stmt.target) {
                    let mut copy = stmt.clone();
                    copy.origin = iid.clone();
                    self.store.add(copy);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DataField;
    use crate::transform::patterns::default_registry;
    use crate::vocab::BFLITE;

    fn compiled() -> CompiledTransforms {
        let config = ConverterConfig::default();
        default_registry().resolve(&config.transforms_spec()).unwrap()
    }

    fn sample_record() -> Record {
        Record::builder()
            .leader("01142cam  2200301 a 4500")
            .control_field("001", "92005291")
            .control_field("008", "920219s1993    caua   j      000 0 eng  ")
            .field(
                DataField::builder("100", '1', ' ')
                    .subfield('a', "Sandburg, Carl,")
                    .subfield('d', "1878-1967.")
                    .build(),
            )
            .field(
                DataField::builder("245", '1', '0')
                    .subfield('a', "Arithmetic /")
                    .subfield('c', "Carl Sandburg.")
                    .build(),
            )
            .field(
                DataField::builder("650", ' ', '0')
                    .subfield('a', "Arithmetic")
                    .subfield('x', "Juvenile poetry.")
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_record_produces_work_and_instance() {
        let transforms = compiled();
        let config = ConverterConfig::default();
        let mut transducer = Transducer::new(&transforms, &config);

        let RecordOutcome::Done(state) = transducer.process_record(&sample_record()) else {
            panic!("expected Done");
        };
        assert!(!state.work_id.is_empty());
        assert_eq!(state.instance_ids.len(), 1);

        let store = &transducer.store;
        // instance instantiates work
        let inst = &state.instance_ids[0];
        assert!(store.contains(
            inst,
            &format!("{BFLITE}instantiates"),
            &Target::Link(state.work_id.clone())
        ));
        // title lands on both work and instance
        assert_eq!(
            store
                .match_stmts(None, Some(&format!("{BFLITE}title")), None)
                .len(),
            2
        );
        // creator materialized
        assert_eq!(
            store
                .match_stmts(Some(&state.work_id), Some(&format!("{BFLITE}creator")), None)
                .len(),
            1
        );
    }

    #[test]
    fn test_work_identity_deterministic_across_transducers() {
        let transforms = compiled();
        let config = ConverterConfig::default();

        let mut t1 = Transducer::new(&transforms, &config);
        let mut t2 = Transducer::new(&transforms, &config);
        let RecordOutcome::Done(s1) = t1.process_record(&sample_record()) else {
            panic!()
        };
        let RecordOutcome::Done(s2) = t2.process_record(&sample_record()) else {
            panic!()
        };
        assert_eq!(s1.work_id, s2.work_id);
        assert_eq!(s1.instance_ids, s2.instance_ids);
    }

    #[test]
    fn test_unhandled_field_fallback_on_work() {
        let transforms = compiled();
        let config = ConverterConfig::default();
        let mut transducer = Transducer::new(&transforms, &config);

        let record = Record::builder()
            .field(
                DataField::builder("245", '1', '0').subfield('a', "T").build(),
            )
            .field(
                DataField::builder("987", ' ', ' ').subfield('q', "oddball").build(),
            )
            .build();
        let RecordOutcome::Done(state) = transducer.process_record(&record) else {
            panic!()
        };
        assert_eq!(transducer.unhandled_fields, 1);
        let hits = transducer.store.match_stmts(
            Some(&state.work_id),
            Some("http://bibfra.me/vocab/marcext/tag-987-q"),
            None,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, Target::Text("oddball".into()));
    }

    #[test]
    fn test_multi_isbn_generates_duplicated_instances() {
        let transforms = compiled();
        let config = ConverterConfig::default();
        let mut transducer = Transducer::new(&transforms, &config);

        let record = Record::builder()
            .field(
                DataField::builder("020", ' ', ' ')
                    .subfield('a', "9781588902153 (TNY)")
                    .build(),
            )
            .field(
                DataField::builder("020", ' ', ' ')
                    .subfield('a', "3136128044 (GTV)")
                    .build(),
            )
            .field(
                DataField::builder("245", '1', '0')
                    .subfield('a', "Thieme leximed dictionary")
                    .build(),
            )
            .build();
        let RecordOutcome::Done(state) = transducer.process_record(&record) else {
            panic!()
        };
        assert_eq!(state.instance_ids.len(), 2);

        let title_rel = format!("{BFLITE}title");
        for iid in &state.instance_ids {
            assert!(transducer.store.contains(
                iid,
                &title_rel,
                &Target::Text("Thieme leximed dictionary".into())
            ));
            assert!(transducer.store.contains(
                iid,
                &format!("{BFLITE}instantiates"),
                &Target::Link(state.work_id.clone())
            ));
        }
    }

    #[test]
    fn test_leader_and_008_specials_on_work() {
        let transforms = compiled();
        let config = ConverterConfig::default();
        let mut transducer = Transducer::new(&transforms, &config);

        let record = Record::builder()
            .leader("01142ces 2200301 a 4500")
            .control_field("008", "920219s1993    caua   j      000 0 eng  ")
            .build();
        let RecordOutcome::Done(state) = transducer.process_record(&record) else {
            panic!()
        };

        let type_rel = format!("{BFLITE}type");
        assert!(transducer.store.contains(
            &state.work_id,
            &type_rel,
            &Target::Link(format!("{BFLITE}StillImage"))
        ));
        assert!(transducer.store.contains(
            &state.work_id,
            &type_rel,
            &Target::Link(format!("{BFLITE}Collection"))
        ));
        assert!(transducer.store.contains(
            &state.work_id,
            "http://bibfra.me/vocab/marc/language",
            &Target::Text("eng".into())
        ));
    }

    #[test]
    fn test_006_and_007_decoded_on_work() {
        let transforms = compiled();
        let config = ConverterConfig::default();
        let mut transducer = Transducer::new(&transforms, &config);

        let record = Record::builder()
            .leader("01142cam  2200301 a 4500")
            .control_field("006", "m")
            .control_field("007", "cr")
            .build();
        let RecordOutcome::Done(state) = transducer.process_record(&record) else {
            panic!()
        };

        // 006 material form adds a type alongside the leader's
        let type_rel = format!("{BFLITE}type");
        assert!(transducer.store.contains(
            &state.work_id,
            &type_rel,
            &Target::Link(format!("{BFLITE}Software"))
        ));
        assert!(transducer.store.contains(
            &state.work_id,
            &type_rel,
            &Target::Link(format!("{BFLITE}LanguageMaterial"))
        ));
        // 007 'cr' reads as an online carrier
        assert!(transducer.store.contains(
            &state.work_id,
            "http://bibfra.me/vocab/marc/medium",
            &Target::Text("online".into())
        ));
        // raw control-field passthrough still present
        let raw_006 = transducer.store.match_stmts(
            None,
            Some("http://bibfra.me/vocab/marc/tag-006"),
            None,
        );
        assert_eq!(raw_006.len(), 1);
    }

    #[test]
    fn test_agent_folds_across_records() {
        let transforms = compiled();
        let config = ConverterConfig::default();
        let mut transducer = Transducer::new(&transforms, &config);

        let make = |title: &str| {
            Record::builder()
                .field(
                    DataField::builder("100", '1', ' ')
                        .subfield('a', "Sandburg, Carl,")
                        .subfield('d', "1878-1967.")
                        .build(),
                )
                .field(DataField::builder("245", '1', '0').subfield('a', title).build())
                .build()
        };
        let RecordOutcome::Done(_) = transducer.process_record(&make("Arithmetic /")) else {
            panic!()
        };
        let RecordOutcome::Done(_) = transducer.process_record(&make("Chicago poems /")) else {
            panic!()
        };

        // two creator links, one materialized Person
        assert_eq!(
            transducer
                .store
                .match_stmts(None, Some(&format!("{BFLITE}creator")), None)
                .len(),
            2
        );
        let person_type = Target::Link(format!("{BFLITE}Person"));
        assert_eq!(
            transducer
                .store
                .match_stmts(None, Some(&format!("{BFLITE}type")), Some(&person_type))
                .len(),
            1
        );
    }
}
