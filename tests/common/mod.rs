//! Shared helpers for integration tests.

#![allow(dead_code)]

use marc2bf::config::ConverterConfig;
use marc2bf::pipeline::{Pipeline, RunReport, VecSource};
use marc2bf::plugins::PluginRegistry;
use marc2bf::record::{DataField, Record};
use marc2bf::statement::Target;
use marc2bf::transform::patterns::default_registry;

/// BIBFRAME Lite vocabulary base.
pub const LITE: &str = "http://bibfra.me/vocab/lite/";
/// MARC-specials vocabulary base.
pub const MARC: &str = "http://bibfra.me/vocab/marc/";
/// Raw-MARC extension vocabulary base.
pub const MARCEXT: &str = "http://bibfra.me/vocab/marcext/";

/// Runs records through a default pipeline (default transforms, no plugins).
pub fn run_default(records: Vec<Record>) -> RunReport {
    run_with_config(records, ConverterConfig::default())
}

/// Runs records through a pipeline built from the given configuration.
pub fn run_with_config(records: Vec<Record>, config: ConverterConfig) -> RunReport {
    let mut pipeline = Pipeline::new(&default_registry(), &PluginRegistry::with_defaults(), config)
        .expect("default pipeline must validate");
    let mut source = VecSource::new(records);
    pipeline.run(&mut [&mut source]).expect("run must succeed")
}

/// A complete book record exercising agents, titles, publication,
/// subjects, and an electronic location.
pub fn sandburg_record() -> Record {
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
                .subfield('c', "Carl Sandburg ; illustrated as an anamorphic adventure by Ted Rand.")
                .build(),
        )
        .field(
            DataField::builder("260", ' ', ' ')
                .subfield('a', "San Diego :")
                .subfield('b', "Harcourt Brace Jovanovich,")
                .subfield('c', "c1993.")
                .build(),
        )
        .field(
            DataField::builder("650", ' ', '0')
                .subfield('a', "Arithmetic")
                .subfield('x', "Juvenile poetry.")
                .build(),
        )
        .field(
            DataField::builder("856", '4', '0')
                .subfield('u', "http://www.example.com/arithmetic")
                .build(),
        )
        .build()
}

/// Returns the single link target of the first statement matching
/// (origin, relationship), panicking when absent or not a link.
pub fn link_target(report: &RunReport, origin: &str, relationship: &str) -> String {
    let hits = report.store.match_stmts(Some(origin), Some(relationship), None);
    match &hits.first().expect("expected a matching statement").target {
        Target::Link(id) => id.clone(),
        other => panic!("expected a link target, got {other:?}"),
    }
}

/// The Work id of the first `lite:instantiates` statement in the store.
pub fn first_work_id(report: &RunReport) -> String {
    let rel = format!("{LITE}instantiates");
    let hits = report.store.match_stmts(None, Some(&rel), None);
    match &hits.first().expect("expected an instantiates statement").target {
        Target::Link(id) => id.clone(),
        other => panic!("expected a link target, got {other:?}"),
    }
}

/// The first Instance id (origin of the first `lite:instantiates`).
pub fn first_instance_id(report: &RunReport) -> String {
    let rel = format!("{LITE}instantiates");
    let hits = report.store.match_stmts(None, Some(&rel), None);
    hits.first()
        .expect("expected an instantiates statement")
        .origin
        .clone()
}
