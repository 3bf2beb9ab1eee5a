//! ISBN-driven Instance generation and statement duplication.

mod common;

use common::{first_work_id, run_default, LITE, MARC};
use marc2bf::record::{DataField, Record};
use marc2bf::statement::Target;

fn dictionary_record() -> Record {
    Record::builder()
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
                .subfield('a', "Thieme leximed compact dictionary")
                .build(),
        )
        .field(
            DataField::builder("250", ' ', ' ')
                .subfield('a', "2nd ed.")
                .build(),
        )
        .build()
}

fn isbn_values(report: &marc2bf::pipeline::RunReport) -> Vec<(String, Option<String>)> {
    let rel = format!("{LITE}isbn");
    report
        .store
        .match_stmts(None, Some(&rel), None)
        .iter()
        .map(|s| {
            (
                s.target.as_str().unwrap_or_default().to_string(),
                s.attrs.get("annotation").cloned(),
            )
        })
        .collect()
}

#[test]
fn test_one_instance_per_distinct_isbn() {
    let report = run_default(vec![dictionary_record()]);

    let instantiates = format!("{LITE}instantiates");
    let hits = report.store.match_stmts(None, Some(&instantiates), None);
    assert_eq!(hits.len(), 2);
    // both instances share the one work
    let work = first_work_id(&report);
    assert!(hits
        .iter()
        .all(|s| s.target == Target::Link(work.clone())));

    let mut isbns = isbn_values(&report);
    isbns.sort();
    assert_eq!(
        isbns,
        vec![
            ("978158890215".to_string(), Some("(TNY)".to_string())),
            ("978313612804".to_string(), Some("(GTV)".to_string())),
        ]
    );
}

#[test]
fn test_descriptive_statements_duplicated_across_instances() {
    let report = run_default(vec![dictionary_record()]);

    let instantiates = format!("{LITE}instantiates");
    let instance_ids: Vec<String> = report
        .store
        .match_stmts(None, Some(&instantiates), None)
        .iter()
        .map(|s| s.origin.clone())
        .collect();
    assert_eq!(instance_ids.len(), 2);

    for iid in &instance_ids {
        assert!(report.store.contains(
            iid,
            &format!("{LITE}title"),
            &Target::Text("Thieme leximed compact dictionary".into())
        ));
        assert!(report.store.contains(
            iid,
            &format!("{MARC}edition"),
            &Target::Text("2nd ed.".into())
        ));
    }
}

#[test]
fn test_instances_keep_distinct_isbns() {
    let report = run_default(vec![dictionary_record()]);
    let rel = format!("{LITE}isbn");
    let hits = report.store.match_stmts(None, Some(&rel), None);

    // duplication must not smear one instance's ISBN onto the other
    assert_eq!(hits.len(), 2);
    let origins: Vec<&str> = hits.iter().map(|s| s.origin.as_str()).collect();
    assert_ne!(origins[0], origins[1]);
}

#[test]
fn test_record_without_isbn_gets_default_instance() {
    let record = Record::builder()
        .field(DataField::builder("245", '1', '0').subfield('a', "No ISBN here").build())
        .build();
    let report = run_default(vec![record]);

    let instantiates = format!("{LITE}instantiates");
    assert_eq!(report.store.match_stmts(None, Some(&instantiates), None).len(), 1);
    assert!(report
        .store
        .match_stmts(None, Some(&format!("{LITE}isbn")), None)
        .is_empty());
}

#[test]
fn test_repeated_isbn_yields_one_instance() {
    // same ISBN as 10- and 13-digit forms canonicalizes to one prefix
    let record = Record::builder()
        .field(
            DataField::builder("020", ' ', ' ')
                .subfield('a', "9780688075460")
                .build(),
        )
        .field(
            DataField::builder("020", ' ', ' ')
                .subfield('a', "0688075460 (pbk.)")
                .build(),
        )
        .field(DataField::builder("245", '1', '0').subfield('a', "Dup").build())
        .build();
    let report = run_default(vec![record]);

    let instantiates = format!("{LITE}instantiates");
    assert_eq!(report.store.match_stmts(None, Some(&instantiates), None).len(), 1);
    let isbns = isbn_values(&report);
    assert_eq!(isbns.len(), 1);
    assert_eq!(isbns[0].0, "978068807546");
    // first-seen annotation wins (the unannotated 13-digit form)
    assert_eq!(isbns[0].1, None);
}
