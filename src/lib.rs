#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # marc2bf: MARC to BIBFRAME conversion
//!
//! A Rust library that converts parsed MARC bibliographic records into
//! BIBFRAME-style linked data, expressed as Versa statements
//! (origin, relationship, target, attributes).
//!
//! ## Quick Start
//!
//! ```ignore
//! use marc2bf::config::ConverterConfig;
//! use marc2bf::pipeline::{Pipeline, VecSource};
//! use marc2bf::plugins::PluginRegistry;
//! use marc2bf::record::{DataField, Record};
//! use marc2bf::transform::patterns::default_registry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let record = Record::builder()
//!     .leader("01142cam  2200301 a 4500")
//!     .control_field("001", "92005291")
//!     .field(
//!         DataField::builder("100", '1', ' ')
//!             .subfield('a', "Sandburg, Carl,")
//!             .subfield('d', "1878-1967.")
//!             .build(),
//!     )
//!     .field(
//!         DataField::builder("245", '1', '0')
//!             .subfield('a', "Arithmetic /")
//!             .build(),
//!     )
//!     .build();
//!
//! let mut pipeline = Pipeline::new(
//!     &default_registry(),
//!     &PluginRegistry::with_defaults(),
//!     ConverterConfig::default(),
//! )?;
//! let mut source = VecSource::new(vec![record]);
//! let report = pipeline.run(&mut [&mut source])?;
//!
//! for (_, stmt) in report.store.iter() {
//!     println!("{} {} {:?}", stmt.origin, stmt.relationship, stmt.target);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`record`] — Parsed MARC record structures handed in by the parser
//! - [`statement`] — Versa statements and the in-memory statement store
//! - [`idgen`] — Deterministic content-addressed resource identifiers
//! - [`isbn`] — ISBN canonicalization and EAN-13 check digits
//! - [`transform`] — Expression combinators, rule kinds, transform sets
//! - [`marcspecials`] — Leader and 008 fixed-field decoders
//! - [`transducer`] — The per-record conversion state machine
//! - [`plugins`] — Conversion observers (labelizer, record filtering)
//! - [`pipeline`] — Sources-in, statements-out driver with validation
//! - [`config`] — Conversion configuration
//! - [`error`] — The library error type

pub mod config;
pub mod error;
pub mod idgen;
pub mod isbn;
pub mod marcspecials;
pub mod pipeline;
pub mod plugins;
pub mod record;
pub mod statement;
pub mod transducer;
pub mod transform;
pub mod vocab;

pub use config::{AbortScope, ConverterConfig};
pub use error::{Marc2BfError, Result};
pub use pipeline::{Pipeline, RecordSource, RunReport, VecSource};
pub use plugins::{Plugin, PluginRegistry, RecordAction};
pub use record::{DataField, FieldEntry, Record, Subfield};
pub use statement::{Statement, StatementStore, Target};
pub use transducer::{RecordOutcome, RecordState, Transducer};
pub use transform::{TransformRegistry, TransformsSpec};
