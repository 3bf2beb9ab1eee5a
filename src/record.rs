//! MARC record structures as consumed by the transducer.
//!
//! This module provides the parsed-record model handed over by the external
//! parsing front end:
//! - [`Record`] — an ordered sequence of field entries
//! - [`FieldEntry`] — leader, control field, or data field
//! - [`DataField`] / [`Subfield`] — variable fields with ordered subfields
//!
//! Entries are stored in document order; the transducer depends on that
//! order both for statement output and for identity hashing.
//!
//! # Examples
//!
//! Build a record fluently:
//!
//! ```ignore
//! use marc2bf::record::{DataField, Record};
//!
//! let record = Record::builder()
//!     .leader("01142cam  2200301 a 4500")
//!     .control_field("001", "92005291")
//!     .field(
//!         DataField::builder("245", '1', '0')
//!             .subfield('a', "Arithmetic /")
//!             .subfield('c', "Carl Sandburg.")
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(record.data_fields().count(), 1);
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Sentinel tag substituted for malformed tags (wrong length or
/// non-alphanumeric); the field is kept and a warning is logged.
pub const SENTINEL_TAG: &str = "999";

/// A subfield within a data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character).
    pub code: char,
    /// Subfield value.
    pub value: String,
}

/// A variable data field (tags 010 and higher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Field tag (3 characters).
    pub tag: String,
    /// First indicator.
    pub indicator1: char,
    /// Second indicator.
    pub indicator2: char,
    /// Subfields in document order (`SmallVec` avoids allocation for
    /// typical fields with 4 or fewer subfields).
    pub subfields: SmallVec<[Subfield; 4]>,
}

impl DataField {
    /// Creates a new data field with no subfields.
    ///
    /// A malformed tag (not exactly 3 alphanumeric characters) is replaced
    /// with [`SENTINEL_TAG`] and a warning is logged; processing continues.
    #[must_use]
    pub fn new(tag: &str, indicator1: char, indicator2: char) -> Self {
        let tag = if is_valid_tag(tag) {
            tag.to_string()
        } else {
            log::warn!("malformed tag {tag:?} substituted with sentinel {SENTINEL_TAG}");
            SENTINEL_TAG.to_string()
        };
        DataField {
            tag,
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Creates a builder for fluently constructing a data field.
    #[must_use]
    pub fn builder(tag: &str, indicator1: char, indicator2: char) -> DataFieldBuilder {
        DataFieldBuilder {
            field: DataField::new(tag, indicator1, indicator2),
        }
    }

    /// Appends a subfield.
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }

    /// Returns all values for a subfield code, in document order.
    #[must_use]
    pub fn subfield_values(&self, code: char) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
            .collect()
    }

    /// Returns the first value for a subfield code.
    #[must_use]
    pub fn first_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Returns true if both indicators are blank.
    #[must_use]
    pub fn indicators_blank(&self) -> bool {
        self.indicator1 == ' ' && self.indicator2 == ' '
    }
}

/// Builder for [`DataField`].
#[derive(Debug)]
pub struct DataFieldBuilder {
    field: DataField,
}

impl DataFieldBuilder {
    /// Adds a subfield.
    #[must_use]
    pub fn subfield(mut self, code: char, value: impl Into<String>) -> Self {
        self.field.add_subfield(code, value);
        self
    }

    /// Finishes building the field.
    #[must_use]
    pub fn build(self) -> DataField {
        self.field
    }
}

/// One entry in a parsed record, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldEntry {
    /// The 24-byte record leader.
    Leader(String),
    /// A control field (tags 001-009): tag plus flat string value.
    Control {
        /// 3-digit numeric tag.
        tag: String,
        /// Field value.
        value: String,
    },
    /// A variable data field.
    Data(DataField),
}

/// A parsed MARC record: an ordered sequence of field entries.
///
/// Immutable once handed to the transducer; produced entirely by the
/// external parser (or by the builder in tests).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    /// Field entries in document order.
    pub entries: Vec<FieldEntry>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Record::default()
    }

    /// Creates a builder for fluently constructing records.
    #[must_use]
    pub fn builder() -> RecordBuilder {
        RecordBuilder {
            record: Record::new(),
        }
    }

    /// Returns the leader, if present.
    #[must_use]
    pub fn leader(&self) -> Option<&str> {
        self.entries.iter().find_map(|e| match e {
            FieldEntry::Leader(l) => Some(l.as_str()),
            _ => None,
        })
    }

    /// Returns the first control field value for a tag.
    #[must_use]
    pub fn control_field(&self, wanted: &str) -> Option<&str> {
        self.entries.iter().find_map(|e| match e {
            FieldEntry::Control { tag, value } if tag == wanted => Some(value.as_str()),
            _ => None,
        })
    }

    /// Iterates over data fields in document order.
    pub fn data_fields(&self) -> impl Iterator<Item = &DataField> {
        self.entries.iter().filter_map(|e| match e {
            FieldEntry::Data(f) => Some(f),
            _ => None,
        })
    }

    /// Iterates over data fields matching a specific tag.
    pub fn fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> {
        self.data_fields().filter(move |f| f.tag == tag)
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: FieldEntry) {
        self.entries.push(entry);
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Sets the record leader.
    #[must_use]
    pub fn leader(mut self, leader: impl Into<String>) -> Self {
        self.record.push(FieldEntry::Leader(leader.into()));
        self
    }

    /// Adds a control field.
    #[must_use]
    pub fn control_field(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.record.push(FieldEntry::Control {
            tag: tag.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a data field.
    #[must_use]
    pub fn field(mut self, field: DataField) -> Self {
        self.record.push(FieldEntry::Data(field));
        self
    }

    /// Finishes building the record.
    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}

fn is_valid_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.chars().all(|c| c.is_ascii_alphanumeric())
}
