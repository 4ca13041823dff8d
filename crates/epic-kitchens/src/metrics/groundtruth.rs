//! Ground-truth label table.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ndarray::{Array1, ArrayView1, Zip};

use crate::classes::{NOUN_CLASS_COUNT, VERB_CLASS_LIMIT, action_id_from_verb_noun};
use crate::error::{LoadError, MetricsError};
use crate::io::{column_index, csv_reader, parse_field, require_column};

/// Column holding the verb class of each instance.
pub const VERB_CLASS_COLUMN: &str = "verb_class";
/// Column holding the noun class of each instance.
pub const NOUN_CLASS_COLUMN: &str = "noun_class";
/// Optional column holding the unique segment id of each instance.
pub const UID_COLUMN: &str = "uid";

/// Verb and noun labels of every evaluated instance.
///
/// Row `i` is aligned with row `i` of every score array passed to the
/// evaluator. Every label pair has a valid action id.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth {
    uids: Option<Array1<u64>>,
    verb_class: Array1<usize>,
    noun_class: Array1<usize>,
}

impl GroundTruth {
    /// Create a table from verb and noun labels of equal length.
    ///
    /// # Errors
    ///
    /// - labels of different lengths
    /// - a noun label of [`NOUN_CLASS_COUNT`] or more
    /// - a verb label of [`VERB_CLASS_LIMIT`] or more, whose action id would
    ///   overflow
    pub fn new(verb_class: Array1<usize>, noun_class: Array1<usize>) -> Result<Self, MetricsError> {
        if noun_class.len() != verb_class.len() {
            return Err(MetricsError::LengthMismatch {
                what: "noun labels",
                expected: verb_class.len(),
                got: noun_class.len(),
            });
        }
        check_range("verb label", verb_class.view(), VERB_CLASS_LIMIT)?;
        check_range("noun label", noun_class.view(), NOUN_CLASS_COUNT)?;
        Ok(Self {
            uids: None,
            verb_class,
            noun_class,
        })
    }

    /// Attach segment ids, one per instance.
    pub fn with_uids(mut self, uids: Array1<u64>) -> Result<Self, MetricsError> {
        if uids.len() != self.len() {
            return Err(MetricsError::LengthMismatch {
                what: "uids",
                expected: self.len(),
                got: uids.len(),
            });
        }
        self.uids = Some(uids);
        Ok(self)
    }

    /// Segment ids, when known.
    pub fn uids(&self) -> Option<ArrayView1<'_, u64>> {
        self.uids.as_ref().map(|u| u.view())
    }

    pub fn verb_class(&self) -> ArrayView1<'_, usize> {
        self.verb_class.view()
    }

    pub fn noun_class(&self) -> ArrayView1<'_, usize> {
        self.noun_class.view()
    }

    pub fn len(&self) -> usize {
        self.verb_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verb_class.is_empty()
    }

    /// Dense action id of every instance.
    pub fn action_class(&self) -> Array1<usize> {
        Zip::from(&self.verb_class)
            .and(&self.noun_class)
            .map_collect(|&v, &n| action_id_from_verb_noun(v, n))
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Read a label table from CSV.
    ///
    /// Requires `verb_class` and `noun_class` columns; a `uid` column is read
    /// when present. Other columns are ignored.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut reader = csv_reader(reader);
        let verb_idx = require_column(&mut reader, VERB_CLASS_COLUMN)?;
        let noun_idx = require_column(&mut reader, NOUN_CLASS_COLUMN)?;
        let uid_idx = column_index(&mut reader, UID_COLUMN)?;

        let mut verbs = Vec::new();
        let mut nouns = Vec::new();
        let mut uids = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            verbs.push(parse_field(&record, verb_idx, VERB_CLASS_COLUMN, row)?);
            nouns.push(parse_field(&record, noun_idx, NOUN_CLASS_COLUMN, row)?);
            if let Some(idx) = uid_idx {
                uids.push(parse_field(&record, idx, UID_COLUMN, row)?);
            }
        }

        let groundtruth = Self::new(Array1::from(verbs), Array1::from(nouns))?;
        let groundtruth = match uid_idx {
            Some(_) => groundtruth.with_uids(Array1::from(uids))?,
            None => groundtruth,
        };
        log::debug!("loaded ground truth with {} instances", groundtruth.len());
        Ok(groundtruth)
    }

    /// Read a label table from a CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let file = File::open(path.as_ref())?;
        Self::from_csv_reader(BufReader::new(file))
    }
}

fn check_range(
    what: &'static str,
    labels: ArrayView1<'_, usize>,
    limit: usize,
) -> Result<(), MetricsError> {
    match labels.iter().position(|&label| label >= limit) {
        Some(row) => Err(MetricsError::ClassOutOfRange {
            what,
            row,
            value: labels[row],
            limit,
        }),
        None => Ok(()),
    }
}
