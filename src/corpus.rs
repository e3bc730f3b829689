//! ## Reference corpora
//! Ordered, immutable record sequences loaded once per labeled source. The
//! simulation draws its windows from two of these: one `normal`, one `attack`.
//!
//! [`LabeledDataset`] splits comma separated feature records (KDD-style, one
//! record per line with the class label in a fixed column) into the two
//! corpora. Only the feature prefix preceding the label column is retained, so
//! the label never leaks into the hashed record.

use std::collections::BTreeMap;

/// Label of records considered benign; every other label is an attack.
pub const NORMAL_LABEL: &str = "normal";
/// Label given to the corpus holding all non-normal records.
pub const ATTACK_LABEL: &str = "attack";
const FIELD_SEPARATOR: char = ',';

/// Ordered sequence of raw records sharing one label
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferenceCorpus {
    label: String,
    records: Vec<String>,
}

impl ReferenceCorpus {
    /// Create new corpus from already loaded records
    pub fn new(label: impl Into<String>, records: Vec<String>) -> Self {
        Self {
            label: label.into(),
            records,
        }
    }

    /// Return corpus label
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Return records in load order
    #[inline]
    pub fn records(&self) -> &[String] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ReferenceCorpus {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(String::new(), iter.into_iter().map(Into::into).collect())
    }
}

/// Labeled records split into a normal and an attack corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledDataset {
    pub normal: ReferenceCorpus,
    pub attack: ReferenceCorpus,
    class_counts: BTreeMap<String, usize>,
    skipped: usize,
}

impl LabeledDataset {
    /// Split `lines` by the label found in zero-based column `label_column`.
    ///
    /// Blank lines and lines with fewer than `label_column + 1` fields are
    /// skipped and counted. A trailing `.` on the label (KDD'99 style) is
    /// ignored.
    pub fn partition<I, T>(lines: I, label_column: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut normal = Vec::new();
        let mut attack = Vec::new();
        let mut class_counts = BTreeMap::new();
        let mut skipped = 0;

        for line in lines {
            let line = line.as_ref().trim_end();
            let Some((features, label)) = split_label(line, label_column) else {
                skipped += 1;
                continue;
            };
            *class_counts.entry(label.to_string()).or_insert(0) += 1;
            if label == NORMAL_LABEL {
                normal.push(features.to_string());
            } else {
                attack.push(features.to_string());
            }
        }

        Self {
            normal: ReferenceCorpus::new(NORMAL_LABEL, normal),
            attack: ReferenceCorpus::new(ATTACK_LABEL, attack),
            class_counts,
            skipped,
        }
    }

    /// Return number of records per label, before normal/attack grouping
    pub fn class_counts(&self) -> &BTreeMap<String, usize> {
        &self.class_counts
    }

    /// Return number of lines without a label column
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consume dataset returning `(normal, attack)` corpora
    pub fn into_corpora(self) -> (ReferenceCorpus, ReferenceCorpus) {
        (self.normal, self.attack)
    }
}

/// Split a record into its feature prefix and label
fn split_label(line: &str, label_column: usize) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    let mut fields = line.match_indices(FIELD_SEPARATOR).map(|(idx, _)| idx);
    let label_start = match label_column {
        0 => 0,
        n => fields.nth(n - 1)? + 1,
    };
    let label_end = fields.next().unwrap_or(line.len());
    let features = line[..label_start].strip_suffix(FIELD_SEPARATOR).unwrap_or("");
    let label = line[label_start..label_end].trim();
    let label = label.strip_suffix('.').unwrap_or(label);
    Some((features, label))
}
