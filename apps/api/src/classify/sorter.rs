//! Sorter — partitions extracted metadata into reply buckets.
//!
//! Pure and deterministic: no I/O, no hidden state, input order preserved
//! within each bucket.

use serde::Serialize;

use super::ExtractedMetadata;

/// The mutually exclusive triage outcomes. Exactly one per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    MissingResume,
    MissingCoverLetter,
    UnclearPosition,
    MultipleMissing,
    Confirmed,
}

/// Counts the missing-detail flags and applies the fixed precedence:
/// two or more → `MultipleMissing`; exactly one → that flag's bucket in the
/// order resume → cover letter → position; none → `Confirmed`.
pub fn bucket_for(record: &ExtractedMetadata) -> Bucket {
    let missing_resume = !record.has_resume;
    let missing_cover_letter = !record.has_cover_letter;
    let unclear_position = record.position.is_none();

    let missing_count =
        missing_resume as u8 + missing_cover_letter as u8 + unclear_position as u8;

    if missing_count >= 2 {
        Bucket::MultipleMissing
    } else if missing_resume {
        Bucket::MissingResume
    } else if missing_cover_letter {
        Bucket::MissingCoverLetter
    } else if unclear_position {
        Bucket::UnclearPosition
    } else {
        Bucket::Confirmed
    }
}

/// One run's worth of records, partitioned.
#[derive(Debug, Default, Serialize)]
pub struct SortedBatch {
    pub missing_resume: Vec<ExtractedMetadata>,
    pub missing_cover_letter: Vec<ExtractedMetadata>,
    pub unclear_position: Vec<ExtractedMetadata>,
    pub multiple_missing: Vec<ExtractedMetadata>,
    pub confirmed: Vec<ExtractedMetadata>,
}

impl SortedBatch {
    pub fn total(&self) -> usize {
        self.missing_resume.len()
            + self.missing_cover_letter.len()
            + self.unclear_position.len()
            + self.multiple_missing.len()
            + self.confirmed.len()
    }

    /// Buckets paired with their members, in fixed dispatch order.
    pub fn iter_buckets(&self) -> impl Iterator<Item = (Bucket, &[ExtractedMetadata])> + '_ {
        [
            (Bucket::MissingResume, self.missing_resume.as_slice()),
            (
                Bucket::MissingCoverLetter,
                self.missing_cover_letter.as_slice(),
            ),
            (Bucket::UnclearPosition, self.unclear_position.as_slice()),
            (Bucket::MultipleMissing, self.multiple_missing.as_slice()),
            (Bucket::Confirmed, self.confirmed.as_slice()),
        ]
        .into_iter()
    }
}

/// Stable partition of a batch into buckets.
pub fn sort_into_buckets(records: Vec<ExtractedMetadata>) -> SortedBatch {
    let mut batch = SortedBatch::default();
    for record in records {
        match bucket_for(&record) {
            Bucket::MissingResume => batch.missing_resume.push(record),
            Bucket::MissingCoverLetter => batch.missing_cover_letter.push(record),
            Bucket::UnclearPosition => batch.unclear_position.push(record),
            Bucket::MultipleMissing => batch.multiple_missing.push(record),
            Bucket::Confirmed => batch.confirmed.push(record),
        }
    }
    batch
}
