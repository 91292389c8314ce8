//! Pairing manifest records with discovered streams
//!
//! Decompressed size is the only correlation key between a manifest record
//! and a candidate stream. Matching is greedy: records are visited in
//! manifest order and each takes the first remaining pool segment of the
//! same size, which is then consumed.
//!
//! When two records share a size the first record in manifest order gets
//! the first segment of that size in pool order. The result is
//! deterministic for a fixed pool order, but nothing ties a segment to a
//! record beyond the size, so such pairings are not guaranteed to be right.

use crate::manifest::{MANIFEST_MARKER, ManifestRecord};
use crate::scanner::CandidateSegment;
use tracing::debug;

/// Every segment whose text does not contain the manifest table marker
///
/// Segments are borrowed from `pool`; no decompressed data is copied.
pub fn exclude_manifest(pool: &[CandidateSegment]) -> Vec<&CandidateSegment> {
    manifest_free(pool).into_iter().map(|i| &pool[i]).collect()
}

/// Indices into `pool` of the segments without the manifest marker
pub(crate) fn manifest_free(pool: &[CandidateSegment]) -> Vec<usize> {
    let remaining: Vec<_> = pool
        .iter()
        .enumerate()
        .filter(|(_, segment)| !segment.contains(MANIFEST_MARKER.as_bytes()))
        .map(|(i, _)| i)
        .collect();

    debug!(
        "Excluded {} manifest segment(s) from pool of {}",
        pool.len() - remaining.len(),
        pool.len()
    );
    remaining
}

/// Assign at most one pool segment to each record by exact size
///
/// The manifest segment must already be excluded from `pool`. The result is
/// aligned with `records`; a record without a parsed size, or with no
/// segment of that size left, yields `None`.
pub fn match_streams<'a>(
    records: &[ManifestRecord],
    pool: &[&'a CandidateSegment],
) -> Vec<Option<&'a [u8]>> {
    assign(records, pool.iter().map(|segment| segment.size()))
        .into_iter()
        .map(|slot| slot.map(|i| pool[i].data.as_slice()))
        .collect()
}

/// Greedy size matching over segment sizes in pool order
///
/// Returns, per record, the pool index of the segment it consumed.
pub(crate) fn assign(
    records: &[ManifestRecord],
    sizes: impl IntoIterator<Item = usize>,
) -> Vec<Option<usize>> {
    let sizes: Vec<usize> = sizes.into_iter().collect();
    let mut taken = vec![false; sizes.len()];
    let mut matched = 0usize;

    let slots: Vec<_> = records
        .iter()
        .map(|record| {
            let expected = usize::try_from(record.file_size?).ok()?;
            let index = sizes
                .iter()
                .zip(&taken)
                .position(|(&size, &used)| !used && size == expected)?;
            taken[index] = true;
            matched += 1;
            Some(index)
        })
        .collect();

    debug!(
        "Matched {} of {} records, {} segments left unused",
        matched,
        records.len(),
        sizes.len() - matched
    );

    slots
}
