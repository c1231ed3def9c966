//! The sequence lookup maps an animation ID to the index of its first [Sequence].
//! The lookup is a dense array indexed by animation ID with `-1` for animations the model does not define.
//! Models converted between client versions often have a lookup that no longer matches the sequences,
//! so the lookup is always rebuilt from the sequences rather than trusted.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bytes::read_elements;
use crate::header::M2Header;
use crate::sequence::Sequence;
use crate::FormatError;

/// The value of lookup entries for animations without a sequence.
pub const MISSING_SEQUENCE: i16 = -1;

/// The size in bytes of each lookup entry.
pub const LOOKUP_ENTRY_SIZE: u64 = 2;

/// A single lookup entry that differs between two lookups.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupChange {
    /// The animation ID used to index the lookup.
    pub index: usize,
    /// The previous value or `None` if the previous lookup was too short.
    pub old: Option<i16>,
    /// The rebuilt value or `-1` if the rebuilt lookup is shorter.
    pub new: i16,
}

/// Reads the existing lookup described by `header`.
pub fn read_sequence_lookup(data: &[u8], header: &M2Header) -> Result<Vec<i16>, FormatError> {
    read_elements(
        data,
        "sequence lookup",
        header.absolute_offset(header.sequence_lookup.offset),
        header.sequence_lookup.count,
        LOOKUP_ENTRY_SIZE,
        |_| (),
    )
}

/// Builds the lookup for `sequences` with one entry for each ID up to the largest animation ID.
/// If multiple sequences share an animation ID, the entry points to the first sequence.
///
/// Positions are assumed to fit in an [i16].
/// Callers should reject models with more sequences than the lookup can address.
pub fn build_sequence_lookup(sequences: &[Sequence]) -> Vec<i16> {
    let max_id = match sequences.iter().map(|s| s.animation_id).max() {
        Some(max_id) => max_id as usize,
        None => return Vec::new(),
    };

    let mut lookup = vec![MISSING_SEQUENCE; max_id + 1];
    for sequence in sequences {
        let entry = &mut lookup[sequence.animation_id as usize];
        // TODO: Check if the client prefers the first or last variation when ids repeat.
        if *entry == MISSING_SEQUENCE {
            *entry = sequence.position as i16;
        }
    }
    lookup
}

/// Finds the entries that differ between `old` and `new`.
/// Entries past the end of either lookup are treated as `-1`,
/// so trailing `-1` entries never count as a change.
pub fn diff_sequence_lookup(old: &[i16], new: &[i16]) -> Vec<LookupChange> {
    (0..old.len().max(new.len()))
        .filter_map(|index| {
            let old_value = old.get(index).copied();
            let new_value = new.get(index).copied().unwrap_or(MISSING_SEQUENCE);
            if old_value.unwrap_or(MISSING_SEQUENCE) != new_value {
                Some(LookupChange {
                    index,
                    old: old_value,
                    new: new_value,
                })
            } else {
                None
            }
        })
        .collect()
}
