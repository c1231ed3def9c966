use m2_lib::lookup::{build_sequence_lookup, MISSING_SEQUENCE};
use m2_lib::Sequence;

/// Checks that every entry of the rebuilt lookup points to the first sequence with that animation ID.
pub fn check_sequence_lookup(sequences: &[Sequence]) {
    let lookup = build_sequence_lookup(sequences);

    let expected_len = sequences
        .iter()
        .map(|s| s.animation_id as usize + 1)
        .max()
        .unwrap_or(0);
    assert_eq!(expected_len, lookup.len());

    for (animation_id, value) in lookup.iter().enumerate() {
        match sequences
            .iter()
            .find(|s| s.animation_id as usize == animation_id)
        {
            Some(first) => assert_eq!(first.position as i16, *value),
            None => assert_eq!(MISSING_SEQUENCE, *value),
        }
    }
}
