#![no_main]
use libfuzzer_sys::fuzz_target;
use m2_lib::Sequence;

fuzz_target!(|sequences: Vec<Sequence>| {
    // Positions are assigned when reading, so they always match the index.
    let sequences: Vec<_> = sequences
        .into_iter()
        .take(m2_lib::MAX_SEQUENCE_COUNT as usize)
        .enumerate()
        .map(|(position, s)| Sequence { position, ..s })
        .collect();
    m2_lib_fuzz::check_sequence_lookup(&sequences);
});
