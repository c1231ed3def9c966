#![no_main]
use libfuzzer_sys::fuzz_target;
use m2_lib::{M2File, RemapError};

fuzz_target!(|data: &[u8]| {
    // Test that this doesn't panic on errors.
    let mut m2 = M2File::from_bytes(data.to_vec());
    match m2.remap(false) {
        Ok(report) if report.is_changed() => {
            // The appended marker should skip the file next time.
            assert!(m2.is_remapped());
            assert!(matches!(m2.remap(false), Err(RemapError::AlreadyRemapped)));
        }
        // Unchanged files and errors should never modify the data.
        _ => assert_eq!(data, m2.as_bytes()),
    }
});
