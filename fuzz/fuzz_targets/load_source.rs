#![no_main]

use libfuzzer_sys::fuzz_target;
use unicat::diagnostics::Diagnostics;
use unicat::source::load;

// Arbitrary bytes either load or fail with an error, never panic.
fuzz_target!(|data: &[u8]| {
    let mut diagnostics = Diagnostics::new();
    if let Ok(records) = load(0, "FUZZ", data, &mut diagnostics) {
        for (position, record) in records.iter().enumerate() {
            assert_eq!(record.id.position, position);
        }
    }
});
