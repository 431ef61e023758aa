#![no_main]

use libfuzzer_sys::fuzz_target;
use unicat::diagnostics::Diagnostics;
use unicat::normalize::NormalizedKeys;
use unicat::source::load;
use unicat::RunConfig;

fuzz_target!(|data: &[u8]| {
    let mut diagnostics = Diagnostics::new();
    let Ok(records) = load(0, "FUZZ", data, &mut diagnostics) else {
        return;
    };
    let config = RunConfig::default();
    for loaded in &records {
        let keys = NormalizedKeys::from_record(&loaded.record, &config);
        assert!(keys.strong.windows(2).all(|w| w[0] < w[1]));
    }
});
