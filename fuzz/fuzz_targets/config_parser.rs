#![no_main]

use libfuzzer_sys::fuzz_target;
use scantrace::config::TracerConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Rejecting is fine, panicking is not
        if let Ok(config) = TracerConfig::from_toml_str(input) {
            assert!(config.filename.ends_with(".scnx"));
        }
    }
});
