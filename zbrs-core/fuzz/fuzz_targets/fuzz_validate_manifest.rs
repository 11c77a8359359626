#![no_main]

//! Fuzz target for manifest validation
//!
//! Feeds arbitrary JSON documents through classification, validation and
//! decoding. None of these may panic, and validity must track the error list.
//!
//! Run with: cargo +nightly fuzz run fuzz_validate_manifest

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use zbrs_core::{SecurityPolicy, Validator, ZbrsManifest};

fn validator() -> &'static Validator {
    static VALIDATOR: OnceLock<Validator> = OnceLock::new();
    VALIDATOR.get_or_init(|| {
        Validator::new(Arc::new(SecurityPolicy::default())).expect("built-in schemas compile")
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let result = validator().validate_manifest(&raw);
    assert_eq!(result.is_valid(), result.errors.is_empty());

    if result.is_valid() {
        // A manifest that validated must also decode
        assert!(ZbrsManifest::from_value(raw).is_ok());
    }
});
