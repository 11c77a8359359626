#![no_main]

//! Fuzz target for book validation
//!
//! Book files come from untrusted repositories; validation must report
//! defects without panicking on any JSON input.
//!
//! Run with: cargo +nightly fuzz run fuzz_validate_book

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use zbrs_core::{SecurityPolicy, Validator};

fn validator() -> &'static Validator {
    static VALIDATOR: OnceLock<Validator> = OnceLock::new();
    VALIDATOR.get_or_init(|| {
        Validator::new(Arc::new(SecurityPolicy::default())).expect("built-in schemas compile")
    })
}

fuzz_target!(|data: &[u8]| {
    let Some((&order, rest)) = data.split_first() else {
        return;
    };
    let Ok(raw) = serde_json::from_slice::<serde_json::Value>(rest) else {
        return;
    };

    let expected = (order > 0).then_some(u32::from(order));
    let _ = validator().validate_book(&raw, expected);
});
