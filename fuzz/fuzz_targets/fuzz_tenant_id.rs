//! Fuzz target for tenant id parsing.
//!
//! Checks that arbitrary header bytes never panic the parser and that the
//! parser and the validity predicate always agree.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_tenant_id -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use licensa_core::{TenantId, MAX_TENANT_ID_LEN};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    match TenantId::parse(s) {
        Ok(tenant) => {
            assert!(TenantId::is_valid(s));
            assert_eq!(tenant.as_str(), s);
            assert!(!s.is_empty() && s.len() <= MAX_TENANT_ID_LEN);

            // Display output parses back to the same id
            let reparsed = TenantId::parse(&tenant.to_string()).unwrap();
            assert_eq!(reparsed, tenant);
        }
        Err(_) => assert!(!TenantId::is_valid(s)),
    }
});
