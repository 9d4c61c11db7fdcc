#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Neither decoder may panic on arbitrary input.
    if let Ok(resp) = certlint_lib::parse_ocsp_response(data) {
        let _ = resp.is_successful();
        for single in &resp.responses {
            let _ = single.is_current(single.this_update);
        }
    }
    if let Ok(crls) = certlint_lib::parse_crl(data) {
        for crl in &crls {
            let _ = crl.issuer_string();
            let _ = crl.is_current(crl.this_update);
        }
    }
});
