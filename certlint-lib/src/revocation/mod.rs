//! Revocation material: CRLs and OCSP responses.

mod crl;
mod ocsp;

pub use crl::{parse_crl, parse_crl_der, parse_pem_crls, CrlInfo, RevokedEntry};
pub use ocsp::{
    parse_ocsp_response, CertStatus, OcspResponse, OcspResponseStatus, OcspSingleResponse,
    ResponderId,
};

/// Format a CRL/OCSP revocation reason code as an RFC 5280-style string.
pub(crate) fn reason_name(code: u8) -> &'static str {
    match code {
        0 => "unspecified",
        1 => "keyCompromise",
        2 => "cACompromise",
        3 => "affiliationChanged",
        4 => "superseded",
        5 => "cessationOfOperation",
        6 => "certificateHold",
        // 7 is unused per RFC 5280
        8 => "removeFromCRL",
        9 => "privilegeWithdrawn",
        10 => "aACompromise",
        _ => "unspecified",
    }
}
