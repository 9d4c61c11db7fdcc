//! Certificate data types and field extraction.

use serde::Serialize;
use std::net::IpAddr;
use time::OffsetDateTime;

/// Digest algorithm for content hashes and OCSP CertID matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
    Sha1,
}

/// A parsed X.509 certificate with extracted fields.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateInfo {
    /// Certificate version (1, 2, or 3).
    pub version: u32,
    /// Serial number as raw big-endian bytes with leading zeros stripped.
    #[serde(serialize_with = "serialize_hex")]
    pub serial: Vec<u8>,
    /// Signature algorithm name.
    pub signature_algorithm: String,
    /// Signature algorithm OID.
    pub signature_algorithm_oid: String,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Validity start date.
    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,
    /// Validity end date.
    #[serde(with = "time::serde::rfc3339")]
    pub not_after: OffsetDateTime,
    /// Public key information.
    pub public_key: PublicKeyInfo,
    /// X.509v3 extensions.
    pub extensions: Vec<Extension>,

    /// Raw DER bytes of the entire certificate (signature checks, content hash).
    #[serde(skip)]
    pub raw_der: Vec<u8>,
}

/// Distinguished name with ordered components.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DistinguishedName {
    /// Ordered list of (attribute_type, value) pairs.
    /// Attribute types use short names where known (e.g., "CN", "O", "C").
    pub components: Vec<(String, String)>,
    /// DER encoding of the name, used for OCSP issuer-name hashing.
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl DistinguishedName {
    /// Build a name from components alone (no DER encoding available).
    pub fn from_components<K: Into<String>, V: Into<String>>(
        components: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        DistinguishedName {
            components: components
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            raw: Vec::new(),
        }
    }

    /// Format as a comma-separated one-line string matching OpenSSL's default format.
    /// Example: "C = US, O = Org, CN = example.com"
    ///
    /// Values containing commas, equals signs, or backslashes are escaped
    /// to prevent ambiguous output.
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push_str(" = ");
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }

    /// First value of the given attribute short name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

/// Public key algorithm, with the parameters the lint operators care about.
///
/// `Unknown` keeps the algorithm OID so it stays representable; size and
/// algorithm checks treat it as a clean failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum KeyAlgorithm {
    Rsa { bits: u32, exponent: u64 },
    Ec { curve: String, bits: Option<u32> },
    Ed25519,
    Ed448,
    Unknown { oid: String },
}

impl KeyAlgorithm {
    /// Short algorithm name: "RSA", "EC", "Ed25519", "Ed448", or the OID.
    pub fn name(&self) -> &str {
        match self {
            KeyAlgorithm::Rsa { .. } => "RSA",
            KeyAlgorithm::Ec { .. } => "EC",
            KeyAlgorithm::Ed25519 => "Ed25519",
            KeyAlgorithm::Ed448 => "Ed448",
            KeyAlgorithm::Unknown { oid } => oid,
        }
    }

    /// Key size in bits, when it is known.
    pub fn key_size(&self) -> Option<u32> {
        match self {
            KeyAlgorithm::Rsa { bits, .. } => Some(*bits),
            KeyAlgorithm::Ec { bits, .. } => *bits,
            KeyAlgorithm::Ed25519 => Some(256),
            KeyAlgorithm::Ed448 => Some(448),
            KeyAlgorithm::Unknown { .. } => None,
        }
    }
}

/// Public key information.
#[derive(Debug, Clone, Serialize)]
pub struct PublicKeyInfo {
    pub algorithm: KeyAlgorithm,
    /// Contents of the subjectPublicKey BIT STRING (OCSP issuer-key hashing).
    #[serde(skip)]
    pub raw: Vec<u8>,
}

/// A certificate extension.
#[derive(Debug, Clone, Serialize)]
pub struct Extension {
    /// OID as a dotted-decimal string.
    pub oid: String,
    /// Human-readable name (or OID string if unknown).
    pub name: String,
    /// Whether this extension is marked critical.
    pub critical: bool,
    /// Raw extnValue contents.
    #[serde(serialize_with = "serialize_hex")]
    pub raw: Vec<u8>,
    /// Parsed extension value.
    pub value: ExtensionValue,
}

/// Strongly-typed extension values.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ExtensionValue {
    BasicConstraints {
        ca: bool,
        path_len: Option<u32>,
    },
    /// Key usage bit flags, bit 0 = digitalSignature.
    KeyUsage(u16),
    /// Extended key usage OIDs.
    ExtendedKeyUsage(Vec<String>),
    SubjectAltName(Vec<SanEntry>),
    SubjectKeyIdentifier(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
    AuthorityKeyIdentifier {
        #[serde(serialize_with = "serialize_opt_hex")]
        key_id: Option<Vec<u8>>,
    },
    AuthorityInfoAccess(Vec<AiaEntry>),
    CrlDistributionPoints(Vec<String>),
    CertificatePolicies(Vec<String>),
    PolicyMappings(Vec<PolicyMapping>),
    PolicyConstraints {
        require_explicit_policy: Option<u32>,
        inhibit_policy_mapping: Option<u32>,
    },
    InhibitAnyPolicy(u32),
    NameConstraints(NameConstraints),
    /// Fallback for extensions we don't parse into a specific variant.
    Raw,
}

/// Subject Alternative Name entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum SanEntry {
    Dns(String),
    Email(String),
    Ip(IpAddr),
    Uri(String),
    DirName(String),
    Other(String),
}

/// Authority Information Access entry.
#[derive(Debug, Clone, Serialize)]
pub struct AiaEntry {
    /// Access method: "OCSP" or "CA Issuers".
    pub method: String,
    /// Access location (usually a URI).
    pub location: String,
}

/// One issuerDomainPolicy -> subjectDomainPolicy pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyMapping {
    pub issuer_domain_policy: String,
    pub subject_domain_policy: String,
}

/// Permitted and excluded subtrees of a Name Constraints extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NameConstraints {
    pub permitted: Vec<GeneralSubtree>,
    pub excluded: Vec<GeneralSubtree>,
}

/// The base name of a Name Constraints subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum GeneralSubtree {
    Dns(String),
    Email(String),
    Uri(String),
    /// Address followed by netmask: 8 bytes for IPv4, 32 bytes for IPv6.
    Ip(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
    Other(String),
}

impl CertificateInfo {
    /// Return the subject as a one-line string.
    pub fn subject_string(&self) -> String {
        self.subject.to_oneline()
    }

    /// Return the issuer as a one-line string.
    pub fn issuer_string(&self) -> String {
        self.issuer.to_oneline()
    }

    /// Return the serial number as a colon-separated hex string (e.g., "10:00").
    pub fn serial_hex(&self) -> String {
        crate::util::hex_colon_upper(&self.serial)
    }

    /// Whether subject and issuer names are identical.
    ///
    /// Used as the self-signed test for chain construction and root
    /// classification; signatures are checked separately by `signedBy`.
    pub fn is_self_issued(&self) -> bool {
        if !self.subject.raw.is_empty() && !self.issuer.raw.is_empty() {
            return self.subject.raw == self.issuer.raw;
        }
        self.subject_string() == self.issuer_string()
    }

    /// Find an extension by OID.
    pub fn extension(&self, oid: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.oid == oid)
    }

    /// Basic constraints as `(ca, path_len)`, if the extension is present.
    pub fn basic_constraints(&self) -> Option<(bool, Option<u32>)> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::BasicConstraints { ca, path_len } => Some((*ca, *path_len)),
            _ => None,
        })
    }

    /// Whether basic constraints mark this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        self.basic_constraints().is_some_and(|(ca, _)| ca)
    }

    /// Declared pathLenConstraint of a CA certificate.
    pub fn path_len_constraint(&self) -> Option<u32> {
        match self.basic_constraints() {
            Some((true, path_len)) => path_len,
            _ => None,
        }
    }

    /// Extract all SAN entries.
    pub fn san_entries(&self) -> Vec<&SanEntry> {
        self.extensions
            .iter()
            .find_map(|ext| match &ext.value {
                ExtensionValue::SubjectAltName(entries) => Some(entries.iter().collect()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Subject Key Identifier bytes.
    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::SubjectKeyIdentifier(id) => Some(id.as_slice()),
            _ => None,
        })
    }

    /// Authority Key Identifier keyIdentifier bytes.
    pub fn authority_key_id(&self) -> Option<&[u8]> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::AuthorityKeyIdentifier { key_id } => key_id.as_deref(),
            _ => None,
        })
    }

    /// Declared certificate policy OIDs, if the extension is present.
    pub fn policies(&self) -> Option<&[String]> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::CertificatePolicies(oids) => Some(oids.as_slice()),
            _ => None,
        })
    }

    /// Declared policy mappings (empty when the extension is absent).
    pub fn policy_mappings(&self) -> &[PolicyMapping] {
        self.extensions
            .iter()
            .find_map(|ext| match &ext.value {
                ExtensionValue::PolicyMappings(m) => Some(m.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// PolicyConstraints as `(require_explicit_policy, inhibit_policy_mapping)`.
    pub fn policy_constraints(&self) -> Option<(Option<u32>, Option<u32>)> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::PolicyConstraints {
                require_explicit_policy,
                inhibit_policy_mapping,
            } => Some((*require_explicit_policy, *inhibit_policy_mapping)),
            _ => None,
        })
    }

    /// InhibitAnyPolicy skipCerts value.
    pub fn inhibit_any_policy(&self) -> Option<u32> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::InhibitAnyPolicy(skip) => Some(*skip),
            _ => None,
        })
    }

    /// Name Constraints declared by this certificate.
    pub fn name_constraints(&self) -> Option<&NameConstraints> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::NameConstraints(nc) => Some(nc),
            _ => None,
        })
    }
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&crate::util::hex_colon_upper(bytes))
}

fn serialize_opt_hex<S: serde::Serializer>(
    bytes: &Option<Vec<u8>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => serialize_hex(b, s),
        None => s.serialize_none(),
    }
}
