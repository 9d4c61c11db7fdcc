//! Declarative mapping from [`CertificateInfo`] to an attribute tree.

use super::{AttributeNode, Value};
use crate::fields::{
    CertificateInfo, DistinguishedName, Extension, ExtensionValue, GeneralSubtree, KeyAlgorithm,
    NameConstraints, SanEntry,
};
use crate::oid;
use crate::util;
use std::collections::BTreeMap;

/// Top-level key under which the certificate subtree lives.
pub const ROOT_KEY: &str = "certificate";

/// Key usage flag names indexed by bit position (bit 0 = digitalSignature).
const KEY_USAGE_FLAGS: [&str; 9] = [
    "digitalSignature",
    "contentCommitment",
    "keyEncipherment",
    "dataEncipherment",
    "keyAgreement",
    "keyCertSign",
    "cRLSign",
    "encipherOnly",
    "decipherOnly",
];

const EKU_FLAGS: [(&str, &str); 7] = [
    (oid::EKU_SERVER_AUTH, "serverAuth"),
    (oid::EKU_CLIENT_AUTH, "clientAuth"),
    (oid::EKU_CODE_SIGNING, "codeSigning"),
    (oid::EKU_EMAIL_PROTECTION, "emailProtection"),
    (oid::EKU_TIME_STAMPING, "timeStamping"),
    (oid::EKU_OCSP_SIGNING, "ocspSigning"),
    (oid::EKU_ANY, "anyExtendedKeyUsage"),
];

/// Build the attribute tree for one certificate.
///
/// The returned root has a single child, [`ROOT_KEY`], so rule targets read
/// `certificate.subject.CN`, `certificate.extensions.2.5.29.19.critical`,
/// and so on.
pub fn build_tree(cert: &CertificateInfo) -> AttributeNode {
    let mut c = AttributeNode::new(ROOT_KEY);

    c.insert(AttributeNode::leaf("version", cert.version));
    c.insert(
        AttributeNode::leaf("serialNumber", Value::Bytes(cert.serial.clone()))
            .with_child(AttributeNode::leaf("hex", cert.serial_hex()))
            .with_child(AttributeNode::leaf(
                "decimal",
                util::be_bytes_to_decimal(&cert.serial),
            )),
    );
    c.insert(
        AttributeNode::leaf("signatureAlgorithm", cert.signature_algorithm.as_str())
            .with_child(AttributeNode::leaf("oid", cert.signature_algorithm_oid.as_str())),
    );
    c.insert(name_node("issuer", &cert.issuer));
    c.insert(name_node("subject", &cert.subject));

    let days = (cert.not_after - cert.not_before).whole_days();
    c.insert(
        AttributeNode::new("validity")
            .with_child(AttributeNode::leaf("notBefore", cert.not_before))
            .with_child(AttributeNode::leaf("notAfter", cert.not_after))
            .with_child(AttributeNode::leaf("days", days)),
    );
    c.insert(public_key_node(&cert.public_key.algorithm));

    let mut extensions = AttributeNode::new("extensions");
    for ext in &cert.extensions {
        if let Some(view) = extension_view(ext) {
            c.insert(view.with_child(AttributeNode::leaf("critical", ext.critical)));
        }
        let raw = AttributeNode::leaf(ext.oid.as_str(), Value::Bytes(ext.raw.clone()))
            .with_child(AttributeNode::leaf("critical", ext.critical))
            .with_child(AttributeNode::leaf("name", ext.name.as_str()))
            .with_child(AttributeNode::leaf("oid", ext.oid.as_str()));
        extensions.insert_path(&ext.oid, raw);
    }
    c.insert(extensions);

    AttributeNode::new("").with_child(c)
}

/// One-line name as the value; one child per attribute short name. Repeated
/// attributes (several OUs) become a list.
fn name_node(key: &str, dn: &DistinguishedName) -> AttributeNode {
    let mut grouped: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
    for (k, v) in &dn.components {
        grouped
            .entry(k.as_str())
            .or_default()
            .push(Value::String(v.clone()));
    }
    let mut node = AttributeNode::leaf(key, dn.to_oneline());
    for (k, values) in grouped {
        let value = match <[Value; 1]>::try_from(values) {
            Ok([single]) => single,
            Err(values) => Value::List(values),
        };
        node.insert(AttributeNode::leaf(k, value));
    }
    node
}

fn public_key_node(algorithm: &KeyAlgorithm) -> AttributeNode {
    let mut node = AttributeNode::new("subjectPublicKeyInfo")
        .with_child(AttributeNode::leaf("algorithm", algorithm.name()));
    if let Some(bits) = algorithm.key_size() {
        node.insert(AttributeNode::leaf("keySize", bits));
    }
    match algorithm {
        KeyAlgorithm::Rsa { exponent, .. } => {
            node.insert(AttributeNode::leaf("exponent", *exponent));
        }
        KeyAlgorithm::Ec { curve, .. } => {
            node.insert(AttributeNode::leaf("curve", curve.as_str()));
        }
        _ => {}
    }
    node
}

fn string_list<'a>(items: impl IntoIterator<Item = &'a str>) -> Value {
    Value::List(items.into_iter().map(Value::from).collect())
}

/// Named view of a typed extension, without its `critical` child.
fn extension_view(ext: &Extension) -> Option<AttributeNode> {
    let node = match &ext.value {
        ExtensionValue::BasicConstraints { ca, path_len } => {
            let mut node = AttributeNode::new("basicConstraints")
                .with_child(AttributeNode::leaf("ca", *ca));
            if let Some(len) = path_len {
                node.insert(AttributeNode::leaf("pathLenConstraint", *len));
            }
            node
        }
        ExtensionValue::KeyUsage(flags) => {
            let mut node = AttributeNode::leaf("keyUsage", u32::from(*flags));
            for (bit, name) in KEY_USAGE_FLAGS.iter().enumerate() {
                node.insert(AttributeNode::leaf(*name, flags & (1 << bit) != 0));
            }
            node
        }
        ExtensionValue::ExtendedKeyUsage(oids) => {
            let mut node = AttributeNode::leaf(
                "extendedKeyUsage",
                string_list(oids.iter().map(String::as_str)),
            );
            for (eku_oid, name) in EKU_FLAGS {
                node.insert(AttributeNode::leaf(name, oids.iter().any(|o| o == eku_oid)));
            }
            node
        }
        ExtensionValue::SubjectAltName(entries) => san_node(entries),
        ExtensionValue::SubjectKeyIdentifier(id) => {
            AttributeNode::leaf("subjectKeyIdentifier", Value::Bytes(id.clone()))
        }
        ExtensionValue::AuthorityKeyIdentifier { key_id } => match key_id {
            Some(id) => AttributeNode::leaf("authorityKeyIdentifier", Value::Bytes(id.clone()))
                .with_child(AttributeNode::leaf("keyIdentifier", Value::Bytes(id.clone()))),
            None => AttributeNode::new("authorityKeyIdentifier"),
        },
        ExtensionValue::AuthorityInfoAccess(entries) => {
            let by_method = |method: &str| {
                string_list(
                    entries
                        .iter()
                        .filter(|e| e.method == method)
                        .map(|e| e.location.as_str()),
                )
            };
            AttributeNode::new("authorityInfoAccess")
                .with_child(AttributeNode::leaf("ocsp", by_method("OCSP")))
                .with_child(AttributeNode::leaf("caIssuers", by_method("CA Issuers")))
        }
        ExtensionValue::CrlDistributionPoints(uris) => AttributeNode::leaf(
            "crlDistributionPoints",
            string_list(uris.iter().map(String::as_str)),
        ),
        ExtensionValue::CertificatePolicies(oids) => {
            let mut node = AttributeNode::leaf(
                "certificatePolicies",
                string_list(oids.iter().map(String::as_str)),
            );
            // Each policy OID is also a presence path, one arc per level.
            for policy in oids {
                node.insert_path(policy, AttributeNode::leaf(policy.as_str(), true));
            }
            node
        }
        ExtensionValue::PolicyMappings(mappings) => {
            let mut node = AttributeNode::leaf("policyMappings", mappings.len() as u64);
            for (i, m) in mappings.iter().enumerate() {
                node.insert(
                    AttributeNode::new(i.to_string())
                        .with_child(AttributeNode::leaf(
                            "issuerDomainPolicy",
                            m.issuer_domain_policy.as_str(),
                        ))
                        .with_child(AttributeNode::leaf(
                            "subjectDomainPolicy",
                            m.subject_domain_policy.as_str(),
                        )),
                );
            }
            node
        }
        ExtensionValue::PolicyConstraints {
            require_explicit_policy,
            inhibit_policy_mapping,
        } => {
            let mut node = AttributeNode::new("policyConstraints");
            if let Some(n) = require_explicit_policy {
                node.insert(AttributeNode::leaf("requireExplicitPolicy", *n));
            }
            if let Some(n) = inhibit_policy_mapping {
                node.insert(AttributeNode::leaf("inhibitPolicyMapping", *n));
            }
            node
        }
        ExtensionValue::InhibitAnyPolicy(skip) => AttributeNode::leaf("inhibitAnyPolicy", *skip),
        ExtensionValue::NameConstraints(nc) => name_constraints_node(nc),
        ExtensionValue::Raw => return None,
    };
    Some(node)
}

fn san_node(entries: &[SanEntry]) -> AttributeNode {
    let mut dns = Vec::new();
    let mut email = Vec::new();
    let mut ip = Vec::new();
    let mut uri = Vec::new();
    let mut dir_name = Vec::new();
    for entry in entries {
        match entry {
            SanEntry::Dns(v) => dns.push(Value::from(v.as_str())),
            SanEntry::Email(v) => email.push(Value::from(v.as_str())),
            SanEntry::Ip(addr) => ip.push(Value::String(addr.to_string())),
            SanEntry::Uri(v) => uri.push(Value::from(v.as_str())),
            SanEntry::DirName(v) => dir_name.push(Value::from(v.as_str())),
            SanEntry::Other(_) => {}
        }
    }
    AttributeNode::leaf("subjectAltName", entries.len() as u64)
        .with_child(AttributeNode::leaf("dns", Value::List(dns)))
        .with_child(AttributeNode::leaf("email", Value::List(email)))
        .with_child(AttributeNode::leaf("ip", Value::List(ip)))
        .with_child(AttributeNode::leaf("uri", Value::List(uri)))
        .with_child(AttributeNode::leaf("dirName", Value::List(dir_name)))
}

fn name_constraints_node(nc: &NameConstraints) -> AttributeNode {
    AttributeNode::new("nameConstraints")
        .with_child(subtrees_node("permitted", &nc.permitted))
        .with_child(subtrees_node("excluded", &nc.excluded))
}

fn subtrees_node(key: &str, subtrees: &[GeneralSubtree]) -> AttributeNode {
    let mut dns = Vec::new();
    let mut email = Vec::new();
    let mut uri = Vec::new();
    let mut ip = Vec::new();
    for subtree in subtrees {
        match subtree {
            GeneralSubtree::Dns(v) => dns.push(Value::from(v.as_str())),
            GeneralSubtree::Email(v) => email.push(Value::from(v.as_str())),
            GeneralSubtree::Uri(v) => uri.push(Value::from(v.as_str())),
            GeneralSubtree::Ip(bytes) => ip.push(Value::String(format_ip_subtree(bytes))),
            GeneralSubtree::Other(_) => {}
        }
    }
    AttributeNode::new(key)
        .with_child(AttributeNode::leaf("dns", Value::List(dns)))
        .with_child(AttributeNode::leaf("email", Value::List(email)))
        .with_child(AttributeNode::leaf("uri", Value::List(uri)))
        .with_child(AttributeNode::leaf("ip", Value::List(ip)))
}

/// Render an address+mask subtree as CIDR (`10.0.0.0/8`), or hex when the
/// encoding is not 8 or 32 bytes.
fn format_ip_subtree(bytes: &[u8]) -> String {
    let half = bytes.len() / 2;
    let (addr, mask) = bytes.split_at(half);
    let prefix: u32 = mask.iter().map(|b| b.count_ones()).sum();
    match util::ip_from_bytes(addr) {
        Some(ip) => format!("{}/{}", ip, prefix),
        None => hex::encode(bytes),
    }
}
