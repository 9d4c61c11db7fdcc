//! Name Constraints checking (RFC 5280 Section 4.2.1.10), simplified.
//!
//! Permitted and excluded subtrees of every CA above the certificate are
//! accumulated and applied together instead of being intersected per CA.

use super::{Operator, OperatorError};
use crate::context::EvaluationContext;
use crate::fields::{GeneralSubtree, SanEntry};
use crate::tree::{AttributeNode, Value};
use std::net::IpAddr;

/// Maximum work factor for Name Constraints checking (names × subtrees).
/// Certificates above it fail instead of being checked.
pub(crate) const MAX_NC_WORK_FACTOR: usize = 65_536;

#[derive(Debug, Default)]
struct Subtrees {
    dns: Vec<String>,
    email: Vec<String>,
    uri: Vec<String>,
    ip: Vec<Vec<u8>>,
}

impl Subtrees {
    fn add(&mut self, subtree: &GeneralSubtree) {
        match subtree {
            GeneralSubtree::Dns(v) => self.dns.push(v.to_ascii_lowercase()),
            GeneralSubtree::Email(v) => self.email.push(v.to_ascii_lowercase()),
            GeneralSubtree::Uri(v) => self.uri.push(v.to_ascii_lowercase()),
            GeneralSubtree::Ip(v) => self.ip.push(v.clone()),
            GeneralSubtree::Other(_) => {}
        }
    }

    fn len(&self) -> usize {
        self.dns.len() + self.email.len() + self.uri.len() + self.ip.len()
    }
}

/// `nameConstraintsValid`: every SAN of the certificate under test is
/// outside all excluded subtrees and, per name type with permitted
/// subtrees, inside at least one of them.
#[derive(Debug, Clone, Copy)]
pub struct NameConstraintsValid;

impl Operator for NameConstraintsValid {
    fn name(&self) -> &'static str {
        "nameConstraintsValid"
    }

    fn evaluate(
        &self,
        _target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        _operands: &[Value],
    ) -> Result<bool, OperatorError> {
        let Some(info) = ctx.cert.as_ref() else {
            return Ok(false);
        };
        if ctx.chain.is_empty() {
            return Ok(false);
        }

        let mut permitted = Subtrees::default();
        let mut excluded = Subtrees::default();
        for ca in ctx.chain.iter().skip(info.position + 1) {
            if !ca.cert.is_ca() {
                continue;
            }
            if let Some(nc) = ca.cert.name_constraints() {
                nc.permitted.iter().for_each(|s| permitted.add(s));
                nc.excluded.iter().for_each(|s| excluded.add(s));
            }
        }

        let names = info.cert.san_entries();
        let work = names
            .len()
            .saturating_mul(permitted.len() + excluded.len());
        if work > MAX_NC_WORK_FACTOR {
            tracing::warn!(
                subject = %info.subject(),
                names = names.len(),
                subtrees = permitted.len() + excluded.len(),
                "name constraints check exceeds resource limits"
            );
            return Ok(false);
        }

        for name in names {
            let ok = match name {
                SanEntry::Dns(dns) => {
                    let dns = dns.to_ascii_lowercase();
                    allowed(&dns, &permitted.dns, &excluded.dns, dns_name_matches_constraint)
                }
                SanEntry::Email(email) => {
                    let email = email.to_ascii_lowercase();
                    allowed(&email, &permitted.email, &excluded.email, email_matches_constraint)
                }
                SanEntry::Uri(uri) => match uri_host(uri) {
                    Some(host) => {
                        allowed(&host, &permitted.uri, &excluded.uri, dns_name_matches_constraint)
                    }
                    // A URI without a host cannot satisfy a permitted subtree.
                    None => permitted.uri.is_empty(),
                },
                SanEntry::Ip(addr) => {
                    let bytes = ip_bytes(addr);
                    !excluded.ip.iter().any(|c| ip_matches_constraint(&bytes, c))
                        && (permitted.ip.is_empty()
                            || permitted.ip.iter().any(|c| ip_matches_constraint(&bytes, c)))
                }
                SanEntry::DirName(_) | SanEntry::Other(_) => true,
            };
            if !ok {
                tracing::debug!(name = ?name, "name violates constraints");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn allowed(
    name: &str,
    permitted: &[String],
    excluded: &[String],
    matches: fn(&str, &str) -> bool,
) -> bool {
    if excluded.iter().any(|c| matches(name, c)) {
        return false;
    }
    permitted.is_empty() || permitted.iter().any(|c| matches(name, c))
}

/// Check if a DNS name matches a Name Constraint.
///
/// A constraint of ".example.com" matches "host.example.com" but not
/// "example.com". A constraint of "example.com" matches both.
pub(crate) fn dns_name_matches_constraint(name: &str, constraint: &str) -> bool {
    if constraint.is_empty() {
        // Empty constraint matches everything
        return true;
    }
    if constraint.starts_with('.') {
        name.ends_with(constraint)
    } else {
        name == constraint
            || (name.len() > constraint.len()
                && name.ends_with(constraint)
                && name.as_bytes().get(name.len() - constraint.len() - 1) == Some(&b'.'))
    }
}

/// Check if an email matches a Name Constraint.
///
/// A constraint containing `@` is an exact mailbox match. Otherwise the
/// domain part is matched with the DNS rules.
pub(crate) fn email_matches_constraint(email: &str, constraint: &str) -> bool {
    if constraint.contains('@') {
        return email == constraint;
    }
    match email.rsplit_once('@') {
        Some((_, domain)) => dns_name_matches_constraint(domain, constraint),
        None => false,
    }
}

/// Check if an IP address matches a constraint (address + netmask).
///
/// IPv4 constraints are 8 bytes (4 address + 4 mask).
/// IPv6 constraints are 32 bytes (16 address + 16 mask).
pub(crate) fn ip_matches_constraint(ip_bytes: &[u8], constraint: &[u8]) -> bool {
    let addr_len = ip_bytes.len();
    if constraint.len() != addr_len * 2 || (addr_len != 4 && addr_len != 16) {
        return false;
    }
    let (addr, mask) = constraint.split_at(addr_len);
    ip_bytes
        .iter()
        .zip(addr.iter())
        .zip(mask.iter())
        .all(|((ip, a), m)| (ip & m) == (a & m))
}

fn ip_bytes(addr: &IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Lowercased host of a URI: scheme, userinfo, port, path dropped.
fn uri_host(uri: &str) -> Option<String> {
    let (_, rest) = uri.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = if let Some(bracketed) = host_port.strip_prefix('[') {
        bracketed.split(']').next()?
    } else {
        host_port.split(':').next()?
    };
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}
