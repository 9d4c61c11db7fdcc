//! Rule operators and the name-keyed registry that dispatches them.
//!
//! Every operator receives the resolved target node (`None` when the rule's
//! path does not exist), the evaluation context, and the rule's operands.
//! A missing target is never an error: it yields `false`, except for the
//! few operators whose meaning is "absent is fine" (`isEmpty`, `notRevoked`,
//! `notRevokedOCSP`). Missing chain or revocation material is handled the
//! same way.

mod chain;
mod compare;
mod equality;
mod extension;
mod key;
mod length;
mod membership;
mod name_constraints;
mod pattern;
mod policy_graph;
mod revocation;
mod temporal;

pub use chain::{AkiMatchesSki, IssuedBy, PathLenValid, SignedBy};
pub use compare::{Compare, CompareOp, Positive};
pub use equality::{Equality, Matches};
pub use extension::{Criticality, NoUnknownCriticalExtensions};
pub use key::{KeyAlgorithmIn, MinKeySize};
pub use length::{Emptiness, Length, Present};
pub use membership::{Contains, Membership};
pub use name_constraints::NameConstraintsValid;
pub use pattern::RegexMatch;
pub use policy_graph::CertificatePolicyValid;
pub use revocation::{
    CrlNotExpired, CrlSignedBy, CrlValid, NotRevoked, NotRevokedOcsp, OcspGood, OcspNotExpired,
    OcspSignedBy, OcspValid,
};
pub use temporal::Temporal;

use crate::context::EvaluationContext;
use crate::tree::{AttributeNode, Value};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// A named predicate over an attribute node.
pub trait Operator: Send + Sync {
    /// Name used in rule documents.
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        target: Option<&AttributeNode>,
        ctx: &EvaluationContext,
        operands: &[Value],
    ) -> Result<bool, OperatorError>;
}

/// Errors raised by operators for malformed rules, and by the registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperatorError {
    #[error("unknown operator: {0}")]
    NotFound(String),

    #[error("{operator}: expected {expected} operand(s), got {got}")]
    Arity {
        operator: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{operator}: not a number: {value}")]
    NotNumeric { operator: &'static str, value: String },

    #[error("{operator}: invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        operator: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("{operator}: cannot parse timestamp {value:?}")]
    InvalidTimestamp { operator: &'static str, value: String },

    #[error("{operator}: unsupported value shape: {shape}")]
    UnsupportedShape { operator: &'static str, shape: String },

    #[error("{operator}: {reason}")]
    InvalidOperand {
        operator: &'static str,
        reason: String,
    },
}

/// Name-to-operator map.
#[derive(Clone)]
pub struct OperatorRegistry {
    operators: HashMap<&'static str, Arc<dyn Operator>>,
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.names())
            .finish()
    }
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        OperatorRegistry {
            operators: HashMap::new(),
        }
    }

    /// A registry holding every built-in operator. `regex` and `notRegex`
    /// share one pattern cache owned by this registry.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let cache = Arc::new(RegexCache::new());

        registry.register(Equality::eq());
        registry.register(Equality::neq());
        registry.register(Matches);
        registry.register(Compare::new(CompareOp::Gt));
        registry.register(Compare::new(CompareOp::Gte));
        registry.register(Compare::new(CompareOp::Lt));
        registry.register(Compare::new(CompareOp::Lte));
        registry.register(Membership::is_in());
        registry.register(Membership::not_in());
        registry.register(Contains);
        registry.register(Length::min());
        registry.register(Length::max());
        registry.register(Emptiness::is_empty());
        registry.register(Emptiness::not_empty());
        registry.register(RegexMatch::new(Arc::clone(&cache)));
        registry.register(RegexMatch::negated(cache));
        registry.register(Temporal::before());
        registry.register(Temporal::after());
        registry.register(Criticality::is_critical());
        registry.register(Criticality::not_critical());
        registry.register(Positive);
        registry.register(Present);

        registry.register(SignedBy);
        registry.register(IssuedBy);
        registry.register(AkiMatchesSki);
        registry.register(PathLenValid);
        registry.register(NameConstraintsValid);
        registry.register(CertificatePolicyValid);

        registry.register(CrlValid);
        registry.register(CrlNotExpired);
        registry.register(CrlSignedBy);
        registry.register(NotRevoked);
        registry.register(OcspValid);
        registry.register(OcspNotExpired);
        registry.register(OcspSignedBy);
        registry.register(NotRevokedOcsp);
        registry.register(OcspGood);

        registry.register(KeyAlgorithmIn);
        registry.register(MinKeySize);
        registry.register(NoUnknownCriticalExtensions);

        registry
    }

    /// Register `op` under its own name, replacing any previous entry.
    pub fn register<O: Operator + 'static>(&mut self, op: O) {
        self.operators.insert(op.name(), Arc::new(op));
    }

    pub fn get(&self, name: &str) -> Result<&dyn Operator, OperatorError> {
        self.operators
            .get(name)
            .map(|op| op.as_ref())
            .ok_or_else(|| OperatorError::NotFound(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.operators.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Compiled regular expressions keyed by pattern text.
///
/// Safe to share between threads; concurrent lookups take a read lock and
/// only a miss takes the write lock.
#[derive(Debug, Default)]
pub struct RegexCache {
    patterns: RwLock<HashMap<String, Arc<Regex>>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the compiled form of `pattern`, compiling it on first use.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        if let Some(re) = self.patterns.read().get(pattern) {
            return Ok(Arc::clone(re));
        }
        let compiled = Arc::new(Regex::new(pattern)?);
        let mut patterns = self.patterns.write();
        let entry = patterns
            .entry(pattern.to_string())
            .or_insert_with(|| Arc::clone(&compiled));
        Ok(Arc::clone(entry))
    }

    /// Number of cached patterns.
    pub fn len(&self) -> usize {
        self.patterns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.read().is_empty()
    }
}

/// Require exactly one operand.
pub(crate) fn single_operand<'a>(
    operator: &'static str,
    operands: &'a [Value],
) -> Result<&'a Value, OperatorError> {
    match operands {
        [one] => Ok(one),
        _ => Err(OperatorError::Arity {
            operator,
            expected: "exactly 1",
            got: operands.len(),
        }),
    }
}

/// Deep equality with numeric coercion across integer and float variants,
/// and hex-string comparison against byte values.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::UInt(y)) | (Value::UInt(y), Value::Int(x)) => {
            i128::from(*x) == i128::from(*y)
        }
        (Value::Float(_), Value::Int(_) | Value::UInt(_) | Value::Float(_))
        | (Value::Int(_) | Value::UInt(_), Value::Float(_)) => a.as_f64() == b.as_f64(),
        (Value::Bytes(bytes), Value::String(s)) | (Value::String(s), Value::Bytes(bytes)) => {
            bytes_match_hex(bytes, s)
        }
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

/// Compare bytes with a hex string, ignoring case and `:` separators.
fn bytes_match_hex(bytes: &[u8], text: &str) -> bool {
    let compact: String = text
        .chars()
        .filter(|c| *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    compact == hex::encode(bytes)
}

/// Scalar value of a node, if any.
pub(crate) fn node_value(target: Option<&AttributeNode>) -> Option<&Value> {
    target.and_then(|node| node.value.as_ref())
}

/// Strings carried by the operands, flattening list operands.
pub(crate) fn string_operands(operands: &[Value]) -> Vec<String> {
    let mut out = Vec::new();
    for op in operands {
        match op {
            Value::List(items) => out.extend(string_operands(items)),
            other => out.push(other.to_string()),
        }
    }
    out
}
